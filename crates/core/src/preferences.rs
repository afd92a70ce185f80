use crate::storage::{get_json, keys, set_json, KvStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => anyhow::bail!("unknown theme: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub is_available: bool,
}

pub fn model_catalogue() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: "gemini-2.5-flash",
            name: "Gemini 2.5 Flash",
            description: "Fast and versatile model for structured market analysis.",
            is_available: true,
        },
        ModelInfo {
            id: "gemini-pro",
            name: "Gemini Pro (Legacy)",
            description: "Previous generation model. Kept for reference, no longer selectable.",
            is_available: false,
        },
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Model is not available: {0}")]
    ModelUnavailable(String),
    #[error("preference store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceSnapshot {
    pub theme: Theme,
    pub model: String,
}

/// Theme and model choice. Missing or unreadable values fall back to the defaults.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KvStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn theme(&self) -> Theme {
        match get_json::<Theme>(self.store.as_ref(), keys::THEME).await {
            Ok(theme) => theme.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "theme preference unreadable");
                Theme::default()
            }
        }
    }

    pub async fn set_theme(&self, theme: Theme) -> anyhow::Result<()> {
        set_json(self.store.as_ref(), keys::THEME, &theme).await
    }

    pub async fn model(&self) -> String {
        match get_json::<String>(self.store.as_ref(), keys::MODEL).await {
            Ok(Some(model)) => model,
            Ok(None) => DEFAULT_MODEL.to_string(),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "model preference unreadable");
                DEFAULT_MODEL.to_string()
            }
        }
    }

    /// Only ids from the catalogue that are still available can be chosen.
    pub async fn set_model(&self, model: &str) -> Result<(), PreferenceError> {
        let catalogue = model_catalogue();
        let info = catalogue
            .iter()
            .find(|m| m.id == model)
            .ok_or_else(|| PreferenceError::UnknownModel(model.to_string()))?;
        if !info.is_available {
            return Err(PreferenceError::ModelUnavailable(model.to_string()));
        }
        set_json(self.store.as_ref(), keys::MODEL, info.id).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> PreferenceSnapshot {
        PreferenceSnapshot {
            theme: self.theme().await,
            model: self.model().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn defaults_are_dark_and_flash() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            prefs.snapshot().await,
            PreferenceSnapshot {
                theme: Theme::Dark,
                model: "gemini-2.5-flash".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn theme_is_stored_as_a_json_string() {
        let store = Arc::new(MemoryStore::new());
        let prefs = Preferences::new(store.clone());
        prefs.set_theme("LIGHT".parse().unwrap()).await.unwrap();
        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("\"light\""));
        assert_eq!(prefs.theme().await, Theme::Light);
    }

    #[tokio::test]
    async fn unavailable_or_unknown_models_are_rejected() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            prefs.set_model("gemini-pro").await,
            Err(PreferenceError::ModelUnavailable(id)) if id == "gemini-pro"
        ));
        assert!(matches!(
            prefs.set_model("gpt-4").await,
            Err(PreferenceError::UnknownModel(id)) if id == "gpt-4"
        ));
        prefs.set_model("gemini-2.5-flash").await.unwrap();
        assert_eq!(prefs.model().await, "gemini-2.5-flash");
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("connection reset")
        }

        async fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_failure_is_not_reported_as_a_bad_model() {
        let prefs = Preferences::new(Arc::new(BrokenStore));
        let err = prefs.set_model("gemini-2.5-flash").await.unwrap_err();
        assert!(matches!(err, PreferenceError::Store(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn garbage_theme_falls_back_to_default() {
        let store = Arc::new(MemoryStore::new());
        store.set("theme", "purple").await.unwrap();
        assert_eq!(Preferences::new(store).theme().await, Theme::Dark);
    }
}
