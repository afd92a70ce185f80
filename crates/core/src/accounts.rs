use crate::domain::user::{SessionUser, User};
use crate::storage::{get_json, keys, set_json, KvStore};
use regex::Regex;
use std::sync::{Arc, OnceLock};

const MIN_PASSWORD_LEN: usize = 6;

/// Account failures. `Display` is the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("All fields are required.")]
    MissingFields,
    #[error("Password must be at least 6 characters long.")]
    PasswordTooShort,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Username already exists.")]
    UsernameTaken,
    #[error("Email address is already registered.")]
    EmailTaken,
    #[error("Username and password are required.")]
    MissingCredentials,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("account store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl AuthError {
    /// True for failures caused by the request rather than the store.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("regex email"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Registration, login and the session user, all kept in the injected store.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn KvStore>,
}

impl Accounts {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    async fn users(&self) -> anyhow::Result<Vec<User>> {
        Ok(get_json::<Vec<User>>(self.store.as_ref(), keys::USERS)
            .await?
            .unwrap_or_default())
    }

    /// Creates the account and logs it in.
    pub async fn register(
        &self,
        username: &str,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, AuthError> {
        if [username, full_name, email, password]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(AuthError::MissingFields);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        let mut users = self.users().await?;
        if users.iter().any(|u| u.username == username) {
            return Err(AuthError::UsernameTaken);
        }
        if users.iter().any(|u| u.email == email) {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            username: username.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = SessionUser::from(&user);
        users.push(user);
        set_json(self.store.as_ref(), keys::USERS, &users).await?;
        set_json(self.store.as_ref(), keys::CURRENT_USER, &session).await?;

        tracing::info!(username, "account registered");
        Ok(session)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let users = self.users().await?;
        let user = users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        let session = SessionUser::from(user);
        set_json(self.store.as_ref(), keys::CURRENT_USER, &session).await?;
        tracing::info!(username, "logged in");
        Ok(session)
    }

    pub async fn logout(&self) -> anyhow::Result<()> {
        self.store.remove(keys::CURRENT_USER).await
    }

    /// An undecodable session entry is dropped and treated as logged out.
    pub async fn current_user(&self) -> anyhow::Result<Option<SessionUser>> {
        match get_json::<SessionUser>(self.store.as_ref(), keys::CURRENT_USER).await {
            Ok(session) => Ok(session),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "dropping unreadable session");
                self.store.remove(keys::CURRENT_USER).await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn accounts() -> (Accounts, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Accounts::new(store.clone()), store)
    }

    #[tokio::test]
    async fn register_logs_the_user_in_without_password() {
        let (accounts, store) = accounts();
        let session = accounts
            .register("ada", "Ada Lovelace", "ada@example.com", "engine1")
            .await
            .unwrap();
        assert_eq!(session.username, "ada");
        assert_eq!(accounts.current_user().await.unwrap(), Some(session));

        let raw = store.get("currentUser").await.unwrap().unwrap();
        assert!(!raw.contains("engine1"));
        assert!(raw.contains("fullName"));
    }

    #[tokio::test]
    async fn duplicate_username_and_email_have_distinct_messages() {
        let (accounts, _) = accounts();
        accounts
            .register("ada", "Ada Lovelace", "ada@example.com", "engine1")
            .await
            .unwrap();

        let by_name = accounts
            .register("ada", "Someone Else", "other@example.com", "secret1")
            .await
            .unwrap_err();
        let by_email = accounts
            .register("grace", "Grace Hopper", "ada@example.com", "secret1")
            .await
            .unwrap_err();

        assert_eq!(by_name.to_string(), "Username already exists.");
        assert_eq!(by_email.to_string(), "Email address is already registered.");
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_any_write() {
        let (accounts, store) = accounts();
        let err = accounts
            .register("ada", "Ada Lovelace", "ada@example.com", "12345")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters long.");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn validation_order_reports_missing_fields_first() {
        let (accounts, _) = accounts();
        let err = accounts.register("ada", "", "not-an-email", "1").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingFields));

        let err = accounts
            .register("ada", "Ada", "not-an-email", "123456")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid email address.");
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn login_and_logout() {
        let (accounts, _) = accounts();
        accounts
            .register("ada", "Ada Lovelace", "ada@example.com", "engine1")
            .await
            .unwrap();
        accounts.logout().await.unwrap();
        assert_eq!(accounts.current_user().await.unwrap(), None);

        assert!(matches!(
            accounts.login("", "x").await.unwrap_err(),
            AuthError::MissingCredentials
        ));
        assert_eq!(
            accounts.login("ada", "wrong!!").await.unwrap_err().to_string(),
            "Invalid username or password."
        );
        let session = accounts.login("ada", "engine1").await.unwrap();
        assert_eq!(session.email, "ada@example.com");
    }

    #[tokio::test]
    async fn unreadable_session_is_dropped() {
        let (accounts, store) = accounts();
        store.set("currentUser", "not json").await.unwrap();
        assert_eq!(accounts.current_user().await.unwrap(), None);
        assert!(store.get("currentUser").await.unwrap().is_none());
    }

    #[test]
    fn email_check_is_loose() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("ab.co"));
    }
}
