use crate::analysis::AnalysisProvider;
use crate::domain::company::{seed_companies, Company};
use std::sync::Arc;
use tokio::sync::RwLock;

pub fn not_found_message(query: &str) -> String {
    format!("Could not find company: \"{query}\". Please try a different name or ticker.")
}

/// Seed companies plus everything found through lookups, newest first.
pub struct CompanyDirectory {
    provider: Arc<dyn AnalysisProvider>,
    companies: RwLock<Vec<Company>>,
}

impl CompanyDirectory {
    pub fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            provider,
            companies: RwLock::new(seed_companies()),
        }
    }

    pub async fn list(&self) -> Vec<Company> {
        self.companies.read().await.clone()
    }

    pub async fn get(&self, ticker: &str) -> Option<Company> {
        let ticker = crate::domain::company::normalize_ticker(ticker);
        self.companies
            .read()
            .await
            .iter()
            .find(|c| c.ticker == ticker)
            .cloned()
    }

    /// Lookup failures are logged and reported as not found.
    pub async fn search(&self, query: &str, model: &str) -> Option<Company> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let found = match self.provider.find_company(query, model).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(query, model, error = %format!("{err:#}"), "company lookup failed");
                None
            }
        };

        let Some(company) = found else {
            tracing::info!(query, "company not found");
            return None;
        };
        self.remember(company.clone()).await;
        Some(company)
    }

    async fn remember(&self, company: Company) {
        let mut companies = self.companies.write().await;
        companies.retain(|c| c.ticker != company.ticker);
        companies.insert(0, company);
    }
}
