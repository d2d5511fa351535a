use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{ApiErrorResponse, LedgerError};
use crate::types::{CategoryShare, DateRange, Expense, MessageResponse};

/// Typed client for the expense API, as used by the dashboard.
#[derive(Clone)]
pub struct ExpenseApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ExpenseApiClient {
    /// `host` is the API root, e.g. `http://127.0.0.1:8000`.
    pub fn new(client: reqwest::Client, host: Url) -> Result<Self, LedgerError> {
        let mut root = host;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let base = root.join("expenses/")?;
        Ok(Self { client, base })
    }

    /// Client rooted at `LOCAL_API_HOST`.
    pub fn from_config(cfg: &Config) -> Result<Self, LedgerError> {
        Self::new(reqwest::Client::new(), cfg.api_base_url()?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub async fn expenses_for_date(&self, date: NaiveDate) -> Result<Vec<Expense>, LedgerError> {
        let url = self.base.join(&format!("add_update/{date}"))?;
        debug!(%url, "GET expenses");
        let resp = self.client.get(url).send().await?;
        decode(resp).await
    }

    /// Replace every expense on `date`; returns the server's message.
    pub async fn replace_expenses(
        &self,
        date: NaiveDate,
        expenses: &[Expense],
    ) -> Result<String, LedgerError> {
        let url = self.base.join(&format!("add_update/{date}"))?;
        debug!(%url, count = expenses.len(), "POST expenses");
        let resp = self.client.post(url).json(expenses).send().await?;
        let body: MessageResponse = decode(resp).await?;
        Ok(body.message)
    }

    pub async fn analytics(
        &self,
        range: DateRange,
    ) -> Result<BTreeMap<String, CategoryShare>, LedgerError> {
        let url = self.base.join("analytics/")?;
        debug!(%url, "POST analytics");
        let resp = self.client.post(url).json(&range).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, LedgerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&text)
        .map(|e| e.error.message)
        .unwrap_or(text);
    Err(LedgerError::ApiStatus {
        status,
        message,
    })
}
