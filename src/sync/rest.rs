//! REST session store
//!
//! Talks to a PostgREST-style endpoint exposing `focus_sessions` and
//! `parking_lot_items`. Only compiled with the `remote` feature.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use super::records::{ParkingLotRow, SessionPatch, SessionRow};
use super::SessionStore;
use crate::config::StoreConfig;
use crate::error::{FocusError, Result};

const SESSIONS_TABLE: &str = "focus_sessions";
const PARKING_LOT_TABLE: &str = "parking_lot_items";

/// HTTP implementation of [`SessionStore`]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl RestStore {
    /// Build the store with an explicit client; no lazy construction
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| FocusError::StoreUnavailable {
                reason: format!("Cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder, prefer: &str) -> Result<()> {
        let response = self
            .authorize(request)
            .header("Prefer", prefer)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        check_status(response).await
    }

    fn map_transport_error(&self, e: reqwest::Error) -> FocusError {
        if e.is_timeout() {
            FocusError::StoreUnavailable {
                reason: format!("Request timed out after {}ms", self.timeout_ms),
            }
        } else if e.is_connect() {
            FocusError::StoreUnavailable {
                reason: format!("Cannot connect to store at {}: {}", self.base_url, e),
            }
        } else {
            FocusError::StoreUnavailable {
                reason: e.to_string(),
            }
        }
    }
}

async fn check_status(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(FocusError::StoreRejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SessionStore for RestStore {
    async fn create_session(&self, row: &SessionRow) -> Result<()> {
        let request = self
            .client
            .post(self.table_url(SESSIONS_TABLE))
            .json(row);
        self.execute(request, "resolution=merge-duplicates,return=minimal")
            .await
    }

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<()> {
        let request = self
            .client
            .patch(self.table_url(SESSIONS_TABLE))
            .query(&[("id", format!("eq.{}", id))])
            .json(patch);
        self.execute(request, "return=minimal").await
    }

    async fn create_parking_lot_items(&self, rows: &[ParkingLotRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .post(self.table_url(PARKING_LOT_TABLE))
            .json(rows);
        self.execute(request, "return=minimal").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let store = RestStore::new(&StoreConfig {
            url: "https://store.example.com/".to_string(),
            api_key: None,
            timeout_ms: 1_000,
        })
        .unwrap();
        assert_eq!(
            store.table_url(SESSIONS_TABLE),
            "https://store.example.com/rest/v1/focus_sessions"
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let store = RestStore::new(&StoreConfig {
            url: "http://127.0.0.1:9".to_string(),
            api_key: Some("anon".to_string()),
            timeout_ms: 500,
        })
        .unwrap();

        let result = store.create_parking_lot_items(&[]).await;
        assert!(result.is_ok());

        let row = SessionRow::from_session(
            &crate::session::Session::with_random_id(25, chrono::Utc::now()),
            None,
        );
        let result = store.create_session(&row).await;
        assert!(matches!(result, Err(FocusError::StoreUnavailable { .. })));
    }
}
