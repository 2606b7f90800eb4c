//! In-memory session store
//!
//! Records every call instead of talking to a network. Used by tests and by
//! the CLI when no remote store is configured.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::records::{ParkingLotRow, SessionPatch, SessionRow};
use super::SessionStore;
use crate::error::{FocusError, Result};

/// A call received by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    CreateSession(SessionRow),
    UpdateSession { id: String, patch: SessionPatch },
    CreateParkingLotItems(Vec<ParkingLotRow>),
}

/// Store that keeps calls and upserted rows in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    calls: Mutex<Vec<StoreCall>>,
    sessions: Mutex<Vec<SessionRow>>,
    failure: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with `reason` (after being recorded)
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// All calls received so far, in order
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    /// Current state of the session table
    pub async fn sessions(&self) -> Vec<SessionRow> {
        self.sessions.lock().await.clone()
    }

    async fn record(&self, call: StoreCall) -> Result<()> {
        self.calls.lock().await.push(call);
        match &self.failure {
            Some(reason) => Err(FocusError::StoreUnavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, row: &SessionRow) -> Result<()> {
        self.record(StoreCall::CreateSession(row.clone())).await?;

        // Upsert by id
        let mut sessions = self.sessions.lock().await;
        match sessions.iter_mut().find(|s| s.id == row.id) {
            Some(existing) => *existing = row.clone(),
            None => sessions.push(row.clone()),
        }
        Ok(())
    }

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<()> {
        self.record(StoreCall::UpdateSession {
            id: id.to_string(),
            patch: patch.clone(),
        })
        .await?;

        let mut sessions = self.sessions.lock().await;
        if let Some(row) = sessions.iter_mut().find(|s| s.id == id) {
            row.actual_duration = patch.actual_duration;
            row.ended_at = patch.ended_at;
            row.focus_quality = patch.focus_quality;
            row.notes = patch.notes.clone();
        }
        Ok(())
    }

    async fn create_parking_lot_items(&self, rows: &[ParkingLotRow]) -> Result<()> {
        self.record(StoreCall::CreateParkingLotItems(rows.to_vec()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_then_update_applies_patch() {
        let store = MemoryStore::new();
        let session = Session::with_random_id(25, Utc::now());
        store
            .create_session(&SessionRow::from_session(&session, None))
            .await
            .unwrap();

        let done = session.completed(Utc::now(), None, Some("ok".to_string()));
        store
            .update_session(&session.id, &SessionPatch::completion(&done))
            .await
            .unwrap();

        let sessions = store.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].notes.as_deref(), Some("ok"));
        assert_eq!(store.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_create_is_upsert() {
        let store = MemoryStore::new();
        let session = Session::with_random_id(25, Utc::now());
        let row = SessionRow::from_session(&session, None);
        store.create_session(&row).await.unwrap();
        store.create_session(&row).await.unwrap();
        assert_eq!(store.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store_still_records() {
        let store = MemoryStore::failing("offline");
        let session = Session::with_random_id(25, Utc::now());
        let result = store
            .create_session(&SessionRow::from_session(&session, None))
            .await;

        assert!(matches!(result, Err(FocusError::StoreUnavailable { .. })));
        assert_eq!(store.calls().await.len(), 1);
        assert!(store.sessions().await.is_empty());
    }
}
