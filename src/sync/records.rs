//! Remote store row shapes
//!
//! Two logical tables: `focus_sessions` and `parking_lot_items`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{ParkingLotItem, Session};

/// Row in the `focus_sessions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub task_id: Option<String>,
    pub planned_duration: u32,
    pub actual_duration: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub focus_quality: Option<u8>,
    pub notes: Option<String>,
}

impl SessionRow {
    pub fn from_session(session: &Session, user_id: Option<&str>) -> Self {
        Self {
            id: session.id.clone(),
            user_id: user_id.map(str::to_string),
            task_id: session.task_id.clone(),
            planned_duration: session.planned_duration,
            actual_duration: session.actual_duration,
            started_at: session.started_at,
            ended_at: session.ended_at,
            focus_quality: session.focus_quality.map(u8::from),
            notes: session.notes.clone(),
        }
    }
}

/// Fields written when a session completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub actual_duration: Option<u32>,
    pub ended_at: Option<DateTime<Utc>>,
    pub focus_quality: Option<u8>,
    pub notes: Option<String>,
}

impl SessionPatch {
    /// Completion fields of a finished session
    pub fn completion(session: &Session) -> Self {
        Self {
            actual_duration: session.actual_duration,
            ended_at: session.ended_at,
            focus_quality: session.focus_quality.map(u8::from),
            notes: session.notes.clone(),
        }
    }
}

/// Row in the `parking_lot_items` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLotRow {
    pub id: Uuid,
    pub text: String,
    pub captured_at: DateTime<Utc>,
    pub session_id: String,
}

impl ParkingLotRow {
    pub fn from_item(item: &ParkingLotItem, session_id: &str) -> Self {
        Self {
            id: item.id,
            text: item.text.clone(),
            captured_at: item.captured_at,
            session_id: session_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FocusQuality;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_session_row_shape() {
        let started = Utc.with_ymd_and_hms(2026, 4, 1, 14, 0, 0).unwrap();
        let session = Session::new("11111111-1111-1111-1111-111111111111", 50, started)
            .with_task("task-7");
        let row = SessionRow::from_session(&session, Some("user-1"));
        let value = serde_json::to_value(&row).unwrap();

        assert_eq!(value["id"], json!("11111111-1111-1111-1111-111111111111"));
        assert_eq!(value["user_id"], json!("user-1"));
        assert_eq!(value["task_id"], json!("task-7"));
        assert_eq!(value["planned_duration"], json!(50));
        assert_eq!(value["actual_duration"], json!(null));
        assert_eq!(value["ended_at"], json!(null));
    }

    #[test]
    fn test_session_row_omits_missing_user() {
        let session = Session::new("local-1", 25, Utc::now());
        let value = serde_json::to_value(SessionRow::from_session(&session, None)).unwrap();
        assert!(value.get("user_id").is_none());
    }

    #[test]
    fn test_patch_carries_quality_as_number() {
        let started = Utc.with_ymd_and_hms(2026, 4, 1, 14, 0, 0).unwrap();
        let done = Session::new("local-1", 25, started).completed(
            started + chrono::Duration::minutes(25),
            FocusQuality::new(3).ok(),
            None,
        );
        let value = serde_json::to_value(SessionPatch::completion(&done)).unwrap();
        assert_eq!(value["focus_quality"], json!(3));
        assert_eq!(value["actual_duration"], json!(25));
    }
}
