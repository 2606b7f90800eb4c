//! Session data model
//!
//! Sessions, their lifecycle status, focus ratings and parking-lot captures.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FocusError, Result};

/// Returns true if `id` is a syntactically valid UUID.
///
/// Only such sessions are synced; anything else (e.g. `local-1` in a demo
/// context) stays local-only.
pub fn is_persistable_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Lifecycle status of the focus session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No session configured (initial state)
    #[default]
    Idle,
    /// Caller is configuring the next session
    Setup,
    /// Countdown is live
    Running,
    /// Countdown is frozen
    Paused,
    /// An external break flow has taken over
    Break,
    /// Last session finished; a new one is expected
    Complete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Setup => "setup",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Break => "break",
            SessionStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = FocusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SessionStatus::Idle),
            "setup" => Ok(SessionStatus::Setup),
            "running" => Ok(SessionStatus::Running),
            "paused" => Ok(SessionStatus::Paused),
            "break" => Ok(SessionStatus::Break),
            "complete" => Ok(SessionStatus::Complete),
            _ => Err(FocusError::UnknownStatus {
                name: s.to_string(),
            }),
        }
    }
}

/// Self-rated focus quality, 1 (scattered) to 5 (deep)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FocusQuality(u8);

impl FocusQuality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        Self::try_from(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FocusQuality {
    type Error = FocusError;

    fn try_from(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(FocusError::InvalidFocusQuality { value })
        }
    }
}

impl From<FocusQuality> for u8 {
    fn from(quality: FocusQuality) -> Self {
        quality.0
    }
}

/// A timed work interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier; only UUIDs are persisted
    pub id: String,

    /// Optional associated task reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Planned duration in minutes
    pub planned_duration: u32,

    /// Actual duration in minutes, set at completion
    #[serde(default)]
    pub actual_duration: Option<u32>,

    pub started_at: DateTime<Utc>,

    /// Null until complete
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub focus_quality: Option<FocusQuality>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, planned_duration: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            task_id: None,
            planned_duration,
            actual_duration: None,
            started_at,
            ended_at: None,
            focus_quality: None,
            notes: None,
        }
    }

    /// Create a session with a fresh v4 UUID, eligible for syncing
    pub fn with_random_id(planned_duration: u32, started_at: DateTime<Utc>) -> Self {
        Self::new(Uuid::new_v4().to_string(), planned_duration, started_at)
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_persistable(&self) -> bool {
        is_persistable_id(&self.id)
    }

    pub fn is_complete(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Planned countdown length in seconds
    pub fn planned_seconds(&self) -> u64 {
        u64::from(self.planned_duration) * 60
    }

    /// Build the completed copy of this session as of `now`
    ///
    /// Actual duration is the wall-clock delta rounded to whole minutes.
    /// `notes` replaces the prior notes only when supplied.
    pub fn completed(
        &self,
        now: DateTime<Utc>,
        quality: Option<FocusQuality>,
        notes: Option<String>,
    ) -> Session {
        let elapsed_ms = now
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0);
        let actual = (elapsed_ms as f64 / 60_000.0).round() as u32;

        Session {
            actual_duration: Some(actual),
            ended_at: Some(now),
            focus_quality: quality,
            notes: notes.or_else(|| self.notes.clone()),
            ..self.clone()
        }
    }
}

/// A distraction or thought captured mid-session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLotItem {
    pub id: Uuid,
    pub text: String,
    pub captured_at: DateTime<Utc>,

    /// Owning session, filled in when the item is flushed to the store
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ParkingLotItem {
    pub fn new(text: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            captured_at,
            session_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_persistable_ids() {
        assert!(is_persistable_id("11111111-1111-1111-1111-111111111111"));
        assert!(is_persistable_id(&Uuid::new_v4().to_string()));
        assert!(!is_persistable_id("local-1"));
        assert!(!is_persistable_id(""));
        assert!(!is_persistable_id("11111111-1111-1111-1111"));
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            SessionStatus::Idle,
            SessionStatus::Setup,
            SessionStatus::Running,
            SessionStatus::Paused,
            SessionStatus::Break,
            SessionStatus::Complete,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("napping".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Break).unwrap();
        assert_eq!(json, "\"break\"");
    }

    #[test]
    fn test_focus_quality_bounds() {
        assert!(FocusQuality::new(0).is_err());
        assert_eq!(FocusQuality::new(1).unwrap().value(), 1);
        assert_eq!(FocusQuality::new(5).unwrap().value(), 5);
        assert!(FocusQuality::new(6).is_err());
        assert!(serde_json::from_str::<FocusQuality>("9").is_err());
    }

    #[test]
    fn test_completed_rounds_minutes() {
        let session = Session::new("local-1", 25, start());
        let done = session.completed(
            start() + Duration::seconds(10 * 60 + 29),
            FocusQuality::new(4).ok(),
            Some("good session".to_string()),
        );

        assert_eq!(done.actual_duration, Some(10));
        assert_eq!(done.ended_at, Some(start() + Duration::seconds(629)));
        assert_eq!(done.focus_quality, FocusQuality::new(4).ok());
        assert_eq!(done.notes.as_deref(), Some("good session"));
        // The original record is untouched
        assert_eq!(session.ended_at, None);
    }

    #[test]
    fn test_completed_keeps_prior_notes() {
        let session = Session::new("local-1", 25, start()).with_notes("draft chapter 3");
        let done = session.completed(start() + Duration::minutes(30), None, None);
        assert_eq!(done.notes.as_deref(), Some("draft chapter 3"));
        assert_eq!(done.focus_quality, None);
    }

    #[test]
    fn test_completed_clock_skew_clamps_to_zero() {
        let session = Session::new("local-1", 25, start());
        let done = session.completed(start() - Duration::minutes(3), None, None);
        assert_eq!(done.actual_duration, Some(0));
    }

    #[test]
    fn test_planned_seconds() {
        let session = Session::new("local-1", 25, start());
        assert_eq!(session.planned_seconds(), 1500);
    }
}
