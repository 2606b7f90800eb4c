//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::controller::{ControllerSnapshot, FocusController};
use crate::error::{FocusError, Result};
use crate::session::{FocusQuality, IntervalTicks, Session, SystemClock, TickSource};
use crate::soundscape::{render_profile, AudioGraph, SoundscapeProfile, SoundscapeState, SynthGraph};
use crate::sync::{MemoryStore, PersistenceSync, SessionStore};

/// Options for a single `run` invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub minutes: u32,
    pub id: Option<String>,
    pub task: Option<String>,
    pub soundscape: String,
    pub volume: Option<f32>,
    pub quality: Option<u8>,
    pub notes: Option<String>,
    pub park: Vec<String>,
}

/// Run a session against the configured store and print the final snapshot.
pub async fn run(options: RunOptions, tick: Duration, config: &Config) -> Result<()> {
    let store = build_store(config)?;
    let (sync, worker) = PersistenceSync::spawn(store, config.user_id.clone());
    let graph = SynthGraph::with_gesture(config.audio.sample_rate);
    let mut controller =
        FocusController::with_config(Arc::new(SystemClock), sync.clone(), graph, config);

    let mut ticks = IntervalTicks::new(tick);
    let snapshot = run_session(&mut controller, &mut ticks, &options, shutdown_signal()).await?;

    // Everything the session queued has reached the store before exit
    sync.flush().await;
    drop(controller);
    drop(sync);
    for report in worker.join().await {
        match &report.result {
            Ok(()) => info!("Synced {} for {}", report.kind, report.session_id),
            Err(e) => warn!("Sync {} for {} failed: {}", report.kind, report.session_id, e),
        }
    }

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Drive one session from start to end
///
/// The countdown advances once per tick from `ticks`. The loop ends when a
/// tick reports expiry or `shutdown` resolves, then the session is ended
/// with the requested quality and notes.
pub async fn run_session<G, T, S>(
    controller: &mut FocusController<G>,
    ticks: &mut T,
    options: &RunOptions,
    shutdown: S,
) -> Result<ControllerSnapshot>
where
    G: AudioGraph,
    T: TickSource,
    S: Future<Output = ()>,
{
    let quality = options.quality.map(FocusQuality::new).transpose()?;
    let profile: SoundscapeProfile = options.soundscape.parse()?;

    let now = controller.session().now();
    let mut session = match &options.id {
        Some(id) => Session::new(id.clone(), options.minutes, now),
        None => Session::with_random_id(options.minutes, now),
    };
    if let Some(task) = &options.task {
        session = session.with_task(task.clone());
    }

    controller.start_session(session);
    if let Some(volume) = options.volume {
        controller.set_volume(volume);
    }
    if let SoundscapeState::Deferred(p) = controller.soundscape_mut().set_profile(profile) {
        warn!("Soundscape {} deferred; continuing in silence", p);
    }
    for text in &options.park {
        controller.add_to_parking_lot(text.clone());
    }

    info!(
        "Focus for {} minute(s), {} remaining",
        options.minutes,
        controller.session().countdown().display()
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let tick = controller.tick();
                if tick.expired {
                    info!("Countdown expired");
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Interrupted with {}s remaining", controller.time_remaining());
                break;
            }
        }
    }

    controller.end_session(quality, options.notes.clone());
    controller.stop_soundscape();
    Ok(controller.snapshot())
}

/// Render a profile to a WAV file.
pub fn render(profile: &str, seconds: f64, volume: f32, output: &Path, config: &Config) -> Result<()> {
    let profile: SoundscapeProfile = profile.parse()?;
    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|_| FocusError::InvalidDuration { value: seconds })?;
    let frames = render_profile(profile, volume, duration, config.audio.sample_rate, output)?;

    println!("Rendered {} ({} frames) to {}", profile, frames, output.display());
    Ok(())
}

/// List available soundscape profiles.
pub fn list_profiles() -> Result<()> {
    for profile in SoundscapeProfile::ALL {
        println!("{:<12} {}", profile.as_str(), profile.description());
    }
    Ok(())
}

#[cfg(feature = "remote")]
fn build_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    match &config.store {
        Some(store) => {
            info!("Syncing sessions to {}", store.url);
            Ok(Arc::new(crate::sync::RestStore::new(store)?))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(not(feature = "remote"))]
fn build_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    if config.store.is_some() {
        warn!("Remote store configured but the `remote` feature is disabled; syncing in memory");
    }
    Ok(Arc::new(MemoryStore::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Clock, ManualClock, ManualTicks, SessionStatus};
    use crate::sync::StoreCall;
    use crate::DEFAULT_SAMPLE_RATE;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;
    use test_case::test_case;

    const SESSION_ID: &str = "22222222-2222-2222-2222-222222222222";

    fn options(minutes: u32) -> RunOptions {
        RunOptions {
            minutes,
            id: Some(SESSION_ID.to_string()),
            soundscape: "rain".to_string(),
            quality: Some(5),
            notes: Some("deep".to_string()),
            park: vec!["reply to Ana".to_string()],
            ..RunOptions::default()
        }
    }

    #[tokio::test]
    async fn test_run_session_until_expiry() {
        let store = Arc::new(MemoryStore::new());
        let (sync, _worker) = PersistenceSync::spawn(store.clone(), Some("user-1".to_string()));
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        ));
        let mut controller = FocusController::new(
            clock,
            sync.clone(),
            SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE),
        );
        let mut ticks = ManualTicks::new();

        let snapshot = run_session(
            &mut controller,
            &mut ticks,
            &options(2),
            std::future::pending::<()>(),
        )
        .await
        .unwrap();

        assert_eq!(ticks.delivered(), 120);
        assert_eq!(snapshot.session.status, SessionStatus::Complete);
        assert_eq!(snapshot.soundscape, SoundscapeState::Silent);
        let last = snapshot.session.last_completed.unwrap();
        assert_eq!(last.notes.as_deref(), Some("deep"));

        sync.flush().await;
        let calls = store.calls().await;
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], StoreCall::CreateSession(_)));
        assert!(matches!(calls[1], StoreCall::UpdateSession { .. }));
        match &calls[2] {
            StoreCall::CreateParkingLotItems(rows) => assert_eq!(rows[0].text, "reply to Ana"),
            other => panic!("unexpected call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_session_interrupted() {
        let mut controller = FocusController::new(
            Arc::new(SystemClock),
            PersistenceSync::disabled(),
            SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE),
        );
        let mut ticks = IntervalTicks::new(Duration::from_secs(3600));

        let snapshot = run_session(&mut controller, &mut ticks, &options(25), async {})
            .await
            .unwrap();

        assert_eq!(snapshot.session.status, SessionStatus::Complete);
        assert_eq!(snapshot.session.time_remaining, 0);
    }

    #[tokio::test]
    async fn test_run_session_rejects_unknown_profile() {
        let mut controller = FocusController::new(
            Arc::new(SystemClock),
            PersistenceSync::disabled(),
            SynthGraph::with_gesture(DEFAULT_SAMPLE_RATE),
        );
        let mut opts = options(1);
        opts.soundscape = "ocean".to_string();

        let result = run_session(
            &mut controller,
            &mut ManualTicks::new(),
            &opts,
            std::future::pending::<()>(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(controller.status(), SessionStatus::Idle);
    }

    #[test_case(f64::INFINITY ; "infinite")]
    #[test_case(f64::NAN ; "not a number")]
    #[test_case(-1.0 ; "negative")]
    #[test_case(1e30 ; "beyond duration range")]
    fn test_render_rejects_unusable_seconds(seconds: f64) {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.wav");

        let err = render("rain", seconds, 0.5, &output, &Config::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DURATION");
        assert!(!output.exists());
    }

    #[test]
    fn test_render_writes_requested_frames() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("wind.wav");
        let mut config = Config::default();
        config.audio.sample_rate = 8_000;

        render("wind", 0.5, 0.5, &output, &config).unwrap();
        assert_eq!(hound::WavReader::open(&output).unwrap().len(), 4_000);
    }
}
