//! File connector: single-flight, cancellable sync runs

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use super::pipeline::{RunOutcome, SyncRun};
use super::{ErrorSyncEvent, SyncEvent, SyncStream};
use crate::config::FileConnectorConfig;
use crate::dedup::ActivityLookup;
use crate::error::{Error, Result};
use crate::model::{AthleteSnapshotResolver, ConnectorType, FixedAthleteSnapshot};
use crate::stats::{BasicStatsComputer, StatsComputer};

/// Lifecycle of a connector's sync runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl SyncState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// A source activities can be synced from
pub trait SyncSource {
    /// Start a run, or return the stream of the run already in progress
    fn sync(&self) -> SyncStream;

    /// Ask the running sync to stop after the file in progress
    fn request_stop(&self) -> Result<()>;

    fn state(&self) -> SyncState;

    fn connector_type(&self) -> ConnectorType;
}

struct ActiveRun {
    events: Sender<SyncEvent>,
    stream: SyncStream,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct RunSlot {
    state: SyncState,
    active: Option<ActiveRun>,
}

struct Shared {
    config: FileConnectorConfig,
    lookup: Arc<dyn ActivityLookup>,
    athlete: Arc<dyn AthleteSnapshotResolver>,
    stats: Arc<dyn StatsComputer>,
    slot: Mutex<RunSlot>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, RunSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Syncs activity files from a local directory.
///
/// Clones share the same run slot, so at most one run is active across all
/// clones of a connector.
#[derive(Clone)]
pub struct FileConnector {
    shared: Arc<Shared>,
}

impl FileConnector {
    pub fn builder() -> FileConnectorBuilder {
        FileConnectorBuilder::new()
    }

    pub fn config(&self) -> &FileConnectorConfig {
        &self.shared.config
    }

    /// Request a stop and wait for the worker to finish.
    ///
    /// Returns the state the run ended in.
    pub fn stop(&self) -> Result<SyncState> {
        let handle = {
            let mut slot = self.shared.slot();
            let active = slot.active.as_mut().ok_or(Error::NoSyncInProgress)?;
            active.stop.store(true, Ordering::SeqCst);
            active.handle.take()
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Sync worker terminated abnormally");
            }
        }
        Ok(self.state())
    }

    /// Wait for the current run, if any, to end
    pub fn wait(&self) -> SyncState {
        let handle = self
            .shared
            .slot()
            .active
            .as_mut()
            .and_then(|active| active.handle.take());

        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Sync worker terminated abnormally");
            }
        }
        self.state()
    }

    fn start_run(&self, slot: &mut RunSlot) -> SyncStream {
        let (events, receiver) = mpsc::channel();
        let stream = SyncStream::new(receiver);
        let stop = Arc::new(AtomicBool::new(false));

        slot.state = SyncState::Running;
        slot.active = Some(ActiveRun {
            events: events.clone(),
            stream: stream.clone(),
            stop: Arc::clone(&stop),
            handle: None,
        });

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("ridesync-file-sync".into())
            .spawn(move || run_worker(shared, events, stop));

        match spawned {
            Ok(handle) => {
                if let Some(active) = slot.active.as_mut() {
                    active.handle = Some(handle);
                }
            }
            Err(e) => {
                tracing::error!("Failed to spawn sync worker: {}", e);
                if let Some(active) = slot.active.take() {
                    let _ = active.events.send(SyncEvent::Error(ErrorSyncEvent::unhandled(
                        ConnectorType::File,
                        format!("Failed to spawn sync worker: {}", e),
                    )));
                }
                slot.state = SyncState::Failed;
            }
        }

        stream
    }
}

impl SyncSource for FileConnector {
    fn sync(&self) -> SyncStream {
        let mut slot = self.shared.slot();

        if let Some(active) = slot.active.as_ref() {
            tracing::warn!("Sync already in progress, rejecting new start");
            let _ = active.events.send(SyncEvent::Error(ErrorSyncEvent::already_started(
                ConnectorType::File,
            )));
            return active.stream.clone();
        }

        tracing::info!(
            "Starting file sync of {}",
            self.shared.config.source_directory.display()
        );
        self.start_run(&mut slot)
    }

    fn request_stop(&self) -> Result<()> {
        let slot = self.shared.slot();
        let active = slot.active.as_ref().ok_or(Error::NoSyncInProgress)?;
        tracing::info!("Stop requested");
        active.stop.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn state(&self) -> SyncState {
        self.shared.slot().state
    }

    fn connector_type(&self) -> ConnectorType {
        ConnectorType::File
    }
}

/// Body of the worker thread
fn run_worker(shared: Arc<Shared>, events: Sender<SyncEvent>, stop: Arc<AtomicBool>) {
    let connector = ConnectorType::File;
    let run = SyncRun {
        config: &shared.config,
        lookup: shared.lookup.as_ref(),
        athlete: shared.athlete.as_ref(),
        stats: shared.stats.as_ref(),
        stop: &stop,
        events: &events,
    };

    let result = catch_unwind(AssertUnwindSafe(|| run.execute()));

    let (state, terminal) = match result {
        Ok(Ok(RunOutcome::Completed)) => (SyncState::Completed, SyncEvent::Completed { connector }),
        Ok(Ok(RunOutcome::Stopped)) => (SyncState::Stopped, SyncEvent::Stopped { connector }),
        Ok(Err(Error::SourceDirectoryMissing(path))) => {
            tracing::error!("Source directory {} does not exist", path.display());
            (
                SyncState::Failed,
                SyncEvent::Error(ErrorSyncEvent::source_directory_missing(connector, &path)),
            )
        }
        Ok(Err(e)) => {
            tracing::error!("Sync failed: {}", e);
            (
                SyncState::Failed,
                SyncEvent::Error(ErrorSyncEvent::unhandled(connector, e.to_string())),
            )
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "sync worker panicked".to_string());
            tracing::error!("Sync worker panicked: {}", message);
            (
                SyncState::Failed,
                SyncEvent::Error(ErrorSyncEvent::unhandled(connector, message)),
            )
        }
    };

    // Release the slot before the terminal event so a caller reacting to it
    // can start a new run right away.
    {
        let mut slot = shared.slot();
        slot.state = state;
        slot.active = None;
    }
    let _ = events.send(terminal);
}

/// Builder for creating a FileConnector
pub struct FileConnectorBuilder {
    config: Option<FileConnectorConfig>,
    lookup: Option<Arc<dyn ActivityLookup>>,
    athlete: Option<Arc<dyn AthleteSnapshotResolver>>,
    stats: Option<Arc<dyn StatsComputer>>,
}

impl FileConnectorBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            lookup: None,
            athlete: None,
            stats: None,
        }
    }

    pub fn config(mut self, config: FileConnectorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Store queried for previously synced activities
    pub fn activity_lookup(mut self, lookup: Arc<dyn ActivityLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Defaults to the default athlete snapshot for every activity
    pub fn athlete_resolver(mut self, resolver: Arc<dyn AthleteSnapshotResolver>) -> Self {
        self.athlete = Some(resolver);
        self
    }

    /// Defaults to [`BasicStatsComputer`]
    pub fn stats_computer(mut self, computer: Arc<dyn StatsComputer>) -> Self {
        self.stats = Some(computer);
        self
    }

    pub fn build(self) -> Result<FileConnector> {
        let config = self
            .config
            .ok_or_else(|| Error::Config("FileConnectorConfig is required".to_string()))?;

        let lookup = self
            .lookup
            .ok_or_else(|| Error::Config("ActivityLookup is required".to_string()))?;

        let athlete = self
            .athlete
            .unwrap_or_else(|| Arc::new(FixedAthleteSnapshot::default()));
        let stats = self
            .stats
            .unwrap_or_else(|| Arc::new(BasicStatsComputer));

        Ok(FileConnector {
            shared: Arc::new(Shared {
                config,
                lookup,
                athlete,
                stats,
                slot: Mutex::new(RunSlot::default()),
            }),
        })
    }
}

impl Default for FileConnectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::MemoryActivityStore;
    use crate::sync::ErrorCode;
    use tempfile::TempDir;

    fn connector(dir: &std::path::Path) -> FileConnector {
        FileConnector::builder()
            .config(FileConnectorConfig::new(dir))
            .activity_lookup(Arc::new(MemoryActivityStore::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_config_and_lookup() {
        assert!(matches!(
            FileConnectorBuilder::new().build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            FileConnectorBuilder::new()
                .config(FileConnectorConfig::default())
                .build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_empty_directory_completes() {
        let temp = TempDir::new().unwrap();
        let connector = connector(temp.path());
        assert_eq!(connector.state(), SyncState::Idle);

        let events: Vec<_> = connector.sync().collect();

        assert_eq!(
            events,
            vec![
                SyncEvent::Started {
                    connector: ConnectorType::File
                },
                SyncEvent::Completed {
                    connector: ConnectorType::File
                },
            ]
        );
        assert_eq!(connector.wait(), SyncState::Completed);
    }

    #[test]
    fn test_request_stop_while_idle() {
        let temp = TempDir::new().unwrap();
        let connector = connector(temp.path());

        assert!(matches!(connector.request_stop(), Err(Error::NoSyncInProgress)));
        assert!(matches!(connector.stop(), Err(Error::NoSyncInProgress)));
    }

    #[test]
    fn test_missing_directory_fails_without_started() {
        let temp = TempDir::new().unwrap();
        let connector = connector(&temp.path().join("missing"));

        let events: Vec<_> = connector.sync().collect();

        assert_eq!(events.len(), 1);
        match &events[0] {
            SyncEvent::Error(error) => {
                assert_eq!(error.code, ErrorCode::FsSourceDirectoryDontExists)
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(connector.wait(), SyncState::Failed);
    }
}
