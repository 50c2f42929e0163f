//! # ridesync-core
//!
//! Core library for importing GPX, TCX and FIT activity files from a local
//! directory.
//!
//! This crate provides the foundational functionality for:
//! - Scanning a directory for activity files and unpacking zip archives
//! - Parsing GPX, TCX and FIT files into canonical time series streams
//! - Estimating cycling power and grade adjusted running speed
//! - Classifying sports and detecting already synced activities
//! - Running cancellable, single-flight syncs that emit typed events
//!
//! ## Modules
//!
//! - [`classifier`] - Sport type mapping and profile based detection
//! - [`config`] - Connector configuration and config file handling
//! - [`dedup`] - Lookup of overlapping stored activities
//! - [`error`] - Error types and Result alias
//! - [`fingerprint`] - Activity ids and content fingerprints
//! - [`model`] - Activity, stream and athlete data structures
//! - [`parser`] - GPX, TCX and FIT parsing
//! - [`scanner`] - Directory scanning and archive extraction
//! - [`stats`] - Extended statistics of activities
//! - [`streams`] - Stream extraction and derived streams
//! - [`sync`] - File connector, events and reports
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ridesync_core::{FileConnector, FileConnectorConfig, MemoryActivityStore, SyncEvent, SyncSource};
//!
//! let connector = FileConnector::builder()
//!     .config(FileConnectorConfig::new("/home/me/activities"))
//!     .activity_lookup(Arc::new(MemoryActivityStore::default()))
//!     .build()
//!     .expect("Failed to build connector");
//!
//! for event in connector.sync() {
//!     if let SyncEvent::ActivityProduced { activity, .. } = event {
//!         println!("{} ({})", activity.name(), activity.activity.sport);
//!     }
//! }
//! ```

// Module declarations
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod parser;
pub mod scanner;
pub mod stats;
pub mod streams;
pub mod sync;
pub mod utils;

// Re-export key types for convenience

// Error types
pub use error::{Error, Result};

// Activity types
pub use model::{
    ActivityStreams, AthleteSettings, AthleteSnapshot, AthleteSnapshotResolver, BareActivity,
    ConnectorType, DatedAthleteSettings, DatedSettings, ExtendedStats, FixedAthleteSnapshot,
    Gender, PrimitiveSourceData, SportType, SyncedActivity,
};

// Configuration
pub use config::{Config, FileConnectorConfig};

// Scanning and parsing
pub use parser::{parse_activity_file, ParsedActivity};
pub use scanner::{ActivityFile, ActivityFileType, ArchiveExtractor, DirectoryScanner};

// Streams and classification
pub use classifier::{ActivityProfile, SportClassification, SportClassifier};
pub use streams::{compute_additional_streams, extract_streams};

// Duplicate detection
pub use dedup::{ActivityLookup, DedupOutcome, MemoryActivityStore};

// Fingerprinting
pub use fingerprint::{activity_fingerprint, activity_id};

// Statistics
pub use stats::{BasicStatsComputer, StatsComputer, StatsInput};

// Sync
pub use sync::{
    ErrorCode, ErrorSyncEvent, FileConnector, FileConnectorBuilder, ReportFormat, RunEnd,
    SyncEvent, SyncReport, SyncSource, SyncState, SyncStream,
};
