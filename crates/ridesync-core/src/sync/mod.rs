//! Sync orchestration of the file connector

mod connector;
mod event;
mod export;
mod payload;
mod pipeline;
mod report;
mod stream;

pub use connector::{FileConnector, FileConnectorBuilder, SyncSource, SyncState};
pub use event::{ErrorCode, ErrorSyncEvent, SyncEvent};
pub use export::ReportFormat;
pub use payload::{compress_streams, decompress_streams};
pub use report::{ProducedActivity, RunEnd, SyncReport};
pub use stream::SyncStream;
