//! Caller side of a run's event channel

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::SyncEvent;

/// Ordered, finite sequence of events of one run.
///
/// Clones share the same underlying channel: each event is delivered to
/// whichever clone receives it first. The stream ends once the run has
/// finished and every event has been consumed.
#[derive(Clone)]
pub struct SyncStream {
    receiver: Arc<Mutex<Receiver<SyncEvent>>>,
}

impl SyncStream {
    pub(crate) fn new(receiver: Receiver<SyncEvent>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Wait for the next event up to `timeout`.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<SyncEvent>, RecvTimeoutError> {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        match receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether both handles read the same run
    pub fn same_run(&self, other: &SyncStream) -> bool {
        Arc::ptr_eq(&self.receiver, &other.receiver)
    }
}

impl Iterator for SyncStream {
    type Item = SyncEvent;

    fn next(&mut self) -> Option<SyncEvent> {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        receiver.recv().ok()
    }
}

impl PartialEq for SyncStream {
    fn eq(&self, other: &Self) -> bool {
        self.same_run(other)
    }
}

impl std::fmt::Debug for SyncStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStream")
            .field("run", &Arc::as_ptr(&self.receiver))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnectorType;
    use std::sync::mpsc;

    #[test]
    fn test_stream_ends_when_sender_dropped() {
        let (tx, rx) = mpsc::channel();
        let stream = SyncStream::new(rx);
        let connector = ConnectorType::File;

        tx.send(SyncEvent::Started { connector }).unwrap();
        tx.send(SyncEvent::Completed { connector }).unwrap();
        drop(tx);

        let events: Vec<_> = stream.clone().collect();
        assert_eq!(
            events,
            vec![SyncEvent::Started { connector }, SyncEvent::Completed { connector }]
        );
        assert_eq!(stream.recv_timeout(Duration::from_millis(10)), Ok(None));
    }

    #[test]
    fn test_clones_share_run() {
        let (_tx, rx) = mpsc::channel();
        let stream = SyncStream::new(rx);
        let (_other_tx, other_rx) = mpsc::channel();

        assert_eq!(stream, stream.clone());
        assert_ne!(stream, SyncStream::new(other_rx));
        assert_eq!(
            stream.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Timeout)
        );
    }
}
