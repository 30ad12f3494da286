//! Sync progress reporting

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Event emitted while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// Share of the scanned height range processed so far (0..=100)
    SyncedPercent(u8),
}

/// Receives scan events synchronously from the engine
pub trait ProgressSink: Send {
    /// Handle one event
    fn on_event(&mut self, event: ScanEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ScanEvent) + Send,
{
    fn on_event(&mut self, event: ScanEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded channel
///
/// A closed receiver is ignored; the scan keeps going.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub UnboundedSender<ScanEvent>);

impl ProgressSink for ChannelSink {
    fn on_event(&mut self, event: ScanEvent) {
        let _ = self.0.send(event);
    }
}

/// Shared progress tracker
///
/// Clones share state, so one clone can be handed to the engine while another
/// is polled by the UI.
#[derive(Debug, Clone, Default)]
pub struct SyncProgress {
    inner: Arc<RwLock<ProgressInner>>,
}

#[derive(Debug, Clone, Default)]
struct ProgressInner {
    percent: Option<u8>,
    event_count: u64,
    complete: bool,
}

impl SyncProgress {
    /// Create new progress tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear state before a new pass
    pub fn reset(&self) {
        *self.inner.write() = ProgressInner::default();
    }

    /// Last reported percentage
    pub fn percent(&self) -> Option<u8> {
        self.inner.read().percent
    }

    /// Number of events received
    pub fn event_count(&self) -> u64 {
        self.inner.read().event_count
    }

    /// Whether 100% has been reported
    pub fn is_complete(&self) -> bool {
        self.inner.read().complete
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        let inner = self.inner.read();
        match (inner.complete, inner.percent) {
            (true, _) => "Synced".to_string(),
            (false, Some(percent)) => format!("Scanning outputs: {}%", percent),
            (false, None) => "Waiting".to_string(),
        }
    }
}

impl ProgressSink for SyncProgress {
    fn on_event(&mut self, event: ScanEvent) {
        let mut inner = self.inner.write();
        inner.event_count += 1;
        match event {
            ScanEvent::SyncedPercent(percent) => {
                inner.percent = Some(percent);
                inner.complete = percent >= 100;
            }
        }
    }
}

/// Emits percentage events, suppressing repeats
pub(crate) struct ProgressReporter<'a> {
    sink: Option<&'a mut dyn ProgressSink>,
    last_percent: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: Option<&'a mut dyn ProgressSink>) -> Self {
        Self {
            sink,
            last_percent: 0,
        }
    }

    /// Report the position of an output at `height` within `start_height..=tip_height`
    pub(crate) fn output_at(&mut self, height: u64, start_height: u64, tip_height: u64) {
        let percent = synced_percent(height, start_height, tip_height);
        if percent != self.last_percent {
            self.last_percent = percent;
            self.emit(ScanEvent::SyncedPercent(percent));
        }
    }

    /// Final event, always sent
    pub(crate) fn finish(&mut self) {
        self.last_percent = 100;
        self.emit(ScanEvent::SyncedPercent(100));
    }

    fn emit(&mut self, event: ScanEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_event(event);
        }
    }
}

/// `floor((height - start) / (tip - start) * 100)` clamped to 0..=100
pub(crate) fn synced_percent(height: u64, start_height: u64, tip_height: u64) -> u8 {
    let range = tip_height.saturating_sub(start_height);
    if range == 0 {
        return 100;
    }
    let done = u128::from(height.saturating_sub(start_height));
    (done * 100 / u128::from(range)).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synced_percent() {
        assert_eq!(synced_percent(100, 100, 200), 0);
        assert_eq!(synced_percent(150, 100, 200), 50);
        assert_eq!(synced_percent(199, 100, 200), 99);
        assert_eq!(synced_percent(250, 100, 200), 100);
        assert_eq!(synced_percent(50, 100, 200), 0);
        assert_eq!(synced_percent(7, 100, 100), 100);
    }

    #[test]
    fn test_reporter_suppresses_repeats() {
        let mut events = Vec::new();
        let mut sink = |event: ScanEvent| events.push(event);
        {
            let mut reporter = ProgressReporter::new(Some(&mut sink));
            reporter.output_at(100, 100, 200);
            reporter.output_at(150, 100, 200);
            reporter.output_at(150, 100, 200);
            reporter.output_at(200, 100, 200);
            reporter.finish();
        }
        assert_eq!(
            events,
            vec![
                ScanEvent::SyncedPercent(50),
                ScanEvent::SyncedPercent(100),
                ScanEvent::SyncedPercent(100),
            ]
        );
    }

    #[test]
    fn test_sync_progress_tracker() {
        let progress = SyncProgress::new();
        assert_eq!(progress.summary(), "Waiting");

        let mut sink = progress.clone();
        sink.on_event(ScanEvent::SyncedPercent(40));
        assert_eq!(progress.percent(), Some(40));
        assert_eq!(progress.summary(), "Scanning outputs: 40%");
        assert!(!progress.is_complete());

        sink.on_event(ScanEvent::SyncedPercent(100));
        assert!(progress.is_complete());
        assert_eq!(progress.event_count(), 2);

        progress.reset();
        assert_eq!(progress.percent(), None);
    }

    #[test]
    fn test_channel_sink() {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let mut sink = ChannelSink(sender);
        sink.on_event(ScanEvent::SyncedPercent(3));
        assert_eq!(receiver.try_recv().unwrap(), ScanEvent::SyncedPercent(3));
        drop(receiver);
        sink.on_event(ScanEvent::SyncedPercent(4));
    }
}
