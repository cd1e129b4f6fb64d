use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[cfg(test)]
use std::sync::Mutex;

/// Receives the human-readable progress lines a running operation emits.
///
/// Implementations must tolerate being called from a worker thread. The
/// lines are advisory; the boolean outcome of the operation is the only
/// contract.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Cooperative cancellation token shared between the driver and a batch.
///
/// The flag is only polled between volumes and between staged phases,
/// never in the middle of a native call.
#[derive(Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

/// Sink that keeps every reported line so tests can assert on the sequence.
#[cfg(test)]
#[derive(Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

#[cfg(test)]
impl CollectingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

#[cfg(test)]
impl ProgressSink for CollectingSink {
    fn report(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}
