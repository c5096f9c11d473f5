use std::sync::atomic::{AtomicBool, Ordering};

/// Global runtime configuration for the store.
/// Thread-safe via atomics, can be changed on-the-fly between ingestion phases.
#[derive(Debug)]
pub struct GlobalConfig {
    /// Whether a duplicate-unique-attribute insertion logs a warning.
    /// The object is always kept in the store either way; this only
    /// silences the log line for callers reprocessing known-dirty input.
    pub warn_on_duplicate_unique: AtomicBool,

    /// Whether merge rejections (conflict or approver veto) emit a debug
    /// log line.
    pub merge_debug_logging: AtomicBool,
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self {
            warn_on_duplicate_unique: AtomicBool::new(true),
            merge_debug_logging: AtomicBool::new(false),
        }
    }

    pub fn warns_on_duplicate_unique(&self) -> bool {
        self.warn_on_duplicate_unique.load(Ordering::Relaxed)
    }

    pub fn set_warn_on_duplicate_unique(&self, val: bool) {
        self.warn_on_duplicate_unique.store(val, Ordering::Relaxed);
    }

    pub fn logs_merge_debug(&self) -> bool {
        self.merge_debug_logging.load(Ordering::Relaxed)
    }

    pub fn set_merge_debug_logging(&self, val: bool) {
        self.merge_debug_logging.store(val, Ordering::Relaxed);
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new()
    }
}
