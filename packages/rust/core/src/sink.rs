//! Side-effect sink for pipeline output and status.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Receives everything the pipeline would otherwise print.
///
/// Called concurrently from file tasks; implementations must not assume
/// any ordering between files.
pub trait OutputSink: Send + Sync {
    /// Transient status line (e.g. "Processing: src/lib.rs ...").
    fn status(&self, message: &str);
    /// A finished file block.
    fn emit(&self, block: &str);
    /// A block was written to `path`.
    fn saved(&self, path: &Path);
    /// Remove any transient status.
    fn clear_status(&self);
}

/// No-op sink for headless usage.
pub struct SilentSink;

impl OutputSink for SilentSink {
    fn status(&self, _message: &str) {}
    fn emit(&self, _block: &str) {}
    fn saved(&self, _path: &Path) {}
    fn clear_status(&self) {}
}

/// Collects emitted blocks and saved paths in memory.
#[derive(Default)]
pub struct RecordingSink {
    blocks: Mutex<Vec<String>>,
    saved: Mutex<Vec<PathBuf>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks in the order they were emitted.
    pub fn blocks(&self) -> Vec<String> {
        self.blocks.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn saved_paths(&self) -> Vec<PathBuf> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl OutputSink for RecordingSink {
    fn status(&self, _message: &str) {}

    fn emit(&self, block: &str) {
        if let Ok(mut blocks) = self.blocks.lock() {
            blocks.push(block.to_string());
        }
    }

    fn saved(&self, path: &Path) {
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(path.to_path_buf());
        }
    }

    fn clear_status(&self) {}
}
