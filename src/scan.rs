//! Scan slot for running recognition off the calling thread.
//!
//! A slot allows one scan in flight at a time. Submitting while busy is
//! rejected so a busy indicator can stay up until the single outcome arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::thread;

use tracing::{info, warn};

use crate::config::TrackerConfig;
use crate::ocr::{ExtractedFields, Recognizer, ScanError, scan_image};

/// Outcome of a single scan.
pub type ScanOutcome = Result<ExtractedFields, ScanError>;

/// One user-facing scan action. Cheap to clone; clones share the busy flag.
#[derive(Clone, Default)]
pub struct ScanSlot {
    scanning: Arc<AtomicBool>,
}

/// Handle to an in-flight scan.
pub struct ScanHandle {
    receiver: Receiver<ScanOutcome>,
}

/// Clears the busy flag when the worker exits, including on panic.
struct SlotRelease(Arc<AtomicBool>);

impl Drop for SlotRelease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ScanSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a scan is currently running in this slot.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Starts scanning `path` in a background thread.
    ///
    /// Returns immediately. Fails with `ScanError::SlotBusy` if a previous
    /// scan in this slot has not finished yet.
    pub fn submit(
        &self,
        path: PathBuf,
        config: TrackerConfig,
        recognizer: Arc<dyn Recognizer>,
    ) -> Result<ScanHandle, ScanError> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            warn!("Rejected scan of {}: slot busy", path.display());
            return Err(ScanError::SlotBusy);
        }

        let (sender, receiver) = channel();
        let release = SlotRelease(Arc::clone(&self.scanning));

        let spawned = thread::Builder::new()
            .name("scan-worker".to_string())
            .spawn(move || {
                let release = release;
                let outcome = scan_image(&path, &config, recognizer.as_ref());
                if let Err(e) = &outcome {
                    warn!("Scan of {} failed: {}", path.display(), e);
                }
                // Free the slot before the caller can observe the outcome
                drop(release);
                // Receiver may already be gone if the caller gave up
                let _ = sender.send(outcome);
            });

        match spawned {
            Ok(_) => {
                info!("Scan started");
                Ok(ScanHandle { receiver })
            }
            Err(e) => {
                self.scanning.store(false, Ordering::SeqCst);
                Err(ScanError::Io(e))
            }
        }
    }
}

impl ScanHandle {
    /// Blocks until the scan finishes and returns its outcome.
    pub fn wait(self) -> ScanOutcome {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(ScanError::EngineFailed("scan worker exited".to_string())))
    }
}
