//! Capture of `tracing` diagnostics.
//!
//! The engine reports protocol misuse through `tracing` rather than through
//! return values. [`capture_diagnostics`] installs a thread-local fmt
//! subscriber that writes into a buffer, so a test can assert on what was
//! reported while running its closure.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Diagnostics emitted while a closure ran.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    text: String,
}

impl Diagnostics {
    /// Returns the raw formatted output.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns true if any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Returns how many lines contain `needle`.
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        self.text.lines().filter(|l| l.contains(needle)).count()
    }

    /// Returns how many unbalanced-commit reports were emitted.
    #[must_use]
    pub fn unbalanced_commits(&self) -> usize {
        self.count("unbalanced call - resetting")
    }
}

/// Runs `f` and returns its result plus everything it logged at `DEBUG`
/// and above.
pub fn capture_diagnostics<R>(f: impl FnOnce() -> R) -> (R, Diagnostics) {
    let buffer = SharedBuffer(Arc::new(Mutex::new(Vec::new())));
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
    (result, Diagnostics { text })
}

/// Installs a global fmt subscriber for a test binary.
///
/// The filter comes from `RUST_LOG`, defaulting to `debug` when `verbose`
/// is set and `warn` otherwise. Returns false if a global subscriber was
/// already installed.
pub fn init_test_logging(verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}
