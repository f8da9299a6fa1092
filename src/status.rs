use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Sink for progress events. Advisory only: implementations must tolerate
/// calls from many threads and must never block the attack.
pub trait Status: Send + Sync {
    /// A new output of `total` units (bytes, or encoded characters in
    /// encrypt mode) is about to be computed.
    fn open(&self, total: usize);

    fn close(&self);

    /// One more output byte was recovered. Bytes arrive tail-first.
    fn plain_byte(&self, byte: u8);

    /// The whole output-so-far, already encoded. Replaces prior content.
    fn string(&self, s: &str);

    /// A phase label, e.g. the pre-flight checks.
    fn action(&self, label: &str);

    /// Yet another oracle request went out.
    fn count_request(&self);
}

/// Discards every event. Used by tests and `--quiet`.
pub struct SilentStatus;

impl Status for SilentStatus {
    fn open(&self, _total: usize) {}
    fn close(&self) {}
    fn plain_byte(&self, _byte: u8) {}
    fn string(&self, _s: &str) {}
    fn action(&self, _label: &str) {}
    fn count_request(&self) {}
}

// refresh the request counter in the bar message this often
const REQUEST_REFRESH: u64 = 32;

/// Terminal progress bar: position tracks recovered output, the message
/// shows the printable output tail plus request statistics.
#[derive(Default)]
pub struct ProgressStatus {
    bar: Mutex<Option<ProgressBar>>,
    known: Mutex<Vec<u8>>,
    requests: AtomicU64,
}

impl ProgressStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn message(&self, known: &[u8]) -> String {
        let text: String = known
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect();
        format!("{text} | reqs: {}", self.requests.load(Ordering::Relaxed))
    }
}

impl Status for ProgressStatus {
    fn open(&self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {msg}").unwrap(),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        self.known.lock().unwrap().clear();
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn close(&self) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }

    fn plain_byte(&self, byte: u8) {
        let mut known = self.known.lock().unwrap();
        known.insert(0, byte);
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.inc(1);
            bar.set_message(self.message(&known));
        }
    }

    fn string(&self, s: &str) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.set_position(s.len() as u64);
            bar.set_message(format!(
                "{s} | reqs: {}",
                self.requests.load(Ordering::Relaxed)
            ));
        }
    }

    fn action(&self, label: &str) {
        match self.bar.lock().unwrap().as_ref() {
            Some(bar) => bar.println(label),
            None => eprintln!("{label}"),
        }
    }

    fn count_request(&self) {
        let sent = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        if sent % REQUEST_REFRESH != 0 {
            return;
        }
        // probe threads call in here, so skip the refresh rather than wait
        let (Ok(bar), Ok(known)) = (self.bar.try_lock(), self.known.try_lock()) else {
            return;
        };
        if let Some(bar) = bar.as_ref() {
            bar.set_message(self.message(&known));
        }
    }
}
