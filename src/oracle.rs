use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Error;

/// Outcome of submitting a candidate ciphertext to the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate decrypted to well-formed PKCS#7 padding.
    Accepted,
    /// The verifier flagged the decryption as badly padded.
    PaddingError,
}

/// Cooperative cancellation flag shared between a byte search and its
/// probes. Cloning yields a handle onto the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A verifier that reveals whether a candidate ciphertext decrypts to valid
/// padding under its fixed, unknown key.
///
/// Implementations are queried from many threads at once and must check the
/// cancel token: once it trips, an in-flight query may bail out with a
/// transport error, which the engine discards.
pub trait Oracle: Send + Sync {
    fn query(&self, candidate: &[u8], cancel: &CancelToken) -> Result<Verdict, Error>;
}
