//! Padding-oracle attack engine.
//!
//! Given a verifier that merely reveals whether a ciphertext decrypts to
//! valid PKCS#7 padding, and one valid CBC sample produced under the
//! verifier's key, the [`Cracker`] recovers the sample's plaintext and
//! forges ciphertexts for chosen plaintexts. The key is never learned.

mod attack;
mod encoding;
mod error;
mod http;
mod oracle;
mod status;

pub use attack::{Config, Cracker};
pub use encoding::{Base64Encoder, Encoder, HexEncoder};
pub use error::Error;
pub use http::{HttpOracle, PAYLOAD_PLACEHOLDER};
pub use oracle::{CancelToken, Oracle, Verdict};
pub use status::{ProgressStatus, SilentStatus, Status};
