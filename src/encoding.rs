use base64::{engine::general_purpose, Engine};

use crate::error::Error;

/// Codec between the wire representation of ciphertexts and raw bytes.
pub trait Encoder: Send + Sync {
    fn decode(&self, input: &str) -> Result<Vec<u8>, Error>;

    fn encode(&self, bytes: &[u8]) -> String;

    /// Length of the encoded form of `byte_count` bytes, used to size the
    /// progress bar before any output exists.
    fn encoded_len(&self, byte_count: usize) -> usize;
}

/// Hexadecimal codec. Decoding accepts either case regardless of the
/// configured output case.
pub struct HexEncoder {
    pub uppercase: bool,
}

impl Encoder for HexEncoder {
    fn decode(&self, input: &str) -> Result<Vec<u8>, Error> {
        Ok(hex::decode(input.trim())?)
    }

    fn encode(&self, bytes: &[u8]) -> String {
        if self.uppercase {
            hex::encode_upper(bytes)
        } else {
            hex::encode(bytes)
        }
    }

    fn encoded_len(&self, byte_count: usize) -> usize {
        byte_count * 2
    }
}

/// Base64 codec, standard or URL-safe alphabet, always padded.
pub struct Base64Encoder {
    pub url_safe: bool,
}

impl Base64Encoder {
    fn engine(&self) -> general_purpose::GeneralPurpose {
        if self.url_safe {
            general_purpose::URL_SAFE
        } else {
            general_purpose::STANDARD
        }
    }
}

impl Encoder for Base64Encoder {
    fn decode(&self, input: &str) -> Result<Vec<u8>, Error> {
        Ok(self.engine().decode(input.trim())?)
    }

    fn encode(&self, bytes: &[u8]) -> String {
        self.engine().encode(bytes)
    }

    fn encoded_len(&self, byte_count: usize) -> usize {
        byte_count.div_ceil(3) * 4
    }
}
