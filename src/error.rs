use std::error::Error as StdError;
use std::fmt;

/// Failures the attack surfaces to the caller. None of these are retried
/// internally; a transport retry policy belongs to the oracle transport.
#[derive(Debug)]
pub enum Error {
    /// The provided sample decoded to zero bytes.
    EmptySample,
    /// Sample length is not a multiple of the configured block length.
    MisalignedSample { len: usize, block_len: usize },
    /// A single-block sample carries no target block to decrypt.
    NoTargetBlock,
    /// The sample could not be decoded with the selected encoding.
    Decode(String),
    /// The oracle rejected the unmodified sample, so tampering on it cannot
    /// reach any valid-padding state.
    SampleRejected,
    /// Tampered bytes were never rejected; the verifier is not a padding
    /// oracle.
    NotExploitable,
    /// A probe failed below the oracle, e.g. a network error.
    Transport(Box<dyn StdError + Send + Sync>),
    /// The last-byte confirmation rejected every previously accepted
    /// candidate.
    UnexpectedOracleBehavior,
    /// Every one of the 256 candidate bytes produced a padding error.
    AllBytesRejected,
    /// Rejected configuration value.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptySample => write!(f, "the sample is empty"),
            Error::MisalignedSample { len, block_len } => write!(
                f,
                "sample length {len} is not a multiple of the block length {block_len}"
            ),
            Error::NoTargetBlock => {
                write!(f, "the sample holds a single block, there is nothing to decrypt")
            }
            Error::Decode(msg) => write!(f, "could not decode the sample: {msg}"),
            Error::SampleRejected => write!(
                f,
                "the original sample produced a padding error, it cannot seed the attack"
            ),
            Error::NotExploitable => write!(
                f,
                "padding oracle not confirmed, check the error marker and the server response"
            ),
            Error::Transport(cause) => write!(f, "oracle request failed: {cause}"),
            Error::UnexpectedOracleBehavior => write!(
                f,
                "the oracle accepted a candidate byte and then rejected its confirmation"
            ),
            Error::AllBytesRejected => {
                write!(f, "every tried byte produced a padding error")
            }
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Transport(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}
