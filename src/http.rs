use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::encoding::Encoder;
use crate::error::Error;
use crate::oracle::{CancelToken, Oracle, Verdict};

/// Placeholder in the URL template substituted with the encoded candidate.
pub const PAYLOAD_PLACEHOLDER: char = '$';

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote verifier reached over HTTP.
///
/// The candidate ciphertext is encoded, percent-escaped and substituted for
/// `$` in the URL template. A response body containing the error marker
/// counts as a padding error; anything else counts as accepted.
pub struct HttpOracle {
    client: Client,
    url_template: String,
    error_marker: String,
    encoder: Arc<dyn Encoder>,
}

impl HttpOracle {
    pub fn new(
        url_template: String,
        error_marker: String,
        encoder: Arc<dyn Encoder>,
    ) -> Result<Self, Error> {
        if !url_template.contains(PAYLOAD_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "the URL must contain the payload placeholder '{PAYLOAD_PLACEHOLDER}'"
            )));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url_template,
            error_marker,
            encoder,
        })
    }

    fn render_url(&self, candidate: &[u8]) -> String {
        let payload = urlencoding::encode(&self.encoder.encode(candidate)).into_owned();
        self.url_template.replace(PAYLOAD_PLACEHOLDER, &payload)
    }
}

impl Oracle for HttpOracle {
    fn query(&self, candidate: &[u8], cancel: &CancelToken) -> Result<Verdict, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Transport("request cancelled".into()));
        }
        let body = self.client.get(self.render_url(candidate)).send()?.text()?;
        if body.contains(&self.error_marker) {
            Ok(Verdict::PaddingError)
        } else {
            Ok(Verdict::Accepted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Base64Encoder;

    fn oracle(url: &str) -> Result<HttpOracle, Error> {
        HttpOracle::new(
            url.to_string(),
            "padding error".to_string(),
            Arc::new(Base64Encoder { url_safe: false }),
        )
    }

    #[test]
    fn substitutes_escaped_payload() {
        let oracle = oracle("http://target/decrypt?c=$").unwrap();
        // 0xfb 0xff 0xbf encodes to "+/+/", which must be percent-escaped
        let url = oracle.render_url(&[0xfb, 0xff, 0xbf]);
        assert_eq!(url, "http://target/decrypt?c=%2B%2F%2B%2F");
    }

    #[test]
    fn rejects_template_without_placeholder() {
        assert!(matches!(
            oracle("http://target/decrypt"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn cancelled_query_fails_with_transport_error() {
        let oracle = oracle("http://target/decrypt?c=$").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            oracle.query(&[0u8; 16], &cancel),
            Err(Error::Transport(_))
        ));
    }
}
