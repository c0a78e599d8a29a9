use crate::error::{codes, HashError, LogicError, Result};
use crate::models::Algorithm;
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use sha2::digest::DynDigest;
use std::fmt;

/// BLAKE2b is configurable, so its length is fixed here rather than queried.
const BLAKE2B_OUTPUT_LEN: usize = 64;

/// Per-family backend state. States that are consumed by finalization sit
/// behind an `Option` and are taken exactly once.
enum HashState {
    Md5(Option<md5::Context>),
    Generic(Box<dyn DynDigest + Send>),
    Blake2b(Option<Blake2bVar>),
}

/// Incremental digest of a single algorithm.
///
/// `Created -> (update)* -> finalize -> digest*`. Misordered calls return
/// [`LogicError`]; backend failures carry the algorithm and a code.
pub struct Hasher {
    algorithm: Algorithm,
    state: HashState,
    output: Vec<u8>,
    finalized: bool,
    consumed: u64,
}

impl Hasher {
    pub fn new(algorithm: Algorithm) -> Result<Self> {
        let (state, output_len) = match algorithm {
            Algorithm::Md5 => (HashState::Md5(Some(md5::Context::new())), 16),
            Algorithm::Blake2b => {
                let state = Blake2bVar::new(BLAKE2B_OUTPUT_LEN).map_err(|_| HashError::Initialization {
                    algorithm,
                    code: codes::INVALID_OUTPUT_SIZE,
                })?;
                (HashState::Blake2b(Some(state)), BLAKE2B_OUTPUT_LEN)
            }
            _ => {
                let state = generic_state(algorithm);
                let len = state.output_size();
                (HashState::Generic(state), len)
            }
        };

        if output_len == 0 {
            return Err(HashError::Initialization { algorithm, code: codes::INVALID_OUTPUT_SIZE });
        }

        Ok(Hasher {
            algorithm,
            state,
            output: vec![0u8; output_len],
            finalized: false,
            consumed: 0,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Feed the next chunk. Empty chunks are accepted and change nothing.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        if self.finalized {
            return Err(LogicError::UpdateAfterFinalize.into());
        }

        let total = self.consumed.checked_add(data.len() as u64);
        let within_limit = match (total, self.algorithm.max_message_len()) {
            (None, _) => false,
            (Some(total), Some(max)) => total <= max,
            (Some(_), None) => true,
        };
        if !within_limit {
            return Err(HashError::Update { algorithm: self.algorithm, code: codes::MESSAGE_TOO_LONG });
        }

        match &mut self.state {
            HashState::Md5(Some(ctx)) => ctx.consume(data),
            HashState::Generic(state) => DynDigest::update(state.as_mut(), data),
            HashState::Blake2b(Some(state)) => Update::update(state, data),
            // Only finalize takes the state, and that sets `finalized` first.
            HashState::Md5(None) | HashState::Blake2b(None) => {
                return Err(LogicError::UpdateAfterFinalize.into());
            }
        }
        self.consumed = total.unwrap_or(u64::MAX);
        Ok(())
    }

    /// Complete the digest. The call counts even if the backend fails.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(LogicError::FinalizeTwice.into());
        }
        self.finalized = true;

        let algorithm = self.algorithm;
        let mismatch = HashError::Finalization { algorithm, code: codes::BUFFER_SIZE_MISMATCH };
        match &mut self.state {
            HashState::Md5(ctx) => {
                let ctx = ctx.take().ok_or(LogicError::FinalizeTwice)?;
                let digest = ctx.finalize();
                if digest.0.len() != self.output.len() {
                    return Err(mismatch);
                }
                self.output.copy_from_slice(&digest.0);
            }
            HashState::Generic(state) => {
                state.finalize_into_reset(&mut self.output).map_err(|_| mismatch)?;
            }
            HashState::Blake2b(state) => {
                let state = state.take().ok_or(LogicError::FinalizeTwice)?;
                state.finalize_variable(&mut self.output).map_err(|_| mismatch)?;
            }
        }
        Ok(())
    }

    /// Lowercase hex of the finalized output.
    pub fn digest(&self) -> Result<String> {
        Ok(hex::encode(self.digest_bytes()?))
    }

    pub fn digest_bytes(&self) -> Result<&[u8]> {
        if !self.finalized {
            return Err(LogicError::DigestBeforeFinalize.into());
        }
        Ok(&self.output)
    }

    #[cfg(test)]
    pub(crate) fn with_consumed(mut self, consumed: u64) -> Self {
        self.consumed = consumed;
        self
    }
}

fn generic_state(algorithm: Algorithm) -> Box<dyn DynDigest + Send> {
    match algorithm {
        Algorithm::Sha1 => Box::new(sha1::Sha1::default()),
        Algorithm::Sha256 => Box::new(sha2::Sha256::default()),
        Algorithm::Sha512 => Box::new(sha2::Sha512::default()),
        Algorithm::Sha3_256 => Box::new(sha3::Sha3_256::default()),
        Algorithm::Sha3_512 => Box::new(sha3::Sha3_512::default()),
        Algorithm::Md5 | Algorithm::Blake2b => unreachable!("{} has a dedicated state", algorithm),
    }
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hasher")
            .field("algorithm", &self.algorithm)
            .field("finalized", &self.finalized)
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl Drop for Hasher {
    fn drop(&mut self) {
        log::trace!("released {} hash state after {} bytes", self.algorithm, self.consumed);
    }
}

/// One-shot digest of an in-memory buffer.
pub fn digest_bytes(algorithm: Algorithm, data: &[u8]) -> Result<String> {
    let mut hasher = Hasher::new(algorithm)?;
    hasher.update(data)?;
    hasher.finalize()?;
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(algorithm: Algorithm, data: &[u8], sizes: &[usize]) -> String {
        let mut hasher = Hasher::new(algorithm).unwrap();
        let mut rest = data;
        for &size in sizes {
            let take = size.min(rest.len());
            hasher.update(&rest[..take]).unwrap();
            rest = &rest[take..];
        }
        hasher.update(rest).unwrap();
        hasher.finalize().unwrap();
        hasher.digest().unwrap()
    }

    #[test]
    fn known_vectors() {
        assert_eq!(digest_bytes(Algorithm::Md5, b"").unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            digest_bytes(Algorithm::Sha256, b"abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest_bytes(Algorithm::Sha1, b"abc").unwrap(), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(digest_bytes(Algorithm::Md5, b"abc").unwrap(), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            digest_bytes(Algorithm::Blake2b, b"abc").unwrap(),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
        assert_eq!(
            digest_bytes(Algorithm::Sha3_256, b"").unwrap(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn chunking_does_not_change_digest() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
        for algorithm in Algorithm::all() {
            let whole = digest_bytes(algorithm, &data).unwrap();
            let equal = chunked(algorithm, &data, &[2_500, 2_500, 2_500, 2_500]);
            let irregular = chunked(algorithm, &data, &[0, 1, 63, 0, 64, 1_000, 0, 7, 4_096]);
            assert_eq!(whole, equal, "{algorithm}");
            assert_eq!(whole, irregular, "{algorithm}");
        }
    }

    #[test]
    fn hex_is_lowercase_and_sized() {
        for algorithm in Algorithm::all() {
            let hex = digest_bytes(algorithm, b"hex formatting").unwrap();
            assert_eq!(hex.len(), algorithm.digest_len() * 2, "{algorithm}");
            assert!(hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')), "{hex}");
        }
    }

    #[test]
    fn state_machine_is_enforced() {
        for algorithm in Algorithm::all() {
            let mut hasher = Hasher::new(algorithm).unwrap();
            assert!(matches!(
                hasher.digest(),
                Err(HashError::Logic(LogicError::DigestBeforeFinalize))
            ));

            hasher.update(b"data").unwrap();
            hasher.finalize().unwrap();
            assert!(hasher.is_finalized());

            assert!(matches!(
                hasher.update(b"more"),
                Err(HashError::Logic(LogicError::UpdateAfterFinalize))
            ));
            assert!(matches!(hasher.finalize(), Err(HashError::Logic(LogicError::FinalizeTwice))));

            let first = hasher.digest().unwrap();
            assert_eq!(first, hasher.digest().unwrap());
        }
    }

    #[test]
    fn message_length_limit_is_reported_as_update_error() {
        let mut hasher = Hasher::new(Algorithm::Sha256).unwrap().with_consumed(u64::MAX / 8 - 1);
        hasher.update(b"a").unwrap();
        let err = hasher.update(b"b").unwrap_err();
        assert_eq!(err.code(), Some(codes::MESSAGE_TOO_LONG));
        assert_eq!(err.algorithm(), Some(Algorithm::Sha256));

        let mut unlimited = Hasher::new(Algorithm::Sha512).unwrap().with_consumed(u64::MAX / 8);
        unlimited.update(b"fine").unwrap();
    }
}
