use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt;

/// Digests of one computation, keyed by algorithm. Values are lowercase hex
/// or an error placeholder (see [`error_placeholder`]). Empty means cancelled.
pub type DigestMap = BTreeMap<Algorithm, String>;

pub const ERROR_PLACEHOLDER_PREFIX: &str = "Err-crypt code: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Sha3_256,
    Sha3_512,
    Blake2b,
}

impl Algorithm {
    pub fn all() -> Vec<Algorithm> {
        vec![
            Algorithm::Md5,
            Algorithm::Sha1,
            Algorithm::Sha256,
            Algorithm::Sha512,
            Algorithm::Sha3_256,
            Algorithm::Sha3_512,
            Algorithm::Blake2b,
        ]
    }

    /// The list requested when nothing else is configured. BLAKE2b is
    /// supported but left out.
    pub fn default_request() -> Vec<Algorithm> {
        vec![
            Algorithm::Md5,
            Algorithm::Sha1,
            Algorithm::Sha256,
            Algorithm::Sha512,
            Algorithm::Sha3_256,
            Algorithm::Sha3_512,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA-1",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha512 => "SHA-512",
            Algorithm::Sha3_256 => "SHA3-256",
            Algorithm::Sha3_512 => "SHA3-512",
            Algorithm::Blake2b => "BLAKE2b",
        }
    }

    /// Output length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 | Algorithm::Sha3_256 => 32,
            Algorithm::Sha512 | Algorithm::Sha3_512 | Algorithm::Blake2b => 64,
        }
    }

    /// Largest message, in bytes, the algorithm is defined for.
    /// SHA-1 and SHA-256 carry a 64-bit bit-length counter.
    pub fn max_message_len(&self) -> Option<u64> {
        match self {
            Algorithm::Sha1 | Algorithm::Sha256 => Some(u64::MAX / 8),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub fn error_placeholder(code: i32) -> String {
    format!("{}{}", ERROR_PLACEHOLDER_PREFIX, code)
}

pub fn is_error_placeholder(value: &str) -> bool {
    value.contains(ERROR_PLACEHOLDER_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Match(Algorithm),
    NoMatch,
}

impl VerificationStatus {
    pub fn message(&self) -> String {
        match self {
            VerificationStatus::Match(algo) => format!("Match found for algorithm: {}", algo),
            VerificationStatus::NoMatch => "No match found.".to_string(),
        }
    }
}
