//! Streaming multi-algorithm file digests with cooperative cancellation.
//!
//! One read pass over a file feeds every requested [`Hasher`]; a
//! [`CancelFlag`] raised by the caller stops the work at the next checkpoint
//! and yields an empty [`DigestMap`].

pub mod cancel;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod hashers;
pub mod logging;
pub mod models;
pub mod session;
pub mod utils;

pub use cancel::CancelFlag;
pub use config::{DigestConfig, DigestOptions, FailurePolicy, OutputFormat, DEFAULT_CHUNK_SIZE};
pub use error::{HashError, InputError, LogicError};
pub use file_ops::{compute_file_digests, compute_file_digests_with, digest_reader, validate_input_file};
pub use hashers::{digest_bytes, Hasher};
pub use models::{Algorithm, DigestMap, VerificationStatus};
pub use session::{DigestJob, DigestReport, DigestSession};
pub use utils::{check_hash, find_matching_algorithm, parse_first_hash_from_text};
