use crate::cancel::{is_cancelled, CancelFlag};
use crate::config::{DigestOptions, FailurePolicy};
use crate::error::{HashError, InputError, Result};
use crate::hashers::Hasher;
use crate::models::{error_placeholder, Algorithm, DigestMap};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

/// Compute every requested digest of the file at `path` in a single read pass.
///
/// Returns an empty map if `cancel` is raised at any checkpoint, and
/// [`HashError::NoAlgorithms`] for an empty request. This is
/// synchronous; run it on a blocking worker to keep a caller responsive.
pub fn compute_file_digests(
    path: &Path,
    algorithms: &[Algorithm],
    cancel: Option<&CancelFlag>,
) -> Result<DigestMap> {
    compute_file_digests_with(path, algorithms, cancel, &DigestOptions::default())
}

pub fn compute_file_digests_with(
    path: &Path,
    algorithms: &[Algorithm],
    cancel: Option<&CancelFlag>,
    options: &DigestOptions,
) -> Result<DigestMap> {
    log::debug!("hashing {} with {:?}", path.display(), algorithms);
    run(path, || File::open(path), algorithms, || is_cancelled(cancel), options)
}

/// Same pipeline as [`compute_file_digests_with`] over an already open reader.
pub fn digest_reader<R: Read>(
    reader: R,
    algorithms: &[Algorithm],
    cancel: Option<&CancelFlag>,
    options: &DigestOptions,
) -> Result<DigestMap> {
    run(Path::new("<reader>"), || Ok(reader), algorithms, || is_cancelled(cancel), options)
}

/// Caller-side precondition: the path names an existing, non-empty regular
/// file. Returns its length.
pub fn validate_input_file(path: &Path) -> std::result::Result<u64, InputError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Err(InputError::Missing(path.to_path_buf())),
    };
    if !meta.is_file() {
        return Err(InputError::NotAFile(path.to_path_buf()));
    }
    if meta.len() == 0 {
        return Err(InputError::Empty(path.to_path_buf()));
    }
    Ok(meta.len())
}

/// `cancelled` is consulted at every checkpoint: before any work, after the
/// hashers exist, before each read, after finalizing and after collecting.
fn run<R: Read>(
    source: &Path,
    open: impl FnOnce() -> io::Result<R>,
    algorithms: &[Algorithm],
    cancelled: impl Fn() -> bool,
    options: &DigestOptions,
) -> Result<DigestMap> {
    if algorithms.is_empty() {
        return Err(HashError::NoAlgorithms);
    }
    if cancelled() {
        return Ok(DigestMap::new());
    }

    let mut fanout = Fanout::build(algorithms, options.failure_policy)?;
    if cancelled() {
        return Ok(DigestMap::new());
    }

    let reader = open().map_err(|e| HashError::io(source, "opening", e))?;
    if !fanout.stream(reader, source, &cancelled, options.chunk_size)? {
        log::info!("digest of {} cancelled mid-stream", source.display());
        return Ok(DigestMap::new());
    }

    fanout.finalize()?;
    if cancelled() {
        return Ok(DigestMap::new());
    }

    let digests = fanout.collect()?;
    if cancelled() {
        return Ok(DigestMap::new());
    }
    Ok(digests)
}

enum Slot {
    Active(Hasher),
    Failed(i32),
}

/// One hasher per distinct algorithm. Duplicate requests collapse onto the
/// same entry, so each algorithm is computed once.
struct Fanout {
    slots: BTreeMap<Algorithm, Slot>,
    policy: FailurePolicy,
}

impl Fanout {
    fn build(algorithms: &[Algorithm], policy: FailurePolicy) -> Result<Self> {
        let mut slots = BTreeMap::new();
        for &algorithm in algorithms {
            if slots.contains_key(&algorithm) {
                continue;
            }
            let slot = match Hasher::new(algorithm) {
                Ok(hasher) => Slot::Active(hasher),
                Err(err) => Slot::Failed(isolate(policy, err)?),
            };
            slots.insert(algorithm, slot);
        }
        Ok(Fanout { slots, policy })
    }

    /// Feed the whole stream. `Ok(false)` means cancellation was observed.
    fn stream<R: Read>(
        &mut self,
        mut reader: R,
        source: &Path,
        cancelled: impl Fn() -> bool,
        chunk_size: usize,
    ) -> Result<bool> {
        let mut buffer = vec![0u8; chunk_size.max(1)];
        loop {
            if cancelled() {
                return Ok(false);
            }

            let n = match reader.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::io(source, "reading", e)),
            };
            if n == 0 {
                break;
            }
            self.update(&buffer[..n])?;
        }
        Ok(true)
    }

    fn update(&mut self, chunk: &[u8]) -> Result<()> {
        let policy = self.policy;
        for slot in self.slots.values_mut() {
            if let Slot::Active(hasher) = slot {
                if let Err(err) = hasher.update(chunk) {
                    *slot = Slot::Failed(isolate(policy, err)?);
                }
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let policy = self.policy;
        for slot in self.slots.values_mut() {
            if let Slot::Active(hasher) = slot {
                if let Err(err) = hasher.finalize() {
                    *slot = Slot::Failed(isolate(policy, err)?);
                }
            }
        }
        Ok(())
    }

    fn collect(&self) -> Result<DigestMap> {
        let mut digests = DigestMap::new();
        for (&algorithm, slot) in &self.slots {
            let value = match slot {
                Slot::Active(hasher) => hasher.digest()?,
                Slot::Failed(code) => error_placeholder(*code),
            };
            digests.insert(algorithm, value);
        }
        Ok(digests)
    }
}

/// Decide whether a hasher failure stays local to its algorithm. Logic errors
/// and anything under [`FailurePolicy::Abort`] propagate.
fn isolate(policy: FailurePolicy, err: HashError) -> Result<i32> {
    match (policy, err.code()) {
        (FailurePolicy::Isolate, Some(code)) => {
            log::error!("{err}; continuing with the remaining algorithms");
            Ok(code)
        }
        _ => {
            log::error!("{err}");
            Err(err)
        }
    }
}
