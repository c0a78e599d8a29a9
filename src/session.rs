use crate::cancel::CancelFlag;
use crate::config::{DigestConfig, DigestOptions};
use crate::error::HashError;
use crate::file_ops;
use crate::models::{Algorithm, DigestMap};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task::{self, JoinError, JoinHandle};
use uuid::Uuid;

/// Outcome of one finished job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestReport {
    pub job_id: Uuid,
    pub path: PathBuf,
    pub algorithms: Vec<Algorithm>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub digests: DigestMap,
}

impl DigestReport {
    /// (display name, value) in the order the algorithms were requested.
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        let mut seen = Vec::with_capacity(self.algorithms.len());
        let mut rows = Vec::with_capacity(self.digests.len());
        for algo in &self.algorithms {
            if seen.contains(algo) {
                continue;
            }
            seen.push(*algo);
            if let Some(value) = self.digests.get(algo) {
                rows.push((algo.name(), value.as_str()));
            }
        }
        rows
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing digest report")
    }
}

/// A computation running on the blocking pool, with its own cancel flag.
///
/// Dropping a job that has not been collected raises its flag; the worker
/// stops at its next checkpoint and the result is discarded.
#[derive(Debug)]
pub struct DigestJob {
    id: Uuid,
    path: PathBuf,
    algorithms: Vec<Algorithm>,
    started_at: DateTime<Utc>,
    cancel: CancelFlag,
    handle: Option<JoinHandle<Result<DigestMap, HashError>>>,
}

impl DigestJob {
    /// Must be called from within a tokio runtime.
    pub fn spawn(path: PathBuf, algorithms: Vec<Algorithm>, options: DigestOptions) -> Self {
        Self::spawn_with_flag(path, algorithms, options, CancelFlag::new())
    }

    pub fn spawn_with_flag(
        path: PathBuf,
        algorithms: Vec<Algorithm>,
        options: DigestOptions,
        cancel: CancelFlag,
    ) -> Self {
        let id = Uuid::new_v4();
        log::debug!("job {} started for {}", id, path.display());

        let worker_path = path.clone();
        let worker_algos = algorithms.clone();
        let worker_flag = cancel.clone();
        let handle = task::spawn_blocking(move || {
            file_ops::compute_file_digests_with(&worker_path, &worker_algos, Some(&worker_flag), &options)
        });

        DigestJob {
            id,
            path,
            algorithms,
            started_at: Utc::now(),
            cancel,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Non-blocking poll. Yields the report once; `None` while running or
    /// after the result has been taken.
    pub fn try_take(&mut self) -> Option<Result<DigestReport>> {
        let joined = self.handle.as_mut()?.now_or_never()?;
        self.handle = None;
        Some(self.report(joined))
    }

    pub async fn wait(mut self) -> Result<DigestReport> {
        let joined = match self.handle.as_mut() {
            Some(handle) => handle.await,
            None => anyhow::bail!("job {} was already collected", self.id),
        };
        self.handle = None;
        self.report(joined)
    }

    fn report(&self, joined: std::result::Result<Result<DigestMap, HashError>, JoinError>) -> Result<DigestReport> {
        let digests = joined
            .with_context(|| format!("digest worker for job {} failed", self.id))?
            .with_context(|| format!("hashing {}", self.path.display()))?;
        let cancelled = digests.is_empty() && self.cancel.is_cancelled();
        if cancelled {
            log::info!("job {} cancelled", self.id);
        } else {
            log::debug!("job {} finished with {} digests", self.id, digests.len());
        }
        Ok(DigestReport {
            job_id: self.id,
            path: self.path.clone(),
            algorithms: self.algorithms.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            cancelled,
            digests,
        })
    }
}

impl Drop for DigestJob {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}

/// Controller holding at most one outstanding job. Starting a new file
/// supersedes the previous job; dropping the session cancels what is left.
#[derive(Debug)]
pub struct DigestSession {
    config: DigestConfig,
    current: Option<DigestJob>,
}

impl DigestSession {
    pub fn new(config: DigestConfig) -> Self {
        DigestSession { config, current: None }
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub fn current_job(&self) -> Option<&DigestJob> {
        self.current.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.current.as_ref().is_some_and(|job| !job.is_finished())
    }

    /// Validate `path` and begin hashing it. Must be called from within a
    /// tokio runtime.
    pub fn start(&mut self, path: impl AsRef<Path>) -> Result<Uuid> {
        let path = path.as_ref();
        file_ops::validate_input_file(path)?;

        if let Some(old) = self.current.take() {
            log::info!("job {} superseded by {}", old.id(), path.display());
            old.cancel();
        }

        let job = DigestJob::spawn(path.to_path_buf(), self.config.algorithms.clone(), self.config.options());
        let id = job.id();
        self.current = Some(job);
        Ok(id)
    }

    /// Non-blocking; see [`DigestJob::try_take`].
    pub fn poll(&mut self) -> Option<Result<DigestReport>> {
        let result = self.current.as_mut()?.try_take()?;
        self.current = None;
        Some(result)
    }

    pub async fn finish(&mut self) -> Result<DigestReport> {
        let job = self.current.take().context("no digest in progress")?;
        job.wait().await
    }

    pub fn shutdown(&mut self) {
        if let Some(job) = self.current.take() {
            job.cancel();
        }
    }
}

impl Drop for DigestSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn session_reports_digests_in_request_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "abc.txt", b"abc");

        let mut session = DigestSession::new(DigestConfig::default());
        session.start(&path).unwrap();
        let report = session.finish().await.unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.path, path);
        let names: Vec<&str> = report.rows().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["MD5", "SHA-1", "SHA-256", "SHA-512", "SHA3-256", "SHA3-512"]);
        assert_eq!(report.digests[&Algorithm::Sha1], "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[tokio::test]
    async fn start_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.bin", b"");
        let mut session = DigestSession::new(DigestConfig::default());
        let err = session.start(&path).unwrap_err();
        assert_eq!(err.to_string(), "File passed is empty");
        assert!(session.current_job().is_none());
    }

    #[tokio::test]
    async fn new_file_supersedes_running_job() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "first.bin", &[7u8; 4096]);
        let second = write(dir.path(), "second.bin", b"abc");

        let mut session = DigestSession::new(DigestConfig::default());
        session.start(&first).unwrap();
        let old_flag = session.current_job().unwrap().cancel_flag().clone();
        let second_id = session.start(&second).unwrap();

        assert!(old_flag.is_cancelled());
        let report = session.finish().await.unwrap();
        assert_eq!(report.job_id, second_id);
        assert_eq!(report.path, second);
    }

    #[tokio::test]
    async fn poll_yields_result_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "abc.txt", b"abc");
        let mut session = DigestSession::new(DigestConfig::default());
        session.start(&path).unwrap();

        let report = loop {
            if let Some(result) = session.poll() {
                break result.unwrap();
            }
            tokio::task::yield_now().await;
            std::thread::sleep(std::time::Duration::from_millis(1));
        };
        assert_eq!(report.digests.len(), 6);
        assert!(session.poll().is_none());
        assert!(session.current_job().is_none());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn cancelled_job_reports_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "abc.txt", b"abc");
        let flag = CancelFlag::new();
        flag.cancel();

        let job = DigestJob::spawn_with_flag(path, Algorithm::all(), DigestOptions::default(), flag);
        let report = job.wait().await.unwrap();
        assert!(report.cancelled);
        assert!(report.digests.is_empty());
        assert!(report.rows().is_empty());
    }

    #[tokio::test]
    async fn dropping_session_cancels_outstanding_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "abc.txt", b"abc");
        let mut session = DigestSession::new(DigestConfig::default());
        session.start(&path).unwrap();
        let flag = session.current_job().unwrap().cancel_flag().clone();
        drop(session);
        assert!(flag.is_cancelled());
    }

    #[tokio::test]
    async fn report_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "abc.txt", b"abc");
        let job = DigestJob::spawn(path, vec![Algorithm::Md5], DigestOptions::default());
        let json = job.wait().await.unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["digests"]["Md5"], "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(value["cancelled"], false);
    }
}
