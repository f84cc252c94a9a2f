#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;

use pipedag::errors::{PipedagError, Result};
use pipedag::exec::{RunRequest, TaskBackend, TaskOutcome};
use pipedag::stage::{ObjectUrl, Stager};

/// A fake backend that:
/// - records each request in start and completion order
/// - tracks the peak number of concurrently running tasks
/// - completes with a non-zero status for configured task names.
#[derive(Default)]
pub struct FakeBackend {
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    requests: Mutex<Vec<RunRequest>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    delay: Option<Duration>,
    failing: HashSet<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside each `run`, so concurrency is observable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the named task exit non-zero.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskBackend for FakeBackend {
    async fn run(&self, req: &RunRequest) -> Result<TaskOutcome> {
        self.started.lock().unwrap().push(req.name.clone());
        self.requests.lock().unwrap().push(req.clone());

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(req.name.clone());

        if self.failing.contains(&req.name) {
            Ok(TaskOutcome::Failed(1))
        } else {
            Ok(TaskOutcome::Success)
        }
    }
}

/// A fake staging adapter that records calls and optionally fails for
/// configured URLs. Nothing touches the filesystem.
#[derive(Default)]
pub struct FakeStager {
    downloads: Mutex<Vec<(String, PathBuf)>>,
    uploads: Mutex<Vec<(PathBuf, String)>>,
    failing_urls: HashSet<String>,
}

impl FakeStager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make any transfer against this URL fail.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().unwrap().clone()
    }

    fn check(&self, url: &str) -> Result<()> {
        if self.failing_urls.contains(url) {
            Err(PipedagError::Staging {
                url: url.to_string(),
                cause: anyhow!("injected staging failure"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Stager for FakeStager {
    async fn download(&self, url: &str, dir: &Path) -> Result<()> {
        self.check(url)?;
        // Same contract as the real adapter: an empty prefix transfers
        // nothing.
        let parsed: ObjectUrl = url.parse()?;
        if parsed.prefix.is_empty() {
            return Ok(());
        }
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), dir.to_path_buf()));
        Ok(())
    }

    async fn upload(&self, dir: &Path, url: &str) -> Result<()> {
        self.check(url)?;
        self.uploads
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), url.to_string()));
        Ok(())
    }
}

/// Helper pair used by most engine tests.
pub fn fake_world() -> (Arc<FakeBackend>, Arc<FakeStager>) {
    (Arc::new(FakeBackend::new()), Arc::new(FakeStager::new()))
}
