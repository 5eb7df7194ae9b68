use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Photo, PhotoSource};

/// A scripted photo source for tests. Returns pre-defined results in order,
/// then empty lists once the script runs out.
pub struct MockSource {
    name: String,
    script: Vec<Result<Vec<Photo>, String>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(name: &str, script: Vec<Result<Vec<Photo>, String>>) -> Self {
        Self {
            name: name.to_string(),
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that always finds nothing.
    pub fn empty(name: &str) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _species: &str) -> Result<Vec<Photo>> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.get(i) {
            Some(Ok(photos)) => Ok(photos.clone()),
            Some(Err(msg)) => Err(anyhow::anyhow!("{}: {msg}", self.name)),
            None => Ok(Vec::new()),
        }
    }
}
