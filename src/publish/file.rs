use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::publish::Publisher;

/// Overwrites a local file with the latest report.
pub struct FilePublisher {
    path: PathBuf,
}

impl FilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Publisher for FilePublisher {
    fn name(&self) -> &str {
        "file"
    }

    async fn publish(&self, document: &str) -> Result<()> {
        tokio::fs::write(&self.path, document.as_bytes()).await?;
        Ok(())
    }
}
