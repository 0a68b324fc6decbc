//! Report publishing targets.

pub mod file;
pub mod ftp;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{error, info};

use crate::error::Result;

pub use file::FilePublisher;
pub use ftp::FtpPublisher;

/// A destination for the rendered report. Each publish overwrites the previous one.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, document: &str) -> Result<()>;
}

/// Publish to every target concurrently. Failures are logged, never propagated.
/// Returns how many targets succeeded.
pub async fn publish_all(publishers: &[Box<dyn Publisher>], document: &str) -> usize {
    let results = join_all(publishers.iter().map(|p| async move {
        let outcome = p.publish(document).await;
        (p.name(), outcome)
    }))
    .await;

    let mut ok = 0;
    for (name, outcome) in results {
        match outcome {
            Ok(()) => {
                info!(target_name = name, bytes = document.len(), "report published");
                ok += 1;
            }
            Err(e) => error!(target_name = name, "publish failed: {e}"),
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    struct Recording {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Publisher for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn publish(&self, document: &str) -> Result<()> {
            self.seen.lock().unwrap().push(document.to_string());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Publisher for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn publish(&self, _document: &str) -> Result<()> {
            Err(AppError::Publish("remote refused".to_string()))
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publishers: Vec<Box<dyn Publisher>> = vec![
            Box::new(Failing),
            Box::new(Recording { seen: Arc::clone(&seen) }),
        ];

        let ok = publish_all(&publishers, "<html></html>").await;

        assert_eq!(ok, 1);
        assert_eq!(*seen.lock().unwrap(), vec!["<html></html>".to_string()]);
    }

    #[tokio::test]
    async fn no_publishers_is_fine() {
        assert_eq!(publish_all(&[], "<html></html>").await, 0);
    }
}
