use std::io::Cursor;

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::debug;

use crate::config::FtpConfig;
use crate::error::Result;
use crate::publish::Publisher;

const DEFAULT_FTP_PORT: u16 = 21;

/// Uploads the report to a fixed remote path, replacing whatever is there.
/// Opens a fresh control connection per publish.
pub struct FtpPublisher {
    cfg: FtpConfig,
    remote_name: String,
}

impl FtpPublisher {
    pub fn new(cfg: FtpConfig, remote_name: impl Into<String>) -> Self {
        Self {
            cfg,
            remote_name: remote_name.into(),
        }
    }
}

/// `host` or `host:port` -> `host:port`.
pub fn ftp_addr(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_FTP_PORT}")
    }
}

fn upload(cfg: &FtpConfig, remote_name: &str, document: &[u8]) -> Result<u64> {
    let mut ftp = FtpStream::connect(ftp_addr(&cfg.host))?;
    ftp.login(&cfg.user, &cfg.pass)?;
    ftp.transfer_type(FileType::Binary)?;
    if !cfg.dir.is_empty() {
        ftp.cwd(&cfg.dir)?;
    }
    let written = ftp.put_file(remote_name, &mut Cursor::new(document))?;
    ftp.quit()?;
    Ok(written)
}

#[async_trait]
impl Publisher for FtpPublisher {
    fn name(&self) -> &str {
        "ftp"
    }

    async fn publish(&self, document: &str) -> Result<()> {
        let cfg = self.cfg.clone();
        let remote_name = self.remote_name.clone();
        let bytes = document.as_bytes().to_vec();

        // suppaftp's stream is blocking
        let written =
            tokio::task::spawn_blocking(move || upload(&cfg, &remote_name, &bytes)).await??;
        debug!(
            host = %self.cfg.host,
            dir = %self.cfg.dir,
            file = %self.remote_name,
            bytes = written,
            "ftp upload complete"
        );
        Ok(())
    }
}
