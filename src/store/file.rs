use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::PacketStore;
use crate::error::{Error, Result};
use crate::recorder::SampledRecord;

/// JsonLinesStore appends one JSON object per record to a file.
pub struct JsonLinesStore {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonLinesStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        log::info!("json lines store opened at {}", path.display());

        Ok(JsonLinesStore {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// records reads the file back. Blank lines are ignored.
    pub async fn records(&self) -> Result<Vec<SampledRecord>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut records = vec![];
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl PacketStore for JsonLinesStore {
    async fn ping(&self) -> Result<()> {
        let file = self.file.lock().await;
        match &*file {
            Some(f) => {
                f.metadata().await?;
                Ok(())
            }
            None => Err(Error::ErrStoreClosed),
        }
    }

    async fn insert(&self, record: &SampledRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        let f = file.as_mut().ok_or(Error::ErrStoreClosed)?;
        f.write_all(&line)
            .await
            .map_err(|e| Error::ErrStoreWrite(e.to_string()))?;
        f.flush()
            .await
            .map_err(|e| Error::ErrStoreWrite(e.to_string()))?;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut file = self.file.lock().await;
        if let Some(f) = file.take() {
            f.sync_all().await?;
        }
        Ok(())
    }
}
