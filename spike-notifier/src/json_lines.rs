use crate::VerdictSink;
use async_trait::async_trait;
use spike_core::{Result, VerdictEvent};
use std::path::{Path, PathBuf};
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::Mutex,
};
use tracing::info;

/// Appends one JSON document per verdict to a file, for offline plotting.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;

        info!(path = %path.display(), "Writing verdicts as JSON lines");

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VerdictSink for JsonLinesSink {
    async fn emit(&self, event: &VerdictEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        self.writer.lock().await.write_all(&line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json-lines"
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::event;

    #[tokio::test]
    async fn test_writes_one_event_per_line() {
        let path = std::env::temp_dir().join(format!("spike-{}.jsonl", uuid::Uuid::new_v4()));
        let sink = JsonLinesSink::create(&path).await.unwrap();

        sink.emit(&event(0, 10.0, false)).await.unwrap();
        sink.emit(&event(1, 40.0, true)).await.unwrap();
        sink.flush().await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let events: Vec<VerdictEvent> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].index, 1);
        assert!(events[1].anomalous);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_fails_for_missing_directory() {
        let path = std::env::temp_dir()
            .join(uuid::Uuid::new_v4().to_string())
            .join("verdicts.jsonl");
        assert!(JsonLinesSink::create(path).await.is_err());
    }
}
