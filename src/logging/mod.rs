use std::{
    io::{self, Write},
    path::Path,
    str::FromStr,
};

use env_logger::{Builder, Target};
use log::LevelFilter;
use tokio::{
    fs::{create_dir_all, metadata, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config,
    core::{MediatorError, MediatorResult},
};

pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .send(buf.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Ships log records to a file from a background task.
pub struct Logger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    path: String,
}

impl Logger {
    pub fn new(path: impl Into<String>) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            path: path.into(),
        }
    }

    pub fn writer(&self) -> AsyncWriter {
        AsyncWriter {
            sender: self.sender.clone(),
        }
    }

    /// Drain buffered records into the log file until `shutdown` fires or
    /// every writer is gone.
    pub async fn run(mut self, shutdown: CancellationToken) -> MediatorResult<()> {
        // Only writers handed out to the env_logger keep the channel open
        drop(self.sender);

        if let Some(parent) = Path::new(&self.path).parent() {
            if metadata(parent).await.is_err() {
                create_dir_all(parent).await.map_err(|e| {
                    MediatorError::Config(format!("Failed to create log path {}: {e}", self.path))
                })?;
            }
        }

        let mut file = BufWriter::new(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(&self.path)
                .await
                .map_err(|e| {
                    MediatorError::Config(format!("Failed to open log file {}: {e}", self.path))
                })?,
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    log::info!("Shutdown signal received, stopping write log");
                    break;
                }

                data = self.receiver.recv() => {
                    match data {
                        Some(data) => {
                            if let Err(e) = file.write_all(&data).await {
                                log::error!("Failed to write to log file: {}", e);
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        // Whatever is already queued still goes to the file
        while let Ok(data) = self.receiver.try_recv() {
            if let Err(e) = file.write_all(&data).await {
                log::error!("Failed to write to log file: {}", e);
            }
        }

        file.flush()
            .await
            .map_err(|e| MediatorError::Config(format!("Failed to flush log file: {e}")))
    }
}

/// Install the global logger described by `config`.
///
/// With a `path` configured, records are piped to the returned [`Logger`],
/// which the caller must spawn. Otherwise records go to stderr.
pub fn init(config: &config::Log) -> MediatorResult<Option<Logger>> {
    let level = LevelFilter::from_str(&config.level)
        .map_err(|e| MediatorError::Config(format!("Invalid log level {}: {e}", config.level)))?;

    let mut builder = Builder::from_env(env_logger::Env::default());
    builder.filter(None, level);

    let logger = config.path.as_ref().map(Logger::new);
    if let Some(logger) = &logger {
        builder.target(Target::Pipe(Box::new(logger.writer())));
    }

    builder
        .try_init()
        .map_err(|e| MediatorError::Config(format!("Logger already initialised: {e}")))?;

    Ok(logger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logger_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("herald.log");

        let logger = Logger::new(path.display().to_string());
        let mut writer = logger.writer();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(logger.run(shutdown.clone()));

        writer.write_all(b"first line\n").unwrap();
        writer.write_all(b"second line\n").unwrap();
        drop(writer);

        task.await.unwrap().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first line\nsecond line\n");
    }

    #[tokio::test]
    async fn test_logger_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.log");

        let logger = Logger::new(path.display().to_string());
        let mut writer = logger.writer();
        writer.write_all(b"queued\n").unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        logger.run(shutdown).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "queued\n");
        // The receiver is gone once the logger stopped
        assert!(writer.write_all(b"late\n").is_err());
    }
}
