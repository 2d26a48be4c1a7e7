//! Destinations for published frame transforms

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Transform of a device frame relative to the base frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameTransform {
    /// Child frame name
    pub frame: String,
    /// Parent frame name
    pub parent: String,
    /// 4x4 homogeneous matrix, row-major
    pub matrix: [[f64; 4]; 4],
    pub timestamp: DateTime<Utc>,
}

pub trait TransformSink: Send {
    fn send(&mut self, transform: &FrameTransform) -> Result<(), SinkError>;
}

/// Writes transforms to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl TransformSink for LogSink {
    fn send(&mut self, transform: &FrameTransform) -> Result<(), SinkError> {
        let m = &transform.matrix;
        debug!(
            frame = %transform.frame,
            parent = %transform.parent,
            x = m[0][3],
            y = m[1][3],
            z = m[2][3],
            "Transform"
        );
        Ok(())
    }
}

/// Writes one JSON object per transform, newline separated
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TransformSink for JsonLinesSink<W> {
    fn send(&mut self, transform: &FrameTransform) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, transform)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
