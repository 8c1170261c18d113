use thiserror::Error;

use crate::args::InputMode;

/// A CLI flag combination the resolver rejects. Raised before any I/O is
/// opened, so a malformed invocation never creates output files or touches
/// a camera device.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("--input-type is required")]
    MissingInputType,
    #[error("--input-file is required when --input-type is {mode}")]
    MissingInputFile { mode: InputMode },
    #[error("--index only applies to webcam input, not {mode}")]
    IndexWithFile { mode: InputMode },
    #[error("--input-file does not apply to webcam input")]
    FileWithWebcam,
}

/// Failures on the capture side of the pipeline.
///
/// `Open` is fatal to the process (the source never produced a frame);
/// `Other` covers read failures mid-stream, which end the loop but leave
/// the process to exit normally.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}")]
    Open { uri: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures on the output-writer side. A rejected frame terminates the
/// loop; no partial-write recovery is attempted.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open output writer {path:?}")]
    Open { path: String },
    #[error("failed to write frame: {0}")]
    Write(#[from] anyhow::Error),
}
