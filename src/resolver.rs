use std::path::PathBuf;

use crate::args::{Args, InputMode};
use crate::error::ValidationError;

/// The resolved input intent. Built once from the CLI before any I/O is
/// opened and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub mode: InputMode,
    pub file_path: Option<PathBuf>,
    pub device_index: Option<u32>,
    pub output_path: Option<PathBuf>,
}

/// Validate the flag combination and pin it down to one concrete source.
///
/// Image/video need a file and must not name a camera; webcam must not
/// name a file and defaults to device 0. An explicit `--index 0` is
/// indistinguishable from the default and passes for every mode.
pub fn resolve(args: &Args) -> Result<InputSpec, ValidationError> {
    let mode = args.input_type.ok_or(ValidationError::MissingInputType)?;

    match mode {
        InputMode::Image | InputMode::Video => {
            let file = args
                .input_file
                .clone()
                .ok_or(ValidationError::MissingInputFile { mode })?;
            if args.index != 0 {
                return Err(ValidationError::IndexWithFile { mode });
            }
            Ok(InputSpec {
                mode,
                file_path: Some(file),
                device_index: None,
                output_path: args.output_file.clone(),
            })
        }
        InputMode::Webcam => {
            if args.input_file.is_some() {
                return Err(ValidationError::FileWithWebcam);
            }
            Ok(InputSpec {
                mode,
                file_path: None,
                device_index: Some(args.index),
                output_path: args.output_file.clone(),
            })
        }
    }
}
