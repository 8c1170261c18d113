use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Kind of input source to read frames from
    #[arg(
        short = 't',
        long = "input-type",
        value_enum,
        required_unless_present = "list_cameras"
    )]
    pub input_type: Option<InputMode>,

    /// Camera device index (webcam only, default 0)
    #[arg(short = 'i', long, default_value_t = 0)]
    pub index: u32,

    /// Path to the input image or video (required with image/video)
    #[arg(long = "input-file", alias = "if")]
    pub input_file: Option<PathBuf>,

    /// Where to write the annotated output (.mp4/.avi for streaming input)
    #[arg(long = "output-file", alias = "of")]
    pub output_file: Option<PathBuf>,

    /// List available cameras and exit
    #[arg(long)]
    pub list_cameras: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Image,
    Video,
    Webcam,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputMode::Image => "image",
            InputMode::Video => "video",
            InputMode::Webcam => "webcam",
        };
        f.write_str(name)
    }
}
