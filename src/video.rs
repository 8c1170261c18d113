use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use anyhow::anyhow;

use crate::error::CaptureError;
use crate::source::FrameSource;
use crate::types::Frame;

/// Decodes a video file into RGB frames through an ffmpeg child process
/// writing rawvideo to its stdout. Reads are synchronous: one
/// `read_exact` per pipeline iteration, no background thread.
pub struct VideoFileSource {
    child: Child,
    stdout: ChildStdout,
    uri: String,
    width: u32,
    height: u32,
    frame_rate: Option<f64>,
    frame_len: usize,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let uri = path.display().to_string();
        let (width, height, frame_rate) = probe(path)?;

        let mut child = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(path)
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| {
                log::error!("failed to spawn ffmpeg: {err}");
                CaptureError::Open { uri: uri.clone() }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Open { uri: uri.clone() })?;

        Ok(Self {
            child,
            stdout,
            uri,
            width,
            height,
            frame_rate,
            frame_len: width as usize * height as usize * 3,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut buffer = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => {
                let frame = Frame::from_raw(self.width, self.height, buffer)
                    .ok_or_else(|| anyhow!("frame buffer size mismatch"))?;
                Ok(Some(frame))
            }
            // A clean EOF is end-of-stream, not a failure.
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(err) => Err(CaptureError::Other(err.into())),
        }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn describe(&self) -> String {
        self.uri.clone()
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Ask ffprobe for the first video stream's dimensions and frame rate.
fn probe(path: &Path) -> Result<(u32, u32, Option<f64>), CaptureError> {
    let uri = path.display().to_string();
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height,avg_frame_rate")
        .arg("-of")
        .arg("csv=p=0")
        .arg(path)
        .output()
        .map_err(|err| {
            log::error!("failed to run ffprobe: {err}");
            CaptureError::Open { uri: uri.clone() }
        })?;

    if !output.status.success() {
        return Err(CaptureError::Open { uri });
    }

    let line = String::from_utf8_lossy(&output.stdout);
    parse_probe_line(line.trim()).ok_or(CaptureError::Open { uri })
}

/// Parse a `width,height,avg_frame_rate` csv line from ffprobe.
fn parse_probe_line(line: &str) -> Option<(u32, u32, Option<f64>)> {
    let mut parts = line.split(',');
    let width: u32 = parts.next()?.trim().parse().ok()?;
    let height: u32 = parts.next()?.trim().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    let rate = parts.next().and_then(|s| parse_rational(s.trim()));
    Some((width, height, rate))
}

/// `30000/1001`-style rational, or a bare number. Zero means unknown.
fn parse_rational(s: &str) -> Option<f64> {
    let value = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (value > 0.0).then_some(value)
}
