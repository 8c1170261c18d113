use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::anyhow;

use crate::error::SinkError;
use crate::types::Frame;

/// Output-writer collaborator contract. `finish` flushes and closes the
/// sink; it must be called on every exit path (drop is the backstop but
/// may leave the file truncated).
pub trait FrameSink {
    fn append(&mut self, frame: &Frame) -> Result<(), SinkError>;
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Encodes RGB frames into a video file through an ffmpeg child process
/// reading rawvideo from its stdin. Container and codec follow from the
/// `.mp4`/`.avi` extension.
pub struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
    path: String,
    frame_len: usize,
    frames_written: u64,
}

impl FfmpegSink {
    pub fn open(path: &Path, frame_rate: f64, frame_size: (u32, u32)) -> Result<Self, SinkError> {
        let (width, height) = frame_size;
        let path_str = path.display().to_string();

        let mut child = Command::new("ffmpeg")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-video_size")
            .arg(format!("{width}x{height}"))
            .arg("-framerate")
            .arg(format!("{frame_rate}"))
            .arg("-i")
            .arg("-")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| {
                log::error!("failed to spawn ffmpeg encoder: {err}");
                SinkError::Open {
                    path: path_str.clone(),
                }
            })?;

        let stdin = child.stdin.take().ok_or_else(|| SinkError::Open {
            path: path_str.clone(),
        })?;

        log::info!("Writing annotated stream to {path_str} at {frame_rate:.1} fps");

        Ok(Self {
            child,
            stdin: Some(stdin),
            path: path_str,
            frame_len: width as usize * height as usize * 3,
            frames_written: 0,
        })
    }
}

impl FrameSink for FfmpegSink {
    fn append(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SinkError::Write(anyhow!("output writer already finished")))?;

        if frame.as_raw().len() != self.frame_len {
            return Err(SinkError::Write(anyhow!(
                "frame size changed mid-stream ({} bytes, expected {})",
                frame.as_raw().len(),
                self.frame_len
            )));
        }

        stdin
            .write_all(frame.as_raw())
            .map_err(|err| SinkError::Write(err.into()))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        // Closing stdin tells the encoder to finalize the container.
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|err| SinkError::Write(err.into()))?;
        if !status.success() {
            return Err(SinkError::Write(anyhow!(
                "ffmpeg encoder exited with {status}"
            )));
        }
        log::info!("Wrote {} frames to {}", self.frames_written, self.path);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
