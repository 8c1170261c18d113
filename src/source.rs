use crate::error::CaptureError;
use crate::types::Frame;

/// Capture-source collaborator contract.
///
/// `read` returns `Ok(None)` at end of stream and `Err` on a read
/// failure; both terminate the streaming loop without failing the
/// process. Handles are released when the source is dropped.
pub trait FrameSource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Frames per second, when the source can report one.
    fn frame_rate(&self) -> Option<f64>;

    /// Human-readable identity for log lines.
    fn describe(&self) -> String;
}
