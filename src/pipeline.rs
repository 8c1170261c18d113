use std::path::Path;

use anyhow::{Context, Result};

use crate::detector::Detector;
use crate::display::DisplaySink;
use crate::error::CaptureError;
use crate::overlay::{self, OverlayStyle};
use crate::source::FrameSource;
use crate::ttf::FontRenderer;
use crate::types::{Detection, Frame};
use crate::writer::FrameSink;

/// The frame pipeline: detect, overlay, emit. The detector handle is
/// held for the pipeline's lifetime and released with it on every exit
/// path.
pub struct FramePipeline {
    detector: Box<dyn Detector>,
    style: OverlayStyle,
    font: Option<FontRenderer>,
}

impl FramePipeline {
    pub fn new(detector: Box<dyn Detector>, style: OverlayStyle, font: Option<FontRenderer>) -> Self {
        Self {
            detector,
            style,
            font,
        }
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// The per-frame step shared by both modes: run detection, then draw
    /// every detection in the order the detector returned them.
    pub fn annotate(&mut self, frame: &mut Frame) -> Result<Vec<Detection>> {
        let detections = self.detector.detect(frame)?;
        overlay::draw_detections(frame, &detections, &self.style, self.font.as_ref());
        Ok(detections)
    }

    /// Single-shot mode: load, detect once, render, optionally save,
    /// display until a key is pressed.
    pub fn run_image(
        &mut self,
        path: &Path,
        output: Option<&Path>,
        display: &mut dyn DisplaySink,
    ) -> Result<()> {
        let image = image::open(path).map_err(|err| {
            log::error!("failed to decode {}: {err}", path.display());
            CaptureError::Open {
                uri: path.display().to_string(),
            }
        })?;
        let mut frame = image.to_rgb8();

        let detections = self.annotate(&mut frame)?;
        log::info!("{}: {} detections", path.display(), detections.len());

        if let Some(out) = output {
            frame
                .save(out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            log::info!("Saved annotated image to {}", out.display());
        }

        display.show(&frame)?;
        display.wait_for_key();
        Ok(())
    }

    /// Streaming mode: capture, detect, render, emit, until the source
    /// ends or the user quits. A read or write failure ends the loop but
    /// not the process. Returns the number of frames fully processed.
    pub fn run_stream<'s>(
        &mut self,
        source: &mut dyn FrameSource,
        mut sink: Option<&mut (dyn FrameSink + 's)>,
        display: &mut dyn DisplaySink,
    ) -> Result<u64> {
        let mut frames: u64 = 0;

        loop {
            let mut frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("End of stream after {frames} frames");
                    break;
                }
                Err(err) => {
                    log::warn!("Unable to capture frame: {err}");
                    break;
                }
            };

            self.annotate(&mut frame)?;

            if let Some(sink) = sink.as_mut() {
                if let Err(err) = sink.append(&frame) {
                    log::warn!("Output writer rejected frame: {err}");
                    break;
                }
            }

            display.show(&frame)?;
            frames += 1;

            // The only cancellation mechanism: one quit poll per frame.
            if display.quit_requested() {
                log::info!("Quit requested after {frames} frames");
                break;
            }
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::types::Rect;
    use anyhow::anyhow;
    use image::Rgb;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeDetector {
        calls: Rc<Cell<usize>>,
        detections: Vec<Detection>,
    }

    impl Detector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.detections.clone())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct ScriptedSource {
        remaining: Option<usize>, // None = endless
        fail_after: Option<usize>,
        served: usize,
    }

    impl ScriptedSource {
        fn finite(n: usize) -> Self {
            Self {
                remaining: Some(n),
                fail_after: None,
                served: 0,
            }
        }

        fn endless() -> Self {
            Self {
                remaining: None,
                fail_after: None,
                served: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
            if let Some(n) = self.fail_after {
                if self.served >= n {
                    return Err(CaptureError::Other(anyhow!("transient read failure")));
                }
            }
            if let Some(n) = self.remaining {
                if self.served >= n {
                    return Ok(None);
                }
            }
            self.served += 1;
            Ok(Some(Frame::from_pixel(16, 16, Rgb([0, 0, 0]))))
        }

        fn width(&self) -> u32 {
            16
        }

        fn height(&self) -> u32 {
            16
        }

        fn frame_rate(&self) -> Option<f64> {
            Some(30.0)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    struct CountingSink {
        appended: usize,
        fail_on: Option<usize>,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                appended: 0,
                fail_on: None,
            }
        }
    }

    impl FrameSink for CountingSink {
        fn append(&mut self, _frame: &Frame) -> Result<(), SinkError> {
            if self.fail_on == Some(self.appended + 1) {
                return Err(SinkError::Write(anyhow!("disk full")));
            }
            self.appended += 1;
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    struct StubDisplay {
        shows: usize,
        quit_after: Option<usize>,
    }

    impl StubDisplay {
        fn new() -> Self {
            Self {
                shows: 0,
                quit_after: None,
            }
        }
    }

    impl DisplaySink for StubDisplay {
        fn show(&mut self, _frame: &Frame) -> Result<()> {
            self.shows += 1;
            Ok(())
        }

        fn quit_requested(&mut self) -> bool {
            self.quit_after.is_some_and(|n| self.shows >= n)
        }

        fn wait_for_key(&mut self) {}
    }

    fn pipeline_with_counter() -> (FramePipeline, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let detector = FakeDetector {
            calls: Rc::clone(&calls),
            detections: vec![Detection::new(Rect::new(2.0, 2.0, 8.0, 8.0), "cat", 0.9)],
        };
        (
            FramePipeline::new(Box::new(detector), OverlayStyle::default(), None),
            calls,
        )
    }

    #[test]
    fn drains_a_finite_source() {
        let (mut pipeline, calls) = pipeline_with_counter();
        let mut source = ScriptedSource::finite(3);
        let mut sink = CountingSink::new();
        let mut display = StubDisplay::new();

        let frames = pipeline
            .run_stream(&mut source, Some(&mut sink), &mut display)
            .unwrap();

        assert_eq!(frames, 3);
        assert_eq!(calls.get(), 3);
        assert_eq!(sink.appended, 3);
        assert_eq!(display.shows, 3);
    }

    #[test]
    fn runs_without_a_sink() {
        let (mut pipeline, calls) = pipeline_with_counter();
        let mut source = ScriptedSource::finite(2);
        let mut display = StubDisplay::new();

        let frames = pipeline.run_stream(&mut source, None, &mut display).unwrap();

        assert_eq!(frames, 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn quit_stops_an_endless_source() {
        let (mut pipeline, calls) = pipeline_with_counter();
        let mut source = ScriptedSource::endless();
        let mut sink = CountingSink::new();
        let mut display = StubDisplay::new();
        display.quit_after = Some(2);

        let frames = pipeline
            .run_stream(&mut source, Some(&mut sink), &mut display)
            .unwrap();

        assert_eq!(frames, 2);
        assert_eq!(calls.get(), 2);
        assert_eq!(sink.appended, 2);
    }

    #[test]
    fn read_failure_ends_the_loop_gracefully() {
        let (mut pipeline, _calls) = pipeline_with_counter();
        let mut source = ScriptedSource::endless();
        source.fail_after = Some(2);
        let mut display = StubDisplay::new();

        let frames = pipeline.run_stream(&mut source, None, &mut display).unwrap();

        assert_eq!(frames, 2);
    }

    #[test]
    fn write_failure_ends_the_loop_gracefully() {
        let (mut pipeline, calls) = pipeline_with_counter();
        let mut source = ScriptedSource::endless();
        let mut sink = CountingSink::new();
        sink.fail_on = Some(3);
        let mut display = StubDisplay::new();

        let frames = pipeline
            .run_stream(&mut source, Some(&mut sink), &mut display)
            .unwrap();

        // Two frames made it through before the writer rejected one.
        assert_eq!(frames, 2);
        assert_eq!(sink.appended, 2);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn annotate_draws_when_detections_exist() {
        let (mut pipeline, calls) = pipeline_with_counter();
        let mut frame = Frame::from_pixel(16, 16, Rgb([0, 0, 0]));
        let untouched = frame.clone();

        let detections = pipeline.annotate(&mut frame).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(detections.len(), 1);
        assert_ne!(frame.as_raw(), untouched.as_raw());
    }
}
