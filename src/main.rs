use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::*;

mod args;
mod camera;
mod config;
mod detector;
mod display;
mod error;
mod font;
mod overlay;
mod pipeline;
mod resolver;
mod source;
mod ttf;
mod types;
mod video;
mod writer;

use args::{Args, InputMode};
use camera::CameraSource;
use config::AppConfig;
use detector::OnnxDetector;
use display::WindowDisplay;
use overlay::OverlayStyle;
use pipeline::FramePipeline;
use resolver::InputSpec;
use source::FrameSource;
use ttf::FontRenderer;
use video::VideoFileSource;
use writer::{FfmpegSink, FrameSink};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list_cameras {
        return camera::list_cameras();
    }

    // Validate before any I/O: a bad invocation must not create output
    // files or touch a device.
    let spec = match resolver::resolve(&args) {
        Ok(spec) => spec,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            eprintln!(
                "Usage: spotter --input-type <image|video|webcam> [--index <n>] \
                 [--input-file <path>] [--output-file <path>]"
            );
            std::process::exit(2);
        }
    };

    let config = AppConfig::load()?;

    let detector = OnnxDetector::new(&config.detector)?;
    let style = OverlayStyle::from_ui(&config.ui);
    let font = FontRenderer::try_load(&config.ui.font_family);
    let mut pipeline = FramePipeline::new(Box::new(detector), style, font);
    println!(
        "{}",
        format!("Active detector: {}", pipeline.detector_name()).green()
    );

    match spec.mode {
        InputMode::Image => run_single_shot(&mut pipeline, &spec, &config),
        InputMode::Video | InputMode::Webcam => run_streaming(&mut pipeline, &spec, &config),
    }
}

fn run_single_shot(pipeline: &mut FramePipeline, spec: &InputSpec, config: &AppConfig) -> Result<()> {
    let path = spec
        .file_path
        .as_deref()
        .ok_or_else(|| anyhow!("resolved image input has no file path"))?;

    // The window adopts the image's dimensions on first show.
    let mut display = WindowDisplay::new(&config.ui.window_title, 640, 480)?;
    pipeline.run_image(path, spec.output_path.as_deref(), &mut display)
}

fn run_streaming(pipeline: &mut FramePipeline, spec: &InputSpec, config: &AppConfig) -> Result<()> {
    let mut source: Box<dyn FrameSource> = match spec.mode {
        InputMode::Webcam => Box::new(CameraSource::open(spec.device_index.unwrap_or(0))?),
        _ => {
            let path = spec
                .file_path
                .as_deref()
                .ok_or_else(|| anyhow!("resolved video input has no file path"))?;
            Box::new(VideoFileSource::open(path)?)
        }
    };
    println!("{}", format!("Reading from {}", source.describe()).green());

    let mut sink: Option<Box<dyn FrameSink>> = match &spec.output_path {
        Some(path) => {
            let fps = source.frame_rate().unwrap_or(config.output.fallback_fps);
            let sink = FfmpegSink::open(path, fps, (source.width(), source.height()))
                .context("failed to open the output writer")?;
            Some(Box::new(sink))
        }
        None => None,
    };

    let mut display = WindowDisplay::new(
        &config.ui.window_title,
        source.width() as usize,
        source.height() as usize,
    )?;

    let result = pipeline.run_stream(source.as_mut(), sink.as_deref_mut(), &mut display);

    // Release order is unconditional: writer finalized and capture handle
    // dropped whether the loop ended normally, on a failure, or on quit.
    if let Some(mut sink) = sink {
        if let Err(err) = sink.finish() {
            log::warn!("failed to finalize output file: {err}");
        }
    }
    drop(source);

    let frames = result?;
    println!("Processed {frames} frames");
    Ok(())
}
