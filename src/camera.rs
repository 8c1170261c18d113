use anyhow::{anyhow, Result};
use colored::*;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

use crate::error::CaptureError;
use crate::source::FrameSource;
use crate::types::Frame;

pub struct CameraSource {
    camera: Camera,
    index: u32,
}

impl CameraSource {
    pub fn open(index: u32) -> Result<Self, CaptureError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(|err| {
            log::error!("failed to create camera instance: {err}");
            CaptureError::Open {
                uri: format!("camera #{index}"),
            }
        })?;

        camera.open_stream().map_err(|err| {
            log::error!("failed to open camera stream: {err}");
            CaptureError::Open {
                uri: format!("camera #{index}"),
            }
        })?;

        println!(
            "{}",
            format!("Opened camera: {}", camera.info().human_name()).green()
        );
        log::info!("Camera format: {}", camera.camera_format());

        Ok(Self { camera, index })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let frame = self.camera.frame().map_err(|e| anyhow!(e))?;
        let decoded = frame.decode_image::<RgbFormat>().map_err(|e| anyhow!(e))?;
        Ok(Some(decoded))
    }

    fn width(&self) -> u32 {
        self.camera.resolution().width()
    }

    fn height(&self) -> u32 {
        self.camera.resolution().height()
    }

    fn frame_rate(&self) -> Option<f64> {
        let rate = self.camera.camera_format().frame_rate();
        (rate > 0).then_some(rate as f64)
    }

    fn describe(&self) -> String {
        format!("camera #{} ({})", self.index, self.camera.info().human_name())
    }
}

/// Print the device table for `--list-cameras`.
pub fn list_cameras() -> Result<()> {
    let cameras = nokhwa::query(nokhwa::utils::ApiBackend::Auto)?;
    println!("Available Cameras:");
    println!("{:<5} | {:<30} | {:<10}", "Index", "Name", "Misc");
    println!("{}", "-".repeat(60));
    for cam in cameras {
        println!(
            "{:<5} | {:<30} | {:?}",
            cam.index(),
            cam.human_name(),
            cam.misc()
        );
    }
    Ok(())
}
