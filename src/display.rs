use anyhow::Result;

use crate::types::Frame;

/// Display-sink collaborator contract. `quit_requested` is the
/// streaming loop's per-iteration cancellation poll; `wait_for_key`
/// blocks until a key press, used by single-shot mode.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame) -> Result<()>;
    fn quit_requested(&mut self) -> bool;
    fn wait_for_key(&mut self);
}

pub struct WindowDisplay {
    window: minifb::Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl WindowDisplay {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = minifb::Window::new(
            title,
            width,
            height,
            minifb::WindowOptions {
                resize: true,
                ..minifb::WindowOptions::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("Failed to create window: {}", e))?;

        window.limit_update_rate(Some(std::time::Duration::from_micros(16600))); // ~60 FPS

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
        })
    }
}

impl DisplaySink for WindowDisplay {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        // Track the frame's dimensions; minifb scales the buffer to the
        // window.
        let fw = frame.width() as usize;
        let fh = frame.height() as usize;
        if fw != self.width || fh != self.height {
            self.width = fw;
            self.height = fh;
            self.buffer.resize(fw * fh, 0);
        }

        // RGB8 -> 0RGB u32
        for (i, pixel) in frame.pixels().enumerate() {
            if i >= self.buffer.len() {
                break;
            }
            let r = pixel[0] as u32;
            let g = pixel[1] as u32;
            let b = pixel[2] as u32;
            self.buffer[i] = (r << 16) | (g << 8) | b;
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| anyhow::anyhow!(e))
    }

    fn quit_requested(&mut self) -> bool {
        !self.window.is_open()
            || self.window.is_key_down(minifb::Key::Q)
            || self.window.is_key_down(minifb::Key::Escape)
    }

    fn wait_for_key(&mut self) {
        while self.window.is_open() {
            self.window.update();
            if !self
                .window
                .get_keys_pressed(minifb::KeyRepeat::No)
                .is_empty()
            {
                break;
            }
        }
    }
}
