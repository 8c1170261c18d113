use image::Rgb;

use crate::config::{parse_hex, UiConfig};
use crate::font;
use crate::ttf::FontRenderer;
use crate::types::{Detection, Frame, Rect};

/// Outline thickness in pixels, drawn inward from the box edge.
const BOX_THICKNESS: i32 = 2;
/// Gap between the label baseline area and the box's top edge.
const LABEL_MARGIN: i32 = 2;

const GREEN: (u8, u8, u8) = (0, 255, 0);

/// How detections are rendered onto a frame. Built once from the UI
/// config and handed to the pipeline, never global.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub box_color: (u8, u8, u8),
    pub label_color: (u8, u8, u8),
    pub label_scale: usize,
    pub font_size_pt: f32,
}

impl OverlayStyle {
    pub fn from_ui(ui: &UiConfig) -> Self {
        Self {
            box_color: parse_hex(&ui.box_color_hex).unwrap_or(GREEN),
            label_color: parse_hex(&ui.label_color_hex).unwrap_or(GREEN),
            label_scale: ui.label_scale.max(1),
            font_size_pt: ui.font_size_pt as f32,
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: GREEN,
            label_color: GREEN,
            label_scale: 1,
            font_size_pt: 12.0,
        }
    }
}

/// Draw every detection, in the order the detector returned them. No
/// overlap resolution: later boxes and labels draw over earlier ones.
pub fn draw_detections(
    frame: &mut Frame,
    detections: &[Detection],
    style: &OverlayStyle,
    ttf: Option<&FontRenderer>,
) {
    for det in detections {
        draw_rect(frame, &det.rect, style.box_color);
        draw_label(frame, &det.rect, &det.label, style, ttf);
    }
}

/// Rectangle outline exactly bounding (x, y)-(x+w, y+h), clipped to the
/// frame, thickness growing inward.
fn draw_rect(frame: &mut Frame, rect: &Rect, color: (u8, u8, u8)) {
    let x0 = rect.x.round() as i32;
    let y0 = rect.y.round() as i32;
    let x1 = rect.right().round() as i32;
    let y1 = rect.bottom().round() as i32;

    for t in 0..BOX_THICKNESS {
        draw_h_span(frame, x0, x1, y0 + t, color);
        draw_h_span(frame, x0, x1, y1 - t, color);
        draw_v_span(frame, y0, y1, x0 + t, color);
        draw_v_span(frame, y0, y1, x1 - t, color);
    }
}

fn draw_h_span(frame: &mut Frame, x0: i32, x1: i32, y: i32, color: (u8, u8, u8)) {
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    if y < 0 || y >= h {
        return;
    }
    for x in x0.max(0)..=x1.min(w - 1) {
        frame.put_pixel(x as u32, y as u32, Rgb([color.0, color.1, color.2]));
    }
}

fn draw_v_span(frame: &mut Frame, y0: i32, y1: i32, x: i32, color: (u8, u8, u8)) {
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    if x < 0 || x >= w {
        return;
    }
    for y in y0.max(0)..=y1.min(h - 1) {
        frame.put_pixel(x as u32, y as u32, Rgb([color.0, color.1, color.2]));
    }
}

/// The top-1 category name, a couple of pixels above the box's top edge
/// (clamped into the frame when the box touches the top).
fn draw_label(
    frame: &mut Frame,
    rect: &Rect,
    label: &str,
    style: &OverlayStyle,
    ttf: Option<&FontRenderer>,
) {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let x = rect.x.round().max(0.0) as usize;
    let y0 = rect.y.round() as i32;

    match ttf {
        Some(renderer) => {
            let text_h = renderer.measure_height(style.font_size_pt) as i32;
            let y = (y0 - LABEL_MARGIN - text_h).max(0) as usize;
            renderer.draw_text(frame, w, h, x, y, label, style.label_color, style.font_size_pt);
        }
        None => {
            let text_h = font::measure_text_height(style.label_scale) as i32;
            let y = (y0 - LABEL_MARGIN - text_h).max(0) as usize;
            font::draw_text_line(frame, w, h, x, y, label, style.label_color, style.label_scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Detection;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const BOX: Rgb<u8> = Rgb([0, 255, 0]);
    const TEXT: Rgb<u8> = Rgb([255, 255, 0]);

    fn style() -> OverlayStyle {
        OverlayStyle {
            box_color: (0, 255, 0),
            label_color: (255, 255, 0),
            label_scale: 1,
            font_size_pt: 12.0,
        }
    }

    #[test]
    fn zero_detections_leave_the_frame_untouched() {
        let original = Frame::from_pixel(64, 48, Rgb([7, 13, 19]));
        let mut frame = original.clone();
        draw_detections(&mut frame, &[], &style(), None);
        assert_eq!(frame.as_raw(), original.as_raw());
    }

    #[test]
    fn outline_exactly_bounds_the_box() {
        let mut frame = Frame::from_pixel(100, 100, BLACK);
        let det = Detection::new(Rect::new(10.0, 10.0, 50.0, 50.0), "cat", 0.9);
        draw_detections(&mut frame, &[det], &style(), None);

        // Corners of the (10,10)-(60,60) outline.
        assert_eq!(*frame.get_pixel(10, 10), BOX);
        assert_eq!(*frame.get_pixel(60, 10), BOX);
        assert_eq!(*frame.get_pixel(10, 60), BOX);
        assert_eq!(*frame.get_pixel(60, 60), BOX);
        // Thickness grows inward.
        assert_eq!(*frame.get_pixel(11, 11), BOX);
        assert_eq!(*frame.get_pixel(59, 59), BOX);
        // Nothing outside the box...
        assert_eq!(*frame.get_pixel(9, 35), BLACK);
        assert_eq!(*frame.get_pixel(61, 35), BLACK);
        assert_eq!(*frame.get_pixel(35, 61), BLACK);
        // ...and the interior stays clear.
        assert_eq!(*frame.get_pixel(35, 35), BLACK);
        assert_eq!(*frame.get_pixel(13, 13), BLACK);
    }

    #[test]
    fn label_sits_above_the_top_edge() {
        let mut frame = Frame::from_pixel(100, 100, BLACK);
        let det = Detection::new(Rect::new(10.0, 10.0, 50.0, 50.0), "cat", 0.9);
        draw_detections(&mut frame, &[det], &style(), None);

        // scale 1 text is 5 rows tall, ending 2 px above the box top.
        let band: Vec<_> = (3u32..8)
            .flat_map(|y| (10u32..30).map(move |x| (x, y)))
            .filter(|&(x, y)| *frame.get_pixel(x, y) == TEXT)
            .collect();
        assert!(!band.is_empty(), "no label pixels above the box");

        // Nothing from the label bleeds into or below the box edge.
        for x in 0u32..100 {
            for y in 8u32..100 {
                assert_ne!(*frame.get_pixel(x, y), TEXT);
            }
        }
    }

    #[test]
    fn label_clamps_to_frame_top() {
        let mut frame = Frame::from_pixel(100, 100, BLACK);
        let det = Detection::new(Rect::new(5.0, 3.0, 20.0, 20.0), "dog", 0.9);
        // Box near the top: the label clamps to row 0 instead of vanishing.
        draw_detections(&mut frame, &[det], &style(), None);
        let any_text = (0u32..100)
            .flat_map(|y| (0u32..100).map(move |x| (x, y)))
            .any(|(x, y)| *frame.get_pixel(x, y) == TEXT);
        assert!(any_text);
    }

    #[test]
    fn boxes_clip_to_the_frame() {
        let mut frame = Frame::from_pixel(50, 50, BLACK);
        let det = Detection::new(Rect::new(40.0, 40.0, 30.0, 30.0), "truck", 0.5);
        draw_detections(&mut frame, &[det], &style(), None);
        assert_eq!(*frame.get_pixel(45, 40), BOX);
    }
}
