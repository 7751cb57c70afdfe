//! Rendering detections onto frames.

use crate::detector::Detection;
use crate::frame::Frame;
use image::Rgb;

const VIOLATION_COLOR: Rgb<u8> = Rgb([220, 30, 30]);
const COMPLIANT_COLOR: Rgb<u8> = Rgb([30, 200, 60]);
const BOX_THICKNESS: u32 = 2;

/// Draw one box per detection on a copy of `frame`. Red for missing
/// gear, green for everything else.
pub fn draw_detections(frame: &Frame, detections: &[Detection]) -> Frame {
    let mut annotated = frame.clone();
    for detection in detections {
        let color = if detection.is_violation() {
            VIOLATION_COLOR
        } else {
            COMPLIANT_COLOR
        };
        draw_box(&mut annotated, detection.bbox, color);
    }
    annotated
}

fn draw_box(frame: &mut Frame, bbox: (f32, f32, f32, f32), color: Rgb<u8>) {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let (x, y, w, h) = bbox;
    if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
        return;
    }

    let x0 = (x.max(0.0) as u32).min(width - 1);
    let y0 = (y.max(0.0) as u32).min(height - 1);
    let x1 = ((x + w).max(0.0) as u32).min(width - 1);
    let y1 = ((y + h).max(0.0) as u32).min(height - 1);

    for t in 0..BOX_THICKNESS {
        for px in x0..=x1 {
            put(frame, px, y0.saturating_add(t).min(y1), color);
            put(frame, px, y1.saturating_sub(t).max(y0), color);
        }
        for py in y0..=y1 {
            put(frame, x0.saturating_add(t).min(x1), py, color);
            put(frame, x1.saturating_sub(t).max(x0), py, color);
        }
    }
}

fn put(frame: &mut Frame, x: u32, y: u32, color: Rgb<u8>) {
    if x < frame.width() && y < frame.height() {
        frame.put_pixel(x, y, color);
    }
}
