use std::sync::Arc;

use gpui::RenderImage;
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::types::Frame;

/// Where a contain-fitted image lands inside its container, in container units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct FitRect {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl FitRect {
    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.y + y * self.scale)
    }
}

/// Same placement as `ObjectFit::Contain`: scale to fit, then center.
pub(super) fn contain_fit(container: (f32, f32), image: (u32, u32)) -> FitRect {
    let (cw, ch) = container;
    let (iw, ih) = (image.0.max(1) as f32, image.1.max(1) as f32);
    let scale = (cw / iw).min(ch / ih);
    FitRect {
        x: (cw - iw * scale) / 2.0,
        y: (ch - ih * scale) / 2.0,
        scale,
    }
}

/// Packed RGB to the BGRA layout GPUI uploads directly.
pub(super) fn rgb_to_bgra(rgb: &[u8]) -> Vec<u8> {
    let mut bgra = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        bgra.extend_from_slice(&[px[2], px[1], px[0], 255]);
    }
    bgra
}

pub(super) fn frame_to_image(frame: &Frame) -> Option<Arc<RenderImage>> {
    // Converting here avoids the async asset pipeline and its flicker.
    let bgra = rgb_to_bgra(&frame.rgb);
    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(frame.width, frame.height, bgra)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}

pub(super) fn label_color(color: [u8; 3]) -> gpui::Rgba {
    gpui::rgb(((color[0] as u32) << 16) | ((color[1] as u32) << 8) | color[2] as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_is_letterboxed_vertically() {
        let fit = contain_fit((640.0, 480.0), (1280, 720));
        assert_eq!(fit.scale, 0.5);
        assert_eq!((fit.x, fit.y), (0.0, 60.0));
        assert_eq!(fit.map(100.0, 100.0), (50.0, 110.0));
    }

    #[test]
    fn tall_image_is_pillarboxed() {
        let fit = contain_fit((400.0, 400.0), (100, 200));
        assert_eq!(fit.scale, 2.0);
        assert_eq!((fit.x, fit.y), (100.0, 0.0));
    }

    #[test]
    fn bgra_swaps_channels_and_adds_alpha() {
        assert_eq!(rgb_to_bgra(&[1, 2, 3, 4, 5, 6]), vec![3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn short_frames_produce_no_image() {
        let frame = Frame::new(vec![0; 5], 2, 2);
        assert!(frame_to_image(&frame).is_none());
    }
}
