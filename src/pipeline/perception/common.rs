use std::cmp::Ordering;

use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, Landmark};

#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

impl LetterboxInfo {
    /// Maps a point in model input pixels back to frame pixels.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

#[derive(Clone, Debug)]
pub struct CropTransform {
    pub center: (f32, f32),
    pub side: f32,
    pub angle: f32,
    pub output_size: u32,
    pub orig_w: u32,
    pub orig_h: u32,
}

impl CropTransform {
    /// Maps a point in crop pixels back to frame pixels, clamped to the frame.
    pub fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let half = self.output_size as f32 / 2.0;
        let scale = self.side / self.output_size as f32;
        let dx = (x - half) * scale;
        let dy = (y - half) * scale;
        let (sin, cos) = self.angle.sin_cos();
        let ox = self.center.0 + dx * cos - dy * sin;
        let oy = self.center.1 + dx * sin + dy * cos;
        (
            ox.clamp(0.0, (self.orig_w.saturating_sub(1)) as f32),
            oy.clamp(0.0, (self.orig_h.saturating_sub(1)) as f32),
        )
    }

    /// Projects crop-space points to landmarks normalized by the frame size.
    /// Depth is rescaled by the same factor as x.
    pub fn to_landmarks(&self, points: &[[f32; 3]]) -> Vec<Landmark> {
        let scale = self.side / self.output_size as f32;
        let (w, h) = (self.orig_w.max(1) as f32, self.orig_h.max(1) as f32);
        points
            .iter()
            .map(|[x, y, z]| {
                let (px, py) = self.project(*x, *y);
                Landmark {
                    x: px / w,
                    y: py / h,
                    z: z * scale / w,
                }
            })
            .collect()
    }
}

fn check_frame(frame: &Frame) -> Result<()> {
    let expected_len = Frame::expected_len(frame.width, frame.height);
    if frame.rgb.len() != expected_len || expected_len == 0 {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgb.len(),
            expected_len
        ));
    }
    Ok(())
}

/// Resizes `frame` to fit a `target_size` square, keeping its aspect ratio
/// and padding the remainder with black. Returns the RGB canvas.
pub fn letterbox(frame: &Frame, target_size: u32) -> Result<(Vec<u8>, LetterboxInfo)> {
    check_frame(frame)?;

    let scale = target_size as f32 / (frame.width.max(frame.height) as f32);
    let new_w = ((frame.width as f32 * scale).round().max(1.0) as u32).min(target_size);
    let new_h = ((frame.height as f32 * scale).round().max(1.0) as u32).min(target_size);

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgb.clone(),
        fir::PixelType::U8x3,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size - new_w) / 2) as usize;
    let pad_y = ((target_size - new_h) / 2) as usize;
    let mut canvas = vec![0u8; Frame::expected_len(target_size, target_size)];
    let dst_stride = target_size as usize * 3;
    let src_stride = new_w as usize * 3;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 3;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((canvas, letterbox))
}

/// `[1, size, size, 3]` RGB tensor scaled to [0, 1].
pub fn nhwc_unit_tensor(canvas: &[u8], size: u32) -> Result<Array4<f32>> {
    let normalized: Vec<f32> = canvas.par_iter().map(|&v| v as f32 / 255.0).collect();
    Array4::<f32>::from_shape_vec((1, size as usize, size as usize, 3), normalized)
        .map_err(|err| anyhow!("failed to build input tensor: {err}"))
}

/// `[1, 3, size, size]` BGR planes with raw 0-255 values.
pub fn nchw_bgr_tensor(canvas: &[u8], size: u32) -> Result<Array4<f32>> {
    let side = size as usize;
    let plane = side * side;
    if canvas.len() != plane * 3 {
        return Err(anyhow!(
            "canvas size mismatch: got {}, expected {}",
            canvas.len(),
            plane * 3
        ));
    }

    let mut data = vec![0f32; plane * 3];
    let (blue, rest) = data.split_at_mut(plane);
    let (green, red) = rest.split_at_mut(plane);
    for (i, px) in canvas.chunks_exact(3).enumerate() {
        red[i] = px[0] as f32;
        green[i] = px[1] as f32;
        blue[i] = px[2] as f32;
    }

    Array4::<f32>::from_shape_vec((1, 3, side, side), data)
        .map_err(|err| anyhow!("failed to build input tensor: {err}"))
}

/// Samples a rotated square of `side` frame pixels around `center` into an
/// `output_size` NHWC tensor in [0, 1].
pub fn prepare_rotated_crop(
    frame: &Frame,
    center: (f32, f32),
    side: f32,
    angle: f32,
    output_size: u32,
) -> Result<(Array4<f32>, CropTransform)> {
    check_frame(frame)?;

    let mut data =
        Vec::with_capacity((output_size as usize).saturating_mul(output_size as usize * 3));
    let half = output_size as f32 / 2.0;
    let scale = side / output_size as f32;
    let (sin, cos) = angle.sin_cos();

    for y in 0..output_size {
        let dy = (y as f32 + 0.5 - half) * scale;
        for x in 0..output_size {
            let dx = (x as f32 + 0.5 - half) * scale;
            let src_x = center.0 + dx * cos - dy * sin;
            let src_y = center.1 + dx * sin + dy * cos;
            data.extend_from_slice(&sample_rgb(frame, src_x, src_y));
        }
    }

    let array =
        Array4::<f32>::from_shape_vec((1, output_size as usize, output_size as usize, 3), data)
            .map_err(|err| anyhow!("failed to build rotated crop tensor: {err}"))?;

    let transform = CropTransform {
        center,
        side,
        angle,
        output_size,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((array, transform))
}

fn sample_rgb(frame: &Frame, x: f32, y: f32) -> [f32; 3] {
    if x.is_nan() || y.is_nan() {
        return [0.0, 0.0, 0.0];
    }
    let x0 = x.floor();
    let y0 = y.floor();

    let fetch = |cx: f32, cy: f32| -> [f32; 3] {
        if cx < 0.0 || cy < 0.0 {
            return [0.0, 0.0, 0.0];
        }
        frame
            .pixel(cx as u32, cy as u32)
            .map(|px| {
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ]
            })
            .unwrap_or([0.0, 0.0, 0.0])
    };

    let fx = x - x0;
    let fy = y - y0;
    let c00 = fetch(x0, y0);
    let c10 = fetch(x0 + 1.0, y0);
    let c01 = fetch(x0, y0 + 1.0);
    let c11 = fetch(x0 + 1.0, y0 + 1.0);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let mut out = [0.0; 3];
    for c in 0..3 {
        out[c] = lerp(lerp(c00[c], c10[c], fx), lerp(c01[c], c11[c], fx), fy);
    }
    out
}

/// Splits a flat `[x, y, z, x, y, z, ...]` output into points.
pub fn decode_points(flat: &[f32], min_points: usize) -> Result<Vec<[f32; 3]>> {
    if flat.len() < min_points * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            min_points * 3
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect())
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Greedy non-maximum suppression over `[x1, y1, x2, y2]` boxes. Returns the
/// kept indices, best score first.
pub fn nms(boxes: &[[f32; 4]], scores: &[f32], threshold: f32, top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len().min(scores.len())).collect();
    order.sort_by(|a, b| scores[*b].partial_cmp(&scores[*a]).unwrap_or(Ordering::Equal));

    let mut keep: Vec<usize> = Vec::new();
    'outer: for &idx in &order {
        if keep.len() >= top_k {
            break;
        }
        for &k in &keep {
            if iou(&boxes[idx], &boxes[k]) >= threshold {
                continue 'outer;
            }
        }
        keep.push(idx);
    }
    keep
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

pub fn clamp_box(bbox: [f32; 4], w: u32, h: u32) -> [f32; 4] {
    let max_w = (w.saturating_sub(1)) as f32;
    let max_h = (h.saturating_sub(1)) as f32;
    [
        bbox[0].clamp(0.0, max_w),
        bbox[1].clamp(0.0, max_h),
        bbox[2].clamp(0.0, max_w),
        bbox[3].clamp(0.0, max_h),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterbox_pads_the_short_side() {
        let frame = Frame::filled(8, 4, [200, 100, 50]);
        let (canvas, info) = letterbox(&frame, 4).expect("letterbox");

        assert_eq!(canvas.len(), 4 * 4 * 3);
        assert_eq!(info.scale, 0.5);
        assert_eq!((info.pad_x, info.pad_y), (0.0, 1.0));
        // Top padding row stays black, content starts on row 1.
        assert_eq!(&canvas[0..3], &[0, 0, 0]);
        assert!(canvas[12..15].iter().zip([200u8, 100, 50]).all(|(a, b)| a.abs_diff(b) <= 1));
        assert_eq!(info.to_frame(2.0, 2.0), (4.0, 2.0));
    }

    #[test]
    fn letterbox_rejects_short_buffers() {
        let frame = Frame::new(vec![0; 5], 2, 2);
        assert!(letterbox(&frame, 4).is_err());
    }

    #[test]
    fn nchw_bgr_splits_planes() {
        let canvas = vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let tensor = nchw_bgr_tensor(&canvas, 2).expect("tensor");
        assert_eq!(tensor.shape(), &[1, 3, 2, 2]);
        assert_eq!(tensor[[0, 0, 0, 0]], 30.0);
        assert_eq!(tensor[[0, 1, 0, 1]], 50.0);
        assert_eq!(tensor[[0, 2, 1, 1]], 100.0);
    }

    #[test]
    fn unrotated_crop_projects_center_to_center() {
        let transform = CropTransform {
            center: (50.0, 40.0),
            side: 20.0,
            angle: 0.0,
            output_size: 10,
            orig_w: 100,
            orig_h: 80,
        };
        assert_eq!(transform.project(5.0, 5.0), (50.0, 40.0));
        assert_eq!(transform.project(10.0, 0.0), (60.0, 30.0));

        let landmarks = transform.to_landmarks(&[[5.0, 5.0, 1.0]]);
        assert_eq!(landmarks[0].x, 0.5);
        assert_eq!(landmarks[0].y, 0.5);
    }

    #[test]
    fn crop_samples_frame_pixels() {
        let frame = Frame::filled(16, 16, [255, 0, 0]);
        let (tensor, _) = prepare_rotated_crop(&frame, (8.0, 8.0), 4.0, 0.3, 4).expect("crop");
        assert_eq!(tensor.shape(), &[1, 4, 4, 3]);
        assert!((tensor[[0, 1, 1, 0]] - 1.0).abs() < 1e-5);
        assert_eq!(tensor[[0, 1, 1, 1]], 0.0);
    }

    #[test]
    fn nms_suppresses_overlaps_and_honours_top_k() {
        let boxes = [
            [0.0, 0.0, 10.0, 10.0],
            [1.0, 1.0, 11.0, 11.0],
            [20.0, 20.0, 30.0, 30.0],
            [40.0, 40.0, 50.0, 50.0],
        ];
        let scores = [0.8, 0.9, 0.7, 0.6];
        assert_eq!(nms(&boxes, &scores, 0.3, 8), vec![1, 2, 3]);
        assert_eq!(nms(&boxes, &scores, 0.3, 2), vec![1, 2]);
    }

    #[test]
    fn iou_of_disjoint_and_identical_boxes() {
        let a = [0.0, 0.0, 2.0, 2.0];
        assert_eq!(iou(&a, &[5.0, 5.0, 6.0, 6.0]), 0.0);
        assert_eq!(iou(&a, &a), 1.0);
    }
}
