use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::common::{LetterboxInfo, clamp_box, letterbox, nchw_bgr_tensor, nms};
use crate::types::{FaceDetection, Frame, RelativeBoundingBox};

pub const FACE_INPUT_SIZE: u32 = 640;
const FACE_STRIDES: [u32; 3] = [8, 16, 32];
const FACE_NMS_THRESHOLD: f32 = 0.3;

/// Raw YuNet head outputs for one stride, flattened row-major over the grid.
pub struct YunetHead<'a> {
    pub stride: u32,
    pub cls: &'a [f32],
    pub obj: &'a [f32],
    pub bbox: &'a [f32],
}

/// YuNet face detector over a letterboxed square input.
pub struct FaceDetector {
    session: Session,
    score_threshold: f32,
    max_faces: usize,
}

impl FaceDetector {
    pub fn new(model_path: &Path, score_threshold: f32, max_faces: usize) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load face detector from {}", model_path.display())
            })?;

        Ok(Self {
            session,
            score_threshold,
            max_faces,
        })
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>> {
        let (canvas, letterbox) = letterbox(frame, FACE_INPUT_SIZE)?;
        let tensor = Tensor::from_array(nchw_bgr_tensor(&canvas, FACE_INPUT_SIZE)?)?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run face detector session")?;

        // cls_8..32, obj_8..32, bbox_8..32, kps_8..32
        if outputs.len() < 9 {
            return Err(anyhow!(
                "face detector returned {} outputs, expected at least 9",
                outputs.len()
            ));
        }

        let mut flat = Vec::with_capacity(9);
        for idx in 0..9 {
            let array = outputs[idx].try_extract_array::<f32>()?;
            flat.push(array.iter().copied().collect::<Vec<f32>>());
        }

        let heads: Vec<YunetHead<'_>> = FACE_STRIDES
            .iter()
            .enumerate()
            .map(|(i, &stride)| YunetHead {
                stride,
                cls: &flat[i],
                obj: &flat[3 + i],
                bbox: &flat[6 + i],
            })
            .collect();

        Ok(decode_yunet(
            &heads,
            &letterbox,
            self.score_threshold,
            self.max_faces,
        ))
    }
}

/// Turns YuNet head outputs into relative face boxes, best first.
pub fn decode_yunet(
    heads: &[YunetHead<'_>],
    letterbox: &LetterboxInfo,
    score_threshold: f32,
    max_faces: usize,
) -> Vec<FaceDetection> {
    let mut boxes = Vec::new();
    let mut scores = Vec::new();

    for head in heads {
        let cols = FACE_INPUT_SIZE.div_ceil(head.stride) as usize;
        let stride = head.stride as f32;
        let cells = head
            .cls
            .len()
            .min(head.obj.len())
            .min(head.bbox.len() / 4);

        for idx in 0..cells {
            let score = (head.cls[idx].clamp(0.0, 1.0) * head.obj[idx].clamp(0.0, 1.0)).sqrt();
            if score < score_threshold {
                continue;
            }

            let (row, col) = ((idx / cols) as f32, (idx % cols) as f32);
            let raw = &head.bbox[idx * 4..idx * 4 + 4];
            let cx = (col + raw[0]) * stride;
            let cy = (row + raw[1]) * stride;
            let w = raw[2].exp() * stride;
            let h = raw[3].exp() * stride;

            let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);
            boxes.push(clamp_box(
                [x1, y1, x2, y2],
                letterbox.orig_w,
                letterbox.orig_h,
            ));
            scores.push(score);
        }
    }

    let (fw, fh) = (
        letterbox.orig_w.max(1) as f32,
        letterbox.orig_h.max(1) as f32,
    );
    nms(&boxes, &scores, FACE_NMS_THRESHOLD, max_faces)
        .into_iter()
        .map(|idx| {
            let [x1, y1, x2, y2] = boxes[idx];
            FaceDetection {
                score: scores[idx],
                bbox: RelativeBoundingBox {
                    xmin: x1 / fw,
                    ymin: y1 / fh,
                    width: (x2 - x1) / fw,
                    height: (y2 - y1) / fh,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letterbox_640() -> LetterboxInfo {
        LetterboxInfo {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_w: 640,
            orig_h: 640,
        }
    }

    fn stride_32_head(cells: &[(usize, f32, [f32; 4])]) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        let count = 20 * 20;
        let mut cls = vec![0.0; count];
        let mut obj = vec![0.0; count];
        let mut bbox = vec![0.0; count * 4];
        for &(idx, score, raw) in cells {
            cls[idx] = score;
            obj[idx] = score;
            bbox[idx * 4..idx * 4 + 4].copy_from_slice(&raw);
        }
        (cls, obj, bbox)
    }

    #[test]
    fn decodes_grid_cell_into_relative_box() {
        // Row 5, column 10 of the 20x20 stride-32 grid.
        let (cls, obj, bbox) =
            stride_32_head(&[(5 * 20 + 10, 0.96, [0.0, 0.0, 0.0, 2.0_f32.ln()])]);
        let heads = [YunetHead {
            stride: 32,
            cls: &cls,
            obj: &obj,
            bbox: &bbox,
        }];

        let faces = decode_yunet(&heads, &letterbox_640(), 0.5, 2);
        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert!((face.score - 0.96).abs() < 1e-5);
        // Center (320, 160), size 32x64.
        assert!((face.bbox.xmin - 304.0 / 640.0).abs() < 1e-5);
        assert!((face.bbox.ymin - 128.0 / 640.0).abs() < 1e-5);
        assert!((face.bbox.width - 32.0 / 640.0).abs() < 1e-5);
        assert!((face.bbox.height - 64.0 / 640.0).abs() < 1e-5);
    }

    #[test]
    fn keeps_best_faces_up_to_limit() {
        let (cls, obj, bbox) = stride_32_head(&[
            (0, 0.7, [0.5, 0.5, 0.0, 0.0]),
            (50, 0.9, [0.5, 0.5, 0.0, 0.0]),
            (100, 0.8, [0.5, 0.5, 0.0, 0.0]),
            (150, 0.3, [0.5, 0.5, 0.0, 0.0]),
        ]);
        let heads = [YunetHead {
            stride: 32,
            cls: &cls,
            obj: &obj,
            bbox: &bbox,
        }];

        let faces = decode_yunet(&heads, &letterbox_640(), 0.5, 2);
        let scores: Vec<f32> = faces.iter().map(|f| f.score).collect();
        assert_eq!(faces.len(), 2);
        assert!((scores[0] - 0.9).abs() < 1e-5);
        assert!((scores[1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn overlapping_candidates_collapse() {
        let (cls, obj, bbox) = stride_32_head(&[
            (210, 0.95, [0.0, 0.0, 1.0, 1.0]),
            (211, 0.93, [-0.1, 0.0, 1.0, 1.0]),
        ]);
        let heads = [YunetHead {
            stride: 32,
            cls: &cls,
            obj: &obj,
            bbox: &bbox,
        }];

        let faces = decode_yunet(&heads, &letterbox_640(), 0.5, 5);
        assert_eq!(faces.len(), 1);
    }
}
