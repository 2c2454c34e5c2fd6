use std::{f32::consts::PI, path::Path};

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    anchors::palm_anchors,
    common::{LetterboxInfo, clamp_box, letterbox, nhwc_unit_tensor, nms, sigmoid},
};
use crate::types::Frame;

pub const PALM_INPUT_SIZE: u32 = 192;
const PALM_KEYPOINTS: usize = 7;
const PALM_NMS_THRESHOLD: f32 = 0.3;

/// One palm found by the detector, in frame pixels.
#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub keypoints: Vec<(f32, f32)>,
    pub score: f32,
}

pub struct PalmDetector {
    session: Session,
    anchors: Vec<[f32; 2]>,
    score_threshold: f32,
    max_palms: usize,
}

impl PalmDetector {
    pub fn new(model_path: &Path, score_threshold: f32, max_palms: usize) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load palm detector from {}", model_path.display())
            })?;

        Ok(Self {
            session,
            anchors: palm_anchors(),
            score_threshold,
            max_palms,
        })
    }

    /// Palms in descending score order, at most `max_palms`.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>> {
        let (canvas, letterbox) = letterbox(frame, PALM_INPUT_SIZE)?;
        let tensor = Tensor::from_array(nhwc_unit_tensor(&canvas, PALM_INPUT_SIZE)?)?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run palm detector session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "palm detector returned {} outputs, expected at least 2",
                outputs.len()
            ));
        }

        let boxes = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let feature_dim = *boxes
            .shape()
            .last()
            .ok_or_else(|| anyhow!("missing feature dimension in palm box shape"))?;
        let boxes: Vec<f32> = boxes.iter().copied().collect();
        let scores: Vec<f32> = scores.iter().copied().collect();

        let candidates = decode_palms(
            &boxes,
            feature_dim,
            &scores,
            &self.anchors,
            &letterbox,
            self.score_threshold,
        )?;

        let bboxes: Vec<[f32; 4]> = candidates.iter().map(|c| c.bbox).collect();
        let confidences: Vec<f32> = candidates.iter().map(|c| c.score).collect();
        let kept = nms(&bboxes, &confidences, PALM_NMS_THRESHOLD, self.max_palms);

        Ok(kept.into_iter().map(|idx| candidates[idx].clone()).collect())
    }
}

/// Decodes raw regressor output (`[cx, cy, w, h, kx0, ky0, ...]` per anchor,
/// in input pixels) and logit scores into frame-space palms.
pub fn decode_palms(
    boxes: &[f32],
    feature_dim: usize,
    scores: &[f32],
    anchors: &[[f32; 2]],
    letterbox: &LetterboxInfo,
    score_threshold: f32,
) -> Result<Vec<PalmRegion>> {
    if feature_dim < 4 + PALM_KEYPOINTS * 2 {
        return Err(anyhow!("palm box feature dimension too small: {feature_dim}"));
    }

    let input = PALM_INPUT_SIZE as f32;
    let count = anchors
        .len()
        .min(scores.len())
        .min(boxes.len() / feature_dim);

    let mut palms = Vec::new();
    for (idx, anchor) in anchors.iter().enumerate().take(count) {
        let score = sigmoid(scores[idx]);
        if score < score_threshold {
            continue;
        }

        let raw = &boxes[idx * feature_dim..(idx + 1) * feature_dim];
        let cx = raw[0] + anchor[0] * input;
        let cy = raw[1] + anchor[1] * input;
        let (hw, hh) = (raw[2] / 2.0, raw[3] / 2.0);

        let (x1, y1) = letterbox.to_frame(cx - hw, cy - hh);
        let (x2, y2) = letterbox.to_frame(cx + hw, cy + hh);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        let keypoints = (0..PALM_KEYPOINTS)
            .map(|k| {
                let kx = raw[4 + k * 2] + anchor[0] * input;
                let ky = raw[4 + k * 2 + 1] + anchor[1] * input;
                letterbox.to_frame(kx, ky)
            })
            .collect();

        palms.push(PalmRegion {
            bbox: clamp_box([x1, y1, x2, y2], letterbox.orig_w, letterbox.orig_h),
            keypoints,
            score,
        });
    }

    Ok(palms)
}

/// Center, side and rotation of the square the hand landmark model sees.
pub fn crop_from_palm(region: &PalmRegion) -> ((f32, f32), f32, f32) {
    let center = if region.keypoints.is_empty() {
        (
            (region.bbox[0] + region.bbox[2]) * 0.5,
            (region.bbox[1] + region.bbox[3]) * 0.5,
        )
    } else {
        let (sum_x, sum_y) = region
            .keypoints
            .iter()
            .fold((0.0_f32, 0.0_f32), |acc, p| (acc.0 + p.0, acc.1 + p.1));
        let n = region.keypoints.len() as f32;
        (sum_x / n, sum_y / n)
    };

    let base = (region.bbox[2] - region.bbox[0])
        .abs()
        .max((region.bbox[3] - region.bbox[1]).abs());
    let span = keypoint_span(&region.keypoints);
    // Expand generously to avoid cropping fingers away.
    let side = base.max(span).max(80.0) * 2.4;

    (center, side, estimate_orientation(region))
}

fn keypoint_span(points: &[(f32, f32)]) -> f32 {
    if points.is_empty() {
        return 0.0;
    }
    let (min_x, max_x, min_y, max_y) = points
        .iter()
        .fold((f32::MAX, f32::MIN, f32::MAX, f32::MIN), |acc, (x, y)| {
            (acc.0.min(*x), acc.1.max(*x), acc.2.min(*y), acc.3.max(*y))
        });
    (max_x - min_x).max(max_y - min_y)
}

/// Principal axis of the palm keypoints, rotated so fingers point up.
fn estimate_orientation(region: &PalmRegion) -> f32 {
    let points = &region.keypoints;
    if points.len() < 2 {
        return 0.0;
    }

    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0_f32, 0.0_f32), |acc, (x, y)| (acc.0 + x, acc.1 + y));
    let mean = (sx / n, sy / n);

    let (mut cov_xx, mut cov_xy, mut cov_yy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let dx = x - mean.0;
        let dy = y - mean.1;
        cov_xx += dx * dx;
        cov_xy += dx * dy;
        cov_yy += dy * dy;
    }
    cov_xx /= n;
    cov_xy /= n;
    cov_yy /= n;

    let trace = cov_xx + cov_yy;
    let det = cov_xx * cov_yy - cov_xy * cov_xy;
    let lambda = (trace * 0.5 + ((trace * 0.5).powi(2) - det).max(0.0).sqrt()).max(1e-6);
    let (vx, vy) = if cov_xy.abs() > 1e-6 {
        (lambda - cov_yy, cov_xy)
    } else if cov_xx >= cov_yy {
        (1.0, 0.0)
    } else {
        (0.0, 1.0)
    };

    vy.atan2(vx) - PI * 0.5
}
