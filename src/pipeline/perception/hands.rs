use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    common::{decode_points, prepare_rotated_crop},
    palm::{PalmDetector, crop_from_palm},
};
use crate::types::{Frame, HAND_LANDMARKS, HandObservation};

pub const HANDPOSE_INPUT_SIZE: u32 = 224;

/// Palm detection followed by per-palm landmark regression.
pub struct HandTracker {
    handpose: Session,
    palm_detector: PalmDetector,
    tracking_confidence: f32,
}

impl HandTracker {
    pub fn new(
        handpose_model_path: &Path,
        palm_model_path: &Path,
        detection_confidence: f32,
        tracking_confidence: f32,
        max_hands: usize,
    ) -> Result<Self> {
        let handpose = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(handpose_model_path)
            .with_context(|| {
                format!(
                    "failed to load handpose estimator from {}",
                    handpose_model_path.display()
                )
            })?;

        let palm_detector = PalmDetector::new(palm_model_path, detection_confidence, max_hands)?;

        Ok(Self {
            handpose,
            palm_detector,
            tracking_confidence,
        })
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>> {
        let palms = self.palm_detector.detect(frame)?;
        let mut hands = Vec::with_capacity(palms.len());

        for palm in &palms {
            let (center, side, angle) = crop_from_palm(palm);
            let (input, transform) =
                prepare_rotated_crop(frame, center, side, angle, HANDPOSE_INPUT_SIZE)?;
            let tensor = Tensor::from_array(input)?;
            let outputs = self
                .handpose
                .run(ort::inputs![tensor])
                .context("failed to run handpose session")?;

            if outputs.len() < 1 {
                return Err(anyhow!("handpose model returned no outputs"));
            }

            let coords = outputs[0].try_extract_array::<f32>()?;
            let flattened: Vec<f32> = coords.iter().copied().collect();
            let mut points = decode_points(&flattened, HAND_LANDMARKS)?;
            points.truncate(HAND_LANDMARKS);

            let presence = if outputs.len() > 1 {
                outputs[1]
                    .try_extract_array::<f32>()
                    .ok()
                    .and_then(|arr| arr.iter().next().copied())
                    .unwrap_or(0.0)
            } else {
                palm.score
            };

            if presence < self.tracking_confidence {
                log::trace!("dropping hand with presence {presence:.3}");
                continue;
            }

            hands.push(HandObservation::new(transform.to_landmarks(&points)));
        }

        Ok(hands)
    }
}
