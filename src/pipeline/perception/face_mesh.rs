use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::common::{decode_points, prepare_rotated_crop, sigmoid};
use crate::types::{FaceDetection, FaceMesh, Frame};

pub const FACE_MESH_INPUT_SIZE: u32 = 192;
/// Points of the base mesh; the attention variant appends iris points.
pub const FACE_MESH_BASE_LANDMARKS: usize = 468;
/// The crop around a detected face is this much larger than its box.
const FACE_CROP_SCALE: f32 = 1.5;

pub struct FaceMeshEstimator {
    session: Session,
    presence_threshold: f32,
    refine_landmarks: bool,
}

impl FaceMeshEstimator {
    pub fn new(model_path: &Path, presence_threshold: f32, refine_landmarks: bool) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load face mesh model from {}", model_path.display())
            })?;

        Ok(Self {
            session,
            presence_threshold,
            refine_landmarks,
        })
    }

    /// Estimates one mesh per face, skipping crops the model rejects.
    pub fn estimate(&mut self, frame: &Frame, faces: &[FaceDetection]) -> Result<Vec<FaceMesh>> {
        let mut meshes = Vec::with_capacity(faces.len());

        for face in faces {
            let (center, side) = face_crop(face, frame.width, frame.height);
            let (input, transform) =
                prepare_rotated_crop(frame, center, side, 0.0, FACE_MESH_INPUT_SIZE)?;
            let tensor = Tensor::from_array(input)?;
            let outputs = self
                .session
                .run(ort::inputs![tensor])
                .context("failed to run face mesh session")?;

            if outputs.len() < 2 {
                return Err(anyhow!(
                    "face mesh model returned {} outputs, expected at least 2",
                    outputs.len()
                ));
            }

            let coords = outputs[0].try_extract_array::<f32>()?;
            let flattened: Vec<f32> = coords.iter().copied().collect();
            let mut points = decode_points(&flattened, FACE_MESH_BASE_LANDMARKS)?;
            if !self.refine_landmarks {
                points.truncate(FACE_MESH_BASE_LANDMARKS);
            }

            let presence = outputs[1]
                .try_extract_array::<f32>()?
                .iter()
                .next()
                .copied()
                .map(sigmoid)
                .unwrap_or(0.0);
            if presence < self.presence_threshold {
                log::trace!("dropping face mesh with presence {presence:.3}");
                continue;
            }

            meshes.push(FaceMesh {
                landmarks: transform.to_landmarks(&points),
            });
        }

        Ok(meshes)
    }
}

/// Square crop centered on the face box, in frame pixels.
pub fn face_crop(face: &FaceDetection, width: u32, height: u32) -> ((f32, f32), f32) {
    let (w, h) = (width as f32, height as f32);
    let bw = face.bbox.width * w;
    let bh = face.bbox.height * h;
    let center = (face.bbox.xmin * w + bw / 2.0, face.bbox.ymin * h + bh / 2.0);
    (center, bw.max(bh) * FACE_CROP_SCALE)
}
