//! Hand and face perception.
//!
//! [`PerceptionAdapter`] is the boundary the pipeline talks to; [`OrtPerception`]
//! implements it with ONNX Runtime sessions over the MediaPipe hand models, the
//! YuNet face detector and the MediaPipe face mesh.

pub mod anchors;
pub mod common;
pub mod face;
pub mod face_mesh;
pub mod hands;
pub mod palm;

use std::{path::PathBuf, time::Instant};

use anyhow::Result;

use crate::{
    model_download::{ModelKind, default_model_path},
    types::{FaceDetection, FaceMesh, Frame, HandObservation},
};
use face::FaceDetector;
use face_mesh::FaceMeshEstimator;
use hands::HandTracker;

/// Everything the per-frame pipeline needs from a perception backend.
pub trait PerceptionAdapter {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandObservation>>;
    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>>;
    fn detect_face_meshes(&mut self, frame: &Frame) -> Result<Vec<FaceMesh>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerceptionConfig {
    pub max_num_hands: usize,
    pub max_num_faces: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub refine_landmarks: bool,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            max_num_hands: 2,
            max_num_faces: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            refine_landmarks: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelPaths {
    pub palm_detector: PathBuf,
    pub handpose_estimator: PathBuf,
    pub face_detector: PathBuf,
    pub face_mesh: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            palm_detector: default_model_path(ModelKind::PalmDetector),
            handpose_estimator: default_model_path(ModelKind::HandposeEstimator),
            face_detector: default_model_path(ModelKind::FaceDetector),
            face_mesh: default_model_path(ModelKind::FaceMesh),
        }
    }
}

pub struct OrtPerception {
    hands: HandTracker,
    faces: FaceDetector,
    face_mesh: Option<FaceMeshEstimator>,
    last_faces: Option<(Instant, Vec<FaceDetection>)>,
}

impl OrtPerception {
    pub fn new(paths: &ModelPaths, config: &PerceptionConfig) -> Result<Self> {
        let hands = HandTracker::new(
            &paths.handpose_estimator,
            &paths.palm_detector,
            config.min_detection_confidence,
            config.min_tracking_confidence,
            config.max_num_hands,
        )?;
        let faces = FaceDetector::new(
            &paths.face_detector,
            config.min_detection_confidence,
            config.max_num_faces,
        )?;

        let face_mesh = if paths.face_mesh.exists() {
            Some(FaceMeshEstimator::new(
                &paths.face_mesh,
                config.min_tracking_confidence,
                config.refine_landmarks,
            )?)
        } else {
            log::warn!(
                "face mesh model not found at {}; meshes will not be drawn",
                paths.face_mesh.display()
            );
            None
        };

        log::info!(
            "perception ready (hands: {}, {}; faces: {})",
            paths.palm_detector.display(),
            paths.handpose_estimator.display(),
            paths.face_detector.display()
        );

        Ok(Self {
            hands,
            faces,
            face_mesh,
            last_faces: None,
        })
    }

    /// Faces of `frame`, reusing the previous detection when it ran on the
    /// same frame.
    fn faces_for(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>> {
        if let Some((timestamp, faces)) = &self.last_faces {
            if *timestamp == frame.timestamp {
                return Ok(faces.clone());
            }
        }

        let faces = self.faces.detect(frame)?;
        self.last_faces = Some((frame.timestamp, faces.clone()));
        Ok(faces)
    }
}

impl PerceptionAdapter for OrtPerception {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandObservation>> {
        self.hands.detect(frame)
    }

    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>> {
        self.faces_for(frame)
    }

    fn detect_face_meshes(&mut self, frame: &Frame) -> Result<Vec<FaceMesh>> {
        if self.face_mesh.is_none() {
            return Ok(Vec::new());
        }
        let faces = self.faces_for(frame)?;
        match self.face_mesh.as_mut() {
            Some(estimator) => estimator.estimate(frame, &faces),
            None => Ok(Vec::new()),
        }
    }
}
