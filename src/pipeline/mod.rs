pub mod camera;
pub mod draw;
pub mod overlay;
pub mod perception;
pub mod rgb_converter;
pub mod triangulate;

pub use camera::{CaptureError, CaptureSource, open_default_camera};
pub use perception::{ModelPaths, OrtPerception, PerceptionAdapter, PerceptionConfig};

use crate::{
    toggle::{DetectionState, apply_hands},
    types::{Frame, RenderedFrame},
};

/// Result of one pass over a captured frame.
#[derive(Debug)]
pub struct CycleOutcome {
    pub rendered: RenderedFrame,
    pub state: DetectionState,
    /// Set whenever a hand gave a decisive signal this cycle.
    pub status: Option<&'static str>,
}

/// Mirrors `frame`, runs perception on it, updates the toggle and draws the
/// overlays. Every model sees the mirrored frame before anything is drawn on
/// it. Faces and meshes are only queried while enabled. Perception failures
/// count as nothing observed.
pub fn process_frame<P: PerceptionAdapter>(
    mut frame: Frame,
    perception: &mut P,
    state: DetectionState,
) -> CycleOutcome {
    draw::mirror_horizontal(&mut frame);

    let hands = perception.detect_hands(&frame).unwrap_or_else(|err| {
        log::warn!("hand detection failed: {err:?}");
        Vec::new()
    });

    let update = apply_hands(state, &hands);
    if update.changed_from(state) {
        log::info!("face detection {}", update.state.label());
    }

    let (faces, meshes) = if update.state.is_enabled() {
        let faces = perception.detect_faces(&frame).unwrap_or_else(|err| {
            log::warn!("face detection failed: {err:?}");
            Vec::new()
        });
        let meshes = perception.detect_face_meshes(&frame).unwrap_or_else(|err| {
            log::warn!("face mesh estimation failed: {err:?}");
            Vec::new()
        });
        (faces, meshes)
    } else {
        (Vec::new(), Vec::new())
    };

    for hand in &hands {
        overlay::draw_hand(&mut frame, hand);
    }
    let labels = faces
        .iter()
        .filter_map(|face| overlay::draw_face_box(&mut frame, face))
        .collect();
    for mesh in &meshes {
        overlay::draw_face_mesh(&mut frame, mesh);
    }

    CycleOutcome {
        rendered: RenderedFrame { frame, labels },
        state: update.state,
        status: update.status_text(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakePerception, confident_face};
    use super::*;
    use crate::{
        gesture::fixtures::{folded_hand, index_hand, pinky_hand},
        toggle::{INDEX_STATUS, PINKY_STATUS},
        types::{FaceDetection, FaceMesh, Landmark, RelativeBoundingBox},
    };

    const BLACK: [u8; 3] = [0, 0, 0];
    const BOX_RED: [u8; 3] = [255, 0, 0];
    const MESH_GREEN: [u8; 3] = [0, 255, 0];

    fn frame() -> Frame {
        Frame::filled(40, 40, BLACK)
    }

    fn count_color(frame: &Frame, color: [u8; 3]) -> usize {
        frame.rgb.chunks_exact(3).filter(|px| *px == color).count()
    }

    fn triangle_mesh() -> FaceMesh {
        FaceMesh {
            landmarks: vec![
                Landmark::new(0.3, 0.3),
                Landmark::new(0.7, 0.3),
                Landmark::new(0.5, 0.7),
            ],
        }
    }

    #[test]
    fn disabled_state_never_queries_faces() {
        let mut perception = FakePerception::default();
        perception.faces.push(confident_face());

        let outcome = process_frame(frame(), &mut perception, DetectionState::Disabled);

        assert_eq!(outcome.state, DetectionState::Disabled);
        assert_eq!(outcome.status, None);
        assert!(outcome.rendered.labels.is_empty());
        assert_eq!(perception.face_calls, 0);
        assert_eq!(perception.mesh_calls, 0);
    }

    #[test]
    fn pinky_enables_and_draws_faces_in_the_same_cycle() {
        let mut perception = FakePerception::with_hands(vec![vec![pinky_hand()]]);
        perception.faces.push(confident_face());

        let outcome = process_frame(frame(), &mut perception, DetectionState::Disabled);

        assert_eq!(outcome.state, DetectionState::Enabled);
        assert_eq!(outcome.status, Some(PINKY_STATUS));
        assert_eq!(outcome.rendered.labels.len(), 1);
        assert_eq!(outcome.rendered.labels[0].text, "Face & Conf: 95.00%");
        assert_eq!(perception.face_calls, 1);
        assert_eq!(perception.mesh_calls, 1);
    }

    #[test]
    fn index_disables_before_faces_are_considered() {
        let mut perception = FakePerception::with_hands(vec![vec![index_hand()]]);
        perception.faces.push(confident_face());

        let outcome = process_frame(frame(), &mut perception, DetectionState::Enabled);

        assert_eq!(outcome.state, DetectionState::Disabled);
        assert_eq!(outcome.status, Some(INDEX_STATUS));
        assert!(outcome.rendered.labels.is_empty());
        assert_eq!(perception.face_calls, 0);
    }

    #[test]
    fn enabled_without_signal_keeps_state_and_status() {
        let mut perception = FakePerception::with_hands(vec![vec![folded_hand()]]);
        perception.faces = vec![
            confident_face(),
            FaceDetection {
                score: 0.85,
                bbox: RelativeBoundingBox {
                    xmin: 0.0,
                    ymin: 0.0,
                    width: 0.2,
                    height: 0.2,
                },
            },
        ];

        let outcome = process_frame(frame(), &mut perception, DetectionState::Enabled);

        assert_eq!(outcome.state, DetectionState::Enabled);
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.rendered.labels.len(), 1);
    }

    #[test]
    fn hand_failure_is_treated_as_no_hands() {
        let mut perception = FakePerception {
            fail_hands: true,
            ..Default::default()
        };

        let outcome = process_frame(frame(), &mut perception, DetectionState::Enabled);

        assert_eq!(outcome.state, DetectionState::Enabled);
        assert_eq!(outcome.status, None);
        assert_eq!(perception.face_calls, 1);
    }

    #[test]
    fn perception_sees_the_mirrored_frame() {
        let mut source = Frame::filled(2, 1, [0, 0, 0]);
        source.rgb[3..6].copy_from_slice(&[9, 9, 9]);
        let mut perception = FakePerception::default();

        let outcome = process_frame(source, &mut perception, DetectionState::Disabled);

        assert_eq!(perception.seen_first_pixel, vec![[9, 9, 9]]);
        assert_eq!(outcome.rendered.frame.pixel(0, 0), Some([9, 9, 9]));
    }

    #[test]
    fn face_models_see_the_frame_before_overlays() {
        let mut perception = FakePerception::with_hands(vec![vec![pinky_hand()]]);
        perception.faces.push(confident_face());
        perception.meshes.push(triangle_mesh());

        let outcome = process_frame(frame(), &mut perception, DetectionState::Disabled);

        assert_eq!(outcome.state, DetectionState::Enabled);
        assert_eq!(perception.face_frames.len(), 1);
        assert_eq!(perception.mesh_frames.len(), 1);
        for seen in perception.face_frames.iter().chain(&perception.mesh_frames) {
            assert_eq!(count_color(seen, BLACK), 40 * 40);
        }
        // The returned frame still carries every overlay.
        assert!(count_color(&outcome.rendered.frame, BOX_RED) > 0);
        assert!(count_color(&outcome.rendered.frame, MESH_GREEN) > 0);
        assert_ne!(outcome.rendered.frame.pixel(20, 32), Some(BLACK));
    }

    #[test]
    fn low_confidence_face_keeps_its_mesh_but_gets_no_box() {
        let mut perception = FakePerception::default();
        perception.faces.push(FaceDetection {
            score: 0.85,
            ..confident_face()
        });
        perception.meshes.push(triangle_mesh());

        let outcome = process_frame(frame(), &mut perception, DetectionState::Enabled);

        assert!(outcome.rendered.labels.is_empty());
        assert_eq!(count_color(&outcome.rendered.frame, BOX_RED), 0);
        assert!(count_color(&outcome.rendered.frame, MESH_GREEN) > 0);
    }
}
