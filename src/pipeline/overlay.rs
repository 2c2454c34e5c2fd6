use super::{
    draw::{draw_circle, draw_line, draw_rect},
    triangulate::delaunay_edges,
};
use crate::types::{FaceDetection, FaceMesh, Frame, HandObservation, OverlayLabel};

pub const HAND_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// Faces must score strictly above this to get a box and label.
pub const FACE_BOX_CONFIDENCE: f32 = 0.9;

const WHITE: [u8; 3] = [255, 255, 255];
const HAND_POINT_COLOR: [u8; 3] = [127, 0, 255];
const HAND_POINT_RADIUS: i32 = 4;
const HAND_LINE_THICKNESS: i32 = 2;
const FACE_BOX_COLOR: [u8; 3] = [255, 0, 0];
const FACE_BOX_THICKNESS: i32 = 3;
const FACE_LABEL_COLOR: [u8; 3] = [0, 0, 255];
const FACE_LABEL_OFFSET: i32 = 10;
const MESH_POINT_COLOR: [u8; 3] = [0, 255, 0];
const MESH_POINT_RADIUS: i32 = 1;
const MESH_LINE_THICKNESS: i32 = 1;

pub fn draw_hand(frame: &mut Frame, hand: &HandObservation) {
    let points: Vec<(f32, f32)> = hand
        .landmarks
        .iter()
        .map(|l| l.to_pixel(frame.width, frame.height))
        .collect();

    for &(a, b) in HAND_CONNECTIONS {
        if let (Some(&pa), Some(&pb)) = (points.get(a), points.get(b)) {
            draw_line(frame, pa, pb, WHITE, HAND_LINE_THICKNESS);
        }
    }
    for &(x, y) in &points {
        draw_circle(frame, (x as i32, y as i32), HAND_POINT_RADIUS, HAND_POINT_COLOR);
    }
}

pub fn face_label_text(score: f32) -> String {
    format!("Face & Conf: {:.2}%", score * 100.0)
}

/// Draws the box for a confident face and returns its label, or `None` when
/// the face is at or below [`FACE_BOX_CONFIDENCE`].
pub fn draw_face_box(frame: &mut Frame, face: &FaceDetection) -> Option<OverlayLabel> {
    if face.score <= FACE_BOX_CONFIDENCE {
        return None;
    }

    let (w, h) = (frame.width as f32, frame.height as f32);
    let x = (face.bbox.xmin * w) as i32;
    let y = (face.bbox.ymin * h) as i32;
    let bw = (face.bbox.width * w) as i32;
    let bh = (face.bbox.height * h) as i32;

    draw_rect(frame, x, y, x + bw, y + bh, FACE_BOX_COLOR, FACE_BOX_THICKNESS);

    Some(OverlayLabel {
        text: face_label_text(face.score),
        x,
        y: y - FACE_LABEL_OFFSET,
        color: FACE_LABEL_COLOR,
    })
}

pub fn draw_face_mesh(frame: &mut Frame, mesh: &FaceMesh) {
    let points: Vec<(f32, f32)> = mesh
        .landmarks
        .iter()
        .map(|l| l.to_pixel(frame.width, frame.height))
        .collect();

    for (a, b) in delaunay_edges(&points) {
        draw_line(frame, points[a], points[b], WHITE, MESH_LINE_THICKNESS);
    }
    for &(x, y) in &points {
        draw_circle(frame, (x as i32, y as i32), MESH_POINT_RADIUS, MESH_POINT_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gesture::fixtures::pinky_hand,
        types::{Landmark, RelativeBoundingBox},
    };

    const BLACK: [u8; 3] = [0, 0, 0];

    fn face(score: f32) -> FaceDetection {
        FaceDetection {
            score,
            bbox: RelativeBoundingBox {
                xmin: 0.25,
                ymin: 0.25,
                width: 0.5,
                height: 0.5,
            },
        }
    }

    fn count_color(frame: &Frame, color: [u8; 3]) -> usize {
        frame.rgb.chunks_exact(3).filter(|px| **px == color).count()
    }

    #[test]
    fn confident_face_gets_box_and_label() {
        let mut frame = Frame::filled(40, 40, BLACK);
        let label = draw_face_box(&mut frame, &face(0.95)).expect("label for confident face");

        assert!(label.text.contains("95.00%"), "label was {:?}", label.text);
        assert_eq!(label.text, "Face & Conf: 95.00%");
        assert_eq!((label.x, label.y), (10, 0));
        assert_eq!(frame.pixel(10, 10), Some(FACE_BOX_COLOR));
        assert_eq!(frame.pixel(30, 20), Some(FACE_BOX_COLOR));
        assert_eq!(frame.pixel(20, 20), Some(BLACK));
    }

    #[test]
    fn low_confidence_face_draws_nothing() {
        let mut frame = Frame::filled(40, 40, BLACK);
        assert!(draw_face_box(&mut frame, &face(0.85)).is_none());
        assert_eq!(count_color(&frame, FACE_BOX_COLOR), 0);
    }

    #[test]
    fn threshold_itself_is_excluded() {
        let mut frame = Frame::filled(40, 40, BLACK);
        assert!(draw_face_box(&mut frame, &face(0.90)).is_none());
        assert_eq!(count_color(&frame, FACE_BOX_COLOR), 0);

        assert!(draw_face_box(&mut frame, &face(0.9001)).is_some());
        assert!(count_color(&frame, FACE_BOX_COLOR) > 0);
    }

    #[test]
    fn label_rounds_to_two_decimals() {
        assert_eq!(face_label_text(0.98766), "Face & Conf: 98.77%");
        assert_eq!(face_label_text(1.0), "Face & Conf: 100.00%");
    }

    #[test]
    fn hand_skeleton_uses_two_tones() {
        let mut frame = Frame::filled(100, 100, BLACK);
        draw_hand(&mut frame, &pinky_hand());
        assert!(count_color(&frame, HAND_POINT_COLOR) > 0);
        assert!(count_color(&frame, WHITE) > 0);
    }

    #[test]
    fn mesh_draws_edges_and_points() {
        let mut frame = Frame::filled(50, 50, BLACK);
        let mesh = FaceMesh {
            landmarks: vec![
                Landmark::new(0.1, 0.1),
                Landmark::new(0.9, 0.1),
                Landmark::new(0.5, 0.9),
                Landmark::new(0.5, 0.4),
            ],
        };
        draw_face_mesh(&mut frame, &mesh);
        assert_eq!(frame.pixel(25, 20), Some(MESH_POINT_COLOR));
        // Midpoint of the top edge is covered by the wireframe.
        assert_eq!(frame.pixel(25, 5), Some(WHITE));
    }
}
