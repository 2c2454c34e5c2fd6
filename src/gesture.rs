use crate::types::{FingerExtension, HAND_LANDMARKS, HandObservation};

const THUMB_TIP: usize = 4;
const THUMB_IP: usize = 3;

/// (tip, pip) landmark pairs for index, middle, ring and pinky.
const FINGER_JOINTS: [(usize, usize); 4] = [(8, 6), (12, 10), (16, 14), (20, 18)];

/// The thumb test compares x coordinates, which only reads correctly for a
/// right hand with its palm towards a mirrored camera image. A left hand, or
/// an unmirrored feed, reports the thumb inverted.
pub const THUMB_ASSUMES_MIRRORED_VIEW: bool = true;

/// Reports which fingers of `hand` are extended.
///
/// The four fingers are extended when the tip sits above (smaller y than) the
/// second joint. The thumb is extended when its tip lies left of the joint
/// below it, see [`THUMB_ASSUMES_MIRRORED_VIEW`].
pub fn classify_fingers(hand: &HandObservation) -> FingerExtension {
    let points = &hand.landmarks;
    if points.len() < HAND_LANDMARKS {
        return FingerExtension::default();
    }

    let mut flags = [false; 5];
    flags[0] = points[THUMB_TIP].x < points[THUMB_IP].x;
    for (slot, &(tip, pip)) in flags[1..].iter_mut().zip(FINGER_JOINTS.iter()) {
        *slot = points[tip].y < points[pip].y;
    }

    FingerExtension::from_array(flags)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{HAND_LANDMARKS, HandObservation, Landmark};

    /// A hand with every finger folded: tips below their joints and the
    /// thumb tip right of its joint.
    pub fn folded_hand() -> HandObservation {
        let mut points = vec![Landmark::new(0.5, 0.8); HAND_LANDMARKS];
        points[3] = Landmark::new(0.40, 0.60);
        points[4] = Landmark::new(0.45, 0.62);
        for (tip, pip) in [(8, 6), (12, 10), (16, 14), (20, 18)] {
            points[pip] = Landmark::new(0.5, 0.5);
            points[tip] = Landmark::new(0.5, 0.6);
        }
        HandObservation::new(points)
    }

    pub fn hand_with(extended: &[usize]) -> HandObservation {
        let mut hand = folded_hand();
        for &tip in extended {
            if tip == 4 {
                hand.landmarks[4].x = 0.30;
            } else {
                hand.landmarks[tip].y = 0.2;
            }
        }
        hand
    }

    pub fn pinky_hand() -> HandObservation {
        hand_with(&[20])
    }

    pub fn index_hand() -> HandObservation {
        hand_with(&[8])
    }
}
