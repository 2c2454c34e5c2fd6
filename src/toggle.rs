use crate::{
    gesture::classify_fingers,
    types::{FingerExtension, HandObservation},
};

pub const INITIAL_STATUS: &str =
    "🖐 Use Pinky finger to enable face detection, Index finger to disable it";
pub const PINKY_STATUS: &str = "🌸 Pinky Finger Detected → Face Detection ON";
pub const INDEX_STATUS: &str = "☝️ Index Finger Detected → Face Detection OFF";
pub const STARTING_STATUS: &str = "🎥 Starting video...";
pub const STOPPED_STATUS: &str = "⏸ Video stopped.";

/// Whether face overlays are computed and drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectionState {
    #[default]
    Disabled,
    Enabled,
}

impl DetectionState {
    pub fn is_enabled(self) -> bool {
        self == DetectionState::Enabled
    }

    pub fn label(self) -> &'static str {
        match self {
            DetectionState::Disabled => "Face detection OFF",
            DetectionState::Enabled => "Face detection ON",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleSignal {
    Enable,
    Disable,
}

impl ToggleSignal {
    /// Pinky wins over index; anything else carries no signal.
    pub fn from_fingers(fingers: &FingerExtension) -> Option<Self> {
        if fingers.pinky() {
            Some(ToggleSignal::Enable)
        } else if fingers.index() {
            Some(ToggleSignal::Disable)
        } else {
            None
        }
    }

    pub fn target(self) -> DetectionState {
        match self {
            ToggleSignal::Enable => DetectionState::Enabled,
            ToggleSignal::Disable => DetectionState::Disabled,
        }
    }

    pub fn status_text(self) -> &'static str {
        match self {
            ToggleSignal::Enable => PINKY_STATUS,
            ToggleSignal::Disable => INDEX_STATUS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleUpdate {
    pub state: DetectionState,
    /// The signal that decided this cycle, if any hand gave one.
    pub signal: Option<ToggleSignal>,
}

impl ToggleUpdate {
    pub fn status_text(&self) -> Option<&'static str> {
        self.signal.map(ToggleSignal::status_text)
    }

    pub fn changed_from(&self, previous: DetectionState) -> bool {
        self.state != previous
    }
}

/// Applies one cycle's hands to `state`.
///
/// Hands are visited in detection order and the first one that shows a
/// signal decides the cycle; later hands are ignored, so the state moves at
/// most once per cycle.
pub fn apply_hands(state: DetectionState, hands: &[HandObservation]) -> ToggleUpdate {
    let signal = hands
        .iter()
        .find_map(|hand| ToggleSignal::from_fingers(&classify_fingers(hand)));

    ToggleUpdate {
        state: signal.map(ToggleSignal::target).unwrap_or(state),
        signal,
    }
}
