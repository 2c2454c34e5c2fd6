use crate::{
    pipeline::{CaptureSource, PerceptionAdapter, process_frame},
    toggle::{DetectionState, INITIAL_STATUS, STARTING_STATUS, STOPPED_STATUS},
    types::RenderedFrame,
};

/// Owns the camera, the perception backend and the toggle state, and runs
/// one capture-process-render cycle at a time.
pub struct CycleDriver<C: CaptureSource, P: PerceptionAdapter> {
    capture: C,
    perception: P,
    state: DetectionState,
    running: bool,
    released: bool,
    status: &'static str,
}

impl<C: CaptureSource, P: PerceptionAdapter> CycleDriver<C, P> {
    pub fn new(capture: C, perception: P) -> Self {
        Self {
            capture,
            perception,
            state: DetectionState::default(),
            running: false,
            released: false,
            status: INITIAL_STATUS,
        }
    }

    /// Returns `true` when the caller should begin scheduling cycles.
    pub fn start(&mut self) -> bool {
        if self.running || self.released {
            return false;
        }
        self.running = true;
        self.status = STARTING_STATUS;
        log::info!("video started");
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.status = STOPPED_STATUS;
        log::info!("video stopped");
    }

    /// Stops and releases the camera. Safe to call more than once.
    pub fn exit(&mut self) {
        self.running = false;
        if !self.released {
            self.capture.release();
            self.released = true;
            log::info!("exiting, camera released");
        }
    }

    /// Runs one cycle. `None` when stopped or when no frame could be read.
    pub fn run_cycle(&mut self) -> Option<RenderedFrame> {
        if !self.running {
            return None;
        }

        let frame = match self.capture.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("skipping cycle: {err}");
                return None;
            }
        };

        let outcome = process_frame(frame, &mut self.perception, self.state);
        self.state = outcome.state;
        if let Some(status) = outcome.status {
            self.status = status;
        }

        Some(outcome.rendered)
    }

    pub fn status(&self) -> &'static str {
        self.status
    }

    pub fn detection_state(&self) -> DetectionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::{
        gesture::fixtures::{index_hand, pinky_hand},
        pipeline::{
            CaptureError,
            testing::{FakePerception, confident_face},
        },
        toggle::{INDEX_STATUS, PINKY_STATUS},
        types::Frame,
    };

    #[derive(Default)]
    struct FakeCapture {
        /// `None` entries simulate a failed read.
        script: VecDeque<Option<Frame>>,
        releases: usize,
    }

    impl FakeCapture {
        fn frames(count: usize) -> Self {
            Self {
                script: (0..count)
                    .map(|_| Some(Frame::filled(32, 24, [10, 20, 30])))
                    .collect(),
                releases: 0,
            }
        }
    }

    impl CaptureSource for FakeCapture {
        fn read_frame(&mut self) -> Result<Frame, CaptureError> {
            if self.releases > 0 {
                return Err(CaptureError::Released);
            }
            match self.script.pop_front() {
                Some(Some(frame)) => Ok(frame),
                Some(None) => Err(CaptureError::Read("device busy".into())),
                None => Err(CaptureError::Read("no more frames".into())),
            }
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    #[test]
    fn idle_driver_shows_instructions_and_renders_nothing() {
        let mut driver = CycleDriver::new(FakeCapture::frames(1), FakePerception::default());
        assert_eq!(driver.status(), INITIAL_STATUS);
        assert!(!driver.is_running());
        assert!(driver.run_cycle().is_none());
        assert_eq!(driver.perception.hand_calls, 0);
    }

    #[test]
    fn start_is_ignored_while_running() {
        let mut driver = CycleDriver::new(FakeCapture::frames(1), FakePerception::default());
        assert!(driver.start());
        assert_eq!(driver.status(), STARTING_STATUS);
        assert!(!driver.start());
        assert!(driver.is_running());
    }

    #[test]
    fn gestures_toggle_face_detection_across_cycles() {
        let perception =
            FakePerception::with_hands(vec![vec![pinky_hand()], vec![], vec![index_hand()]]);
        let mut driver = CycleDriver::new(FakeCapture::frames(3), perception);
        driver.perception.faces.push(confident_face());
        driver.start();

        let first = driver.run_cycle().expect("first frame");
        assert_eq!(driver.detection_state(), DetectionState::Enabled);
        assert_eq!(driver.status(), PINKY_STATUS);
        assert_eq!(first.labels.len(), 1);

        // No hands: state and status persist.
        let second = driver.run_cycle().expect("second frame");
        assert_eq!(driver.detection_state(), DetectionState::Enabled);
        assert_eq!(driver.status(), PINKY_STATUS);
        assert_eq!(second.labels.len(), 1);

        let third = driver.run_cycle().expect("third frame");
        assert_eq!(driver.detection_state(), DetectionState::Disabled);
        assert_eq!(driver.status(), INDEX_STATUS);
        assert!(third.labels.is_empty());
        assert_eq!(driver.perception.face_calls, 2);
    }

    #[test]
    fn failed_read_skips_the_cycle_but_keeps_running() {
        let capture = FakeCapture {
            script: VecDeque::from(vec![None, Some(Frame::filled(8, 8, [0, 0, 0]))]),
            releases: 0,
        };
        let mut driver = CycleDriver::new(capture, FakePerception::default());
        driver.start();

        assert!(driver.run_cycle().is_none());
        assert!(driver.is_running());
        assert_eq!(driver.status(), STARTING_STATUS);
        assert_eq!(driver.perception.hand_calls, 0);

        assert!(driver.run_cycle().is_some());
    }

    #[test]
    fn stop_halts_cycles_and_keeps_state() {
        let perception = FakePerception::with_hands(vec![vec![pinky_hand()]]);
        let mut driver = CycleDriver::new(FakeCapture::frames(2), perception);
        driver.start();
        driver.run_cycle();

        driver.stop();
        assert!(!driver.is_running());
        assert_eq!(driver.status(), STOPPED_STATUS);
        assert!(driver.run_cycle().is_none());
        assert_eq!(driver.detection_state(), DetectionState::Enabled);

        // Restart picks up where it left off.
        assert!(driver.start());
        assert!(driver.run_cycle().is_some());
        assert_eq!(driver.detection_state(), DetectionState::Enabled);
    }

    #[test]
    fn exit_releases_the_camera_once() {
        let mut driver = CycleDriver::new(FakeCapture::frames(2), FakePerception::default());
        driver.start();
        driver.exit();
        driver.exit();

        assert_eq!(driver.capture.releases, 1);
        assert!(!driver.is_running());
        assert!(driver.run_cycle().is_none());
        assert!(!driver.start());
    }
}
