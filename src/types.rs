use std::time::Instant;

/// Number of landmarks in one hand observation.
pub const HAND_LANDMARKS: usize = 21;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgb: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgb,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// A frame filled with a single color.
    #[cfg(test)]
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            rgb.extend_from_slice(&color);
        }
        Self::new(rgb, width, height)
    }

    pub fn expected_len(width: u32, height: u32) -> usize {
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(3)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.rgb.get(idx..idx + 3).map(|px| [px[0], px[1], px[2]])
    }
}

/// A point normalized to the frame: x and y in [0, 1], z relative depth.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn to_pixel(self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

#[derive(Clone, Debug)]
pub struct HandObservation {
    pub landmarks: Vec<Landmark>,
}

impl HandObservation {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }
}

/// Which fingers of one hand are extended, thumb first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerExtension {
    flags: [bool; 5],
}

impl FingerExtension {
    pub fn from_array(flags: [bool; 5]) -> Self {
        Self { flags }
    }

    #[cfg(test)]
    pub fn as_array(&self) -> [bool; 5] {
        self.flags
    }

    pub fn index(&self) -> bool {
        self.flags[1]
    }

    pub fn pinky(&self) -> bool {
        self.flags[4]
    }
}

/// Bounding box as fractions of the frame size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RelativeBoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub score: f32,
    pub bbox: RelativeBoundingBox,
}

#[derive(Clone, Debug)]
pub struct FaceMesh {
    pub landmarks: Vec<Landmark>,
}

/// Text drawn over the video by the display surface.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLabel {
    pub text: String,
    /// Left end of the text baseline, in frame pixels.
    pub x: i32,
    pub y: i32,
    pub color: [u8; 3],
}

#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub frame: Frame,
    pub labels: Vec<OverlayLabel>,
}
