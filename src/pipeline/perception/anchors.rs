/// SSD anchor centers for a square detector input, as fractions of the input.
///
/// Consecutive layers sharing a stride are merged onto one feature map, each
/// layer contributing two anchors per cell (its own scale plus the
/// interpolated one). Anchor sizes are fixed at 1.0, so only centers matter.
pub fn ssd_anchor_centers(input_size: u32, strides: &[u32]) -> Vec<[f32; 2]> {
    let mut anchors = Vec::new();
    let mut layer = 0;

    while layer < strides.len() {
        let stride = strides[layer];
        let mut same_stride = 0;
        while layer + same_stride < strides.len() && strides[layer + same_stride] == stride {
            same_stride += 1;
        }
        let per_cell = same_stride * 2;

        let grid = input_size.div_ceil(stride);
        for y in 0..grid {
            for x in 0..grid {
                let center = [
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                ];
                anchors.extend(std::iter::repeat_n(center, per_cell));
            }
        }

        layer += same_stride;
    }

    anchors
}

/// Anchors of the 192x192 MediaPipe palm detector.
pub fn palm_anchors() -> Vec<[f32; 2]> {
    ssd_anchor_centers(192, &[8, 16, 16, 16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palm_detector_has_2016_anchors() {
        let anchors = palm_anchors();
        assert_eq!(anchors.len(), 2016);
        assert_eq!(anchors[0], [0.5 / 24.0, 0.5 / 24.0]);
        assert_eq!(anchors[1], anchors[0]);
        assert_eq!(anchors[2], [1.5 / 24.0, 0.5 / 24.0]);
        // First anchor of the stride-16 map.
        assert_eq!(anchors[1152], [0.5 / 12.0, 0.5 / 12.0]);
        assert_eq!(anchors[2015], [11.5 / 12.0, 11.5 / 12.0]);
    }

    #[test]
    fn blazeface_layout_has_896_anchors() {
        assert_eq!(ssd_anchor_centers(128, &[8, 16, 16, 16]).len(), 896);
    }
}
