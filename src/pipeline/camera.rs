use thiserror::Error;

use crate::types::Frame;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera has been released")]
    Released,
    #[error("camera frame read failed: {0}")]
    Read(String),
    #[error("failed to decode camera frame: {0}")]
    Decode(String),
}

/// Where frames come from. One frame per call, no buffering.
pub trait CaptureSource {
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;
    /// Closes the device. Reads after release fail with [`CaptureError::Released`].
    fn release(&mut self);
}

impl<T: CaptureSource + ?Sized> CaptureSource for Box<T> {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).read_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Opens the system's default camera.
#[cfg(feature = "camera-nokhwa")]
pub fn open_default_camera() -> anyhow::Result<Box<dyn CaptureSource>> {
    Ok(Box::new(NokhwaCapture::open_default()?))
}

#[cfg(not(feature = "camera-nokhwa"))]
pub fn open_default_camera() -> anyhow::Result<Box<dyn CaptureSource>> {
    anyhow::bail!("built without camera support (enable the `camera-nokhwa` feature)")
}

#[cfg(feature = "camera-nokhwa")]
pub use native::NokhwaCapture;

#[cfg(feature = "camera-nokhwa")]
mod native {
    use anyhow::{Result, anyhow};
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        utils::{CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    };

    use super::{CaptureError, CaptureSource};
    use crate::pipeline::rgb_converter::{self, PixelFormat};
    use crate::types::Frame;

    // Prefer pixel formats that are widely supported on macOS (the built-in cameras
    // often reject YUYV even though Nokhwa reports it).
    const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
        FrameFormat::RAWRGB,
        FrameFormat::RAWBGR,
        FrameFormat::GRAY,
        FrameFormat::YUYV,
        FrameFormat::NV12,
        FrameFormat::MJPEG,
    ];

    fn requested_formats() -> [RequestedFormat<'static>; 4] {
        [
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestFrameRate,
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::with_formats(
                RequestedFormatType::AbsoluteHighestResolution,
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    fn build_camera(index: CameraIndex) -> Result<Camera> {
        let mut last_err = None;

        for requested in requested_formats() {
            match Camera::new(index.clone(), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => return Ok(camera),
                    Err(err) => last_err = Some(err.into()),
                },
                Err(err) => last_err = Some(err.into()),
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
    }

    /// The system camera, read synchronously on the caller's thread.
    pub struct NokhwaCapture {
        camera: Option<Camera>,
    }

    impl NokhwaCapture {
        /// Opens the default camera (index 0).
        pub fn open_default() -> Result<Self> {
            Self::open(CameraIndex::Index(0))
        }

        pub fn open(index: CameraIndex) -> Result<Self> {
            let camera = build_camera(index.clone())?;
            let format = camera.camera_format();
            log::info!(
                "camera {index} opened: {}x{} {:?} @ {} fps",
                format.width(),
                format.height(),
                format.format(),
                format.frame_rate()
            );
            Ok(Self {
                camera: Some(camera),
            })
        }
    }

    impl CaptureSource for NokhwaCapture {
        fn read_frame(&mut self) -> Result<Frame, CaptureError> {
            let camera = self.camera.as_mut().ok_or(CaptureError::Released)?;
            let buffer = camera
                .frame()
                .map_err(|err| CaptureError::Read(err.to_string()))?;

            let resolution = buffer.resolution();
            rgb_converter::convert_to_frame(
                PixelFormat::from(buffer.source_frame_format()),
                buffer.buffer(),
                resolution.width_x,
                resolution.height_y,
            )
            .map_err(|err| CaptureError::Decode(format!("{err:#}")))
        }

        fn release(&mut self) {
            if let Some(mut camera) = self.camera.take() {
                if let Err(err) = camera.stop_stream() {
                    log::warn!("failed to stop camera stream: {err}");
                }
                log::info!("camera released");
            }
        }
    }

    impl Drop for NokhwaCapture {
        fn drop(&mut self) {
            self.release();
        }
    }
}
