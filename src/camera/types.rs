//! Camera settings and error taxonomy.

use std::path::PathBuf;

/// Settings for the camera-control subprocess.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Camera control binary to invoke
    pub program: String,
    /// Preview frames captured and discarded before one is trusted.
    ///
    /// The vendor streaming pipeline buffers frames; the first few
    /// previews after a pause lag behind the sensor, so only the last
    /// of N captures is kept.
    pub warmup_frames: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            program: "gphoto2".to_string(),
            warmup_frames: 5,
        }
    }
}

/// Errors that can occur while driving the camera.
///
/// At startup every one of these degrades the session to cameraless
/// mode instead of terminating.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// The gphoto2 binary is not installed
    #[error(
        "gphoto2 not found. Please install it with:\n\n    apt install gphoto2    (or: brew install gphoto2)\n"
    )]
    GphotoNotFound,
    /// No camera answered auto-detection
    #[error("No camera detected. Check the USB connection and that the camera is powered on.")]
    NoCameraDetected,
    /// A camera command ran but exited with a failure status
    #[error("Camera command failed: {0}")]
    CommandFailed(String),
    /// The captured preview file could not be decoded
    #[error("Failed to decode preview '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    /// I/O error spawning or talking to the subprocess
    #[error("Camera I/O error: {0}")]
    Io(#[from] std::io::Error),
}
