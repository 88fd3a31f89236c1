//! Camera control via the gphoto2 command-line tool.
//!
//! This module provides the camera-facing API:
//! - Session management via [`CameraSession`]
//! - Configuration via [`CameraSettings`]
//! - Error taxonomy in [`CameraError`]

mod session;
mod types;

pub use session::CameraSession;
pub use types::{CameraError, CameraSettings};
