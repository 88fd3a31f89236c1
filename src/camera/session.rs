//! Camera session driving the gphoto2 command-line tool.
//!
//! Every operation is exactly one subprocess invocation - the CLI opens
//! and closes the device itself, so there is no persistent handle to
//! manage. Failures surface as [`CameraError`] and the controller
//! degrades to cameraless mode when they happen at startup.

use super::types::{CameraError, CameraSettings};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// An opened camera session.
///
/// Exactly one instance exists per process, owned by the controller and
/// released on exit.
#[derive(Debug)]
pub struct CameraSession {
    settings: CameraSettings,
    /// Scratch file the preview captures land in before decoding
    preview_path: PathBuf,
}

impl CameraSession {
    /// Detect a connected camera and open a session.
    ///
    /// # Errors
    /// * `CameraError::GphotoNotFound` - the binary is not installed
    /// * `CameraError::NoCameraDetected` - auto-detect listed no devices
    /// * `CameraError::CommandFailed` - auto-detect itself failed
    pub fn open(settings: CameraSettings) -> Result<Self, CameraError> {
        let work_dir = std::env::temp_dir().join("stopmo");
        std::fs::create_dir_all(&work_dir)?;

        let session = Self {
            settings,
            preview_path: work_dir.join("preview.jpg"),
        };

        let output = session.run(&["--auto-detect"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // Output is a two-line header followed by one line per camera
        let detected = stdout
            .lines()
            .skip(2)
            .any(|line| !line.trim().is_empty());
        if !detected {
            return Err(CameraError::NoCameraDetected);
        }

        log::info!("Camera detected via {}", session.settings.program);
        Ok(session)
    }

    /// Prepare the camera for preview capture.
    ///
    /// Checks that the configured image format is not raw (raw images
    /// can't be previewed) and, where the camera exposes it, selects
    /// capture size class 2 - some bodies won't stream previews without
    /// it. Absent configuration keys are camera-specific and not fatal.
    ///
    /// Returns `Ok(false)` when previewing is not possible.
    pub fn configure_preview(&self) -> Result<bool, CameraError> {
        match self.run(&["--get-config", "imageformat"]) {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if let Some(current) = parse_config_current(&stdout) {
                    if current.to_lowercase().contains("raw") {
                        log::warn!("Image format is '{}'; cannot preview raw images", current);
                        return Ok(false);
                    }
                }
            }
            Err(CameraError::CommandFailed(msg)) => {
                log::debug!("No imageformat config on this camera: {}", msg);
            }
            Err(e) => return Err(e),
        }

        match self.run(&["--get-config", "capturesizeclass"]) {
            Ok(_) => {
                if let Err(e) = self.run(&["--set-config-index", "capturesizeclass=2"]) {
                    log::warn!("Could not set capture size class: {}", e);
                }
            }
            Err(CameraError::CommandFailed(msg)) => {
                log::debug!("No capturesizeclass config on this camera: {}", msg);
            }
            Err(e) => return Err(e),
        }

        Ok(true)
    }

    /// Capture a preview frame and decode it.
    ///
    /// The capture is repeated `warmup_frames` times into the same
    /// scratch file and only the last one is decoded, skipping past the
    /// stale frames the streaming pipeline buffers.
    pub fn capture_preview(&self) -> Result<RgbImage, CameraError> {
        let filename = self.preview_path.to_string_lossy().into_owned();

        for _ in 0..self.settings.warmup_frames.max(1) {
            self.run(&[
                "--capture-preview",
                "--filename",
                &filename,
                "--force-overwrite",
            ])?;
        }

        let img = image::open(&self.preview_path).map_err(|source| CameraError::Decode {
            path: self.preview_path.clone(),
            source,
        })?;
        Ok(img.to_rgb8())
    }

    /// Capture a full-resolution image and store it at `path`.
    pub fn capture_to(&self, path: &Path) -> Result<(), CameraError> {
        let filename = path.to_string_lossy().into_owned();
        self.run(&[
            "--capture-image-and-download",
            "--filename",
            &filename,
            "--force-overwrite",
        ])?;
        log::info!("Captured {}", path.display());
        Ok(())
    }

    /// Release the session.
    ///
    /// The CLI holds no device handle between invocations, so this only
    /// cleans up the preview scratch file.
    pub fn release(self) {
        if self.preview_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.preview_path) {
                log::debug!("Could not remove preview scratch file: {}", e);
            }
        }
        log::info!("Camera session released");
    }

    /// Run one camera command to completion, capturing its output.
    fn run(&self, args: &[&str]) -> Result<Output, CameraError> {
        log::debug!("{} {}", self.settings.program, args.join(" "));

        let output = Command::new(&self.settings.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CameraError::GphotoNotFound
                } else {
                    CameraError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CameraError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(output)
    }
}

/// Pull the `Current:` value out of `--get-config` output.
fn parse_config_current(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Current:"))
        .map(|value| value.trim().to_string())
}
