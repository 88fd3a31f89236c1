//! Scene frame bookkeeping.
//!
//! A scene is a directory of sequentially numbered JPEG frames
//! (`0000.jpg`, `0001.jpg`, ...). This module tracks the next frame
//! number to allocate and handles frame lookup and deletion.

use image::RgbImage;
use std::path::{Path, PathBuf};

/// Errors that can occur while managing a scene directory.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The requested scene name is taken by a regular file
    #[error("'{}' already exists as a file", .0.display())]
    NameCollision(PathBuf),
    /// Filesystem error while scanning or modifying the scene
    #[error("Scene I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A frame file exists but could not be decoded
    #[error("Failed to decode frame '{}': {source}", .path.display())]
    Frame {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Result of a delete-last-frame request.
///
/// Declined and not-found are normal outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The frame was removed and the counter decremented
    Deleted(PathBuf),
    /// The operator declined the confirmation; nothing changed
    Declined,
    /// There was no frame to delete; nothing changed
    NotFound(PathBuf),
}

/// Bookkeeping for one scene directory.
///
/// Tracks `next_index`, the number the next saved frame will get.
/// Invariant: after activation, `next_index` is one greater than the
/// highest numbered frame on disk, or 0 for a fresh scene.
#[derive(Debug)]
pub struct SceneStore {
    dir: PathBuf,
    next_index: u32,
}

impl SceneStore {
    /// Open a scene by name, creating the directory if it doesn't exist.
    ///
    /// # Errors
    /// * `SceneError::NameCollision` - if `name` is an existing regular file
    /// * `SceneError::Io` - if the directory cannot be created or scanned
    pub fn open(name: &str) -> Result<Self, SceneError> {
        let mut store = Self {
            dir: PathBuf::new(),
            next_index: 0,
        };
        store.activate(name)?;
        Ok(store)
    }

    /// Switch to a different scene, creating its directory if needed.
    ///
    /// On success the frame counter is recomputed from the directory
    /// contents. On failure the current scene is left untouched.
    pub fn activate(&mut self, name: &str) -> Result<(), SceneError> {
        let path = Path::new(name);

        if path.is_dir() {
            let next = scan_next_index(path)?;
            log::info!("Switching to scene '{}' (next frame {})", name, next);
            self.dir = path.to_path_buf();
            self.next_index = next;
        } else if path.exists() {
            return Err(SceneError::NameCollision(path.to_path_buf()));
        } else {
            std::fs::create_dir_all(path)?;
            log::info!("Created new scene '{}'", name);
            self.dir = path.to_path_buf();
            self.next_index = 0;
        }

        Ok(())
    }

    /// The scene directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The index the next saved frame will be given.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Path for an arbitrary frame index within the scene.
    ///
    /// Indices are rendered as 4-digit zero-padded numbers; indices at
    /// or above 10000 simply widen the field.
    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("{:04}.jpg", index))
    }

    /// Path the next captured frame will be stored at.
    pub fn next_frame_path(&self) -> PathBuf {
        self.frame_path(self.next_index)
    }

    /// Advance the frame counter. Call only after a successful
    /// capture-and-store to the path from `next_frame_path`.
    pub fn record_saved(&mut self) {
        self.next_index += 1;
    }

    /// Delete the most recently saved frame, gated on a confirmation
    /// callback (the interactive prompt is injected so the store stays
    /// testable).
    pub fn delete_last_frame(
        &mut self,
        confirm: impl FnOnce(&Path) -> bool,
    ) -> Result<DeleteOutcome, SceneError> {
        if self.next_index == 0 {
            return Ok(DeleteOutcome::NotFound(self.frame_path(0)));
        }

        let path = self.frame_path(self.next_index - 1);
        if !path.is_file() {
            return Ok(DeleteOutcome::NotFound(path));
        }

        if !confirm(&path) {
            return Ok(DeleteOutcome::Declined);
        }

        std::fs::remove_file(&path)?;
        self.next_index -= 1;
        log::info!("Deleted {}", path.display());
        Ok(DeleteOutcome::Deleted(path))
    }

    /// Load and decode the frame at `index`.
    ///
    /// Returns `Ok(None)` if the frame doesn't exist - absence is a
    /// normal state (e.g. the first frame of a scene has no predecessor).
    pub fn load_frame(&self, index: u32) -> Result<Option<RgbImage>, SceneError> {
        let path = self.frame_path(index);
        if !path.is_file() {
            return Ok(None);
        }

        let img = image::open(&path).map_err(|source| SceneError::Frame {
            path: path.clone(),
            source,
        })?;
        Ok(Some(img.to_rgb8()))
    }

    /// Load the most recently saved frame, if any.
    pub fn previous_frame(&self) -> Result<Option<RgbImage>, SceneError> {
        if self.next_index == 0 {
            return Ok(None);
        }
        self.load_frame(self.next_index - 1)
    }
}

/// Scan a scene directory for the highest numbered `.jpg` frame and
/// return that number plus one (0 for an empty directory).
///
/// Non-numeric stems and non-jpg files are ignored, so stray files in
/// the scene directory don't disturb the counter.
fn scan_next_index(dir: &Path) -> Result<u32, SceneError> {
    let mut max_index: Option<u32> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_jpg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
        if !is_jpg {
            continue;
        }

        if let Some(index) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u32>().ok())
        {
            max_index = Some(max_index.map_or(index, |m| m.max(index)));
        }
    }

    Ok(max_index.map_or(0, |m| m + 1))
}
