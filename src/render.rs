//! Video rendering via a detached ffmpeg subprocess.
//!
//! The render is fire-and-forget: the encoder is spawned over the
//! scene's frames and never joined, so the operator can keep capturing
//! while it runs. The output file must not be assumed to exist when the
//! triggering keypress returns.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Errors that can occur when launching a render
#[derive(Debug)]
pub enum RenderError {
    /// FFmpeg executable not found
    FfmpegNotFound,
    /// Failed to spawn the FFmpeg process
    SpawnFailed(std::io::Error),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::FfmpegNotFound => {
                write!(
                    f,
                    "FFmpeg not found. Please install it with:\n\n    apt install ffmpeg    (or: brew install ffmpeg)\n"
                )
            }
            RenderError::SpawnFailed(e) => write!(f, "Failed to spawn FFmpeg: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

/// One render invocation over a scene's frame sequence.
#[derive(Debug, Clone)]
pub struct RenderJob {
    scene_dir: PathBuf,
    fps: u32,
}

impl RenderJob {
    /// Create a render job for all frames in `scene_dir` at `fps`.
    pub fn new(scene_dir: &Path, fps: u32) -> Self {
        Self {
            scene_dir: scene_dir.to_path_buf(),
            fps,
        }
    }

    /// Where the encoded video will land.
    pub fn output_path(&self) -> PathBuf {
        self.scene_dir.join("out.mp4")
    }

    /// Build the FFmpeg argument list for this job.
    ///
    /// The input is a glob over the scene's numbered JPEGs; the output
    /// is H.264 with yuv420p pixel format for broad player
    /// compatibility.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let pattern = self.scene_dir.join("*.jpg");
        vec![
            "-framerate".to_string(),
            self.fps.to_string(),
            "-pattern_type".to_string(),
            "glob".to_string(),
            "-i".to_string(),
            pattern.to_string_lossy().into_owned(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-y".to_string(),
            self.output_path().to_string_lossy().into_owned(),
        ]
    }

    /// Spawn FFmpeg detached and return immediately.
    ///
    /// A background thread drains stderr (so the encoder can't block on
    /// a full pipe) and reaps the process when it exits; its exit status
    /// is never inspected.
    pub fn spawn_detached(&self) -> Result<(), RenderError> {
        let args = self.ffmpeg_args();
        log::info!("Rendering {} at {} fps", self.output_path().display(), self.fps);

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RenderError::FfmpegNotFound
                } else {
                    RenderError::SpawnFailed(e)
                }
            })?;

        let stderr = child.stderr.take();
        std::thread::spawn(move || {
            if let Some(stderr) = stderr {
                use std::io::BufRead;
                let reader = std::io::BufReader::new(stderr);
                for line in reader.lines() {
                    match line {
                        Ok(l) => log::debug!("[ffmpeg] {}", l),
                        Err(_) => break,
                    }
                }
            }
            // Reap only; the exit status is deliberately not observed
            let _ = child.wait();
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_args_exact() {
        let job = RenderJob::new(Path::new("scene"), 12);
        let args = job.ffmpeg_args();
        let expected: Vec<String> = [
            "-framerate",
            "12",
            "-pattern_type",
            "glob",
            "-i",
            "scene/*.jpg",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-y",
            "scene/out.mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_output_lands_in_scene_dir() {
        let job = RenderJob::new(Path::new("trip"), 24);
        assert_eq!(job.output_path(), Path::new("trip").join("out.mp4"));
    }

    #[test]
    fn test_spawn_detached_returns_without_waiting() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let job = RenderJob::new(tmp.path(), 12);

        // An empty glob makes ffmpeg fail quickly, which is fine: the
        // spawn itself must succeed and return immediately either way.
        match job.spawn_detached() {
            Ok(()) => {}
            Err(RenderError::FfmpegNotFound) => {
                eprintln!("SKIP: ffmpeg not installed");
            }
            Err(e) => panic!("Unexpected spawn error: {}", e),
        }
    }

    #[test]
    fn test_render_error_display() {
        let msg = format!("{}", RenderError::FfmpegNotFound);
        assert!(msg.contains("FFmpeg not found"));
        assert!(msg.contains("install"));
    }
}
