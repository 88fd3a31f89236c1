use clap::Parser;
use std::path::Path;

use stopmo::camera::{CameraSession, CameraSettings};
use stopmo::config::Config;
use stopmo::controller::{App, AppOptions, ControllerError, InputMode, PreviewState};
use stopmo::display::{self, CharSet, PreviewCanvas};
use stopmo::scene::SceneStore;

/// Parse and validate alpha (0.0-1.0)
fn parse_alpha(s: &str) -> Result<f32, String> {
    let alpha: f32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(0.0..=1.0).contains(&alpha) {
        return Err(format!("Alpha must be between 0.0 and 1.0, got {}", alpha));
    }
    Ok(alpha)
}

/// Parse and validate render frame rate (1-60 fps)
fn parse_fps(s: &str) -> Result<u32, String> {
    let fps: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid framerate", s))?;
    if !(1..=60).contains(&fps) {
        return Err(format!("Framerate must be between 1 and 60 fps, got {}", fps));
    }
    Ok(fps)
}

/// Parse input mode name
fn parse_input_mode(s: &str) -> Result<InputMode, String> {
    InputMode::from_name(s)
        .ok_or_else(|| format!("Unknown input mode '{}'. Available modes: single-key, text", s))
}

/// stopmo: Stop-motion capture with onion-skin preview
#[derive(Parser)]
#[command(name = "stopmo")]
#[command(version, about = "Stop-motion capture tool with onion-skin terminal preview")]
#[command(long_about = "Drives a DSLR through the gphoto2 command-line tool, shows a live \
    preview blended with the previously captured frame (onion-skinning), and collects \
    numbered JPEG frames in per-scene directories. Frames can be encoded to video \
    with ffmpeg in the background.")]
#[command(after_help = "EXAMPLES:
    # Start in the default 'scene' directory
    stopmo

    # Work on a named scene with a stronger ghost of the previous frame
    stopmo --scene trip --alpha 0.6

    # Use the original line-oriented command surface
    stopmo --input-mode text

KEYS (single-key mode):
    p       Refresh the preview
    f       Capture a frame
    v       View the previous frame
    d       Delete the previous frame (asks first)
    r       Render the scene to video in the background
    up/down Adjust the onion-skin alpha
    n       Switch to a new scene
    q       Quit")]
struct Args {
    /// Scene directory to activate at startup
    #[arg(long, short = 's')]
    scene: Option<String>,

    /// Onion-skin blend weight for the live preview (0.0-1.0)
    #[arg(long, short = 'a', value_parser = parse_alpha)]
    alpha: Option<f32>,

    /// Frame rate for background video rendering (1-60)
    #[arg(long, short = 'f', value_parser = parse_fps)]
    fps: Option<u32>,

    /// Preview frames captured and discarded before one is trusted
    #[arg(long, short = 'w')]
    warmup: Option<u32>,

    /// Input mode: single-key or text
    #[arg(long, short = 'i', value_parser = parse_input_mode)]
    input_mode: Option<InputMode>,

    /// External command used to open frames for inspection
    #[arg(long)]
    viewer: Option<String>,

    /// Custom config file path (default: ~/.config/stopmo/config.toml)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    /// Only log errors
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    // Load config file
    // If --config is specified, require the file to exist
    // Otherwise, fall back to defaults if the default config is unusable
    let cfg = if let Some(ref path) = args.config {
        match Config::load_explicit(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match Config::load() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                eprintln!("Using default settings.\n");
                Config::default()
            }
        }
    };

    // Merge settings: CLI args > config file > built-in defaults
    let scene_dir = args
        .scene
        .or(cfg.scene.dir)
        .unwrap_or_else(|| "scene".to_string());

    let alpha = args
        .alpha
        .or(cfg.preview.alpha)
        .unwrap_or(PreviewState::DEFAULT_ALPHA)
        .clamp(0.0, 1.0);

    let fps = args.fps.or(cfg.render.fps).unwrap_or(12);

    let input_mode = args
        .input_mode
        .or_else(|| {
            cfg.input.mode.as_deref().and_then(|name| {
                let mode = InputMode::from_name(name);
                if mode.is_none() {
                    eprintln!("Warning: Unknown input mode '{}' in config, using default", name);
                }
                mode
            })
        })
        .unwrap_or_default();

    let charset = cfg
        .preview
        .charset
        .as_deref()
        .and_then(|name| {
            let charset = CharSet::from_name(name);
            if charset.is_none() {
                eprintln!("Warning: Unknown charset '{}' in config, using standard", name);
            }
            charset
        })
        .unwrap_or_default();

    let viewer_command = args
        .viewer
        .or(cfg.viewer.command)
        .unwrap_or_else(|| display::default_viewer_command().to_string());

    let camera_settings = CameraSettings {
        program: cfg
            .camera
            .program
            .unwrap_or_else(|| CameraSettings::default().program),
        warmup_frames: args
            .warmup
            .or(cfg.camera.warmup_frames)
            .unwrap_or_else(|| CameraSettings::default().warmup_frames),
    };

    let options = AppOptions {
        alpha,
        canvas: PreviewCanvas::new(charset, cfg.preview.invert),
        viewer_command,
        fps,
        input_mode,
    };

    if let Err(e) = run(&scene_dir, camera_settings, options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(
    scene_dir: &str,
    camera_settings: CameraSettings,
    options: AppOptions,
) -> Result<(), ControllerError> {
    let scene = SceneStore::open(scene_dir)?;

    // Camera failures at startup degrade to cameraless mode: browsing
    // and deleting existing frames still works without one.
    let camera = match CameraSession::open(camera_settings) {
        Ok(camera) => {
            match camera.configure_preview() {
                Ok(true) => {}
                Ok(false) => {
                    // Capture still works; the preview will show whatever
                    // the camera streams, if anything.
                    eprintln!("Warning: Cannot preview raw images.");
                }
                Err(e) => eprintln!("Warning: Preview configuration failed: {}", e),
            }
            Some(camera)
        }
        Err(e) => {
            eprintln!("Warning: {}", e);
            eprintln!("Continuing without camera - preview and capture are disabled.\n");
            None
        }
    };

    let mut app = App::new(scene, camera, options);
    let result = app.run();

    // Release the camera on both the normal and the error path
    app.shutdown();
    result
}
