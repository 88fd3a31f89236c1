//! Interactive controller: keyboard dispatch and the event loop.
//!
//! Every action is driven by a single keypress (or, in text-command
//! mode, a line of input). Handlers run to completion before the next
//! event is processed; the only work that outlives a handler is the
//! detached render and the external viewer.

use crate::camera::CameraSession;
use crate::compositor;
use crate::display::{self, PreviewCanvas};
use crate::prompt;
use crate::render::RenderJob;
use crate::scene::{DeleteOutcome, SceneError, SceneStore};
use crate::terminal::RawModeGuard;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Rows occupied by the menu box at the top of the screen.
const HEADER_ROWS: u16 = 10;
/// Row used for one-line status messages.
const STATUS_ROW: u16 = HEADER_ROWS;
/// First row of the preview area.
const PREVIEW_TOP: u16 = HEADER_ROWS + 2;

/// An operation requested by the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Re-render the preview
    Redraw,
    /// Capture a frame and store it as the next numbered frame
    Capture,
    /// Open the previous frame in the external viewer
    ViewPrevious,
    /// Delete the most recently saved frame (with confirmation)
    DeleteLast,
    /// Encode the scene's frames to video in the background
    Render,
    /// Increase the onion-skin alpha one step
    AlphaUp,
    /// Decrease the onion-skin alpha one step
    AlphaDown,
    /// Switch to a new scene; the name is prompted for when absent
    NewScene(Option<String>),
    /// Set the onion-skin alpha directly (text-command mode)
    SetAlpha(f32),
    /// Leave the event loop
    Quit,
}

/// Map a key event to an action.
///
/// Only press events count; everything not in the dispatch table is
/// ignored. Quit is reachable as `q`, Esc, or Ctrl+C.
pub fn action_for_key(event: &KeyEvent) -> Option<Action> {
    if event.kind != KeyEventKind::Press {
        return None;
    }

    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    match event.code {
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'p' => Some(Action::Redraw),
            'f' => Some(Action::Capture),
            'v' => Some(Action::ViewPrevious),
            'd' => Some(Action::DeleteLast),
            'r' => Some(Action::Render),
            'n' => Some(Action::NewScene(None)),
            'q' => Some(Action::Quit),
            _ => None,
        },
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Up => Some(Action::AlphaUp),
        KeyCode::Down => Some(Action::AlphaDown),
        _ => None,
    }
}

/// Transient preview state: the onion-skin blend weight.
///
/// Never persisted; every run starts from the default.
#[derive(Debug, Clone, Copy)]
pub struct PreviewState {
    alpha: f32,
}

impl PreviewState {
    /// Default blend weight given to the live preview.
    pub const DEFAULT_ALPHA: f32 = 0.70;
    /// Step applied per Up/Down keypress.
    pub const ALPHA_STEP: f32 = 0.05;

    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn step_up(&mut self) {
        self.set(self.alpha + Self::ALPHA_STEP);
    }

    pub fn step_down(&mut self) {
        self.set(self.alpha - Self::ALPHA_STEP);
    }
}

impl Default for PreviewState {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALPHA)
    }
}

/// How operator input is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Raw keypress dispatch (the revised surface)
    #[default]
    SingleKey,
    /// Line-oriented command REPL (the original surface)
    Text,
}

impl InputMode {
    /// Parse a mode name as used in config files and `--input-mode`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "single-key" => Some(InputMode::SingleKey),
            "text" => Some(InputMode::Text),
            _ => None,
        }
    }
}

/// Errors that can escape the event loop.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Camera(#[from] crate::camera::CameraError),
    #[error("Terminal I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Options the controller is constructed with (already merged from CLI,
/// config file, and defaults).
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub alpha: f32,
    pub canvas: PreviewCanvas,
    pub viewer_command: String,
    pub fps: u32,
    pub input_mode: InputMode,
}

/// The interactive session: one scene, at most one camera.
pub struct App {
    scene: SceneStore,
    camera: Option<CameraSession>,
    preview: PreviewState,
    canvas: PreviewCanvas,
    viewer_command: String,
    fps: u32,
    input_mode: InputMode,
}

impl App {
    /// Build the session. `camera` is `None` in degraded (cameraless)
    /// mode: preview and capture are disabled but everything else works.
    pub fn new(scene: SceneStore, camera: Option<CameraSession>, options: AppOptions) -> Self {
        Self {
            scene,
            camera,
            preview: PreviewState::new(options.alpha),
            canvas: options.canvas,
            viewer_command: options.viewer_command,
            fps: options.fps,
            input_mode: options.input_mode,
        }
    }

    /// Run the event loop until the operator quits.
    pub fn run(&mut self) -> Result<(), ControllerError> {
        match self.input_mode {
            InputMode::SingleKey => self.run_single_key(),
            InputMode::Text => self.run_text(),
        }
    }

    /// Release the camera session, if one was acquired.
    /// Degraded-mode sessions have nothing to release.
    pub fn shutdown(&mut self) {
        if let Some(camera) = self.camera.take() {
            camera.release();
        }
    }

    fn run_single_key(&mut self) -> Result<(), ControllerError> {
        let mut out = io::stdout();
        let mut guard = RawModeGuard::enter()?;

        crossterm::execute!(out, Clear(ClearType::All))?;
        self.print_header(&mut out)?;
        self.redraw(&mut out)?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            let Some(action) = action_for_key(&key) else {
                continue;
            };
            if action == Action::Quit {
                break;
            }

            let redraw = self.handle(action, &mut out, Some(&mut guard))?;
            // The header shows the next frame path, which most actions
            // change - reprint it on every recognized keypress.
            self.print_header(&mut out)?;
            if redraw {
                self.redraw(&mut out)?;
            }
        }

        guard.exit()?;
        println!();
        Ok(())
    }

    fn run_text(&mut self) -> Result<(), ControllerError> {
        if let Err(e) = setup_quit_handler() {
            log::warn!("Could not set up Ctrl+C handler: {}", e);
        }

        let mut out = io::stdout();
        loop {
            if quit_requested() {
                break;
            }

            self.print_header_text();
            let line = match prompt::read_line("> ") {
                Ok(Some(line)) => line,
                Ok(None) => break, // EOF
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            let Some(action) = prompt::parse_command(&line) else {
                continue;
            };
            if action == Action::Quit {
                break;
            }

            let redraw = self.handle(action, &mut out, None)?;
            if redraw {
                self.redraw(&mut out)?;
            }
        }
        Ok(())
    }

    /// Execute one action. Returns whether the preview should be
    /// redrawn afterwards (capture explicitly suppresses the redraw so
    /// the operator's framing isn't disturbed right after a shot).
    fn handle(
        &mut self,
        action: Action,
        out: &mut impl Write,
        guard: Option<&mut RawModeGuard>,
    ) -> Result<bool, ControllerError> {
        match action {
            Action::Redraw => Ok(true),

            Action::Capture => {
                let Some(camera) = &self.camera else {
                    self.say(out, "Camera unavailable - cannot capture")?;
                    return Ok(false);
                };
                let path = self.scene.next_frame_path();
                camera.capture_to(&path)?;
                self.scene.record_saved();
                self.say(out, &format!("Saved {}", path.display()))?;
                Ok(false)
            }

            Action::ViewPrevious => {
                if self.scene.next_index() == 0 {
                    self.say(out, "No previous frame to view")?;
                    return Ok(false);
                }
                let path = self.scene.frame_path(self.scene.next_index() - 1);
                if !path.is_file() {
                    self.say(out, &format!("Could not find {}", path.display()))?;
                    return Ok(false);
                }
                match display::spawn_viewer(&self.viewer_command, &path) {
                    Ok(()) => self.say(out, &format!("Displaying {}", path.display()))?,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        self.say(
                            out,
                            &format!(
                                "Viewer '{}' not found; set [viewer] command in the config",
                                self.viewer_command
                            ),
                        )?;
                    }
                    Err(e) => return Err(e.into()),
                }
                Ok(false)
            }

            Action::DeleteLast => {
                self.position_prompt(out)?;
                let outcome = match guard {
                    Some(guard) => self.scene.delete_last_frame(|path| {
                        let question =
                            format!("Are you sure you want to delete {}?", path.display());
                        // A failed prompt counts as a decline
                        guard
                            .suspended(|| prompt::confirm(&question))
                            .unwrap_or(false)
                    })?,
                    None => self.scene.delete_last_frame(|path| {
                        let question =
                            format!("Are you sure you want to delete {}?", path.display());
                        prompt::confirm(&question).unwrap_or(false)
                    })?,
                };
                match outcome {
                    DeleteOutcome::Deleted(path) => {
                        self.say(out, &format!("Deleted {}", path.display()))?
                    }
                    DeleteOutcome::Declined => {}
                    DeleteOutcome::NotFound(path) => {
                        self.say(out, &format!("Could not find {}", path.display()))?
                    }
                }
                Ok(true)
            }

            Action::Render => {
                let job = RenderJob::new(self.scene.dir(), self.fps);
                match job.spawn_detached() {
                    Ok(()) => self.say(
                        out,
                        &format!(
                            "Rendering {} in the background",
                            job.output_path().display()
                        ),
                    )?,
                    // A missing encoder shouldn't end the session
                    Err(e) => self.say(out, &e.to_string())?,
                }
                Ok(false)
            }

            Action::AlphaUp => {
                self.preview.step_up();
                self.say(out, &format!("Alpha: {:.2}", self.preview.alpha()))?;
                Ok(true)
            }

            Action::AlphaDown => {
                self.preview.step_down();
                self.say(out, &format!("Alpha: {:.2}", self.preview.alpha()))?;
                Ok(true)
            }

            Action::SetAlpha(value) => {
                self.preview.set(value);
                self.say(out, &format!("Alpha: {:.2}", self.preview.alpha()))?;
                Ok(true)
            }

            Action::NewScene(name) => {
                let name = match name {
                    Some(name) => Some(name),
                    None => {
                        self.position_prompt(out)?;
                        let line = match guard {
                            Some(guard) => {
                                guard.suspended(|| prompt::read_line("Enter a scene name: "))?
                            }
                            None => prompt::read_line("Enter a scene name: ")?,
                        };
                        line.filter(|n| !n.is_empty())
                    }
                };
                let Some(name) = name else {
                    return Ok(false);
                };

                match self.scene.activate(&name) {
                    Ok(()) => self.say(out, &format!("Changed scene to {}", name))?,
                    Err(SceneError::NameCollision(path)) => {
                        self.say(out, &format!("{} already exists as a file", path.display()))?
                    }
                    Err(e) => return Err(e.into()),
                }
                Ok(true)
            }

            // Handled by the event loops before dispatch
            Action::Quit => Ok(false),
        }
    }

    /// Move the cursor to the status line before a line prompt runs, so
    /// prompt input doesn't land in the middle of the preview.
    fn position_prompt(&self, out: &mut impl Write) -> io::Result<()> {
        if self.input_mode == InputMode::SingleKey {
            queue!(
                out,
                cursor::MoveTo(0, STATUS_ROW),
                Clear(ClearType::FromCursorDown)
            )?;
            out.flush()?;
        }
        Ok(())
    }

    /// Capture a fresh preview, blend it with the previous frame, and
    /// draw it. In degraded mode this only reports the missing camera.
    fn redraw(&self, out: &mut impl Write) -> Result<(), ControllerError> {
        let Some(camera) = &self.camera else {
            self.say(out, "Camera unavailable - preview disabled")?;
            return Ok(());
        };

        let current = camera.capture_preview()?;
        let previous = self.scene.previous_frame()?;
        let composite = compositor::composite(&current, previous.as_ref(), self.preview.alpha());

        match self.input_mode {
            InputMode::SingleKey => self.canvas.draw(out, &composite, PREVIEW_TOP)?,
            InputMode::Text => self.canvas.draw_inline(out, &composite)?,
        }
        Ok(())
    }

    /// The menu box shown above the preview.
    fn header_lines(&self) -> Vec<String> {
        let camera_state = if self.camera.is_some() {
            "ready"
        } else {
            "unavailable"
        };
        let status = format!(
            "Alpha: {:.2}    Camera: {}",
            self.preview.alpha(),
            camera_state
        );

        let (keys_one, keys_two) = match self.input_mode {
            InputMode::SingleKey => (
                "p refresh    f capture   v view      d delete",
                "r render     n scene     up/down alpha   q quit",
            ),
            InputMode::Text => (
                "p preview    s save      v view      d delete",
                "r render     n <name> scene   a <value> alpha   q quit",
            ),
        };

        vec![
            format!("┌{}┐", "─".repeat(52)),
            format!("│  stopmo v{:<41} │", env!("CARGO_PKG_VERSION")),
            format!("├{}┤", "─".repeat(52)),
            format!("│  {:<49} │", keys_one),
            format!("│  {:<49} │", keys_two),
            format!("├{}┤", "─".repeat(52)),
            format!("│  Scene:  {:<41} │", self.scene.dir().display().to_string()),
            format!(
                "│  Next:   {:<41} │",
                self.scene.next_frame_path().display().to_string()
            ),
            format!("│  {:<49} │", status),
            format!("└{}┘", "─".repeat(52)),
        ]
    }

    /// Redraw the header in place (raw mode, cursor-addressed).
    fn print_header(&self, out: &mut impl Write) -> io::Result<()> {
        for (row, line) in self.header_lines().iter().enumerate() {
            queue!(
                out,
                cursor::MoveTo(0, row as u16),
                Clear(ClearType::UntilNewLine),
                Print(line)
            )?;
        }
        out.flush()
    }

    /// Print the header as plain lines (text-command mode).
    fn print_header_text(&self) {
        println!();
        for line in self.header_lines() {
            println!("{}", line);
        }
    }

    /// One-line status message to the operator.
    fn say(&self, out: &mut impl Write, message: &str) -> io::Result<()> {
        match self.input_mode {
            InputMode::SingleKey => {
                queue!(
                    out,
                    cursor::MoveTo(0, STATUS_ROW),
                    Clear(ClearType::UntilNewLine),
                    Print(message)
                )?;
                out.flush()
            }
            InputMode::Text => {
                println!("{}", message);
                Ok(())
            }
        }
    }
}

/// Global flag set by the Ctrl+C handler (text-command mode).
static QUIT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Check if Ctrl+C has been received.
pub fn quit_requested() -> bool {
    QUIT_REQUESTED.load(Ordering::SeqCst)
}

/// Install the Ctrl+C handler. Call once at loop startup.
pub fn setup_quit_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        QUIT_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(action_for_key(&press(KeyCode::Char('p'))), Some(Action::Redraw));
        assert_eq!(action_for_key(&press(KeyCode::Char('f'))), Some(Action::Capture));
        assert_eq!(
            action_for_key(&press(KeyCode::Char('v'))),
            Some(Action::ViewPrevious)
        );
        assert_eq!(
            action_for_key(&press(KeyCode::Char('d'))),
            Some(Action::DeleteLast)
        );
        assert_eq!(action_for_key(&press(KeyCode::Char('r'))), Some(Action::Render));
        assert_eq!(
            action_for_key(&press(KeyCode::Char('n'))),
            Some(Action::NewScene(None))
        );
        assert_eq!(action_for_key(&press(KeyCode::Up)), Some(Action::AlphaUp));
        assert_eq!(action_for_key(&press(KeyCode::Down)), Some(Action::AlphaDown));
    }

    #[test]
    fn test_quit_bindings() {
        assert_eq!(action_for_key(&press(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(action_for_key(&press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            action_for_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_unknown_keys_ignored() {
        assert_eq!(action_for_key(&press(KeyCode::Char('x'))), None);
        assert_eq!(action_for_key(&press(KeyCode::Tab)), None);
        assert_eq!(action_for_key(&press(KeyCode::Left)), None);
    }

    #[test]
    fn test_uppercase_keys_dispatch_too() {
        assert_eq!(action_for_key(&press(KeyCode::Char('F'))), Some(Action::Capture));
        assert_eq!(action_for_key(&press(KeyCode::Char('Q'))), Some(Action::Quit));
    }

    #[test]
    fn test_release_events_ignored() {
        let mut event = press(KeyCode::Char('f'));
        event.kind = KeyEventKind::Release;
        assert_eq!(action_for_key(&event), None);
    }

    #[test]
    fn test_alpha_steps_clamp_at_one() {
        // From the default, ten increases overshoot and clamp at 1.0
        let mut state = PreviewState::default();
        for _ in 0..10 {
            state.step_up();
        }
        assert!((state.alpha() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_five_steps_down() {
        let mut state = PreviewState::default();
        for _ in 0..5 {
            state.step_down();
        }
        assert!(
            (state.alpha() - 0.45).abs() < 1e-4,
            "expected ~0.45, got {}",
            state.alpha()
        );
    }

    #[test]
    fn test_alpha_clamps_at_zero() {
        let mut state = PreviewState::new(0.05);
        for _ in 0..4 {
            state.step_down();
        }
        assert_eq!(state.alpha(), 0.0);
    }

    #[test]
    fn test_preview_state_clamps_initial_value() {
        assert_eq!(PreviewState::new(1.5).alpha(), 1.0);
        assert_eq!(PreviewState::new(-0.5).alpha(), 0.0);
    }

    #[test]
    fn test_input_mode_from_name() {
        assert_eq!(InputMode::from_name("single-key"), Some(InputMode::SingleKey));
        assert_eq!(InputMode::from_name("text"), Some(InputMode::Text));
        assert_eq!(InputMode::from_name("gui"), None);
    }
}
