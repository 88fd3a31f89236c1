//! Integration tests for the controller surface: key dispatch, the
//! alpha state machine, text-command parsing, and render arguments.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::Path;
use stopmo::controller::{action_for_key, Action, InputMode, PreviewState};
use stopmo::prompt::parse_command;
use stopmo::render::RenderJob;

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

#[test]
fn test_single_key_surface_is_complete() {
    // The whole revised dispatch table, one key per action
    let table = [
        (KeyCode::Char('p'), Action::Redraw),
        (KeyCode::Char('f'), Action::Capture),
        (KeyCode::Char('v'), Action::ViewPrevious),
        (KeyCode::Char('d'), Action::DeleteLast),
        (KeyCode::Char('r'), Action::Render),
        (KeyCode::Up, Action::AlphaUp),
        (KeyCode::Down, Action::AlphaDown),
        (KeyCode::Char('n'), Action::NewScene(None)),
        (KeyCode::Char('q'), Action::Quit),
        (KeyCode::Esc, Action::Quit),
    ];
    for (code, expected) in table {
        assert_eq!(
            action_for_key(&press(code)),
            Some(expected.clone()),
            "key {:?} should map to {:?}",
            code,
            expected
        );
    }
}

#[test]
fn test_unbound_keys_are_ignored() {
    for code in [
        KeyCode::Char('x'),
        KeyCode::Char('1'),
        KeyCode::Tab,
        KeyCode::Left,
        KeyCode::Right,
        KeyCode::Home,
    ] {
        assert_eq!(action_for_key(&press(code)), None, "{:?} should be ignored", code);
    }
}

#[test]
fn test_alpha_ten_increases_clamp_at_one() {
    // 0.70 + 10 * 0.05 = 1.20, clamped to 1.0
    let mut state = PreviewState::new(0.70);
    for _ in 0..10 {
        state.step_up();
    }
    assert!((state.alpha() - 1.0).abs() < 1e-6, "got {}", state.alpha());
}

#[test]
fn test_alpha_five_decreases_from_default() {
    // 0.70 - 5 * 0.05 = 0.45, up to float accumulation
    let mut state = PreviewState::new(0.70);
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
fn test_text_surface_matches_original_commands() {
    assert_eq!(parse_command("q"), Some(Action::Quit));
    assert_eq!(parse_command("p"), Some(Action::Redraw));
    assert_eq!(parse_command("s"), Some(Action::Capture));
    assert_eq!(parse_command("v"), Some(Action::ViewPrevious));
    assert_eq!(parse_command("d"), Some(Action::DeleteLast));
    assert_eq!(
        parse_command("n trip"),
        Some(Action::NewScene(Some("trip".to_string())))
    );
}

#[test]
fn test_both_input_modes_are_selectable() {
    // Neither revision's surface is silently dropped
    assert_eq!(InputMode::from_name("single-key"), Some(InputMode::SingleKey));
    assert_eq!(InputMode::from_name("text"), Some(InputMode::Text));
    assert_eq!(InputMode::default(), InputMode::SingleKey);
}

#[test]
fn test_render_invocation_shape() {
    let job = RenderJob::new(Path::new("trip"), 15);
    let args = job.ffmpeg_args();

    // Glob over the scene's numbered JPEGs, H.264 + yuv420p out
    assert!(args.contains(&"-framerate".to_string()));
    assert!(args.contains(&"15".to_string()));
    assert!(args.contains(&"trip/*.jpg".to_string()));
    assert!(args.contains(&"libx264".to_string()));
    assert!(args.contains(&"yuv420p".to_string()));
    assert_eq!(args.last().unwrap(), "trip/out.mp4");
}
