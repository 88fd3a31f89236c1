//! Terminal preview rendering.
//!
//! The onion-skin composite is drawn as ASCII art: RGB frames are
//! converted to grayscale, averaged down to a character grid, and
//! mapped onto a density ramp. The previous frame can also be handed to
//! an external viewer for full-fidelity inspection.

use crossterm::{cursor, queue, style::Print};
use image::RgbImage;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Standard ASCII density ramp (10 levels).
/// Characters ordered from darkest (space) to brightest (@).
pub const STANDARD_CHARSET: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Block character set (5 levels), higher perceived resolution.
pub const BLOCKS_CHARSET: &[char] = &[' ', '░', '▒', '▓', '█'];

/// Minimal character set (4 levels), clean and less noisy.
pub const MINIMAL_CHARSET: &[char] = &[' ', '.', ':', '#'];

/// Character set used for preview rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    /// Standard ASCII density ramp (10 levels)
    #[default]
    Standard,
    /// Unicode block characters (5 levels)
    Blocks,
    /// Minimal set (4 levels)
    Minimal,
}

impl CharSet {
    /// Get the character slice for this charset.
    pub fn chars(&self) -> &'static [char] {
        match self {
            CharSet::Standard => STANDARD_CHARSET,
            CharSet::Blocks => BLOCKS_CHARSET,
            CharSet::Minimal => MINIMAL_CHARSET,
        }
    }

    /// Parse a charset name as used in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(CharSet::Standard),
            "blocks" => Some(CharSet::Blocks),
            "minimal" => Some(CharSet::Minimal),
            _ => None,
        }
    }
}

/// Convert an RGB frame to grayscale using the ITU-R BT.601 luminance
/// formula (Y = 0.299*R + 0.587*G + 0.114*B), in integer math.
pub fn to_grayscale(img: &RgbImage) -> Vec<u8> {
    let mut gray = Vec::with_capacity((img.width() * img.height()) as usize);
    for pixel in img.pixels() {
        let r = pixel.0[0] as u32;
        let g = pixel.0[1] as u32;
        let b = pixel.0[2] as u32;
        gray.push(((299 * r + 587 * g + 114 * b) / 1000) as u8);
    }
    gray
}

/// Downsample a grayscale image to a character grid by averaging the
/// pixels that fall into each cell. Returns `cols * rows` brightness
/// values in row-major order (empty on degenerate input).
pub fn downsample(gray: &[u8], img_width: u32, img_height: u32, cols: u16, rows: u16) -> Vec<u8> {
    if cols == 0 || rows == 0 || img_width == 0 || img_height == 0 || gray.is_empty() {
        return Vec::new();
    }

    let cell_w = img_width as f32 / cols as f32;
    let cell_h = img_height as f32 / rows as f32;

    let mut result = Vec::with_capacity(cols as usize * rows as usize);
    for cy in 0..rows {
        for cx in 0..cols {
            let start_x = (cx as f32 * cell_w) as u32;
            let end_x = ((cx + 1) as f32 * cell_w) as u32;
            let start_y = (cy as f32 * cell_h) as u32;
            let end_y = ((cy + 1) as f32 * cell_h) as u32;

            let mut sum = 0u32;
            let mut count = 0u32;
            for py in start_y..end_y {
                for px in start_x..end_x {
                    let idx = (py * img_width + px) as usize;
                    if idx < gray.len() {
                        sum += gray[idx] as u32;
                        count += 1;
                    }
                }
            }
            result.push(if count > 0 { (sum / count) as u8 } else { 0 });
        }
    }
    result
}

/// Map brightness values onto a charset ordered darkest to brightest.
pub fn map_to_chars(brightness: &[u8], charset: &[char], invert: bool) -> Vec<char> {
    if charset.is_empty() {
        return vec![' '; brightness.len()];
    }

    let levels = charset.len();
    brightness
        .iter()
        .map(|&b| {
            let b = if invert { 255 - b } else { b };
            let idx = (b as usize * (levels - 1)) / 255;
            charset[idx]
        })
        .collect()
}

/// Fit an image into a character grid, compensating for terminal cells
/// being roughly twice as tall as they are wide.
pub fn fit_grid(img_width: u32, img_height: u32, max_cols: u16, max_rows: u16) -> (u16, u16) {
    if img_width == 0 || img_height == 0 || max_cols == 0 || max_rows == 0 {
        return (0, 0);
    }

    // Rows the image wants at full terminal width
    let wanted_rows = (img_height as f32 / img_width as f32 * max_cols as f32 / 2.0).round();
    if wanted_rows < 1.0 {
        return (max_cols, 1);
    }
    if wanted_rows as u16 <= max_rows {
        return (max_cols, wanted_rows as u16);
    }

    // Height-bound: shrink columns to keep the aspect
    let cols = (img_width as f32 / img_height as f32 * max_rows as f32 * 2.0).round();
    (cols.clamp(1.0, max_cols as f32) as u16, max_rows.max(1))
}

/// Renders composite frames into the terminal below the menu header.
#[derive(Debug, Clone, Copy)]
pub struct PreviewCanvas {
    pub charset: CharSet,
    pub invert: bool,
}

impl PreviewCanvas {
    pub fn new(charset: CharSet, invert: bool) -> Self {
        Self { charset, invert }
    }

    /// Draw `img` starting at terminal row `top_row`, using the rest of
    /// the terminal. Cursor position is restored afterwards.
    pub fn draw(&self, out: &mut impl Write, img: &RgbImage, top_row: u16) -> io::Result<()> {
        let (term_cols, term_rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let max_rows = term_rows.saturating_sub(top_row).saturating_sub(1);
        let (cols, rows) = fit_grid(img.width(), img.height(), term_cols, max_rows);
        if cols == 0 || rows == 0 {
            return Ok(());
        }

        let gray = to_grayscale(img);
        let brightness = downsample(&gray, img.width(), img.height(), cols, rows);
        let chars = map_to_chars(&brightness, self.charset.chars(), self.invert);

        queue!(out, cursor::SavePosition, cursor::Hide)?;
        for row in 0..rows {
            let start = row as usize * cols as usize;
            let line: String = chars[start..start + cols as usize].iter().collect();
            queue!(out, cursor::MoveTo(0, top_row + row), Print(line))?;
        }
        queue!(out, cursor::Show, cursor::RestorePosition)?;
        out.flush()
    }

    /// Draw `img` as plain scrolling output (text-command mode, no raw
    /// terminal, no cursor addressing).
    pub fn draw_inline(&self, out: &mut impl Write, img: &RgbImage) -> io::Result<()> {
        let (term_cols, term_rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let (cols, rows) = fit_grid(img.width(), img.height(), term_cols, term_rows.saturating_sub(2));
        if cols == 0 || rows == 0 {
            return Ok(());
        }

        let gray = to_grayscale(img);
        let brightness = downsample(&gray, img.width(), img.height(), cols, rows);
        let chars = map_to_chars(&brightness, self.charset.chars(), self.invert);

        for row in 0..rows {
            let start = row as usize * cols as usize;
            let line: String = chars[start..start + cols as usize].iter().collect();
            writeln!(out, "{}", line)?;
        }
        out.flush()
    }
}

/// The platform image opener, used when no viewer is configured.
pub fn default_viewer_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

/// Open `path` in an external viewer, fire-and-forget.
///
/// The viewer is never joined; a missing binary surfaces as
/// `ErrorKind::NotFound` for the caller to report.
pub fn spawn_viewer(command: &str, path: &Path) -> io::Result<()> {
    Command::new(command)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_grayscale_bt601_weights() {
        let img = RgbImage::from_pixel(1, 1, Rgb([100, 200, 50]));
        let gray = to_grayscale(&img);
        // (299*100 + 587*200 + 114*50) / 1000 = 153
        assert_eq!(gray, vec![153]);
    }

    #[test]
    fn test_grayscale_extremes() {
        let black = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        assert!(to_grayscale(&black).iter().all(|&b| b == 0));

        let white = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        assert!(to_grayscale(&white).iter().all(|&b| b == 255));
    }

    #[test]
    fn test_downsample_grid_size() {
        let gray = vec![128u8; 64 * 48];
        let cells = downsample(&gray, 64, 48, 8, 6);
        assert_eq!(cells.len(), 8 * 6);
        assert!(cells.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_downsample_degenerate_inputs() {
        assert!(downsample(&[], 0, 0, 8, 6).is_empty());
        assert!(downsample(&[1, 2, 3], 3, 1, 0, 5).is_empty());
    }

    #[test]
    fn test_map_to_chars_endpoints() {
        let chars = map_to_chars(&[0, 255], STANDARD_CHARSET, false);
        assert_eq!(chars[0], ' ');
        assert_eq!(chars[1], '@');
    }

    #[test]
    fn test_map_to_chars_invert() {
        let chars = map_to_chars(&[0, 255], STANDARD_CHARSET, true);
        assert_eq!(chars[0], '@');
        assert_eq!(chars[1], ' ');
    }

    #[test]
    fn test_charset_from_name() {
        assert_eq!(CharSet::from_name("standard"), Some(CharSet::Standard));
        assert_eq!(CharSet::from_name("blocks"), Some(CharSet::Blocks));
        assert_eq!(CharSet::from_name("minimal"), Some(CharSet::Minimal));
        assert_eq!(CharSet::from_name("braille"), None);
    }

    #[test]
    fn test_fit_grid_width_bound() {
        // A wide image at 80 columns wants few rows
        let (cols, rows) = fit_grid(640, 480, 80, 40);
        assert_eq!(cols, 80);
        assert_eq!(rows, 30); // 480/640 * 80 / 2
    }

    #[test]
    fn test_fit_grid_height_bound() {
        let (cols, rows) = fit_grid(640, 480, 80, 10);
        assert_eq!(rows, 10);
        assert!(cols <= 80);
        assert!(cols > 0);
    }

    #[test]
    fn test_fit_grid_degenerate() {
        assert_eq!(fit_grid(0, 480, 80, 24), (0, 0));
        assert_eq!(fit_grid(640, 480, 0, 24), (0, 0));
    }

    #[test]
    fn test_spawn_viewer_missing_binary() {
        let err = spawn_viewer("stopmo-test-no-such-viewer", Path::new("x.jpg"))
            .expect_err("missing viewer should error");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
