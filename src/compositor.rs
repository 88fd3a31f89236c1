//! Onion-skin compositing.
//!
//! Blends the live camera preview with the previously captured frame so
//! the operator can line up the next shot against the last one.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Blend the current preview with the previous frame.
///
/// The previous frame is stretched to the preview's exact pixel
/// dimensions (bilinear), then blended per channel:
/// `out = round(cur * alpha + prev * (1 - alpha))`.
///
/// With no previous frame the preview is returned unchanged. Callers
/// clamp `alpha` to [0, 1] before passing it in.
///
/// Pure and deterministic - the same inputs always produce the same
/// output, which the golden tests rely on.
pub fn composite(current: &RgbImage, previous: Option<&RgbImage>, alpha: f32) -> RgbImage {
    let Some(previous) = previous else {
        return current.clone();
    };

    let (width, height) = current.dimensions();

    // Stretch to the preview's dimensions; aspect is intentionally not
    // preserved, the two images describe the same framing.
    let resized;
    let previous = if previous.dimensions() == (width, height) {
        previous
    } else {
        resized = imageops::resize(previous, width, height, FilterType::Triangle);
        &resized
    };

    let mut out = RgbImage::new(width, height);
    for (dst, (cur, prev)) in out
        .pixels_mut()
        .zip(current.pixels().zip(previous.pixels()))
    {
        for channel in 0..3 {
            let blended =
                cur.0[channel] as f32 * alpha + prev.0[channel] as f32 * (1.0 - alpha);
            dst.0[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    #[test]
    fn test_no_previous_frame_is_identity() {
        let current = solid(4, 4, [10, 200, 77]);
        let out = composite(&current, None, 0.3);
        assert_eq!(out, current);
    }

    #[test]
    fn test_blend_matches_formula_exactly() {
        let current = solid(2, 2, [200, 100, 0]);
        let previous = solid(2, 2, [100, 200, 40]);

        let out = composite(&current, Some(&previous), 0.7);

        // round(200*0.7 + 100*0.3) = 170, round(100*0.7 + 200*0.3) = 130,
        // round(0*0.7 + 40*0.3) = 12
        for pixel in out.pixels() {
            assert_eq!(pixel.0, [170, 130, 12]);
        }
    }

    #[test]
    fn test_alpha_one_is_current_alpha_zero_is_previous() {
        let current = solid(3, 3, [255, 0, 128]);
        let previous = solid(3, 3, [0, 255, 64]);

        assert_eq!(composite(&current, Some(&previous), 1.0), current);
        assert_eq!(composite(&current, Some(&previous), 0.0), previous);
    }

    #[test]
    fn test_output_stays_in_channel_range() {
        let current = solid(2, 2, [255, 255, 255]);
        let previous = solid(2, 2, [255, 255, 255]);

        for alpha in [0.0, 0.25, 0.5, 0.95, 1.0] {
            let out = composite(&current, Some(&previous), alpha);
            for pixel in out.pixels() {
                assert_eq!(pixel.0, [255, 255, 255]);
            }
        }
    }

    #[test]
    fn test_previous_frame_is_stretched_to_preview_size() {
        // A uniform previous frame stays uniform after resampling
        // (up to resampler rounding), so the blend stays checkable.
        let current = solid(8, 6, [80, 80, 80]);
        let previous = solid(4, 12, [160, 160, 160]);

        let out = composite(&current, Some(&previous), 0.5);
        assert_eq!(out.dimensions(), (8, 6));
        for pixel in out.pixels() {
            for &value in &pixel.0 {
                assert!(
                    (value as i16 - 120).abs() <= 1,
                    "expected ~120, got {}",
                    value
                );
            }
        }
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let mut current = solid(5, 5, [0, 0, 0]);
        for (i, pixel) in current.pixels_mut().enumerate() {
            pixel.0 = [(i * 7 % 256) as u8, (i * 13 % 256) as u8, (i * 29 % 256) as u8];
        }
        let previous = solid(3, 3, [90, 45, 180]);

        let a = composite(&current, Some(&previous), 0.7);
        let b = composite(&current, Some(&previous), 0.7);
        assert_eq!(a, b);
    }
}
