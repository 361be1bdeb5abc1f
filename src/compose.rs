//! Canvas composition: bevel padding, aspect-preserving fit and centering.
//!
//! Pasting is alpha-masked. Onto a transparent canvas a subject pixel is
//! copied as-is wherever its alpha is non-zero; onto an opaque canvas each
//! channel is blended linearly:
//! `out = (subject * alpha + background * (255 - alpha)) / 255`

use image::{imageops, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

use crate::config::{RunConfig, MAX_CANVAS_PIXELS};
use crate::error::{Error, Result};

/// Final pixels of one photo: RGBA on a transparent canvas, RGB when flattened.
#[derive(Debug, Clone, PartialEq)]
pub enum Composite {
    /// Transparent background.
    Rgba(RgbaImage),
    /// Opaque background.
    Rgb(RgbImage),
}

impl Composite {
    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Composite::Rgba(img) => img.dimensions(),
            Composite::Rgb(img) => img.dimensions(),
        }
    }

    /// Convert into a [`DynamicImage`] for encoding.
    #[must_use]
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Composite::Rgba(img) => DynamicImage::ImageRgba8(img),
            Composite::Rgb(img) => DynamicImage::ImageRgb8(img),
        }
    }
}

/// Padding in pixels for a subject of `width` x `height`.
///
/// `pad_x = floor(width * side / 100)`, `pad_y = floor(height * top_bottom / 100)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bevel_padding(width: u32, height: u32, side_percent: f64, top_bottom_percent: f64) -> (u32, u32) {
    let pad_x = (f64::from(width) * side_percent / 100.0).floor();
    let pad_y = (f64::from(height) * top_bottom_percent / 100.0).floor();
    // Float-to-int casts saturate, so absurd bevels surface as overflow below.
    (pad_x as u32, pad_y as u32)
}

/// Place `subject` centered on a transparent canvas grown by the bevel padding.
///
/// # Errors
///
/// Returns [`Error::Composition`] if the subject is empty or the padded size
/// does not fit in `u32` or exceeds [`MAX_CANVAS_PIXELS`].
pub fn expand_with_bevel(
    subject: &RgbaImage,
    side_percent: f64,
    top_bottom_percent: f64,
) -> Result<RgbaImage> {
    let (w, h) = subject.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::Composition(format!("subject has no area ({w}x{h})")));
    }

    let (pad_x, pad_y) = bevel_padding(w, h, side_percent, top_bottom_percent);
    let grown = |len: u32, pad: u32| {
        pad.checked_mul(2)
            .and_then(|p| p.checked_add(len))
            .ok_or_else(|| Error::Composition(format!("bevel padding of {pad}px overflows")))
    };
    let new_w = grown(w, pad_x)?;
    let new_h = grown(h, pad_y)?;
    check_area(new_w, new_h)?;

    let mut expanded = RgbaImage::new(new_w, new_h);
    paste_masked(&mut expanded, subject, pad_x, pad_y);
    Ok(expanded)
}

fn check_area(width: u32, height: u32) -> Result<()> {
    if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
        return Err(Error::Composition(format!(
            "{width}x{height} exceeds the {MAX_CANVAS_PIXELS}-pixel canvas limit"
        )));
    }
    Ok(())
}

/// Size that fits `width` x `height` inside `target` without distortion.
///
/// If the image is wider than the target, width is pinned to the target width
/// and height is `round(target_w * h / w)`; otherwise height is pinned and
/// width is `round(target_h * w / h)`. Neither result drops below 1 pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fit_dimensions(width: u32, height: u32, target: (u32, u32)) -> (u32, u32) {
    let (target_w, target_h) = target;
    let (w, h) = (u64::from(width), u64::from(height));

    // w/h > tw/th, compared without division.
    if w * u64::from(target_h) > u64::from(target_w) * h {
        let resized_h = (f64::from(target_w) * f64::from(height) / f64::from(width)).round();
        (target_w, (resized_h as u32).max(1).min(target_h))
    } else {
        let resized_w = (f64::from(target_h) * f64::from(width) / f64::from(height)).round();
        ((resized_w as u32).max(1).min(target_w), target_h)
    }
}

/// Top-left offset that centers `inner` in `outer`.
///
/// Floor division: an odd leftover pixel lands in the right/bottom margin.
#[must_use]
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// Lanczos3 resize in premultiplied alpha.
///
/// Color is weighted by alpha while resampling, so transparent pixels
/// contribute nothing to the color of the subject's edges.
#[must_use]
pub fn resize_premultiplied(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut premultiplied = image.clone();
    for px in premultiplied.pixels_mut() {
        *px = premultiply(*px);
    }
    let mut resized = imageops::resize(&premultiplied, width, height, imageops::FilterType::Lanczos3);
    for px in resized.pixels_mut() {
        *px = unpremultiply(*px);
    }
    resized
}

#[allow(clippy::cast_possible_truncation)]
fn premultiply(px: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(px[3]);
    let scale = |c: u8| ((u32::from(c) * alpha + 127) / 255) as u8;
    Rgba([scale(px[0]), scale(px[1]), scale(px[2]), px[3]])
}

#[allow(clippy::cast_possible_truncation)]
fn unpremultiply(px: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(px[3]);
    if alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let scale = |c: u8| ((u32::from(c) * 255 + alpha / 2) / alpha).min(255) as u8;
    Rgba([scale(px[0]), scale(px[1]), scale(px[2]), px[3]])
}

/// Copy every non-transparent pixel of `src` onto `canvas` at `(x, y)`.
///
/// Pixels falling outside the canvas are clipped.
pub fn paste_masked(canvas: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    for (sx, sy, px) in src.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        let (cx, cy) = (x + sx, y + sy);
        if cx < canvas.width() && cy < canvas.height() {
            canvas.put_pixel(cx, cy, *px);
        }
    }
}

/// Blend `src` onto an opaque `canvas` at `(x, y)` using its alpha as the mask.
///
/// Pixels falling outside the canvas are clipped.
pub fn blend_onto(canvas: &mut RgbImage, src: &RgbaImage, x: u32, y: u32) {
    for (sx, sy, px) in src.enumerate_pixels() {
        let (cx, cy) = (x + sx, y + sy);
        if cx >= canvas.width() || cy >= canvas.height() {
            continue;
        }
        let bg = canvas.get_pixel_mut(cx, cy);
        *bg = blend_pixel(*px, *bg);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn blend_pixel(fg: Rgba<u8>, bg: Rgb<u8>) -> Rgb<u8> {
    let alpha = u32::from(fg[3]);
    let mix = |f: u8, b: u8| -> u8 {
        // Rounded integer division; the result never exceeds 255.
        ((u32::from(f) * alpha + u32::from(b) * (255 - alpha) + 127) / 255) as u8
    };
    Rgb([mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2])])
}

/// Flatten an RGBA image onto a solid background of the same size.
#[must_use]
pub fn flatten(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(image.width(), image.height(), background);
    blend_onto(&mut canvas, image, 0, 0);
    canvas
}

/// Produce the final image for a cropped subject.
///
/// Applies bevel padding, then either keeps the natural size or fits the
/// result onto a centered canvas of the configured target size. Transparent
/// runs yield [`Composite::Rgba`], opaque runs [`Composite::Rgb`].
///
/// # Errors
///
/// Returns [`Error::Composition`] if the subject is empty, the target size
/// has a zero dimension, or the padded size overflows or exceeds
/// [`MAX_CANVAS_PIXELS`].
pub fn compose(subject: &RgbaImage, config: &RunConfig) -> Result<Composite> {
    let expanded = expand_with_bevel(
        subject,
        config.side_bevel_percent(),
        config.top_bottom_bevel_percent(),
    )?;

    let Some((target_w, target_h)) = config.target_size() else {
        return Ok(if config.transparent_background() {
            Composite::Rgba(expanded)
        } else {
            Composite::Rgb(flatten(&expanded, config.background_color()))
        });
    };

    if target_w == 0 || target_h == 0 {
        return Err(Error::Composition(format!(
            "target size must be positive, got {target_w}x{target_h}"
        )));
    }
    check_area(target_w, target_h)?;

    let (resized_w, resized_h) =
        fit_dimensions(expanded.width(), expanded.height(), (target_w, target_h));
    let resized = resize_premultiplied(&expanded, resized_w, resized_h);
    let (offset_x, offset_y) = center_offset((target_w, target_h), (resized_w, resized_h));
    log::debug!(
        "fit {}x{} into {target_w}x{target_h} as {resized_w}x{resized_h} at ({offset_x}, {offset_y})",
        expanded.width(),
        expanded.height()
    );

    if config.transparent_background() {
        let mut canvas = RgbaImage::new(target_w, target_h);
        paste_masked(&mut canvas, &resized, offset_x, offset_y);
        Ok(Composite::Rgba(canvas))
    } else {
        let mut canvas = RgbImage::from_pixel(target_w, target_h, config.background_color());
        blend_onto(&mut canvas, &resized, offset_x, offset_y);
        Ok(Composite::Rgb(canvas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizeSelection;

    fn solid(w: u32, h: u32, px: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(w, h, px)
    }

    #[test]
    fn bevel_padding_floors_fractions_of_subject_size() {
        assert_eq!(bevel_padding(100, 50, 10.0, 10.0), (10, 5));
        assert_eq!(bevel_padding(33, 7, 10.0, 50.0), (3, 3));
        assert_eq!(bevel_padding(9, 9, 0.0, 0.0), (0, 0));
    }

    #[test]
    fn expanded_width_is_subject_plus_twice_floor_padding() {
        for (w, p) in [(100u32, 12.5f64), (37, 3.0), (1, 99.0), (250, 0.4)] {
            let expanded = expand_with_bevel(&solid(w, 10, Rgba([1, 2, 3, 255])), p, 0.0).unwrap();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pad = (f64::from(w) * p / 100.0).floor() as u32;
            assert_eq!(expanded.width(), w + 2 * pad, "w={w} p={p}");
            assert_eq!(expanded.height(), 10);
        }
    }

    #[test]
    fn expansion_keeps_subject_alpha_and_leaves_border_transparent() {
        let mut subject = solid(4, 4, Rgba([10, 20, 30, 128]));
        subject.put_pixel(0, 0, Rgba([99, 99, 99, 0]));
        let expanded = expand_with_bevel(&subject, 50.0, 25.0).unwrap();

        assert_eq!(expanded.dimensions(), (8, 6));
        assert_eq!(expanded.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(expanded.get_pixel(2, 1), &Rgba([0, 0, 0, 0]));
        assert_eq!(expanded.get_pixel(3, 2), &Rgba([10, 20, 30, 128]));
        assert_eq!(expanded.get_pixel(5, 4), &Rgba([10, 20, 30, 128]));
    }

    #[test]
    fn empty_subject_is_composition_error() {
        let err = compose(&RgbaImage::new(0, 5), &RunConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Composition(_)));
    }

    #[test]
    fn fit_dimensions_preserves_aspect_and_fills_one_axis() {
        let targets = [(256, 256), (300, 100), (100, 300), (1, 1), (1024, 768)];
        let subjects = [(100, 200), (200, 100), (1, 1), (1000, 3), (3, 1000), (640, 480)];
        for &target in &targets {
            for &(w, h) in &subjects {
                let (rw, rh) = fit_dimensions(w, h, target);
                assert!(rw <= target.0 && rh <= target.1, "{w}x{h} -> {rw}x{rh} in {target:?}");
                assert!(rw == target.0 || rh == target.1);
                assert!(rw >= 1 && rh >= 1);

                // One-pixel rounding tolerance on the free axis.
                let wider = u64::from(w) * u64::from(target.1) > u64::from(target.0) * u64::from(h);
                let (w, h, rw, rh) = (f64::from(w), f64::from(h), f64::from(rw), f64::from(rh));
                if wider {
                    assert!((rh - rw * h / w).abs() <= 1.0);
                } else {
                    assert!((rw - rh * w / h).abs() <= 1.0);
                }
            }
        }
    }

    #[test]
    fn fit_dimensions_example_values() {
        assert_eq!(fit_dimensions(100, 200, (256, 256)), (128, 256));
        assert_eq!(fit_dimensions(300, 100, (256, 256)), (256, 85));
        assert_eq!(fit_dimensions(50, 50, (256, 128)), (128, 128));
    }

    #[test]
    fn center_offset_stays_inside_canvas() {
        for outer in [(256, 256), (255, 101), (10, 3)] {
            for inner in [(128, 256), (1, 1), (255, 100), (10, 3), (9, 2)] {
                if inner.0 > outer.0 || inner.1 > outer.1 {
                    continue;
                }
                let (x, y) = center_offset(outer, inner);
                assert!(x + inner.0 <= outer.0 && y + inner.1 <= outer.1);
            }
        }
        // Odd leftover pixel goes to the right/bottom margin.
        assert_eq!(center_offset((11, 11), (4, 4)), (3, 3));
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn opaque_subject_ignores_background_color() {
        let subject = RgbaImage::from_fn(6, 4, |x, y| Rgba([(x * 40) as u8, (y * 60) as u8, 7, 255]));
        for bg in [Rgb([0, 0, 0]), Rgb([255, 255, 255]), Rgb([12, 200, 77])] {
            let flat = flatten(&subject, bg);
            for (x, y, px) in flat.enumerate_pixels() {
                let s = subject.get_pixel(x, y);
                assert_eq!(px, &Rgb([s[0], s[1], s[2]]));
            }
        }
    }

    #[test]
    fn blending_is_linear_in_alpha() {
        assert_eq!(blend_pixel(Rgba([200, 0, 100, 0]), Rgb([10, 20, 30])), Rgb([10, 20, 30]));
        assert_eq!(blend_pixel(Rgba([200, 0, 100, 255]), Rgb([10, 20, 30])), Rgb([200, 0, 100]));
        assert_eq!(blend_pixel(Rgba([255, 255, 255, 128]), Rgb([0, 0, 0])), Rgb([128, 128, 128]));
    }

    #[test]
    fn natural_size_transparent_returns_rgba_expanded() {
        let config = RunConfig::default().with_bevel(10.0, 20.0).unwrap();
        let out = compose(&solid(50, 40, Rgba([1, 1, 1, 255])), &config).unwrap();
        assert!(matches!(out, Composite::Rgba(_)));
        assert_eq!(out.dimensions(), (60, 56));
    }

    #[test]
    fn natural_size_opaque_flattens_padding_to_background() {
        let config = RunConfig::default()
            .with_background(Rgb([0, 0, 255]))
            .with_bevel(50.0, 0.0)
            .unwrap();
        let Composite::Rgb(out) = compose(&solid(2, 2, Rgba([255, 0, 0, 255])), &config).unwrap()
        else {
            panic!("expected RGB output");
        };
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn target_size_centers_subject_on_transparent_canvas() {
        let config = RunConfig::default()
            .with_size(SizeSelection::Preset(256, 256))
            .unwrap();
        let Composite::Rgba(out) = compose(&solid(100, 200, Rgba([0, 255, 0, 255])), &config).unwrap()
        else {
            panic!("expected RGBA output");
        };
        assert_eq!(out.dimensions(), (256, 256));
        assert_eq!(out.get_pixel(63, 128)[3], 0);
        assert_eq!(out.get_pixel(64, 128)[3], 255);
        assert_eq!(out.get_pixel(191, 128)[3], 255);
        assert_eq!(out.get_pixel(192, 128)[3], 0);
    }

    #[test]
    fn target_size_opaque_fills_margins_with_background() {
        let config = RunConfig::default()
            .with_background(Rgb([255, 255, 255]))
            .with_size(SizeSelection::Custom(40, 20))
            .unwrap();
        let out = compose(&solid(10, 10, Rgba([0, 0, 0, 255])), &config).unwrap();
        let Composite::Rgb(out) = out else {
            panic!("expected RGB output");
        };
        assert_eq!(out.dimensions(), (40, 20));
        assert_eq!(out.get_pixel(0, 10), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(20, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn downscaled_white_edges_stay_white() {
        let config = RunConfig::default()
            .with_bevel(50.0, 50.0)
            .unwrap()
            .with_size(SizeSelection::Custom(13, 13))
            .unwrap();
        let Composite::Rgba(out) = compose(&solid(20, 20, Rgba([255, 255, 255, 255])), &config).unwrap()
        else {
            panic!("expected RGBA output");
        };

        let edges: Vec<_> = out.pixels().filter(|p| (64..=250).contains(&p[3])).collect();
        assert!(!edges.is_empty(), "downscale should produce partially transparent edges");
        for px in edges {
            assert!(px[0] > 240 && px[1] > 240 && px[2] > 240, "dark fringe: {px:?}");
        }
    }

    #[test]
    fn premultiply_round_trip_keeps_color() {
        assert_eq!(unpremultiply(premultiply(Rgba([255, 255, 255, 100]))), Rgba([255, 255, 255, 100]));
        assert_eq!(unpremultiply(Rgba([7, 7, 7, 0])), Rgba([0, 0, 0, 0]));
        assert_eq!(premultiply(Rgba([200, 100, 0, 255])), Rgba([200, 100, 0, 255]));
    }

    #[test]
    fn bevel_is_applied_before_fitting_to_target() {
        // 100x200 with 50% side bevel expands to 200x200 and scales by 1.28.
        let config = RunConfig::default()
            .with_bevel(50.0, 0.0)
            .unwrap()
            .with_size(SizeSelection::Preset(256, 256))
            .unwrap();
        let Composite::Rgba(out) = compose(&solid(100, 200, Rgba([0, 0, 255, 255])), &config).unwrap()
        else {
            panic!("expected RGBA output");
        };
        assert_eq!(out.dimensions(), (256, 256));

        for y in [0, 128, 255] {
            for x in [0, 30, 56, 200, 226, 255] {
                assert_eq!(out.get_pixel(x, y)[3], 0, "margin at ({x}, {y})");
            }
            for x in [70, 128, 186] {
                assert_eq!(out.get_pixel(x, y), &Rgba([0, 0, 255, 255]), "subject at ({x}, {y})");
            }
        }
    }

    #[test]
    fn oversized_canvas_fails_without_allocating() {
        let config = RunConfig::default().with_bevel(1e6, 0.0).unwrap();
        let err = compose(&solid(100, 100, Rgba([1, 1, 1, 255])), &config).unwrap_err();
        assert!(matches!(err, Error::Composition(_)), "{err}");
    }
}
