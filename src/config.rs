//! Run configuration: canvas policy, background color and bevel padding.
//!
//! A [`RunConfig`] is built once per batch and validated on construction, so
//! a bad bevel or custom size aborts the run before any file is touched.

use std::fmt;
use std::str::FromStr;

use image::Rgb;

use crate::error::{Error, Result};

/// Fixed canvas sizes offered alongside `original` and custom sizes.
pub const PRESET_SIZES: [(u32, u32); 3] = [(256, 256), (512, 512), (1024, 1024)];

/// Largest canvas, in pixels, any stage may allocate (512 MiB of RGBA).
pub const MAX_CANVAS_PIXELS: u64 = 1 << 27;

/// Background color used in opaque mode when none is given.
pub const DEFAULT_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// How large the output canvas should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeSelection {
    /// Keep the natural size of the (bevelled) subject.
    #[default]
    Original,
    /// One of [`PRESET_SIZES`].
    Preset(u32, u32),
    /// Any other `WxH` canvas.
    Custom(u32, u32),
}

impl SizeSelection {
    /// Canvas dimensions, or `None` to keep the natural size.
    #[must_use]
    pub fn target_size(self) -> Option<(u32, u32)> {
        match self {
            SizeSelection::Original => None,
            SizeSelection::Preset(w, h) | SizeSelection::Custom(w, h) => Some((w, h)),
        }
    }

    /// Label used in output folder names: `Original` or `WxH`.
    #[must_use]
    pub fn label(self) -> String {
        match self.target_size() {
            None => "Original".to_string(),
            Some((w, h)) => format!("{w}x{h}"),
        }
    }
}

impl fmt::Display for SizeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for SizeSelection {
    type Err = Error;

    /// Parses `original` or `WxH`. Sizes matching a preset become
    /// [`SizeSelection::Preset`], anything else [`SizeSelection::Custom`].
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("original") {
            return Ok(SizeSelection::Original);
        }

        let invalid = || {
            Error::ConfigValidation(format!(
                "size must be `original` or WxH with positive integers, got `{s}`"
            ))
        };
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let w: u32 = w.trim().parse().map_err(|_| invalid())?;
        let h: u32 = h.trim().parse().map_err(|_| invalid())?;
        if w == 0 || h == 0 {
            return Err(invalid());
        }

        if PRESET_SIZES.contains(&(w, h)) {
            Ok(SizeSelection::Preset(w, h))
        } else {
            Ok(SizeSelection::Custom(w, h))
        }
    }
}

/// Parse a bevel percentage: a finite, non-negative number.
///
/// # Errors
///
/// Returns [`Error::ConfigValidation`] if the value does not parse or is negative.
pub fn parse_bevel(value: &str) -> Result<f64> {
    let percent: f64 = value.trim().parse().map_err(|_| {
        Error::ConfigValidation(format!("bevel must be a number, got `{value}`"))
    })?;
    check_bevel(percent)?;
    Ok(percent)
}

fn check_bevel(percent: f64) -> Result<()> {
    if percent.is_finite() && percent >= 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigValidation(format!(
            "bevel must be a non-negative number, got {percent}"
        )))
    }
}

/// Parse a background color: `#rgb`, `#rrggbb` (the `#` is optional), `white` or `black`.
///
/// # Errors
///
/// Returns [`Error::ConfigValidation`] for anything else.
pub fn parse_color(value: &str) -> Result<Rgb<u8>> {
    let s = value.trim();
    if s.eq_ignore_ascii_case("white") {
        return Ok(Rgb([255, 255, 255]));
    }
    if s.eq_ignore_ascii_case("black") {
        return Ok(Rgb([0, 0, 0]));
    }

    let invalid = || Error::ConfigValidation(format!("invalid background color `{value}`"));
    let hex = s.strip_prefix('#').unwrap_or(s);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = channel(&c.to_string())?;
                rgb[i] = v * 17;
            }
            Ok(Rgb(rgb))
        }
        6 => Ok(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        _ => Err(invalid()),
    }
}

/// Immutable configuration for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    transparent_background: bool,
    background_color: Rgb<u8>,
    size: SizeSelection,
    side_bevel_percent: f64,
    top_bottom_bevel_percent: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            transparent_background: true,
            background_color: DEFAULT_BACKGROUND,
            size: SizeSelection::Original,
            side_bevel_percent: 0.0,
            top_bottom_bevel_percent: 0.0,
        }
    }
}

impl RunConfig {
    /// Build a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if a bevel is negative or not finite,
    /// or the size has a zero dimension or more than [`MAX_CANVAS_PIXELS`] pixels.
    pub fn new(
        transparent_background: bool,
        background_color: Rgb<u8>,
        size: SizeSelection,
        side_bevel_percent: f64,
        top_bottom_bevel_percent: f64,
    ) -> Result<Self> {
        check_bevel(side_bevel_percent)?;
        check_bevel(top_bottom_bevel_percent)?;
        if let Some((w, h)) = size.target_size() {
            if w == 0 || h == 0 {
                return Err(Error::ConfigValidation(format!(
                    "target size must be positive, got {w}x{h}"
                )));
            }
            if u64::from(w) * u64::from(h) > MAX_CANVAS_PIXELS {
                return Err(Error::ConfigValidation(format!(
                    "target size {w}x{h} exceeds the {MAX_CANVAS_PIXELS}-pixel limit"
                )));
            }
        }

        Ok(Self {
            transparent_background,
            background_color,
            size,
            side_bevel_percent,
            top_bottom_bevel_percent,
        })
    }

    /// Switch to an opaque background of the given color.
    #[must_use]
    pub fn with_background(mut self, color: Rgb<u8>) -> Self {
        self.transparent_background = false;
        self.background_color = color;
        self
    }

    /// Change the canvas size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the size has a zero dimension
    /// or more than [`MAX_CANVAS_PIXELS`] pixels.
    pub fn with_size(self, size: SizeSelection) -> Result<Self> {
        Self::new(
            self.transparent_background,
            self.background_color,
            size,
            self.side_bevel_percent,
            self.top_bottom_bevel_percent,
        )
    }

    /// Change the bevel percentages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if either value is negative or not finite.
    pub fn with_bevel(self, side_percent: f64, top_bottom_percent: f64) -> Result<Self> {
        Self::new(
            self.transparent_background,
            self.background_color,
            self.size,
            side_percent,
            top_bottom_percent,
        )
    }

    /// Whether outputs keep a transparent background (RGBA) or are flattened (RGB).
    #[must_use]
    pub fn transparent_background(&self) -> bool {
        self.transparent_background
    }

    /// Color behind the subject in opaque mode.
    #[must_use]
    pub fn background_color(&self) -> Rgb<u8> {
        self.background_color
    }

    /// Selected canvas size.
    #[must_use]
    pub fn size(&self) -> SizeSelection {
        self.size
    }

    /// Canvas dimensions, or `None` to keep the natural size.
    #[must_use]
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.size.target_size()
    }

    /// Side padding as a percentage of the subject's width.
    #[must_use]
    pub fn side_bevel_percent(&self) -> f64 {
        self.side_bevel_percent
    }

    /// Top and bottom padding as a percentage of the subject's height.
    #[must_use]
    pub fn top_bottom_bevel_percent(&self) -> f64 {
        self.top_bottom_bevel_percent
    }
}
