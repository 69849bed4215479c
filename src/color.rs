//! Color representations shared by all stages.

use std::fmt;
use std::str::FromStr;

use palette::{Hsl, IntoColor, Lab, Srgb};

use crate::error::PaletteError;

/// 8-bit sRGB triple.
pub type Rgb = [u8; 3];

/// CIE L*a*b* (D65) of an sRGB color.
pub fn to_lab(rgb: Rgb) -> Lab {
    Srgb::<u8>::new(rgb[0], rgb[1], rgb[2]).into_linear().into_color()
}

/// Lab coordinates as a plain triple, the form stored in tables.
pub fn lab_triple(rgb: Rgb) -> [f32; 3] {
    let lab = to_lab(rgb);
    [lab.l, lab.a, lab.b]
}

/// Nearest 8-bit sRGB color of a Lab point.
pub fn lab_to_rgb(lab: Lab) -> Rgb {
    let rgb_f32: Srgb<f32> = Srgb::from_linear(lab.into_color());
    let c: Srgb<u8> = rgb_f32.into_format::<u8>();
    [c.red, c.green, c.blue]
}

/// HSL with hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
pub fn to_hsl(rgb: Rgb) -> [f32; 3] {
    let hsl: Hsl = Srgb::<u8>::new(rgb[0], rgb[1], rgb[2]).into_format::<f32>().into_color();
    [hsl.hue.into_positive_degrees(), hsl.saturation, hsl.lightness]
}

/// CSS-like label used as a legend swatch, e.g. `RGB(255,0,0)`.
pub fn rgb_label(rgb: Rgb) -> String {
    format!("RGB({},{},{})", rgb[0], rgb[1], rgb[2])
}

/// Parse a `[a, b, c]` (or `(a, b, c)`) list literal.
pub fn parse_triple<T: FromStr>(field: &'static str, text: &str) -> Result<[T; 3], PaletteError> {
    let malformed = || PaletteError::MalformedField {
        field,
        value: text.to_string(),
    };

    let inner = text
        .trim()
        .strip_prefix(['[', '('])
        .and_then(|s| s.strip_suffix([']', ')']))
        .ok_or_else(malformed)?;

    let mut parts = inner.split(',').map(str::trim);
    let mut next = || -> Result<T, PaletteError> {
        parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)
    };
    let triple = [next()?, next()?, next()?];

    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok(triple)
}

/// Serde adapter storing a triple as a single `[a, b, c]` CSV cell.
pub mod triple {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<T, S>(value: &[T; 3], serializer: S) -> Result<S::Ok, S::Error>
    where
        T: fmt::Display,
        S: Serializer,
    {
        serializer.collect_str(&format_args!("[{}, {}, {}]", value[0], value[1], value[2]))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<[T; 3], D::Error>
    where
        T: FromStr,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_triple("triple", &text).map_err(de::Error::custom)
    }
}
