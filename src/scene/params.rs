//! Parameter records for the layer draw primitives.

use crate::assets::image::ImageResource;

/// Optional styling shared by every primitive. Missing fields leave the surface's state alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Style {
    /// Opacity in `[0, 1]`. `Some(0.0)` is applied as fully transparent rather than treated as
    /// unset, so the primitive paints nothing.
    pub opacity: Option<f64>,
    pub filter: Option<String>,
    /// Fill color.
    pub color: Option<String>,
    /// Border spec, e.g. `"2px solid #fff"`. See [`BorderSpec`].
    pub border: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RectParams {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub style: Style,
}

/// A circle whose bounding box has its top-left corner at `(x, y)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CircleParams {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub style: Style,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextParams {
    pub x: f64,
    pub y: f64,
    pub text: String,
    /// Font family.
    pub font: String,
    /// Font size in pixels.
    pub size: f64,
    pub style: Style,
}

/// Draw the `width`x`height` region at `(src_x, src_y)` of `image` into a `dw`x`dh` box at
/// `(x, y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageParams {
    pub x: f64,
    pub y: f64,
    pub image: ImageResource,
    pub src_x: f64,
    pub src_y: f64,
    pub width: f64,
    pub height: f64,
    pub dw: f64,
    pub dh: f64,
    pub style: Style,
}

/// Parsed border descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct BorderSpec {
    pub width: f64,
    pub color: String,
}

impl BorderSpec {
    /// Tolerant parse of `"<width>[px] [style] <color>"`.
    ///
    /// The width is the leading integer of the first token and falls back to 1 when missing or not
    /// positive. The color is the last token, `#000` when there is none. A single token serves as
    /// both.
    pub fn parse(spec: &str) -> Self {
        let tokens: Vec<&str> = spec.split_whitespace().collect();
        let width = tokens
            .first()
            .and_then(|t| leading_int(t))
            .filter(|w| *w > 0)
            .map_or(1.0, |w| w as f64);
        let color = tokens.last().copied().unwrap_or("#000").to_string();
        Self { width, color }
    }
}

fn leading_int(token: &str) -> Option<i64> {
    let body = token.strip_prefix(['+', '-']).unwrap_or(token);
    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let end = token.len() - body.len() + digits;
    token[..end].parse().ok()
}

#[cfg(test)]
#[path = "../../tests/unit/scene/params.rs"]
mod tests;
