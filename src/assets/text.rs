use crate::foundation::error::{StrataError, StrataResult};

/// Measured extent of a line of text drawn with a top baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
    /// Advance width in pixels.
    pub width: f64,
    /// Distance from the top edge down to the bottom of the glyphs, in pixels.
    pub descent: f64,
}

/// Font selection for text primitives.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FontSpec {
    /// Family name or alias registered with the surface.
    pub family: String,
    /// Font size in pixels.
    pub size_px: f64,
}

impl FontSpec {
    /// Create a font spec.
    pub fn new(family: impl Into<String>, size_px: f64) -> Self {
        Self {
            family: family.into(),
            size_px,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("sans-serif", 10.0)
    }
}

struct RegisteredFont {
    alias: String,
    family_name: String,
    font: vello_cpu::peniko::FontData,
}

/// A shaped line ready for glyph rendering.
pub(crate) struct ShapedText {
    pub(crate) layout: parley::Layout<()>,
    pub(crate) font: vello_cpu::peniko::FontData,
}

/// Stateful helper for shaping text with fonts registered from raw bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    fonts: Vec<RegisteredFont>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: Vec::new(),
        }
    }

    pub(crate) fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    /// Register font bytes under `alias`. The first registered font is the fallback for unknown
    /// families.
    pub(crate) fn register_font(&mut self, alias: &str, font_bytes: Vec<u8>) -> StrataResult<()> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| StrataError::asset("no font families registered from font bytes"))?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StrataError::asset("registered font family has no name"))?
            .to_string();

        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        self.fonts.retain(|f| f.alias != alias);
        self.fonts.push(RegisteredFont {
            alias: alias.to_owned(),
            family_name,
            font,
        });
        Ok(())
    }

    fn resolve(&self, family: &str) -> Option<&RegisteredFont> {
        self.fonts
            .iter()
            .find(|f| f.alias == family || f.family_name == family)
            .or_else(|| self.fonts.first())
    }

    /// Shape one unwrapped line. `None` when no font is registered.
    pub(crate) fn shape(&mut self, text: &str, font: &FontSpec) -> Option<ShapedText> {
        let size_px = font.size_px as f32;
        if !size_px.is_finite() || size_px <= 0.0 {
            return None;
        }
        let (family_name, font_data) = {
            let f = self.resolve(&font.family)?;
            (f.family_name.clone(), f.font.clone())
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        Some(ShapedText {
            layout,
            font: font_data,
        })
    }

    /// Measure text. Without registered fonts this falls back to a fixed advance of half the font
    /// size per character and a descent of one font size.
    pub(crate) fn measure(&mut self, text: &str, font: &FontSpec) -> TextMetrics {
        match self.shape(text, font) {
            Some(shaped) => metrics_of(&shaped, font.size_px),
            None => approximate_metrics(text, font),
        }
    }
}

/// Emit every glyph run of `shaped` into `ctx`, with the top edge of the first line at the
/// current transform's origin.
pub(crate) fn draw_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    shaped: &ShapedText,
    stroke: bool,
) {
    for line in shaped.layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            let builder = ctx
                .glyph_run(&shaped.font)
                .font_size(run.run().font_size());
            if stroke {
                builder.stroke_glyphs(glyphs);
            } else {
                builder.fill_glyphs(glyphs);
            }
        }
    }
}

/// Width is the layout advance. Descent is the lowest inked row below the top edge, so it depends
/// on the glyphs actually drawn. Falls back to the first line's ascent plus descent when the ink
/// scan cannot run.
pub(crate) fn metrics_of(shaped: &ShapedText, size_px: f64) -> TextMetrics {
    let layout = &shaped.layout;
    let descent = ink_descent(shaped, size_px).unwrap_or_else(|| {
        layout
            .lines()
            .next()
            .map(|line| {
                let m = line.metrics();
                f64::from(m.ascent + m.descent)
            })
            .unwrap_or(0.0)
    });
    TextMetrics {
        width: f64::from(layout.width()),
        descent,
    }
}

fn ink_descent(shaped: &ShapedText, size_px: f64) -> Option<f64> {
    // Glyphs may overhang the advance box, so leave one em of slack on every side but the top.
    let pad = size_px.max(1.0).ceil();
    let w = f64::from(shaped.layout.width()).ceil() + 2.0 * pad;
    let h = f64::from(shaped.layout.height()).ceil() + pad;
    if !(w.is_finite() && h.is_finite()) || w > f64::from(u16::MAX) || h > f64::from(u16::MAX) {
        return None;
    }
    let (w, h) = (w as u16, h as u16);

    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((pad, 0.0)));
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
    draw_glyphs(&mut ctx, shaped, false);
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);

    let row_len = usize::from(w) * 4;
    let lowest = pixmap
        .data_as_u8_slice()
        .chunks_exact(row_len)
        .rposition(|row| row.chunks_exact(4).any(|px| px[3] != 0));
    Some(lowest.map_or(0.0, |row| (row + 1) as f64))
}

pub(crate) fn approximate_metrics(text: &str, font: &FontSpec) -> TextMetrics {
    let size = font.size_px.max(0.0);
    TextMetrics {
        width: text.chars().count() as f64 * size * 0.5,
        descent: size,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
