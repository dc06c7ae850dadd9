use std::collections::HashMap;
use std::sync::Arc;

use vello_cpu::kurbo::Shape as _;

use crate::assets::color::ColorDef;
use crate::assets::decode::ImageData;
use crate::assets::text::{FontSpec, ShapedText, TextLayoutEngine, TextMetrics, draw_glyphs};
use crate::foundation::core::{Affine, Canvas, Point, Rect};
use crate::foundation::error::{StrataError, StrataResult};
use crate::render::composite::{clear_region, over_in_place};
use crate::render::filter::Filter;
use crate::render::surface::{FrameRGBA, Surface};

/// Options shared by every [`CpuSurface`] created from them.
#[derive(Debug, Clone, Default)]
pub struct CpuSurfaceOpts {
    pub(crate) fonts: Vec<(String, Arc<Vec<u8>>)>,
}

impl CpuSurfaceOpts {
    /// Register font bytes under `alias` (e.g. `"Arial"` or `"ui"`). The first font registered is
    /// the fallback for families no font was registered for.
    pub fn with_font(mut self, alias: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.fonts.push((alias.into(), Arc::new(bytes)));
        self
    }
}

#[derive(Clone, Debug)]
struct DrawState {
    opacity: f64,
    filter: Filter,
    fill: [u8; 4],
    stroke: [u8; 4],
    line_width: f64,
    font: FontSpec,
}

impl Default for DrawState {
    fn default() -> Self {
        let black = ColorDef::BLACK.to_rgba8();
        Self {
            opacity: 1.0,
            filter: Filter::default(),
            fill: black,
            stroke: black,
            line_width: 1.0,
            font: FontSpec::default(),
        }
    }
}

/// Raster surface backed by a retained premultiplied RGBA8 pixmap.
///
/// Shapes and images are rasterized with `vello_cpu`, text is shaped with `parley`. Each primitive
/// renders into a scratch pixmap that is then filtered and composited source-over onto the retained
/// pixels with the current opacity, so draw state never leaks between calls.
pub struct CpuSurface {
    canvas: Canvas,
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
    scratch: vello_cpu::Pixmap,
    base: Affine,
    state: DrawState,
    stack: Vec<DrawState>,
    text: TextLayoutEngine,
    image_cache: HashMap<u64, vello_cpu::Image>,
    detached: bool,
}

fn dims(canvas: Canvas) -> StrataResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| StrataError::surface("surface width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| StrataError::surface("surface height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(StrataError::surface("surface must be non-empty"));
    }
    Ok((w, h))
}

impl CpuSurface {
    /// Allocate a transparent surface.
    pub fn new(canvas: Canvas, opts: &CpuSurfaceOpts) -> StrataResult<Self> {
        let (width, height) = dims(canvas)?;
        let mut text = TextLayoutEngine::new();
        for (alias, bytes) in &opts.fonts {
            text.register_font(alias, bytes.as_ref().clone())?;
        }
        Ok(Self {
            canvas,
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(width, height),
            scratch: vello_cpu::Pixmap::new(width, height),
            base: Affine::IDENTITY,
            state: DrawState::default(),
            stack: Vec::new(),
            text,
            image_cache: HashMap::new(),
            detached: false,
        })
    }

    /// Register an additional font on this surface only.
    pub fn register_font(&mut self, alias: &str, bytes: Vec<u8>) -> StrataResult<()> {
        self.text.register_font(alias, bytes)
    }

    fn paint(
        &mut self,
        f: impl FnOnce(&mut vello_cpu::RenderContext, &DrawState, vello_cpu::kurbo::Affine),
    ) {
        if self.detached || self.state.opacity <= 0.0 {
            return;
        }
        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        f(&mut ctx, &self.state, affine_to_cpu(self.base));

        self.scratch.data_as_u8_slice_mut().fill(0);
        ctx.flush();
        ctx.render_to_pixmap(&mut self.scratch);

        if !self.state.filter.is_identity() {
            self.state
                .filter
                .apply_premul(self.scratch.data_as_u8_slice_mut());
        }
        if let Err(e) = over_in_place(
            self.pixmap.data_as_u8_slice_mut(),
            self.scratch.data_as_u8_slice(),
            self.state.opacity,
        ) {
            tracing::warn!(error = %e, "dropping primitive that failed to composite");
        }
    }

    fn image_paint_for(&mut self, image: &ImageData) -> Option<vello_cpu::Image> {
        if let Some(p) = self.image_cache.get(&image.id()) {
            return Some(p.clone());
        }
        let pixmap = match pixmap_from_premul_bytes(&image.rgba8_premul, image.width, image.height)
        {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(image = image.id(), error = %e, "cannot upload image");
                return None;
            }
        };
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.image_cache.insert(image.id(), paint.clone());
        Some(paint)
    }

    fn shape(&mut self, text: &str) -> Option<ShapedText> {
        let shaped = self.text.shape(text, &self.state.font);
        if shaped.is_none() && !self.text.has_fonts() {
            tracing::debug!(
                family = %self.state.font.family,
                "no font registered; text is measured but not rasterized"
            );
        }
        shaped
    }

    fn paint_text(&mut self, text: &str, origin: Point, stroke: bool) {
        let Some(shaped) = self.shape(text) else {
            return;
        };
        self.paint(move |ctx, st, base| {
            ctx.set_transform(base * vello_cpu::kurbo::Affine::translate((origin.x, origin.y)));
            let [r, g, b, a] = if stroke { st.stroke } else { st.fill };
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            if stroke {
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(st.line_width));
            }
            draw_glyphs(ctx, &shaped, stroke);
        });
    }
}

impl Surface for CpuSurface {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn set_opacity(&mut self, opacity: f64) {
        if opacity.is_finite() {
            self.state.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    fn set_filter(&mut self, filter: &str) {
        self.state.filter = Filter::parse(filter);
    }

    fn set_fill_color(&mut self, color: &str) {
        match ColorDef::parse(color) {
            Some(c) => self.state.fill = c.to_rgba8(),
            None => tracing::debug!(%color, "keeping fill color; cannot parse"),
        }
    }

    fn set_stroke(&mut self, width: f64, color: &str) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
        match ColorDef::parse(color) {
            Some(c) => self.state.stroke = c.to_rgba8(),
            None => tracing::debug!(%color, "keeping stroke color; cannot parse"),
        }
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.state.font = font.clone();
    }

    fn clear_rect(&mut self, rect: Rect) {
        let px = self.base.transform_rect_bbox(rect);
        clear_region(self.pixmap.data_as_u8_slice_mut(), self.canvas, px);
    }

    fn fill_rect(&mut self, rect: Rect) {
        let r = rect_to_cpu(rect);
        self.paint(|ctx, st, base| {
            ctx.set_transform(base);
            let [cr, cg, cb, ca] = st.fill;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(cr, cg, cb, ca));
            ctx.fill_rect(&r);
        });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let r = rect_to_cpu(rect);
        self.paint(|ctx, st, base| {
            ctx.set_transform(base);
            let [cr, cg, cb, ca] = st.stroke;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(cr, cg, cb, ca));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(st.line_width));
            ctx.stroke_rect(&r);
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64) {
        let path = vello_cpu::kurbo::Circle::new((center.x, center.y), radius.max(0.0)).to_path(0.1);
        self.paint(|ctx, st, base| {
            ctx.set_transform(base);
            let [cr, cg, cb, ca] = st.fill;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(cr, cg, cb, ca));
            ctx.fill_path(&path);
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64) {
        let path = vello_cpu::kurbo::Circle::new((center.x, center.y), radius.max(0.0)).to_path(0.1);
        self.paint(|ctx, st, base| {
            ctx.set_transform(base);
            let [cr, cg, cb, ca] = st.stroke;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(cr, cg, cb, ca));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(st.line_width));
            ctx.stroke_path(&path);
        });
    }

    fn fill_text(&mut self, text: &str, origin: Point) {
        self.paint_text(text, origin, false);
    }

    fn stroke_text(&mut self, text: &str, origin: Point) {
        self.paint_text(text, origin, true);
    }

    fn measure_text(&mut self, text: &str) -> TextMetrics {
        let font = self.state.font.clone();
        self.text.measure(text, &font)
    }

    fn draw_image(&mut self, image: &ImageData, src: Rect, dst: Rect) {
        if src.width() <= 0.0 || src.height() <= 0.0 {
            return;
        }
        let Some(img) = self.image_paint_for(image) else {
            return;
        };
        let placement = vello_cpu::kurbo::Affine::translate((dst.x0, dst.y0))
            * vello_cpu::kurbo::Affine::scale_non_uniform(
                dst.width() / src.width(),
                dst.height() / src.height(),
            )
            * vello_cpu::kurbo::Affine::translate((-src.x0, -src.y0));
        let src_rect = rect_to_cpu(src);
        self.paint(move |ctx, _st, base| {
            ctx.set_transform(base * placement);
            ctx.set_paint(img);
            ctx.fill_rect(&src_rect);
        });
    }

    fn resize(&mut self, canvas: Canvas) {
        let canvas = match dims(canvas) {
            Ok(_) => canvas,
            Err(e) => {
                tracing::warn!(
                    width = canvas.width,
                    height = canvas.height,
                    error = %e,
                    "clamping surface resize"
                );
                Canvas {
                    width: canvas.width.clamp(1, u32::from(u16::MAX)),
                    height: canvas.height.clamp(1, u32::from(u16::MAX)),
                }
            }
        };
        self.canvas = canvas;
        self.width = canvas.width as u16;
        self.height = canvas.height as u16;
        self.pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.scratch = vello_cpu::Pixmap::new(self.width, self.height);
        self.base = Affine::IDENTITY;
        self.state = DrawState::default();
        self.stack.clear();
    }

    fn scale(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio > 0.0 {
            self.base *= Affine::scale(ratio);
        }
    }

    fn detach(&mut self) {
        self.detached = true;
        self.image_cache.clear();
    }

    fn snapshot(&self) -> Option<FrameRGBA> {
        Some(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> StrataResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StrataError::surface("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StrataError::surface("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(StrataError::surface("pixmap byte len mismatch"));
    }
    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in bytes.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
