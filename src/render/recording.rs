use std::cell::RefCell;
use std::rc::Rc;

use crate::assets::decode::ImageData;
use crate::assets::text::{FontSpec, TextMetrics, approximate_metrics};
use crate::foundation::core::{Canvas, Point, Rect};
use crate::render::surface::Surface;

/// One call received by a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCall {
    Save,
    Restore,
    SetOpacity(f64),
    SetFilter(String),
    SetFillColor(String),
    SetStroke { width: f64, color: String },
    SetFont(FontSpec),
    ClearRect(Rect),
    FillRect(Rect),
    StrokeRect(Rect),
    FillCircle { center: Point, radius: f64 },
    StrokeCircle { center: Point, radius: f64 },
    FillText { text: String, origin: Point },
    StrokeText { text: String, origin: Point },
    MeasureText(String),
    DrawImage { image: u64, src: Rect, dst: Rect },
    Resize(Canvas),
    Scale(f64),
    Detach,
}

impl SurfaceCall {
    /// `true` for calls that change pixels.
    pub fn is_paint(&self) -> bool {
        matches!(
            self,
            Self::ClearRect(_)
                | Self::FillRect(_)
                | Self::StrokeRect(_)
                | Self::FillCircle { .. }
                | Self::StrokeCircle { .. }
                | Self::FillText { .. }
                | Self::StrokeText { .. }
                | Self::DrawImage { .. }
        )
    }
}

/// Shared view of the calls recorded by a [`RecordingSurface`].
///
/// Stays readable after the surface itself has been moved into a layer.
#[derive(Clone, Debug, Default)]
pub struct SurfaceLog(Rc<RefCell<Vec<SurfaceCall>>>);

impl SurfaceLog {
    /// Every recorded call in order.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.0.borrow().clone()
    }

    /// Only the pixel-changing calls, in order.
    pub fn paints(&self) -> Vec<SurfaceCall> {
        self.0
            .borrow()
            .iter()
            .filter(|c| c.is_paint())
            .cloned()
            .collect()
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, call: SurfaceCall) {
        self.0.borrow_mut().push(call);
    }
}

/// Headless surface that records calls instead of rasterizing.
///
/// Text is measured with a fixed advance of half the font size per character and a descent of one
/// font size.
#[derive(Debug)]
pub struct RecordingSurface {
    canvas: Canvas,
    log: SurfaceLog,
    font: FontSpec,
    font_stack: Vec<FontSpec>,
}

impl RecordingSurface {
    /// Create a recording surface of the given size.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            log: SurfaceLog::default(),
            font: FontSpec::default(),
            font_stack: Vec::new(),
        }
    }

    /// Handle to the recorded calls.
    pub fn log(&self) -> SurfaceLog {
        self.log.clone()
    }
}

impl Surface for RecordingSurface {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn save(&mut self) {
        self.font_stack.push(self.font.clone());
        self.log.push(SurfaceCall::Save);
    }

    fn restore(&mut self) {
        if let Some(font) = self.font_stack.pop() {
            self.font = font;
        }
        self.log.push(SurfaceCall::Restore);
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.log.push(SurfaceCall::SetOpacity(opacity));
    }

    fn set_filter(&mut self, filter: &str) {
        self.log.push(SurfaceCall::SetFilter(filter.to_owned()));
    }

    fn set_fill_color(&mut self, color: &str) {
        self.log.push(SurfaceCall::SetFillColor(color.to_owned()));
    }

    fn set_stroke(&mut self, width: f64, color: &str) {
        self.log.push(SurfaceCall::SetStroke {
            width,
            color: color.to_owned(),
        });
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.font = font.clone();
        self.log.push(SurfaceCall::SetFont(font.clone()));
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.log.push(SurfaceCall::ClearRect(rect));
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.log.push(SurfaceCall::FillRect(rect));
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.log.push(SurfaceCall::StrokeRect(rect));
    }

    fn fill_circle(&mut self, center: Point, radius: f64) {
        self.log.push(SurfaceCall::FillCircle { center, radius });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64) {
        self.log.push(SurfaceCall::StrokeCircle { center, radius });
    }

    fn fill_text(&mut self, text: &str, origin: Point) {
        self.log.push(SurfaceCall::FillText {
            text: text.to_owned(),
            origin,
        });
    }

    fn stroke_text(&mut self, text: &str, origin: Point) {
        self.log.push(SurfaceCall::StrokeText {
            text: text.to_owned(),
            origin,
        });
    }

    fn measure_text(&mut self, text: &str) -> TextMetrics {
        self.log.push(SurfaceCall::MeasureText(text.to_owned()));
        approximate_metrics(text, &self.font)
    }

    fn draw_image(&mut self, image: &ImageData, src: Rect, dst: Rect) {
        self.log.push(SurfaceCall::DrawImage {
            image: image.id(),
            src,
            dst,
        });
    }

    fn resize(&mut self, canvas: Canvas) {
        self.canvas = canvas;
        self.font = FontSpec::default();
        self.font_stack.clear();
        self.log.push(SurfaceCall::Resize(canvas));
    }

    fn scale(&mut self, ratio: f64) {
        self.log.push(SurfaceCall::Scale(ratio));
    }

    fn detach(&mut self) {
        self.log.push(SurfaceCall::Detach);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/recording.rs"]
mod tests;
