use crate::assets::decode::{ImageData, unpremultiply_rgba8_in_place};
use crate::assets::text::{FontSpec, TextMetrics};
use crate::foundation::core::{Canvas, Point, Rect};

/// A layer's pixels read back from its surface.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Convert to straight alpha (as expected by PNG encoders).
    pub fn into_straight(mut self) -> Self {
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut self.data);
            self.premultiplied = false;
        }
        self
    }
}

/// Host drawing surface a [`Layer`](crate::Layer) renders into.
///
/// The surface carries transient draw state (opacity, filter, fill, stroke, font) that the layer
/// brackets with [`Surface::save`]/[`Surface::restore`] around every primitive call. Text is
/// positioned by its top edge. Colors and filters arrive as the caller's strings; a surface keeps
/// its current value when it cannot parse one.
///
/// Drawing methods are infallible: invalid geometry does whatever the implementation does with it.
pub trait Surface {
    /// Current pixel dimensions.
    fn canvas(&self) -> Canvas;

    /// Push the transient draw state.
    fn save(&mut self);
    /// Pop the transient draw state pushed by the matching [`Surface::save`].
    fn restore(&mut self);

    /// Global opacity applied to subsequent draws.
    fn set_opacity(&mut self, opacity: f64);
    /// Pixel filter applied to subsequent draws.
    fn set_filter(&mut self, filter: &str);
    /// Fill color for subsequent fills.
    fn set_fill_color(&mut self, color: &str);
    /// Stroke width and color for subsequent strokes.
    fn set_stroke(&mut self, width: f64, color: &str);
    /// Font for subsequent text draws and measurements.
    fn set_font(&mut self, font: &FontSpec);

    /// Erase a region to transparent. Ignores transient state.
    fn clear_rect(&mut self, rect: Rect);
    /// Fill an axis-aligned rectangle.
    fn fill_rect(&mut self, rect: Rect);
    /// Stroke an axis-aligned rectangle.
    fn stroke_rect(&mut self, rect: Rect);
    /// Fill a full circle.
    fn fill_circle(&mut self, center: Point, radius: f64);
    /// Stroke a full circle.
    fn stroke_circle(&mut self, center: Point, radius: f64);
    /// Fill text with its top edge at `origin.y`.
    fn fill_text(&mut self, text: &str, origin: Point);
    /// Stroke text outlines with their top edge at `origin.y`.
    fn stroke_text(&mut self, text: &str, origin: Point);
    /// Measure text with the current font.
    fn measure_text(&mut self, text: &str) -> TextMetrics;
    /// Blit the `src` region of `image` into the `dst` region of the surface.
    fn draw_image(&mut self, image: &ImageData, src: Rect, dst: Rect);

    /// Reallocate to `canvas`. Resets content, draw state and scale.
    fn resize(&mut self, canvas: Canvas);
    /// Multiply the drawing-space scale by `ratio`.
    fn scale(&mut self, ratio: f64);

    /// Called once when the owning layer is destroyed.
    fn detach(&mut self) {}

    /// Read back pixels, when the implementation keeps any.
    fn snapshot(&self) -> Option<FrameRGBA> {
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
