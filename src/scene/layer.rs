use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::assets::image::{ImageResource, ImageState};
use crate::assets::text::FontSpec;
use crate::foundation::core::{Canvas, Point, Rect, Vector};
use crate::render::surface::{FrameRGBA, Surface};
use crate::scene::node::SharedSize;
use crate::scene::params::{BorderSpec, CircleParams, ImageParams, RectParams, Style, TextParams};
use crate::scene::view::View;

/// One primitive call, kept as data so it can wait in a layer's queue.
#[derive(Clone, Debug)]
pub(crate) enum DrawRequest {
    Rect(RectParams),
    Circle(CircleParams),
    Text {
        params: TextParams,
        target: SharedSize,
    },
    Image(ImageParams),
}

impl DrawRequest {
    fn kind(&self) -> &'static str {
        match self {
            Self::Rect(_) => "rect",
            Self::Circle(_) => "circle",
            Self::Text { .. } => "text",
            Self::Image(_) => "image",
        }
    }
}

/// The image draw a loading layer is waiting on. Its position was resolved when it was issued.
#[derive(Debug)]
pub(crate) struct BlockedDraw {
    params: ImageParams,
    at: Vector,
}

#[derive(Debug, Default)]
pub(crate) enum DrawPhase {
    #[default]
    Ready,
    Loading {
        blocked: BlockedDraw,
        pending: VecDeque<DrawRequest>,
    },
}

/// Observable state of a [`Layer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerStatus {
    /// Primitive calls execute immediately.
    Ready,
    /// Waiting on an image resource; new calls are queued.
    Loading,
    /// Torn down; calls are ignored.
    Destroyed,
}

type RedrawHook = Rc<dyn Fn()>;

struct LayerInner {
    name: String,
    surface: Box<dyn Surface>,
    canvas: Canvas,
    view: View,
    nodes: Vec<u64>,
    z_index: i64,
    phase: DrawPhase,
    redraw: Option<RedrawHook>,
    destroyed: bool,
}

/// A drawable surface with its view, z-order token and deferred draw queue.
///
/// `Layer` is a cheap handle; clones drive the same surface. Nodes hold a [`LayerRef`] instead so
/// that dropping every `Layer` handle releases the surface.
///
/// While an image draw waits for its resource, every later primitive call is queued. When the
/// resource settles (loaded or failed) the waiting image draws first, then the queue drains in
/// submission order until it is empty or another unsettled image blocks it again.
#[derive(Clone)]
pub struct Layer {
    inner: Rc<RefCell<LayerInner>>,
}

/// Non-owning reference from a node to its layer.
#[derive(Clone, Default)]
pub struct LayerRef(Weak<RefCell<LayerInner>>);

impl LayerRef {
    /// The layer, if it has not been dropped or destroyed.
    pub fn upgrade(&self) -> Option<Layer> {
        let inner = self.0.upgrade()?;
        if inner.try_borrow().is_ok_and(|l| l.destroyed) {
            return None;
        }
        Some(Layer { inner })
    }
}

impl std::fmt::Debug for LayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LayerRef")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

impl Layer {
    /// Wrap `surface` as the layer `name` at z-order `z_index`.
    ///
    /// Without an explicit `view` the layer gets its own identity view.
    pub fn new(
        name: impl Into<String>,
        surface: Box<dyn Surface>,
        z_index: i64,
        view: Option<View>,
    ) -> Self {
        let name = name.into();
        let view = view.unwrap_or_default();
        view.attach(name.clone());
        let canvas = surface.canvas();
        tracing::debug!(layer = %name, z_index, width = canvas.width, height = canvas.height, "layer created");
        Self {
            inner: Rc::new(RefCell::new(LayerInner {
                name,
                surface,
                canvas,
                view,
                nodes: Vec::new(),
                z_index,
                phase: DrawPhase::Ready,
                redraw: None,
                destroyed: false,
            })),
        }
    }

    pub fn downgrade(&self) -> LayerRef {
        LayerRef(Rc::downgrade(&self.inner))
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn canvas(&self) -> Canvas {
        self.inner.borrow().canvas
    }

    pub fn view(&self) -> View {
        self.inner.borrow().view.clone()
    }

    pub fn z_index(&self) -> i64 {
        self.inner.borrow().z_index
    }

    /// Ids of the nodes bound to this layer, in creation order.
    pub fn nodes(&self) -> Vec<u64> {
        self.inner.borrow().nodes.clone()
    }

    pub fn status(&self) -> LayerStatus {
        let inner = self.inner.borrow();
        if inner.destroyed {
            LayerStatus::Destroyed
        } else if matches!(inner.phase, DrawPhase::Loading { .. }) {
            LayerStatus::Loading
        } else {
            LayerStatus::Ready
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status() == LayerStatus::Loading
    }

    /// Number of queued calls behind the blocked image draw.
    pub fn pending_len(&self) -> usize {
        match &self.inner.borrow().phase {
            DrawPhase::Ready => 0,
            DrawPhase::Loading { pending, .. } => pending.len(),
        }
    }

    /// Read back the surface pixels, when the surface supports it.
    pub fn snapshot(&self) -> Option<FrameRGBA> {
        self.inner.borrow().surface.snapshot()
    }

    /// Install the hook [`Layer::request_redraw`] calls.
    pub fn set_redraw(&self, hook: impl Fn() + 'static) {
        self.inner.borrow_mut().redraw = Some(Rc::new(hook));
    }

    pub fn request_redraw(&self) {
        let hook = self.inner.borrow().redraw.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Erase the whole surface. Runs immediately, even while an image is loading.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            tracing::debug!(layer = %inner.name, "clear on destroyed layer ignored");
            return;
        }
        let area = inner.canvas.bounds();
        inner.surface.clear_rect(area);
    }

    pub fn draw_rect(&self, params: RectParams) {
        self.submit(DrawRequest::Rect(params));
    }

    pub fn draw_circle(&self, params: CircleParams) {
        self.submit(DrawRequest::Circle(params));
    }

    /// Draw text and write its measured `(width, descent)` into `target`.
    pub fn draw_text(&self, params: TextParams, target: &SharedSize) {
        self.submit(DrawRequest::Text {
            params,
            target: target.clone(),
        });
    }

    /// Draw an image region. An unsettled resource puts the layer into its loading state until
    /// the resource settles.
    pub fn draw_image(&self, params: ImageParams) {
        self.submit(DrawRequest::Image(params));
    }

    /// Raise the z-order token by `n + 1`; `None` and `0` count as 1.
    pub fn to_top(&self, n: Option<i64>) {
        let step = n.filter(|n| *n != 0).unwrap_or(1) + 1;
        self.inner.borrow_mut().z_index += step;
    }

    /// Lower the z-order token by `n + 1`; `None` and `0` count as 1.
    pub fn to_back(&self, n: Option<i64>) {
        let step = n.filter(|n| *n != 0).unwrap_or(1) + 1;
        self.inner.borrow_mut().z_index -= step;
    }

    /// Resize the surface, which drops its content and scale, then scale the drawing space by
    /// `scale_ratio`. The caller redraws.
    pub fn resize(&self, scale_ratio: f64, size: Canvas) {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return;
        }
        inner.surface.resize(size);
        inner.surface.scale(scale_ratio);
        inner.canvas = size;
        tracing::debug!(layer = %inner.name, width = size.width, height = size.height, scale_ratio, "layer resized");
    }

    /// Detach the surface and discard queued calls. Later calls are ignored.
    pub fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return;
        }
        inner.destroyed = true;
        let dropped = match std::mem::take(&mut inner.phase) {
            DrawPhase::Ready => 0,
            DrawPhase::Loading { pending, .. } => pending.len() + 1,
        };
        inner.surface.detach();
        inner.nodes.clear();
        inner.redraw = None;
        let name = inner.name.clone();
        inner.view.detach(&name);
        tracing::debug!(layer = %name, dropped, "layer destroyed");
    }

    pub(crate) fn attach_node(&self, id: u64) {
        let mut inner = self.inner.borrow_mut();
        if !inner.destroyed {
            inner.nodes.push(id);
        }
    }

    pub(crate) fn detach_node(&self, id: u64) {
        self.inner.borrow_mut().nodes.retain(|n| *n != id);
    }

    fn submit(&self, req: DrawRequest) {
        let wait_on = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                tracing::debug!(layer = %inner.name, kind = req.kind(), "draw on destroyed layer ignored");
                return;
            }
            if let DrawPhase::Loading { pending, .. } = &mut inner.phase {
                pending.push_back(req);
                let queued = pending.len();
                tracing::debug!(layer = %inner.name, queued, "draw deferred behind loading image");
                return;
            }
            inner.run(req)
        };
        if let Some(resource) = wait_on {
            self.wait_for(resource);
        }
    }

    fn wait_for(&self, resource: ImageResource) {
        let layer = self.downgrade();
        resource.on_settled(move || {
            if let Some(layer) = layer.upgrade() {
                layer.resume();
            }
        });
    }

    /// Draw the blocked image, then drain queued calls until done or blocked again.
    #[tracing::instrument(level = "debug", skip_all)]
    fn resume(&self) {
        let wait_on = {
            let mut inner = self.inner.borrow_mut();
            let DrawPhase::Loading { blocked, mut pending } = std::mem::take(&mut inner.phase)
            else {
                return;
            };
            tracing::debug!(layer = %inner.name, queued = pending.len(), "image settled, draining");
            inner.paint_image(&blocked.params, blocked.at);

            let mut wait_on = None;
            while let Some(req) = pending.pop_front() {
                if let Some(resource) = inner.run(req) {
                    if let DrawPhase::Loading { pending: rest, .. } = &mut inner.phase {
                        rest.extend(pending.drain(..));
                    }
                    wait_on = Some(resource);
                    break;
                }
            }
            wait_on
        };
        if let Some(resource) = wait_on {
            self.wait_for(resource);
        }
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Layer")
                .field("name", &inner.name)
                .field("canvas", &inner.canvas)
                .field("z_index", &inner.z_index)
                .field("phase", &inner.phase)
                .field("destroyed", &inner.destroyed)
                .finish_non_exhaustive(),
            Err(_) => f.write_str("Layer { <busy> }"),
        }
    }
}

impl LayerInner {
    /// Execute `req` on a ready layer. Returns the resource to wait on when `req` is an image draw
    /// whose resource has not settled; the layer is then loading.
    fn run(&mut self, req: DrawRequest) -> Option<ImageResource> {
        tracing::trace!(layer = %self.name, kind = req.kind(), "draw");
        match req {
            DrawRequest::Rect(p) => self.paint_rect(&p),
            DrawRequest::Circle(p) => self.paint_circle(&p),
            DrawRequest::Text { params, target } => self.paint_text(&params, &target),
            DrawRequest::Image(p) => {
                let at = self.view.get_position(Vector::new(p.x, p.y));
                if !p.image.is_settled() {
                    let resource = p.image.clone();
                    tracing::debug!(
                        layer = %self.name,
                        image = %resource.label(),
                        "image not ready, layer loading"
                    );
                    self.phase = DrawPhase::Loading {
                        blocked: BlockedDraw { params: p, at },
                        pending: VecDeque::new(),
                    };
                    return Some(resource);
                }
                self.paint_image(&p, at);
            }
        }
        None
    }

    fn begin(&mut self, style: &Style) {
        self.surface.save();
        if let Some(opacity) = style.opacity {
            self.surface.set_opacity(opacity);
        }
        if let Some(filter) = &style.filter {
            self.surface.set_filter(filter);
        }
    }

    fn apply_border(&mut self, border: &str) {
        let spec = BorderSpec::parse(border);
        self.surface.set_stroke(spec.width, &spec.color);
    }

    fn paint_rect(&mut self, p: &RectParams) {
        let pos = self.view.get_position(Vector::new(p.x, p.y));
        let rect = Rect::new(pos.x, pos.y, pos.x + p.width, pos.y + p.height);
        self.begin(&p.style);
        if let Some(color) = &p.style.color {
            self.surface.set_fill_color(color);
            self.surface.fill_rect(rect);
        }
        if let Some(border) = &p.style.border {
            self.apply_border(border);
            self.surface.stroke_rect(rect);
        }
        self.surface.restore();
    }

    fn paint_circle(&mut self, p: &CircleParams) {
        let pos = self.view.get_position(Vector::new(p.x, p.y));
        let center = Point::new(pos.x + p.radius, pos.y + p.radius);
        self.begin(&p.style);
        if let Some(color) = &p.style.color {
            self.surface.set_fill_color(color);
            self.surface.fill_circle(center, p.radius);
        }
        if let Some(border) = &p.style.border {
            self.apply_border(border);
            self.surface.stroke_circle(center, p.radius);
        }
        self.surface.restore();
    }

    fn paint_text(&mut self, p: &TextParams, target: &SharedSize) {
        let pos = self.view.get_position(Vector::new(p.x, p.y));
        self.begin(&p.style);
        self.surface.set_font(&FontSpec::new(p.font.clone(), p.size));
        if let Some(color) = &p.style.color {
            self.surface.set_fill_color(color);
        }
        self.surface.fill_text(&p.text, pos.to_point());
        if let Some(border) = &p.style.border {
            self.apply_border(border);
            self.surface.stroke_text(&p.text, pos.to_point());
        }
        let metrics = self.surface.measure_text(&p.text);
        target.set(Vector::new(metrics.width, metrics.descent));
        self.surface.restore();
    }

    fn paint_image(&mut self, p: &ImageParams, at: Vector) {
        let dst = Rect::new(at.x, at.y, at.x + p.dw, at.y + p.dh);
        self.begin(&p.style);
        match p.image.state() {
            ImageState::Ready(data) => {
                let src = Rect::new(p.src_x, p.src_y, p.src_x + p.width, p.src_y + p.height);
                self.surface.draw_image(&data, src, dst);
            }
            ImageState::Failed(reason) => {
                tracing::warn!(layer = %self.name, image = %p.image.label(), %reason, "skipping failed image");
            }
            ImageState::Pending => {
                tracing::warn!(layer = %self.name, image = %p.image.label(), "image still pending at draw time");
            }
        }
        if let Some(border) = &p.style.border {
            self.apply_border(border);
            self.surface.stroke_rect(dst);
        }
        self.surface.restore();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/layer.rs"]
mod tests;
