use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::assets::image::ImageResource;
use crate::foundation::core::Vector;
use crate::scene::layer::{Layer, LayerRef};
use crate::scene::params::{CircleParams, ImageParams, RectParams, Style, TextParams};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// A node's size, shared with its layer so text draws can write back their measurements.
#[derive(Clone, Debug, Default)]
pub struct SharedSize(Rc<Cell<Vector>>);

impl SharedSize {
    pub fn new(size: Vector) -> Self {
        Self(Rc::new(Cell::new(size)))
    }

    pub fn get(&self) -> Vector {
        self.0.get()
    }

    pub fn set(&self, size: Vector) {
        self.0.set(size);
    }
}

/// Variant data of a [`Node`].
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Anchor for grouping and events; draws nothing.
    Plain,
    Rect {
        color: Option<String>,
    },
    Circle {
        radius: f64,
        color: String,
    },
    Image {
        image: ImageResource,
        /// Origin of the source region.
        src: Vector,
        dw: f64,
        dh: f64,
    },
    Text {
        text: String,
        font: String,
        font_size: f64,
        color: Option<String>,
    },
}

type UpdateFn = Box<dyn FnMut(&mut Node)>;

/// A positioned, sized drawable bound to one [`Layer`].
///
/// `draw` turns the node's state into exactly one primitive call on its layer (none for
/// [`NodeKind::Plain`]); the node never touches a surface itself.
pub struct Node {
    id: u64,
    pub position: Vector,
    size: SharedSize,
    pub border: Option<String>,
    pub opacity: Option<f64>,
    pub filter: Option<String>,
    pub kind: NodeKind,
    layer: LayerRef,
    on_update: Option<UpdateFn>,
}

impl Node {
    fn with_kind(layer: &Layer, position: Vector, size: Vector, kind: NodeKind) -> Self {
        let id = NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed);
        layer.attach_node(id);
        Self {
            id,
            position,
            size: SharedSize::new(size),
            border: None,
            opacity: None,
            filter: None,
            kind,
            layer: layer.downgrade(),
            on_update: None,
        }
    }

    pub fn plain(layer: &Layer, position: Vector, size: Vector) -> Self {
        Self::with_kind(layer, position, size, NodeKind::Plain)
    }

    pub fn rect(layer: &Layer, position: Vector, size: Vector, color: Option<String>) -> Self {
        Self::with_kind(layer, position, size, NodeKind::Rect { color })
    }

    /// Circle with its bounding box at `position`. The fill color defaults to `#000`.
    pub fn circle(layer: &Layer, position: Vector, radius: f64, color: Option<String>) -> Self {
        let color = color.unwrap_or_else(|| "#000".to_string());
        let mut node = Self::with_kind(
            layer,
            position,
            Vector::default(),
            NodeKind::Circle { radius, color },
        );
        node.update_geometry();
        node
    }

    /// Image node showing the `size` region at `src` of `image`.
    ///
    /// The destination height `dh` defaults to the region height (a zero `dh` counts as missing);
    /// the destination width keeps the region's aspect ratio, rounded up.
    pub fn image(
        layer: &Layer,
        position: Vector,
        size: Vector,
        image: ImageResource,
        src: Vector,
        dh: Option<f64>,
    ) -> Self {
        let dh = dh.filter(|h| *h != 0.0).unwrap_or(size.y);
        let mut node = Self::with_kind(
            layer,
            position,
            size,
            NodeKind::Image {
                image,
                src,
                dw: 0.0,
                dh,
            },
        );
        node.update_geometry();
        node
    }

    /// Text node. Its size stays zero until its first draw measures it.
    pub fn text(
        layer: &Layer,
        position: Vector,
        text: impl Into<String>,
        font: impl Into<String>,
        font_size: f64,
        color: Option<String>,
    ) -> Self {
        Self::with_kind(
            layer,
            position,
            Vector::default(),
            NodeKind::Text {
                text: text.into(),
                font: font.into(),
                font_size,
                color,
            },
        )
    }

    pub fn with_border(mut self, border: impl Into<String>) -> Self {
        self.border = Some(border.into());
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Callback run at the end of every [`Node::update`].
    pub fn with_update(mut self, f: impl FnMut(&mut Node) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Type tag as used in scene files.
    pub fn tag(&self) -> &'static str {
        match self.kind {
            NodeKind::Plain => "Node",
            NodeKind::Rect { .. } => "RectNode",
            NodeKind::Circle { .. } => "CircleNode",
            NodeKind::Image { .. } => "ImageNode",
            NodeKind::Text { .. } => "TextNode",
        }
    }

    pub fn size(&self) -> Vector {
        self.size.get()
    }

    pub fn set_size(&mut self, size: Vector) {
        self.size.set(size);
    }

    /// Handle to the size cell the layer writes text measurements into.
    pub fn size_handle(&self) -> SharedSize {
        self.size.clone()
    }

    pub fn layer(&self) -> &LayerRef {
        &self.layer
    }

    /// Recompute derived geometry, then run the update callback.
    pub fn update(&mut self) {
        self.update_geometry();
        if let Some(mut f) = self.on_update.take() {
            f(self);
            if self.on_update.is_none() {
                self.on_update = Some(f);
            }
        }
    }

    fn update_geometry(&mut self) {
        let size = self.size.get();
        match &mut self.kind {
            NodeKind::Circle { radius, .. } => {
                self.size.set(Vector::new(*radius * 2.0, *radius * 2.0));
            }
            NodeKind::Image { dw, dh, .. } => {
                *dw = if size.y == 0.0 {
                    0.0
                } else {
                    (size.x * (*dh / size.y)).ceil()
                };
            }
            NodeKind::Plain | NodeKind::Rect { .. } | NodeKind::Text { .. } => {}
        }
    }

    fn style(&self, color: Option<String>) -> Style {
        Style {
            opacity: self.opacity,
            filter: self.filter.clone(),
            color,
            border: self.border.clone(),
        }
    }

    /// Issue this node's primitive call to its layer.
    pub fn draw(&self) {
        let Some(layer) = self.layer.upgrade() else {
            tracing::debug!(node = self.id, tag = self.tag(), "layer gone, draw skipped");
            return;
        };
        let Vector { x, y } = self.position;
        let size = self.size.get();
        match &self.kind {
            NodeKind::Plain => {}
            NodeKind::Rect { color } => layer.draw_rect(RectParams {
                x,
                y,
                width: size.x,
                height: size.y,
                style: self.style(color.clone()),
            }),
            NodeKind::Circle { radius, color } => layer.draw_circle(CircleParams {
                x,
                y,
                radius: *radius,
                style: self.style(Some(color.clone())),
            }),
            NodeKind::Image { image, src, dw, dh } => layer.draw_image(ImageParams {
                x,
                y,
                image: image.clone(),
                src_x: src.x,
                src_y: src.y,
                width: size.x,
                height: size.y,
                dw: *dw,
                dh: *dh,
                style: self.style(None),
            }),
            NodeKind::Text {
                text,
                font,
                font_size,
                color,
            } => layer.draw_text(
                TextParams {
                    x,
                    y,
                    text: text.clone(),
                    font: font.clone(),
                    size: *font_size,
                    style: self.style(color.clone()),
                },
                &self.size,
            ),
        }
    }

    /// Translate the position in place.
    pub fn move_by(&mut self, v: Vector) {
        self.position.plus(v);
    }

    /// Clear the owning layer, then ask it to redraw.
    pub fn clear_layer(&self) {
        if let Some(layer) = self.layer.upgrade() {
            layer.clear();
            layer.request_redraw();
        }
    }

    /// Unbind from the layer's node list.
    pub fn destroy(self) {
        if let Some(layer) = self.layer.upgrade() {
            layer.detach_node(self.id);
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("size", &self.size.get())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/node.rs"]
mod tests;
