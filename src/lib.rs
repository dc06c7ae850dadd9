//! strata is a small 2D scene-rendering layer for interactive screens.
//!
//! A [`Layer`] owns one drawable [`Surface`] and exposes rectangle, circle, text and image
//! primitives. Every position goes through the layer's [`View`]. [`Node`]s are positioned, sized
//! drawables bound to one layer; each frame the application calls [`Node::update`] and
//! [`Node::draw`].
//!
//! Image draws may reference an [`ImageResource`] that is still loading. The layer then holds that
//! draw and queues every later primitive until the resource settles, so the surface always sees
//! calls in submission order.
//!
//! - [`RecordingSurface`] records calls, for tests and tooling.
//! - [`CpuSurface`] rasterizes with `vello_cpu` and shapes text with `parley`.
//! - [`Stage`] and [`SceneConfig`] build a whole screen from a JSON description.
#![forbid(unsafe_code)]

mod assets;
mod foundation;
mod render;
mod scene;

pub use crate::foundation::core::{Affine, Canvas, Point, Rect, Vector};
pub use crate::foundation::error::{StrataError, StrataResult};

pub use crate::assets::decode::{ImageData, decode_image};
pub use crate::assets::image::{ImageResource, ImageState};
pub use crate::assets::text::{FontSpec, TextMetrics};

pub use crate::render::cpu::{CpuSurface, CpuSurfaceOpts};
pub use crate::render::filter::{Filter, FilterOp};
pub use crate::render::recording::{RecordingSurface, SurfaceCall, SurfaceLog};
pub use crate::render::surface::{FrameRGBA, Surface};

pub use crate::scene::config::{
    CircleNodeConfig, ImageNodeConfig, NodeCommon, NodeConfig, RectNodeConfig, SceneConfig,
    TextNodeConfig,
};
pub use crate::scene::layer::{Layer, LayerRef, LayerStatus};
pub use crate::scene::node::{Node, NodeKind, SharedSize};
pub use crate::scene::params::{BorderSpec, CircleParams, ImageParams, RectParams, Style, TextParams};
pub use crate::scene::stage::Stage;
pub use crate::scene::view::View;
