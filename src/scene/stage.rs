use std::collections::BTreeMap;

use crate::assets::image::ImageResource;
use crate::foundation::core::Canvas;
use crate::foundation::error::{StrataError, StrataResult};
use crate::render::surface::Surface;
use crate::scene::config::{NodeConfig, SceneConfig};
use crate::scene::layer::Layer;
use crate::scene::node::Node;
use crate::scene::view::View;

/// The layers of one screen, positioned through a single shared [`View`].
///
/// Layers stack in creation order: the z-order token of a new layer is its creation index.
#[derive(Debug)]
pub struct Stage {
    canvas: Canvas,
    view: View,
    layers: Vec<Layer>,
    next_z: i64,
}

impl Stage {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            view: View::default(),
            layers: Vec::new(),
            next_z: 0,
        }
    }

    /// Build the stage a scene describes and its nodes, in scene order.
    ///
    /// `make_surface` is called once per layer with the scene canvas. Image nodes draw from
    /// `images`, which must hold every key the scene's image nodes reference.
    pub fn from_scene(
        scene: &SceneConfig,
        images: &BTreeMap<String, ImageResource>,
        mut make_surface: impl FnMut(&str, Canvas) -> StrataResult<Box<dyn Surface>>,
    ) -> StrataResult<(Self, Vec<Node>)> {
        scene.validate()?;
        let mut stage = Self::new(scene.canvas);
        for name in &scene.layers {
            let surface = make_surface(name, scene.canvas)?;
            stage.create_layer(name, surface)?;
        }
        if scene.scale_ratio != 1.0 {
            stage.resize(scene.scale_ratio, scene.canvas);
        }
        let nodes = scene
            .nodes
            .iter()
            .map(|n| stage.create_node(n, images))
            .collect::<StrataResult<Vec<_>>>()?;
        tracing::debug!(
            layers = stage.layers.len(),
            nodes = nodes.len(),
            "stage built from scene"
        );
        Ok((stage, nodes))
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Add a layer named `name` on top of the existing ones.
    pub fn create_layer(&mut self, name: &str, surface: Box<dyn Surface>) -> StrataResult<Layer> {
        if self.layer(name).is_some() {
            return Err(StrataError::validation(format!(
                "layer '{name}' already exists"
            )));
        }
        let layer = Layer::new(name, surface, self.next_z, Some(self.view.clone()));
        self.next_z += 1;
        self.layers.push(layer.clone());
        Ok(layer)
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    /// Layers in creation order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Destroy and forget a layer.
    pub fn remove_layer(&mut self, name: &str) -> StrataResult<()> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.name() == name)
            .ok_or_else(|| StrataError::validation(format!("no layer named '{name}'")))?;
        self.layers.remove(idx).destroy();
        Ok(())
    }

    /// Layers bottom to top. Ties keep creation order.
    pub fn layers_by_z(&self) -> Vec<&Layer> {
        let mut out: Vec<&Layer> = self.layers.iter().collect();
        out.sort_by_key(|l| l.z_index());
        out
    }

    /// Resize every layer. Their content is dropped; the caller redraws.
    pub fn resize(&mut self, scale_ratio: f64, canvas: Canvas) {
        self.canvas = canvas;
        let physical = Canvas {
            width: scaled_dim(canvas.width, scale_ratio),
            height: scaled_dim(canvas.height, scale_ratio),
        };
        for layer in &self.layers {
            layer.resize(scale_ratio, physical);
        }
    }

    /// Build the node `config` describes, bound to its layer on this stage.
    pub fn create_node(
        &self,
        config: &NodeConfig,
        images: &BTreeMap<String, ImageResource>,
    ) -> StrataResult<Node> {
        let common = config.common();
        let layer = self.layer(&common.layer).ok_or_else(|| {
            StrataError::validation(format!(
                "{} references unknown layer '{}'",
                config.tag(),
                common.layer
            ))
        })?;

        let mut node = match config {
            NodeConfig::Node(c) => Node::plain(layer, c.position, c.size),
            NodeConfig::RectNode(n) => {
                Node::rect(layer, common.position, common.size, n.color.clone())
            }
            NodeConfig::CircleNode(n) => {
                Node::circle(layer, common.position, n.radius, n.color.clone())
            }
            NodeConfig::ImageNode(n) => {
                let image = images.get(&n.image).ok_or_else(|| {
                    StrataError::validation(format!(
                        "ImageNode references unknown image '{}'",
                        n.image
                    ))
                })?;
                Node::image(
                    layer,
                    common.position,
                    common.size,
                    image.clone(),
                    n.src_position,
                    n.dh,
                )
            }
            NodeConfig::TextNode(n) => Node::text(
                layer,
                common.position,
                n.text.clone(),
                n.font.clone(),
                n.font_size,
                n.color.clone(),
            ),
        };

        node.border = common.border.clone();
        node.opacity = common.opacity;
        node.filter = common.filter.clone();
        Ok(node)
    }
}

fn scaled_dim(px: u32, ratio: f64) -> u32 {
    let v = (f64::from(px) * ratio).round();
    if v < 1.0 {
        1
    } else if v >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        v as u32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/stage.rs"]
mod tests;
