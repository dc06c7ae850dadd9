use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::core::{Canvas, Vector};
use crate::foundation::error::{StrataError, StrataResult};

/// A screen described as data: its layers, the images and fonts it needs, and its nodes.
///
/// Asset paths are relative to the scene file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneConfig {
    pub canvas: Canvas,
    #[serde(default = "default_scale_ratio")]
    pub scale_ratio: f64,
    /// Layer names, bottom first.
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default)]
    pub images: BTreeMap<String, PathBuf>,
    /// Font files keyed by the family name nodes use.
    #[serde(default)]
    pub fonts: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

fn default_scale_ratio() -> f64 {
    1.0
}

fn default_font() -> String {
    "sans-serif".to_string()
}

fn default_font_size() -> f64 {
    10.0
}

/// Fields every node type shares.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeCommon {
    /// Name of the layer the node draws on.
    pub layer: String,
    #[serde(default)]
    pub position: Vector,
    #[serde(default)]
    pub size: Vector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RectNodeConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CircleNodeConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageNodeConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    /// Key into [`SceneConfig::images`].
    pub image: String,
    #[serde(default)]
    pub src_position: Vector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dh: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextNodeConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    pub text: String,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Node description tagged by `"type"`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum NodeConfig {
    Node(NodeCommon),
    RectNode(RectNodeConfig),
    CircleNode(CircleNodeConfig),
    ImageNode(ImageNodeConfig),
    TextNode(TextNodeConfig),
}

impl NodeConfig {
    pub fn common(&self) -> &NodeCommon {
        match self {
            Self::Node(c) => c,
            Self::RectNode(n) => &n.common,
            Self::CircleNode(n) => &n.common,
            Self::ImageNode(n) => &n.common,
            Self::TextNode(n) => &n.common,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Node(_) => "Node",
            Self::RectNode(_) => "RectNode",
            Self::CircleNode(_) => "CircleNode",
            Self::ImageNode(_) => "ImageNode",
            Self::TextNode(_) => "TextNode",
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> StrataResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a scene file. Does not validate.
    pub fn from_path(path: &Path) -> StrataResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read scene file '{}'", path.display()))?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> StrataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> StrataResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(StrataError::validation("canvas width/height must be > 0"));
        }
        if !(self.scale_ratio.is_finite() && self.scale_ratio > 0.0) {
            return Err(StrataError::validation("scale_ratio must be finite and > 0"));
        }

        let mut names = BTreeSet::new();
        for name in &self.layers {
            if name.trim().is_empty() {
                return Err(StrataError::validation("layer names must be non-empty"));
            }
            if !names.insert(name.as_str()) {
                return Err(StrataError::validation(format!(
                    "duplicate layer name '{name}'"
                )));
            }
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let common = node.common();
            if !names.contains(common.layer.as_str()) {
                return Err(StrataError::validation(format!(
                    "node #{i} ({}) references unknown layer '{}'",
                    node.tag(),
                    common.layer
                )));
            }
            match node {
                NodeConfig::ImageNode(img) if !self.images.contains_key(&img.image) => {
                    return Err(StrataError::validation(format!(
                        "node #{i} (ImageNode) references missing image key '{}'",
                        img.image
                    )));
                }
                NodeConfig::CircleNode(c) if !(c.radius.is_finite() && c.radius >= 0.0) => {
                    return Err(StrataError::validation(format!(
                        "node #{i} (CircleNode) radius must be finite and >= 0"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/config.rs"]
mod tests;
