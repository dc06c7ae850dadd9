use super::*;
use crate::assets::decode::ImageData;
use crate::foundation::core::{Rect, Vector};
use crate::render::recording::{RecordingSurface, SurfaceCall, SurfaceLog};
use crate::scene::node::NodeKind;

fn canvas() -> Canvas {
    Canvas::new(100, 50).unwrap()
}

fn recording(logs: &mut Vec<(String, SurfaceLog)>, name: &str, c: Canvas) -> Box<dyn Surface> {
    let s = RecordingSurface::new(c);
    logs.push((name.to_string(), s.log()));
    Box::new(s)
}

#[test]
fn layers_share_the_stage_view_and_stack_by_creation() {
    let mut stage = Stage::new(canvas());
    let bg = stage
        .create_layer("bg", Box::new(RecordingSurface::new(canvas())))
        .unwrap();
    let ui = stage
        .create_layer("ui", Box::new(RecordingSurface::new(canvas())))
        .unwrap();
    assert_eq!((bg.z_index(), ui.z_index()), (0, 1));
    assert!(bg.view().is_shared_with(stage.view()));
    assert_eq!(stage.view().layers(), vec!["bg".to_string(), "ui".to_string()]);

    bg.to_top(None);
    let order: Vec<_> = stage.layers_by_z().iter().map(|l| l.name()).collect();
    assert_eq!(order, vec!["ui".to_string(), "bg".to_string()]);
}

#[test]
fn duplicate_and_missing_layers_are_errors() {
    let mut stage = Stage::new(canvas());
    stage
        .create_layer("bg", Box::new(RecordingSurface::new(canvas())))
        .unwrap();
    assert!(
        stage
            .create_layer("bg", Box::new(RecordingSurface::new(canvas())))
            .is_err()
    );
    assert!(stage.remove_layer("nope").is_err());
}

#[test]
fn remove_layer_destroys_it() {
    let mut stage = Stage::new(canvas());
    let bg = stage
        .create_layer("bg", Box::new(RecordingSurface::new(canvas())))
        .unwrap();
    stage.remove_layer("bg").unwrap();
    assert!(stage.layer("bg").is_none());
    assert_eq!(bg.status(), crate::scene::layer::LayerStatus::Destroyed);
    assert!(stage.view().layers().is_empty());
}

#[test]
fn create_node_applies_common_styling() {
    let mut stage = Stage::new(canvas());
    stage
        .create_layer("ui", Box::new(RecordingSurface::new(canvas())))
        .unwrap();
    let config: NodeConfig = serde_json::from_str(
        r#"{ "type": "CircleNode", "layer": "ui", "radius": 3, "opacity": 0.5, "border": "2 red" }"#,
    )
    .unwrap();
    let node = stage.create_node(&config, &BTreeMap::new()).unwrap();
    assert_eq!(node.tag(), "CircleNode");
    assert_eq!(node.size(), Vector::new(6.0, 6.0));
    assert_eq!(node.opacity, Some(0.5));
    assert_eq!(node.border.as_deref(), Some("2 red"));
    assert_eq!(stage.layer("ui").unwrap().nodes(), vec![node.id()]);
}

#[test]
fn create_node_rejects_unknown_references() {
    let mut stage = Stage::new(canvas());
    stage
        .create_layer("ui", Box::new(RecordingSurface::new(canvas())))
        .unwrap();
    let on_missing_layer: NodeConfig =
        serde_json::from_str(r#"{ "type": "Node", "layer": "bg" }"#).unwrap();
    assert!(stage.create_node(&on_missing_layer, &BTreeMap::new()).is_err());

    let missing_image: NodeConfig =
        serde_json::from_str(r#"{ "type": "ImageNode", "layer": "ui", "image": "x" }"#).unwrap();
    assert!(stage.create_node(&missing_image, &BTreeMap::new()).is_err());
}

#[test]
fn from_scene_builds_layers_and_nodes_in_order() {
    let scene = SceneConfig::from_json(
        r#"{
            "canvas": { "width": 100, "height": 50 },
            "layers": ["bg", "ui"],
            "images": { "logo": "logo.png" },
            "nodes": [
                { "type": "ImageNode", "layer": "bg", "image": "logo", "size": { "x": 4, "y": 2 } },
                { "type": "RectNode", "layer": "bg", "size": { "x": 10, "y": 10 }, "color": "red" },
                { "type": "TextNode", "layer": "ui", "text": "hi", "font_size": 8 }
            ]
        }"#,
    )
    .unwrap();
    let logo = ImageResource::pending("logo");
    let images = BTreeMap::from([("logo".to_string(), logo.clone())]);
    let mut logs = Vec::new();
    let (stage, nodes) =
        Stage::from_scene(&scene, &images, |name, c| Ok(recording(&mut logs, name, c))).unwrap();

    assert_eq!(stage.layers().len(), 2);
    assert_eq!(nodes.len(), 3);
    assert!(matches!(nodes[0].kind, NodeKind::Image { dw, dh, .. } if dw == 4.0 && dh == 2.0));

    for node in &nodes {
        node.draw();
    }
    let bg = stage.layer("bg").unwrap();
    assert!(bg.is_loading());
    assert_eq!(bg.pending_len(), 1);
    assert_eq!(nodes[2].size(), Vector::new(8.0, 8.0));

    logo.resolve(ImageData::from_premul_rgba8(4, 2, vec![255; 32]).unwrap());
    assert!(!bg.is_loading());
    let bg_paints = logs[0].1.paints();
    assert_eq!(bg_paints.len(), 2);
    assert!(matches!(bg_paints[0], SurfaceCall::DrawImage { .. }));
    assert_eq!(
        bg_paints[1],
        SurfaceCall::FillRect(Rect::new(0.0, 0.0, 10.0, 10.0))
    );
}

#[test]
fn from_scene_applies_scale_ratio() {
    let scene = SceneConfig::from_json(
        r#"{ "canvas": { "width": 100, "height": 50 }, "scale_ratio": 2, "layers": ["bg"] }"#,
    )
    .unwrap();
    let mut logs = Vec::new();
    let (stage, _) = Stage::from_scene(&scene, &BTreeMap::new(), |name, c| {
        Ok(recording(&mut logs, name, c))
    })
    .unwrap();
    let physical = Canvas::new(200, 100).unwrap();
    assert_eq!(stage.layer("bg").unwrap().canvas(), physical);
    assert_eq!(
        logs[0].1.calls(),
        vec![SurfaceCall::Resize(physical), SurfaceCall::Scale(2.0)]
    );
}
