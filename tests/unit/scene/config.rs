use super::*;

const SCENE: &str = r##"{
    "canvas": { "width": 320, "height": 200 },
    "layers": ["bg", "ui"],
    "images": { "hero": "hero.png" },
    "nodes": [
        { "type": "RectNode", "layer": "bg", "size": { "x": 320, "y": 200 }, "color": "#123" },
        { "type": "CircleNode", "layer": "ui", "position": { "x": 10, "y": 10 }, "radius": 5 },
        { "type": "ImageNode", "layer": "bg", "size": { "x": 100, "y": 50 }, "image": "hero", "dh": 25 },
        { "type": "TextNode", "layer": "ui", "text": "Start", "border": "1px solid #fff" },
        { "type": "Node", "layer": "ui" }
    ]
}"##;

#[test]
fn parses_tagged_nodes_with_defaults() {
    let scene = SceneConfig::from_json(SCENE).unwrap();
    scene.validate().unwrap();
    assert_eq!(scene.scale_ratio, 1.0);
    assert_eq!(scene.nodes.len(), 5);

    let tags: Vec<_> = scene.nodes.iter().map(NodeConfig::tag).collect();
    assert_eq!(
        tags,
        vec!["RectNode", "CircleNode", "ImageNode", "TextNode", "Node"]
    );

    let NodeConfig::CircleNode(circle) = &scene.nodes[1] else {
        panic!("expected circle");
    };
    assert_eq!(circle.radius, 5.0);
    assert_eq!(circle.common.position, Vector::new(10.0, 10.0));
    assert_eq!(circle.color, None);

    let NodeConfig::TextNode(text) = &scene.nodes[3] else {
        panic!("expected text");
    };
    assert_eq!(text.font, "sans-serif");
    assert_eq!(text.font_size, 10.0);
    assert_eq!(text.common.border.as_deref(), Some("1px solid #fff"));
}

#[test]
fn json_survives_a_round_trip() {
    let scene = SceneConfig::from_json(SCENE).unwrap();
    let back = SceneConfig::from_json(&scene.to_json_pretty().unwrap()).unwrap();
    assert_eq!(scene, back);
}

#[test]
fn validate_rejects_unknown_layer() {
    let mut scene = SceneConfig::from_json(SCENE).unwrap();
    scene.layers.retain(|l| l != "ui");
    let err = scene.validate().unwrap_err();
    assert!(err.to_string().contains("unknown layer 'ui'"));
}

#[test]
fn validate_rejects_missing_image_and_duplicate_layers() {
    let mut scene = SceneConfig::from_json(SCENE).unwrap();
    scene.images.clear();
    assert!(scene.validate().unwrap_err().to_string().contains("hero"));

    let mut scene = SceneConfig::from_json(SCENE).unwrap();
    scene.layers.push("bg".into());
    assert!(scene.validate().unwrap_err().to_string().contains("duplicate"));
}

#[test]
fn validate_rejects_bad_canvas_and_ratio() {
    let mut scene = SceneConfig::from_json(SCENE).unwrap();
    scene.canvas.width = 0;
    assert!(scene.validate().is_err());

    let mut scene = SceneConfig::from_json(SCENE).unwrap();
    scene.scale_ratio = 0.0;
    assert!(scene.validate().is_err());
}

#[test]
fn unknown_node_type_is_a_serde_error() {
    let err = SceneConfig::from_json(
        r#"{ "canvas": { "width": 1, "height": 1 }, "nodes": [{ "type": "Sprite", "layer": "x" }] }"#,
    )
    .unwrap_err();
    assert!(matches!(err, StrataError::Serde(_)));
}
