use std::cell::Cell;

use super::*;
use crate::assets::decode::ImageData;
use crate::render::recording::{RecordingSurface, SurfaceCall, SurfaceLog};

fn recording_layer(name: &str) -> (Layer, SurfaceLog) {
    let surface = RecordingSurface::new(Canvas::new(100, 80).unwrap());
    let log = surface.log();
    (Layer::new(name, Box::new(surface), 0, None), log)
}

fn filled(x: f64, color: &str) -> RectParams {
    RectParams {
        x,
        y: 0.0,
        width: 10.0,
        height: 10.0,
        style: Style {
            color: Some(color.into()),
            ..Style::default()
        },
    }
}

fn image_params(image: &ImageResource) -> ImageParams {
    ImageParams {
        x: 5.0,
        y: 6.0,
        image: image.clone(),
        src_x: 0.0,
        src_y: 0.0,
        width: 2.0,
        height: 2.0,
        dw: 4.0,
        dh: 4.0,
        style: Style::default(),
    }
}

fn pixel() -> ImageData {
    ImageData::from_premul_rgba8(2, 2, vec![255; 16]).unwrap()
}

#[test]
fn rect_styling_is_bracketed_by_save_restore() {
    let (layer, log) = recording_layer("bg");
    layer.draw_rect(RectParams {
        x: 1.0,
        y: 2.0,
        width: 3.0,
        height: 4.0,
        style: Style {
            opacity: Some(0.5),
            filter: Some("grayscale(1)".into()),
            color: Some("red".into()),
            border: Some("2px solid blue".into()),
        },
    });
    let rect = Rect::new(1.0, 2.0, 4.0, 6.0);
    assert_eq!(
        log.calls(),
        vec![
            SurfaceCall::Save,
            SurfaceCall::SetOpacity(0.5),
            SurfaceCall::SetFilter("grayscale(1)".into()),
            SurfaceCall::SetFillColor("red".into()),
            SurfaceCall::FillRect(rect),
            SurfaceCall::SetStroke {
                width: 2.0,
                color: "blue".into()
            },
            SurfaceCall::StrokeRect(rect),
            SurfaceCall::Restore,
        ]
    );
}

#[test]
fn rect_without_color_or_border_paints_nothing() {
    let (layer, log) = recording_layer("bg");
    layer.draw_rect(RectParams::default());
    assert!(log.paints().is_empty());
    assert_eq!(log.calls(), vec![SurfaceCall::Save, SurfaceCall::Restore]);
}

#[test]
fn zero_opacity_is_applied() {
    let (layer, log) = recording_layer("bg");
    let mut p = filled(0.0, "red");
    p.style.opacity = Some(0.0);
    layer.draw_rect(p);
    assert!(log.calls().contains(&SurfaceCall::SetOpacity(0.0)));
}

#[test]
fn circle_is_centered_in_its_bounding_box() {
    let (layer, log) = recording_layer("bg");
    layer.draw_circle(CircleParams {
        x: 10.0,
        y: 20.0,
        radius: 5.0,
        style: Style {
            color: Some("#000".into()),
            ..Style::default()
        },
    });
    assert_eq!(
        log.paints(),
        vec![SurfaceCall::FillCircle {
            center: Point::new(15.0, 25.0),
            radius: 5.0
        }]
    );
}

#[test]
fn positions_go_through_the_view() {
    let view = View::default();
    view.pan(Vector::new(100.0, 0.0));
    let surface = RecordingSurface::new(Canvas::new(10, 10).unwrap());
    let log = surface.log();
    let layer = Layer::new("ui", Box::new(surface), 0, Some(view.clone()));
    layer.draw_rect(filled(1.0, "red"));
    assert_eq!(
        log.paints(),
        vec![SurfaceCall::FillRect(Rect::new(101.0, 0.0, 111.0, 10.0))]
    );
    assert_eq!(view.layers(), vec!["ui".to_string()]);
}

#[test]
fn text_writes_measured_size_back() {
    let (layer, log) = recording_layer("ui");
    let size = SharedSize::default();
    layer.draw_text(
        TextParams {
            x: 0.0,
            y: 0.0,
            text: "Hello".into(),
            font: "Arial".into(),
            size: 20.0,
            style: Style::default(),
        },
        &size,
    );
    // 5 chars * 20px * 0.5 advance, descent one font size.
    assert_eq!(size.get(), Vector::new(50.0, 20.0));
    let calls = log.calls();
    assert!(calls.contains(&SurfaceCall::SetFont(FontSpec::new("Arial", 20.0))));
    assert!(calls.contains(&SurfaceCall::MeasureText("Hello".into())));
    assert_eq!(calls.last(), Some(&SurfaceCall::Restore));
}

#[test]
fn deferred_draws_keep_submission_order() {
    let (layer, log) = recording_layer("bg");
    let image = ImageResource::pending("hero");

    layer.draw_rect(filled(0.0, "a"));
    layer.draw_image(image_params(&image));
    layer.draw_rect(filled(20.0, "b"));

    assert!(layer.is_loading());
    assert_eq!(layer.pending_len(), 1);
    assert_eq!(log.paints().len(), 1);

    image.resolve(pixel());
    assert_eq!(layer.status(), LayerStatus::Ready);
    assert_eq!(layer.pending_len(), 0);

    let paints = log.paints();
    assert_eq!(paints.len(), 3);
    assert_eq!(paints[0], SurfaceCall::FillRect(Rect::new(0.0, 0.0, 10.0, 10.0)));
    assert!(matches!(
        paints[1],
        SurfaceCall::DrawImage { dst, .. } if dst == Rect::new(5.0, 6.0, 9.0, 10.0)
    ));
    assert_eq!(paints[2], SurfaceCall::FillRect(Rect::new(20.0, 0.0, 30.0, 10.0)));
}

#[test]
fn ready_image_draws_synchronously_after_drain() {
    let (layer, log) = recording_layer("bg");
    let image = ImageResource::pending("a");
    layer.draw_image(image_params(&image));
    image.resolve(pixel());
    log.clear();

    let ready = ImageResource::ready("b", pixel());
    layer.draw_image(image_params(&ready));
    assert!(!layer.is_loading());
    assert_eq!(layer.pending_len(), 0);
    assert_eq!(log.paints().len(), 1);
}

#[test]
fn clear_is_immediate_while_loading() {
    let (layer, log) = recording_layer("bg");
    let image = ImageResource::pending("slow");
    layer.draw_image(image_params(&image));
    layer.draw_rect(filled(0.0, "red"));
    layer.clear();

    assert_eq!(
        log.paints(),
        vec![SurfaceCall::ClearRect(Rect::new(0.0, 0.0, 100.0, 80.0))]
    );
    image.resolve(pixel());
    let paints = log.paints();
    assert_eq!(paints.len(), 3);
    assert!(matches!(paints[0], SurfaceCall::ClearRect(_)));
}

#[test]
fn clear_applies_before_following_draws() {
    let (layer, log) = recording_layer("bg");
    layer.draw_rect(filled(0.0, "red"));
    layer.clear();
    layer.draw_rect(filled(0.0, "blue"));
    let paints = log.paints();
    assert!(matches!(paints[1], SurfaceCall::ClearRect(_)));
    assert!(matches!(paints[2], SurfaceCall::FillRect(_)));
}

#[test]
fn failed_image_unblocks_and_still_draws_border() {
    let (layer, log) = recording_layer("bg");
    let image = ImageResource::pending("missing");
    let mut p = image_params(&image);
    p.style.border = Some("1px red".into());
    layer.draw_image(p);
    layer.draw_rect(filled(0.0, "blue"));

    image.fail("404");
    assert!(!layer.is_loading());
    assert_eq!(
        log.paints(),
        vec![
            SurfaceCall::StrokeRect(Rect::new(5.0, 6.0, 9.0, 10.0)),
            SurfaceCall::FillRect(Rect::new(0.0, 0.0, 10.0, 10.0)),
        ]
    );
}

#[test]
fn second_unready_image_blocks_again_in_turn() {
    let (layer, log) = recording_layer("bg");
    let first = ImageResource::pending("first");
    let second = ImageResource::pending("second");

    layer.draw_image(image_params(&first));
    layer.draw_image(image_params(&second));
    layer.draw_rect(filled(0.0, "c"));
    assert_eq!(layer.pending_len(), 2);

    first.resolve(pixel());
    assert!(layer.is_loading());
    assert_eq!(layer.pending_len(), 1);
    assert_eq!(log.paints().len(), 1);

    second.resolve(pixel());
    assert!(!layer.is_loading());
    assert_eq!(log.paints().len(), 3);
}

#[test]
fn queued_draws_resolve_position_at_execution() {
    let (layer, log) = recording_layer("bg");
    let image = ImageResource::pending("slow");
    layer.draw_image(image_params(&image));
    layer.draw_rect(filled(0.0, "red"));
    layer.view().pan(Vector::new(0.0, 50.0));
    image.resolve(pixel());

    let paints = log.paints();
    assert!(matches!(
        paints[0],
        SurfaceCall::DrawImage { dst, .. } if dst == Rect::new(5.0, 6.0, 9.0, 10.0)
    ));
    assert_eq!(paints[1], SurfaceCall::FillRect(Rect::new(0.0, 50.0, 10.0, 60.0)));
}

#[test]
fn deferred_image_keeps_its_styling() {
    let (layer, log) = recording_layer("bg");
    let image = ImageResource::pending("slow");
    let mut p = image_params(&image);
    p.style.opacity = Some(0.25);
    layer.draw_image(p);
    assert!(log.is_empty());

    image.resolve(pixel());
    let calls = log.calls();
    assert_eq!(calls[0], SurfaceCall::Save);
    assert_eq!(calls[1], SurfaceCall::SetOpacity(0.25));
    assert!(matches!(calls[2], SurfaceCall::DrawImage { .. }));
    assert_eq!(calls[3], SurfaceCall::Restore);
}

#[test]
fn z_order_steps_by_n_plus_one() {
    let (layer, _) = recording_layer("bg");
    layer.to_top(None);
    assert_eq!(layer.z_index(), 2);
    layer.to_top(Some(3));
    assert_eq!(layer.z_index(), 6);
    layer.to_back(Some(0));
    assert_eq!(layer.z_index(), 4);
}

#[test]
fn resize_resets_then_scales() {
    let (layer, log) = recording_layer("bg");
    let canvas = Canvas::new(200, 160).unwrap();
    layer.resize(2.0, canvas);
    assert_eq!(layer.canvas(), canvas);
    assert_eq!(
        log.calls(),
        vec![SurfaceCall::Resize(canvas), SurfaceCall::Scale(2.0)]
    );
}

#[test]
fn destroyed_layer_ignores_calls_and_drops_queue() {
    let (layer, log) = recording_layer("bg");
    let image = ImageResource::pending("slow");
    layer.draw_image(image_params(&image));
    layer.draw_rect(filled(0.0, "red"));
    let weak = layer.downgrade();

    layer.destroy();
    assert_eq!(layer.status(), LayerStatus::Destroyed);
    assert_eq!(layer.pending_len(), 0);
    assert!(weak.upgrade().is_none());
    assert!(layer.view().layers().is_empty());

    layer.draw_rect(filled(0.0, "red"));
    layer.clear();
    image.resolve(pixel());
    assert_eq!(log.calls(), vec![SurfaceCall::Detach]);
}

#[test]
fn redraw_hook_runs_on_request() {
    let (layer, _) = recording_layer("bg");
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    layer.set_redraw(move || h.set(h.get() + 1));
    layer.request_redraw();
    layer.request_redraw();
    assert_eq!(hits.get(), 2);
}

#[test]
fn redraw_hook_may_draw_on_the_layer() {
    let (layer, log) = recording_layer("bg");
    let handle = layer.downgrade();
    layer.set_redraw(move || {
        if let Some(l) = handle.upgrade() {
            l.draw_rect(filled(0.0, "red"));
        }
    });
    layer.request_redraw();
    assert_eq!(log.paints().len(), 1);
}
