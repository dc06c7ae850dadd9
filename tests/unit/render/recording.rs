use super::*;

fn canvas() -> Canvas {
    Canvas::new(64, 32).unwrap()
}

#[test]
fn log_outlives_the_surface() {
    let log = {
        let mut s = RecordingSurface::new(canvas());
        s.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        s.set_fill_color("red");
        s.log()
    };
    assert_eq!(log.len(), 2);
    assert_eq!(log.paints(), vec![SurfaceCall::FillRect(Rect::new(0.0, 0.0, 4.0, 4.0))]);
}

#[test]
fn measurement_uses_font_until_restore() {
    let mut s = RecordingSurface::new(canvas());
    s.save();
    s.set_font(&FontSpec::new("ui", 20.0));
    assert_eq!(s.measure_text("abc").width, 30.0);
    s.restore();
    assert_eq!(s.measure_text("abc").width, 15.0);
}

#[test]
fn paint_classification() {
    assert!(SurfaceCall::ClearRect(Rect::ZERO).is_paint());
    assert!(!SurfaceCall::Save.is_paint());
    assert!(!SurfaceCall::MeasureText("x".into()).is_paint());
}

#[test]
fn resize_updates_canvas() {
    let mut s = RecordingSurface::new(canvas());
    let bigger = Canvas::new(128, 64).unwrap();
    s.resize(bigger);
    assert_eq!(s.canvas(), bigger);
    assert!(s.snapshot().is_none());
}
