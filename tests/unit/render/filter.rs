use super::*;

#[test]
fn parses_function_list_and_percentages() {
    let f = Filter::parse("brightness(1.5) grayscale(50%)");
    assert_eq!(
        f.ops(),
        &[FilterOp::Brightness(1.5), FilterOp::Grayscale(0.5)]
    );
}

#[test]
fn none_empty_and_unknown_are_identity() {
    assert!(Filter::parse("none").is_identity());
    assert!(Filter::parse("").is_identity());
    assert!(Filter::parse("blur(4px) drop-shadow(1px 1px red)").is_identity());
    assert!(Filter::parse("grayscale(").is_identity());
}

#[test]
fn full_grayscale_equalizes_channels() {
    let mut px = vec![255u8, 0, 0, 255];
    Filter::parse("grayscale(1)").apply_premul(&mut px);
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
    assert_eq!(px[3], 255);
}

#[test]
fn brightness_never_exceeds_alpha() {
    let mut px = vec![100u8, 100, 100, 128];
    Filter::parse("brightness(3)").apply_premul(&mut px);
    assert_eq!(px, vec![128, 128, 128, 128]);
}

#[test]
fn opacity_scales_alpha_too() {
    let mut px = vec![255u8, 255, 255, 255];
    Filter::parse("opacity(0.5)").apply_premul(&mut px);
    assert_eq!(px, vec![128, 128, 128, 128]);
}

#[test]
fn invert_of_opaque_black_is_white() {
    let mut px = vec![0u8, 0, 0, 255];
    Filter::parse("invert(100%)").apply_premul(&mut px);
    assert_eq!(px, vec![255, 255, 255, 255]);
}
