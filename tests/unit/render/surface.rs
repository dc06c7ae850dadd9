use super::*;

#[test]
fn pixel_lookup_is_row_major_and_bounded() {
    let frame = FrameRGBA {
        width: 2,
        height: 2,
        data: (0u8..16).collect(),
        premultiplied: false,
    };
    assert_eq!(frame.pixel(1, 0), Some([4, 5, 6, 7]));
    assert_eq!(frame.pixel(0, 1), Some([8, 9, 10, 11]));
    assert_eq!(frame.pixel(2, 0), None);
}

#[test]
fn into_straight_unpremultiplies_once() {
    let frame = FrameRGBA {
        width: 1,
        height: 1,
        data: vec![64, 0, 0, 128],
        premultiplied: true,
    };
    let straight = frame.into_straight();
    assert!(!straight.premultiplied);
    assert_eq!(straight.data, vec![128, 0, 0, 128]);
    assert_eq!(straight.clone().into_straight().data, vec![128, 0, 0, 128]);
}
