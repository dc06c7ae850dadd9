use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StrataError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        StrataError::surface("x")
            .to_string()
            .contains("surface error:")
    );
    assert!(StrataError::asset("x").to_string().contains("asset error:"));
    assert!(
        StrataError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StrataError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde() {
    let e = serde_json::from_str::<u32>("nope").unwrap_err();
    assert!(matches!(StrataError::from(e), StrataError::Serde(_)));
}
