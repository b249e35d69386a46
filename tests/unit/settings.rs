use super::*;

#[test]
fn defaults() {
    let s = DemuxSettings::default();
    assert_eq!((s.width, s.height), (256, 256));
    assert_eq!(s.background(), Some(0xffffffff));
    assert!(s.validate().is_ok());
}

#[test]
fn json_fills_missing_fields() {
    let s = DemuxSettings::from_json(r#"{"width": 640, "background_color": 0}"#).unwrap();
    assert_eq!(s.width, 640);
    assert_eq!(s.height, DEFAULT_HEIGHT);
    assert_eq!(s.background(), None);
}

#[test]
fn json_rejects_unknown_and_invalid() {
    assert!(DemuxSettings::from_json(r#"{"widht": 1}"#).is_err());
    let err = DemuxSettings::from_json(r#"{"height": 0}"#).unwrap_err();
    assert!(err.to_string().contains("validation error:"));
    assert!(DemuxSettings::from_json(r#"{"uri": "  "}"#).is_err());
}
