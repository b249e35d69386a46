use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(DemuxError::parse("x").to_string().contains("parse error:"));
    assert!(
        DemuxError::missing_feature("render")
            .to_string()
            .contains("missing feature: render")
    );
    assert!(
        DemuxError::negotiation("x")
            .to_string()
            .contains("negotiation error:")
    );
    assert!(DemuxError::provider("x").to_string().contains("provider error:"));
    assert!(DemuxError::io("x").to_string().contains("io error:"));
    assert!(
        DemuxError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn flow_errors_convert() {
    let err: DemuxError = FlowError::NotNegotiated.into();
    assert!(matches!(err, DemuxError::Flow(FlowError::NotNegotiated)));
    assert!(err.to_string().contains("not negotiated"));
}

#[test]
fn fatal_setup_classification() {
    assert!(DemuxError::parse("bad xml").is_fatal_setup());
    assert!(DemuxError::missing_feature("window").is_fatal_setup());
    assert!(!DemuxError::Flow(FlowError::Flushing).is_fatal_setup());
    assert!(!DemuxError::provider("boom").is_fatal_setup());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = DemuxError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
