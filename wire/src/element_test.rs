#![allow(clippy::float_cmp)]

use super::*;

fn sticky() -> Element {
    let mut el = Element::new(Uuid::new_v4(), ElementKind::Sticky);
    el.position_x = 10.0;
    el.position_y = 20.0;
    el.content = Content::Text { body: "shot list".into() };
    el
}

#[test]
fn new_element_is_valid() {
    for kind in [
        ElementKind::Image,
        ElementKind::Video,
        ElementKind::Text,
        ElementKind::Shape,
        ElementKind::Sticky,
        ElementKind::Frame,
    ] {
        let el = Element::new(Uuid::new_v4(), kind);
        assert!(el.validate().is_ok(), "{kind} placeholder should validate");
    }
}

#[test]
fn validate_rejects_non_positive_size() {
    let mut el = sticky();
    el.width = 0.0;
    assert_eq!(el.validate(), Err(ValidationError::NonPositive { field: "width" }));

    let mut el = sticky();
    el.height = -4.0;
    assert_eq!(el.validate(), Err(ValidationError::NonPositive { field: "height" }));
}

#[test]
fn validate_rejects_non_finite_geometry() {
    let mut el = sticky();
    el.rotation = f64::NAN;
    assert_eq!(el.validate(), Err(ValidationError::NonFinite { field: "rotation" }));
}

#[test]
fn validate_rejects_opacity_out_of_range() {
    let mut el = sticky();
    el.style.opacity = Some(1.5);
    assert!(matches!(el.validate(), Err(ValidationError::OpacityOutOfRange(_))));

    el.style.opacity = Some(0.0);
    assert!(el.validate().is_ok());
}

#[test]
fn validate_rejects_mismatched_content() {
    let mut el = sticky();
    el.content = Content::Shape { shape: ShapeKind::Circle };
    assert_eq!(
        el.validate(),
        Err(ValidationError::ContentMismatch { kind: ElementKind::Sticky, content: "shape" })
    );
}

#[test]
fn validate_rejects_frame_containing_itself() {
    let mut frame = Element::new(Uuid::new_v4(), ElementKind::Frame);
    frame.content = Content::Frame { children: vec![frame.id] };
    assert_eq!(frame.validate(), Err(ValidationError::SelfReference(frame.id)));
}

#[test]
fn content_fits_matching_kinds_only() {
    let media = Content::Media { url: "https://cdn/clip.mp4".into(), thumbnail_url: None };
    assert!(media.fits(ElementKind::Video));
    assert!(media.fits(ElementKind::Image));
    assert!(!media.fits(ElementKind::Text));
    assert!(Content::Text { body: String::new() }.fits(ElementKind::Sticky));
    assert!(!Content::Frame { children: vec![] }.fits(ElementKind::Shape));
}

#[test]
fn apply_only_touches_present_fields() {
    let mut el = sticky();
    el.apply(&ElementPatch { position_x: Some(99.0), ..ElementPatch::default() });
    assert_eq!(el.position_x, 99.0);
    assert_eq!(el.position_y, 20.0);
    assert_eq!(el.content, Content::Text { body: "shot list".into() });
}

#[test]
fn apply_replaces_style_wholesale() {
    let mut el = sticky();
    el.style.fill = Some("#ffeb3b".into());
    el.apply(&ElementPatch::style(Style { stroke: Some("#000".into()), ..Style::default() }));
    assert_eq!(el.style.fill, None);
    assert_eq!(el.style.stroke.as_deref(), Some("#000"));
}

#[test]
fn pure_unlock_detection() {
    assert!(ElementPatch::locked(false).is_pure_unlock());
    assert!(!ElementPatch::locked(true).is_pure_unlock());

    let bundled = ElementPatch { locked: Some(false), position_x: Some(1.0), ..ElementPatch::default() };
    assert!(!bundled.is_pure_unlock());
    assert!(bundled.touches_unlocked_fields());
    assert!(!ElementPatch::locked(false).touches_unlocked_fields());
}

#[test]
fn patch_validate_rejects_empty_and_bad_values() {
    assert_eq!(ElementPatch::default().validate(), Err(ValidationError::EmptyPatch));
    assert_eq!(
        ElementPatch { width: Some(-1.0), ..ElementPatch::default() }.validate(),
        Err(ValidationError::NonPositive { field: "width" })
    );
    assert_eq!(
        ElementPatch::position(f64::INFINITY, 0.0).validate(),
        Err(ValidationError::NonFinite { field: "position_x" })
    );
    assert!(ElementPatch::position(-50.0, 12.5).validate().is_ok());
}

#[test]
fn inverse_for_restores_exact_prior_state() {
    let original = sticky();
    let patch = ElementPatch {
        position_x: Some(500.0),
        rotation: Some(45.0),
        style: Some(Style { opacity: Some(0.5), ..Style::default() }),
        ..ElementPatch::default()
    };
    let inverse = patch.inverse_for(&original);
    assert_eq!(inverse.position_y, None);
    assert_eq!(inverse.width, None);

    let changed = original.patched(&patch);
    assert_ne!(changed, original);
    assert_eq!(changed.patched(&inverse), original);
}

#[test]
fn merge_prefers_later_fields() {
    let mut patch = ElementPatch::position(1.0, 2.0);
    patch.merge(&ElementPatch { position_y: Some(9.0), width: Some(30.0), ..ElementPatch::default() });
    assert_eq!(patch.position_x, Some(1.0));
    assert_eq!(patch.position_y, Some(9.0));
    assert_eq!(patch.width, Some(30.0));
}

#[test]
fn content_serializes_with_type_tag() {
    let json = serde_json::to_value(Content::Frame { children: vec![] }).unwrap();
    assert_eq!(json, serde_json::json!({"type": "frame", "children": []}));

    let parsed: Content = serde_json::from_value(serde_json::json!({"type": "shape", "shape": "circle"})).unwrap();
    assert_eq!(parsed, Content::Shape { shape: ShapeKind::Circle });
}

#[test]
fn patch_omits_absent_fields_when_serialized() {
    let json = serde_json::to_value(ElementPatch::locked(false)).unwrap();
    assert_eq!(json, serde_json::json!({"locked": false}));
}
