use super::*;
use uuid::Uuid;
use wire::ElementKind;

fn placed(x: f64, y: f64, w: f64, h: f64, z: i64) -> Element {
    let mut el = Element::new(Uuid::nil(), ElementKind::Shape);
    el.position_x = x;
    el.position_y = y;
    el.width = w;
    el.height = h;
    el.z_index = z;
    el
}

#[test]
fn empty_doc_hits_nothing() {
    assert!(hit_test(Point::new(0.0, 0.0), &DocStore::new()).is_none());
}

#[test]
fn point_inside_hits() {
    let mut doc = DocStore::new();
    let el = placed(0.0, 0.0, 100.0, 50.0, 0);
    doc.insert(el.clone());
    assert_eq!(hit_test(Point::new(50.0, 25.0), &doc), Some(el.id));
    assert!(hit_test(Point::new(150.0, 25.0), &doc).is_none());
}

#[test]
fn topmost_wins_on_overlap() {
    let mut doc = DocStore::new();
    let below = placed(0.0, 0.0, 100.0, 100.0, 1);
    let above = placed(50.0, 50.0, 100.0, 100.0, 2);
    doc.insert(below.clone());
    doc.insert(above.clone());
    assert_eq!(hit_test(Point::new(75.0, 75.0), &doc), Some(above.id));
    assert_eq!(hit_test(Point::new(10.0, 10.0), &doc), Some(below.id));
}

#[test]
fn rotation_is_respected() {
    let mut el = placed(0.0, 45.0, 100.0, 10.0, 0);
    el.rotation = 90.0;
    // Rotated a quarter turn the bar stands upright through (50, 50).
    assert!(contains(&el, Point::new(50.0, 5.0)));
    assert!(!contains(&el, Point::new(5.0, 50.0)));
}
