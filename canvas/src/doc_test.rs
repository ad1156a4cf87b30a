#![allow(clippy::float_cmp)]

use super::*;
use uuid::Uuid;
use wire::ElementKind;

fn shape(z: i64) -> Element {
    let mut el = Element::new(Uuid::nil(), ElementKind::Shape);
    el.z_index = z;
    el
}

#[test]
fn new_store_is_empty() {
    let doc = DocStore::new();
    assert!(doc.is_empty());
    assert_eq!(doc.len(), 0);
    assert!(doc.bounds().is_none());
    assert!(doc.max_z().is_none());
}

#[test]
fn insert_replaces_same_id() {
    let mut doc = DocStore::new();
    let mut el = shape(1);
    doc.insert(el.clone());
    el.position_x = 99.0;
    doc.insert(el.clone());
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.get(&el.id).map(|e| e.position_x), Some(99.0));
}

#[test]
fn remove_returns_element() {
    let mut doc = DocStore::new();
    let el = shape(0);
    doc.insert(el.clone());
    assert_eq!(doc.remove(&el.id), Some(el.clone()));
    assert!(!doc.contains(&el.id));
    assert!(doc.remove(&el.id).is_none());
}

#[test]
fn apply_patch_updates_present_fields_only() {
    let mut doc = DocStore::new();
    let el = shape(3);
    doc.insert(el.clone());
    assert!(doc.apply_patch(&el.id, &ElementPatch::position(5.0, 6.0)));
    let got = doc.get(&el.id).cloned().unwrap();
    assert_eq!((got.position_x, got.position_y), (5.0, 6.0));
    assert_eq!(got.width, el.width);
    assert_eq!(got.z_index, 3);
}

#[test]
fn apply_patch_missing_returns_false() {
    let mut doc = DocStore::new();
    assert!(!doc.apply_patch(&Uuid::new_v4(), &ElementPatch::z_index(1)));
}

#[test]
fn load_snapshot_replaces_everything() {
    let mut doc = DocStore::new();
    doc.insert(shape(0));
    let a = shape(1);
    let b = shape(2);
    doc.load_snapshot(vec![a.clone(), b.clone()]);
    assert_eq!(doc.len(), 2);
    assert!(doc.contains(&a.id) && doc.contains(&b.id));
}

#[test]
fn sorted_elements_by_z_then_id() {
    let mut doc = DocStore::new();
    let mut low = shape(1);
    low.id = Uuid::from_u128(9);
    let mut tie_a = shape(5);
    tie_a.id = Uuid::from_u128(1);
    let mut tie_b = shape(5);
    tie_b.id = Uuid::from_u128(2);
    let neg = shape(-3);
    for el in [tie_b.clone(), low.clone(), neg.clone(), tie_a.clone()] {
        doc.insert(el);
    }
    let order: Vec<ElementId> = doc.sorted_elements().iter().map(|e| e.id).collect();
    assert_eq!(order, vec![neg.id, low.id, tie_a.id, tie_b.id]);
}

#[test]
fn z_extremes() {
    let mut doc = DocStore::new();
    for z in [4, -2, 9] {
        doc.insert(shape(z));
    }
    assert_eq!(doc.max_z(), Some(9));
    assert_eq!(doc.min_z(), Some(-2));
    assert_eq!(doc.z_pairs().len(), 3);
}

#[test]
fn bounds_cover_all_elements() {
    let mut doc = DocStore::new();
    let mut a = shape(0);
    a.position_x = -10.0;
    a.position_y = 0.0;
    a.width = 20.0;
    a.height = 20.0;
    let mut b = shape(1);
    b.position_x = 50.0;
    b.position_y = 40.0;
    b.width = 10.0;
    b.height = 10.0;
    doc.insert(a);
    doc.insert(b);
    assert_eq!(doc.bounds(), Some(Bounds::new(-10.0, 0.0, 70.0, 50.0)));
}
