#![allow(clippy::float_cmp)]

use super::*;

fn sample(client_id: Uuid, x: f64, y: f64) -> CursorSample {
    CursorSample { client_id, user_id: Uuid::nil(), name: "ada".into(), color: "#ff0000".into(), x, y }
}

// =============================================================================
// CursorThrottle
// =============================================================================

#[test]
fn first_sample_passes() {
    let mut t = CursorThrottle::new(50);
    assert_eq!(t.offer(Point::new(1.0, 2.0), 0), Some(Point::new(1.0, 2.0)));
}

#[test]
fn samples_inside_interval_are_held() {
    let mut t = CursorThrottle::new(50);
    t.offer(Point::new(0.0, 0.0), 1000);
    assert_eq!(t.offer(Point::new(1.0, 1.0), 1010), None);
    assert_eq!(t.offer(Point::new(2.0, 2.0), 1049), None);
    assert_eq!(t.offer(Point::new(3.0, 3.0), 1050), Some(Point::new(3.0, 3.0)));
    assert_eq!(t.flush(2000), None);
}

#[test]
fn flush_releases_latest_held_sample() {
    let mut t = CursorThrottle::new(50);
    t.offer(Point::new(0.0, 0.0), 0);
    t.offer(Point::new(1.0, 1.0), 10);
    t.offer(Point::new(2.0, 2.0), 20);
    assert_eq!(t.flush(30), None);
    assert_eq!(t.flush(50), Some(Point::new(2.0, 2.0)));
    assert_eq!(t.flush(200), None);
}

#[test]
fn publish_rate_is_bounded() {
    let mut t = CursorThrottle::new(50);
    let sent = (0..1000u64).filter(|ms| t.offer(Point::new(0.0, 0.0), *ms).is_some()).count();
    assert_eq!(sent, 20);
}

// =============================================================================
// RemoteCursors
// =============================================================================

#[test]
fn first_sample_snaps() {
    let mut cursors = RemoteCursors::new(&SessionConfig::default());
    let c = Uuid::new_v4();
    cursors.observe(&sample(c, 100.0, 50.0), 0);
    assert_eq!(cursors.position(&c), Some(Point::new(100.0, 50.0)));
}

#[test]
fn later_samples_are_interpolated() {
    let mut cursors = RemoteCursors::new(&SessionConfig::default());
    let c = Uuid::new_v4();
    cursors.observe(&sample(c, 0.0, 0.0), 0);
    cursors.observe(&sample(c, 100.0, 0.0), 10);
    assert_eq!(cursors.position(&c), Some(Point::new(0.0, 0.0)));
    cursors.tick();
    let p = cursors.position(&c).unwrap();
    assert!((p.x - 35.0).abs() < 1e-9);
    for _ in 0..200 {
        cursors.tick();
    }
    assert_eq!(cursors.position(&c), Some(Point::new(100.0, 0.0)));
}

#[test]
fn idle_cursor_fades_but_stays() {
    let mut cursors = RemoteCursors::new(&SessionConfig::default());
    let c = Uuid::new_v4();
    cursors.observe(&sample(c, 1.0, 1.0), 1_000);
    assert_eq!(cursors.opacity(&c, 3_999), Some(1.0));
    assert_eq!(cursors.opacity(&c, 4_000), Some(FADED_CURSOR_OPACITY));
    assert_eq!(cursors.opacity(&c, 60_000), Some(FADED_CURSOR_OPACITY));
    assert_eq!(cursors.len(), 1);

    cursors.observe(&sample(c, 2.0, 2.0), 61_000);
    assert_eq!(cursors.opacity(&c, 61_000), Some(1.0));
}

#[test]
fn remove_on_departure() {
    let mut cursors = RemoteCursors::new(&SessionConfig::default());
    let c = Uuid::new_v4();
    cursors.observe(&sample(c, 1.0, 1.0), 0);
    assert!(cursors.remove(&c));
    assert!(!cursors.remove(&c));
    assert!(cursors.is_empty());
    assert_eq!(cursors.opacity(&c, 0), None);
}

#[test]
fn views_are_sorted_by_name() {
    let mut cursors = RemoteCursors::new(&SessionConfig::default());
    let zed = CursorSample { name: "zed".into(), ..sample(Uuid::new_v4(), 0.0, 0.0) };
    let amy = CursorSample { name: "amy".into(), ..sample(Uuid::new_v4(), 5.0, 5.0) };
    cursors.observe(&zed, 0);
    cursors.observe(&amy, 0);
    let names: Vec<String> = cursors.views(0).into_iter().map(|v| v.name).collect();
    assert_eq!(names, vec!["amy", "zed"]);
}
