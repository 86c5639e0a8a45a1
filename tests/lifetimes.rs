//! Handle, slot-map and deferred-reclamation behaviour through the public
//! API. These run without a GPU.

use squall::deletion::DeletionQueue;
use squall::slot_map::SlotMap;
use squall::{BufferHandle, ImageHandle, SlotKey};
use std::{cell::Cell, rc::Rc};

#[test]
fn keys_stay_valid_until_erased() {
    let mut map = SlotMap::new();
    let key = map.insert(42u32);
    assert_eq!(map.get(key), Some(&42));

    assert!(map.erase(key));
    assert_eq!(map.get(key), None);
}

#[test]
fn stale_keys_stay_dead_after_slot_reuse() {
    let mut map = SlotMap::new();
    let old = map.insert("first");
    map.erase(old);

    let new = map.insert("second");
    // same slot, different generation
    assert_eq!(new.index, old.index);
    assert_ne!(new, old);

    assert_eq!(map.get(old), None);
    assert_eq!(map.get(new), Some(&"second"));
}

#[test]
fn insert_erase_insert_never_reuses_a_key() {
    let mut map = SlotMap::new();
    let mut seen = Vec::new();
    let mut key = map.insert(0u32);
    for round in 1..50u32 {
        seen.push(key);
        map.erase(key);
        key = map.insert(round);
        assert!(!seen.contains(&key));
    }
}

#[test]
fn typed_handles_do_not_compare_across_generations() {
    let a = ImageHandle::unpack(SlotKey::new(5, 1).pack());
    let b = ImageHandle::unpack(SlotKey::new(5, 2).pack());
    assert_ne!(a, b);
    assert!(ImageHandle::NULL.is_null());
    assert!(BufferHandle::NULL.is_null());
    assert_eq!(BufferHandle::NULL.pack(), u64::MAX);
}

/// A resource released at frame F is destroyed by the end_frame that moves
/// the counter to F + frames_in_flight, and not one frame earlier.
#[test]
fn deleters_run_exactly_frames_in_flight_frames_later() {
    const FRAMES_IN_FLIGHT: usize = 2;

    let destroyed = Rc::new(Cell::new(false));
    let mut queue = DeletionQueue::new(FRAMES_IN_FLIGHT);

    // released at frame 3
    let flag = destroyed.clone();
    queue.defer(3, move || flag.set(true));

    // first end_frame after the release: counter reaches 4, still in flight
    queue.flush_frame(4);
    assert!(!destroyed.get());

    // second end_frame: counter reaches 5 = 3 + frames_in_flight
    queue.flush_frame(5);
    assert!(destroyed.get());
}

#[test]
fn dependent_deleters_run_in_enqueue_order() {
    // an image view must be destroyed before its image
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));
    let mut queue = DeletionQueue::new(1);

    let log = order.clone();
    queue.defer(0, move || log.borrow_mut().push("view"));
    let log = order.clone();
    queue.defer(0, move || log.borrow_mut().push("image"));

    queue.flush_frame(1);
    assert_eq!(*order.borrow(), vec!["view", "image"]);
}

#[test]
fn flush_all_is_teardown_only() {
    let count = Rc::new(Cell::new(0));
    let mut queue = DeletionQueue::new(3);
    for frame in 0..5u64 {
        let count = count.clone();
        queue.defer(frame, move || count.set(count.get() + 1));
    }
    // nothing is old enough yet
    queue.flush_frame(2);
    assert_eq!(count.get(), 0);

    queue.flush_all();
    assert_eq!(count.get(), 5);
    assert_eq!(queue.pending(), 0);
}
