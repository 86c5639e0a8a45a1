//! Frame-indexed deferred reclamation.
//!
//! GPU work for a frame may still be in flight when the CPU releases a
//! resource, so native destruction is postponed: a deleter is stamped with
//! the frame it was enqueued on, and runs only once `frames_in_flight`
//! further frames have begun. No per-resource fences are involved; the
//! frames-in-flight window is the whole synchronisation argument.

use std::fmt;

struct DeleteEntry {
    frame: u64,
    deleter: Box<dyn FnOnce()>,
}

/// An ordered queue of frame-stamped deleters.
///
/// Deleters enqueued in the same frame run in enqueue order, which matters
/// for resources that depend on each other (an image view must go before its
/// image).
pub struct DeletionQueue {
    entries: Vec<DeleteEntry>,
    frames_in_flight: u64,
}

impl DeletionQueue {
    pub fn new(frames_in_flight: usize) -> DeletionQueue {
        assert!(frames_in_flight >= 1);
        DeletionQueue {
            entries: Vec::new(),
            frames_in_flight: frames_in_flight as u64,
        }
    }

    /// Appends a deleter to run once `current_frame` is at least
    /// `frames_in_flight` frames in the past.
    pub fn defer(&mut self, current_frame: u64, deleter: impl FnOnce() + 'static) {
        self.entries.push(DeleteEntry {
            frame: current_frame,
            deleter: Box::new(deleter),
        });
    }

    /// Runs and removes every entry that has aged out of the in-flight
    /// window, in enqueue order.
    pub fn flush_frame(&mut self, current_frame: u64) {
        let frames_in_flight = self.frames_in_flight;
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.frame + frames_in_flight <= current_frame {
                (entry.deleter)();
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
    }

    /// Runs every pending deleter regardless of age. Used on device teardown
    /// after the GPU has gone idle.
    pub fn flush_all(&mut self) {
        for entry in self.entries.drain(..) {
            (entry.deleter)();
        }
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for DeletionQueue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DeletionQueue")
            .field("pending", &self.entries.len())
            .field("frames_in_flight", &self.frames_in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        (log, move |tag| {
            let log = log2.clone();
            Box::new(move || log.borrow_mut().push(tag))
        })
    }

    #[test]
    fn respects_the_in_flight_window() {
        let (log, deleter) = recorder();
        let mut queue = DeletionQueue::new(2);

        queue.defer(0, deleter(0));
        queue.flush_frame(0);
        assert!(log.borrow().is_empty());
        queue.flush_frame(1);
        assert!(log.borrow().is_empty());
        queue.flush_frame(2);
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn same_frame_entries_run_in_enqueue_order() {
        let (log, deleter) = recorder();
        let mut queue = DeletionQueue::new(1);
        queue.defer(5, deleter(1));
        queue.defer(5, deleter(2));
        queue.defer(5, deleter(3));
        queue.flush_frame(6);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn younger_entries_survive_a_flush() {
        let (log, deleter) = recorder();
        let mut queue = DeletionQueue::new(2);
        queue.defer(0, deleter(0));
        queue.defer(1, deleter(1));
        queue.flush_frame(2);
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(queue.pending(), 1);
        queue.flush_frame(3);
        assert_eq!(*log.borrow(), vec![0, 1]);
    }

    #[test]
    fn flush_all_drains_everything() {
        let (log, deleter) = recorder();
        let mut queue = DeletionQueue::new(3);
        queue.defer(10, deleter(1));
        queue.defer(11, deleter(2));
        queue.flush_all();
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(queue.pending(), 0);
    }
}
