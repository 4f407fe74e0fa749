//! Variable-move-to-front decision order.
//!
//! A doubly-linked queue over variables ordered by a monotonically
//! increasing "bumped" timestamp. Decisions walk backward from the
//! `unassigned` pointer; bumps move a variable to the tail. This is the
//! classical alternative to an activity heap.

use crate::clause::{VMap, Var};

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: Var,
    next: Var,
}

impl Default for Link {
    fn default() -> Self {
        Link {
            prev: Var::UNDEF,
            next: Var::UNDEF,
        }
    }
}

#[derive(Debug)]
pub struct VmtfQueue {
    links: VMap<Link>,
    bumped: VMap<u64>,
    first: Var,
    last: Var,
    /// Highest-stamped variable that may still be unassigned; all queue
    /// entries after it are known to be assigned.
    unassigned: Var,
    stamp: u64,
}

impl Default for VmtfQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl VmtfQueue {
    pub fn new() -> Self {
        Self {
            links: VMap::new(),
            bumped: VMap::new(),
            first: Var::UNDEF,
            last: Var::UNDEF,
            unassigned: Var::UNDEF,
            stamp: 0,
        }
    }

    pub fn len_stamp(&self) -> u64 {
        self.stamp
    }

    pub fn bumped(&self, v: Var) -> u64 {
        self.bumped[v]
    }

    /// Register a fresh variable at the tail of the queue.
    pub fn init_var(&mut self, v: Var) {
        self.links.insert_default(v, Link::default());
        self.bumped.insert_default(v, 0);
        self.enqueue_tail(v);
        self.unassigned = v;
    }

    fn enqueue_tail(&mut self, v: Var) {
        self.stamp += 1;
        self.bumped[v] = self.stamp;
        self.links[v] = Link {
            prev: self.last,
            next: Var::UNDEF,
        };
        if self.last != Var::UNDEF {
            self.links[self.last].next = v;
        } else {
            self.first = v;
        }
        self.last = v;
    }

    fn dequeue(&mut self, v: Var) {
        let Link { prev, next } = self.links[v];
        if prev != Var::UNDEF {
            self.links[prev].next = next;
        } else {
            self.first = next;
        }
        if next != Var::UNDEF {
            self.links[next].prev = prev;
        } else {
            self.last = prev;
        }
        if self.unassigned == v {
            // fall back to a position that is certainly not after `v`
            self.unassigned = if prev != Var::UNDEF { prev } else { next };
        }
    }

    /// Move `v` to the tail with a fresh timestamp.
    pub fn bump(&mut self, v: Var, is_unassigned: bool) {
        if self.last == v {
            self.stamp += 1;
            self.bumped[v] = self.stamp;
            return;
        }
        self.dequeue(v);
        self.enqueue_tail(v);
        if is_unassigned {
            self.unassigned = v;
        }
    }

    /// `v` became unassigned again; make sure the search pointer covers it.
    pub fn on_unassign(&mut self, v: Var) {
        if self.unassigned == Var::UNDEF || self.bumped[v] > self.bumped[self.unassigned] {
            self.unassigned = v;
        }
    }

    /// Walk backward from the search pointer until `eligible` accepts a
    /// variable. The pointer is left on the returned variable.
    pub fn pick<F: FnMut(Var) -> bool>(&mut self, mut eligible: F) -> Option<Var> {
        let mut idx = self.unassigned;
        while idx != Var::UNDEF && !eligible(idx) {
            idx = self.links[idx].prev;
        }
        if idx != Var::UNDEF {
            self.unassigned = idx;
            Some(idx)
        } else {
            None
        }
    }

    /// Shuffle the queue order. Only legal at restart points; timestamps are
    /// renumbered so they stay monotone along the queue.
    pub fn shuffle(&mut self, seed: &mut f64) {
        let mut order: Vec<Var> = vec![];
        let mut idx = self.first;
        while idx != Var::UNDEF {
            order.push(idx);
            idx = self.links[idx].next;
        }
        if order.len() < 2 {
            return;
        }
        for i in 0..order.len() - 1 {
            let j = i + irand(seed, (order.len() - i) as i32) as usize;
            order.swap(i, j);
        }
        self.first = Var::UNDEF;
        self.last = Var::UNDEF;
        for &v in &order {
            self.links[v] = Link::default();
        }
        for &v in &order {
            self.enqueue_tail(v);
        }
        self.unassigned = self.last;
    }

    #[cfg(test)]
    fn iter_queue(&self) -> Vec<Var> {
        let mut out = vec![];
        let mut idx = self.first;
        while idx != Var::UNDEF {
            out.push(idx);
            idx = self.links[idx].next;
        }
        out
    }
}

fn drand(seed: &mut f64) -> f64 {
    *seed *= 1389796.0;
    let q = (*seed / 2147483647.0) as i32;
    *seed -= q as f64 * 2147483647.0;
    *seed / 2147483647.0
}

fn irand(seed: &mut f64, size: i32) -> i32 {
    (drand(seed) * size as f64) as i32
}

#[cfg(test)]
mod test {
    use super::*;

    fn mk(n: u32) -> VmtfQueue {
        let mut q = VmtfQueue::new();
        for i in 0..n {
            q.init_var(Var::from_idx(i));
        }
        q
    }

    fn assert_monotone(q: &VmtfQueue) {
        let order = q.iter_queue();
        for w in order.windows(2) {
            assert!(
                q.bumped(w[0]) < q.bumped(w[1]),
                "timestamps must increase along the queue"
            );
        }
    }

    #[test]
    fn test_pick_most_recent_first() {
        let mut q = mk(4);
        // most recently initialized variable comes first
        assert_eq!(q.pick(|_| true), Some(Var::from_idx(3)));
        q.bump(Var::from_idx(1), true);
        assert_eq!(q.pick(|_| true), Some(Var::from_idx(1)));
        assert_monotone(&q);
    }

    #[test]
    fn test_pick_skips_ineligible() {
        let mut q = mk(3);
        let blocked = Var::from_idx(2);
        assert_eq!(q.pick(|v| v != blocked), Some(Var::from_idx(1)));
    }

    #[test]
    fn test_unassign_moves_pointer_back_up() {
        let mut q = mk(3);
        assert_eq!(q.pick(|v| v == Var::from_idx(0)), Some(Var::from_idx(0)));
        q.on_unassign(Var::from_idx(2));
        assert_eq!(q.pick(|_| true), Some(Var::from_idx(2)));
    }

    #[test]
    fn test_shuffle_keeps_monotone_timestamps() {
        let mut q = mk(8);
        q.bump(Var::from_idx(0), true);
        q.bump(Var::from_idx(5), true);
        let mut seed = 91648253.0;
        q.shuffle(&mut seed);
        assert_eq!(q.iter_queue().len(), 8);
        assert_monotone(&q);
    }
}
