//! Vertical slot assignment for the tidy-tree layout.

use crate::worldline::Worldline;

/// Hands out vertical slots to leaves, in visit order.
#[derive(Debug, Clone, Default)]
pub struct SlotCursor {
    next: u32,
    used: bool,
}

impl SlotCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next free slot.
    pub fn take(&mut self) -> f64 {
        let slot = self.next;
        self.next += 1;
        self.used = true;
        f64::from(slot)
    }

    /// Leave `gap` empty slots, unless nothing has been placed yet.
    pub fn skip(&mut self, gap: u32) {
        if self.used {
            self.next += gap;
        }
    }

    /// Number of slots consumed so far, gaps included.
    pub fn position(&self) -> u32 {
        self.next
    }
}

/// Assign a vertical slot to every node of the worldline.
///
/// Leaves take consecutive slots in post-order; an internal node sits at the
/// mean of its children. Independent roots are separated by `lane_gap` slots.
pub fn assign_slots(worldline: &Worldline<'_>, cursor: &mut SlotCursor, lane_gap: u32) -> Vec<f64> {
    let mut slots = vec![0.0; worldline.len()];
    for (lane, &root) in worldline.roots().iter().enumerate() {
        if lane > 0 {
            cursor.skip(lane_gap);
        }
        for i in worldline.post_order(root) {
            let children = worldline.children(i);
            slots[i] = if children.is_empty() {
                cursor.take()
            } else {
                children.iter().map(|&c| slots[c]).sum::<f64>() / children.len() as f64
            };
        }
    }
    slots
}
