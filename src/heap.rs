//! A binary min-heap of entries keyed by their next firing instant.
//!
//! `std::collections::BinaryHeap` cannot remove an arbitrary element or
//! restore order after entries are rescheduled in place, so the sift
//! routines are written out here.

use crate::entry::Entry;

#[derive(Default)]
pub(crate) struct EntryHeap {
    entries: Vec<Entry>,
}

impl EntryHeap {
    pub fn peek(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.sift_up(self.entries.len() - 1);
    }

    pub fn pop(&mut self) -> Option<Entry> {
        if self.entries.is_empty() {
            return None;
        }
        let entry = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(entry)
    }

    /// Remove the first entry with the given id. No-op if absent.
    pub fn remove_id(&mut self, id: i64) -> Option<Entry> {
        let i = self.entries.iter().position(|e| e.id == id)?;
        Some(self.remove_at(i))
    }

    fn remove_at(&mut self, i: usize) -> Entry {
        let entry = self.entries.swap_remove(i);
        if i < self.entries.len() {
            self.sift_down(i);
            self.sift_up(i);
        }
        entry
    }

    /// Restore heap order after entries were mutated in place.
    pub fn rebuild(&mut self) {
        for i in (0..self.entries.len() / 2).rev() {
            self.sift_down(i);
        }
    }

    /// Drop entries that fail the predicate, then restore order.
    pub fn retain(&mut self, keep: impl FnMut(&Entry) -> bool) {
        self.entries.retain(keep);
        self.rebuild();
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// An entry that will never fire sorts after every scheduled one.
    fn less(a: &Entry, b: &Entry) -> bool {
        match (a.next, b.next) {
            (None, _) => false,
            (_, None) => true,
            (Some(a), Some(b)) => a < b,
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !Self::less(&self.entries[i], &self.entries[parent]) {
                break;
            }
            self.entries.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * i + 1;
            if left >= n {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < n && Self::less(&self.entries[right], &self.entries[left]) {
                child = right;
            }
            if !Self::less(&self.entries[child], &self.entries[i]) {
                break;
            }
            self.entries.swap(i, child);
            i = child;
        }
    }
}

impl IntoIterator for EntryHeap {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
