use crate::entry::Entry;

/// Fixed capacity ring of the most recent entries.
///
/// `first` is the slot of the oldest entry and `next` the slot the next
/// store writes to. `next` is allowed to sit at `depth` until the following
/// store wraps it back to zero. Once the ring is full every store evicts the
/// oldest entry.
///
/// With compaction enabled a run of consecutive entries carrying the same
/// message is stored once, followed by a single `"<message> (N)"` entry when
/// the run ends.
#[derive(Debug)]
pub struct Backlog {
    slots: Vec<Option<Entry>>,
    depth: usize,
    first: usize,
    next: usize,
    len: usize,
    compact_duplicates: bool,
    last_entry: Option<Entry>,
    duplicate_count: usize,
}

impl Backlog {
    pub fn new(depth: usize, compact_duplicates: bool) -> Self {
        Self {
            slots: vec![None; depth],
            depth,
            first: 0,
            next: 0,
            len: 0,
            compact_duplicates,
            last_entry: None,
            duplicate_count: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `(first, next)` ring cursors.
    pub fn cursors(&self) -> (usize, usize) {
        (self.first, self.next)
    }

    pub fn compact_duplicates(&self) -> bool {
        self.compact_duplicates
    }

    pub fn set_compact_duplicates(&mut self, compact: bool) {
        if !compact {
            self.finish_duplicate_run();
            self.last_entry = None;
        }
        self.compact_duplicates = compact;
    }

    /// Drops everything buffered and starts over with `depth` slots.
    pub fn resize(&mut self, depth: usize) {
        *self = Self::new(depth, self.compact_duplicates);
    }

    pub fn push(&mut self, entry: Entry) {
        if !self.compact_duplicates {
            self.store(entry);
            return;
        }

        let is_duplicate = self
            .last_entry
            .as_ref()
            .is_some_and(|last| last.message() == entry.message());

        if is_duplicate {
            self.duplicate_count += 1;
            self.last_entry = Some(entry);
            return;
        }

        self.finish_duplicate_run();
        self.duplicate_count = 1;
        self.last_entry = Some(entry.clone());
        self.store(entry);
    }

    /// Removes and returns every buffered entry, oldest first.
    ///
    /// A pending duplicate run is stored first so its summary is part of the
    /// result.
    pub fn drain(&mut self) -> Vec<Entry> {
        self.finish_duplicate_run();
        self.last_entry = None;
        self.duplicate_count = 0;

        if self.is_empty() {
            return Vec::new();
        }

        let mut slots = std::mem::replace(&mut self.slots, vec![None; self.depth]);
        let entries = if self.next > self.first {
            slots.drain(self.first..self.next).flatten().collect()
        } else {
            let mut entries: Vec<Entry> = Vec::with_capacity(self.len);
            entries.extend(slots.drain(self.first..self.depth).flatten());
            entries.extend(slots.drain(..self.next).flatten());
            entries
        };

        self.first = 0;
        self.next = 0;
        self.len = 0;

        entries
    }

    /// Buffered entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        (0..self.len).filter_map(move |offset| self.slots[(self.first + offset) % self.depth].as_ref())
    }

    fn finish_duplicate_run(&mut self) {
        if self.duplicate_count > 1 {
            if let Some(last) = self.last_entry.take() {
                self.store(last.compacted(self.duplicate_count));
            }
        }
        self.duplicate_count = 0;
    }

    fn store(&mut self, entry: Entry) {
        if self.depth == 0 {
            return;
        }

        if self.next >= self.depth {
            self.next = 0;
        }

        if self.len == self.depth {
            self.first = (self.first + 1) % self.depth;
        } else {
            self.len += 1;
        }

        self.slots[self.next] = Some(entry);
        self.next += 1;
    }
}
