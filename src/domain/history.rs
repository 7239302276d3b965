// Bounded history buffer with coalesced change notifications
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryChange<T> {
    Appended(T),
    Evicted(T),
    /// Contents replaced wholesale; emitted once when a bulk update ends
    Reset,
}

pub type ChangeListener<T> = Box<dyn FnMut(&HistoryChange<T>, &VecDeque<T>) + Send>;

/// Ordered FIFO sequence that never holds more than `capacity` items.
///
/// Every single-element mutation reports one [`HistoryChange`] to the listener.
/// Inside a [`BulkUpdate`] scope element reports are suppressed and a single
/// [`HistoryChange::Reset`] is reported when the scope ends.
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
    listener: Option<ChangeListener<T>>,
    suppressed: bool,
}

impl<T: Clone> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            listener: None,
            suppressed: false,
        }
    }

    pub fn with_listener(capacity: usize, listener: ChangeListener<T>) -> Self {
        let mut history = Self::new(capacity);
        history.listener = Some(listener);
        history
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// Append one value, evicting the oldest first if the buffer is full
    pub fn push(&mut self, value: T) {
        if self.items.len() == self.capacity {
            self.evict_front(1);
        }
        self.items.push_back(value.clone());
        self.notify(HistoryChange::Appended(value));
    }

    /// Remove up to `count` of the oldest values, returning how many were removed
    pub fn evict_front(&mut self, count: usize) -> usize {
        let mut removed = 0;
        while removed < count {
            let Some(value) = self.items.pop_front() else {
                break;
            };
            removed += 1;
            self.notify(HistoryChange::Evicted(value));
        }
        removed
    }

    /// Enter bulk-mutation mode until the returned guard is dropped
    pub fn bulk_update(&mut self) -> BulkUpdate<'_, T> {
        self.suppressed = true;
        BulkUpdate { history: self }
    }

    fn notify(&mut self, change: HistoryChange<T>) {
        if self.suppressed {
            return;
        }
        if let Some(listener) = self.listener.as_mut() {
            listener(&change, &self.items);
        }
    }
}

pub struct BulkUpdate<'a, T: Clone> {
    history: &'a mut BoundedHistory<T>,
}

impl<T: Clone> Deref for BulkUpdate<'_, T> {
    type Target = BoundedHistory<T>;

    fn deref(&self) -> &Self::Target {
        self.history
    }
}

impl<T: Clone> DerefMut for BulkUpdate<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.history
    }
}

impl<T: Clone> Drop for BulkUpdate<'_, T> {
    fn drop(&mut self) {
        self.history.suppressed = false;
        self.history.notify(HistoryChange::Reset);
    }
}
