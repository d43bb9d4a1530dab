//! Bounded LIFO stack that forgets its oldest element when full.

use std::collections::VecDeque;

/// A stack holding at most `limit` elements.
///
/// Pushing onto a full stack evicts the bottom (oldest) element.
///
/// ```rust
/// use document_core::LimitedStack;
///
/// let mut stack = LimitedStack::new(2);
/// stack.push(1);
/// stack.push(2);
/// assert_eq!(stack.push(3), Some(1));
/// assert_eq!(stack.pop(), Some(3));
/// assert_eq!(stack.pop(), Some(2));
/// assert_eq!(stack.pop(), None);
/// ```
#[derive(Debug, Clone)]
pub struct LimitedStack<T> {
    items: VecDeque<T>,
    limit: usize,
}

impl<T> LimitedStack<T> {
    /// Create an empty stack. A limit of 0 is treated as 1.
    pub fn new(limit: usize) -> Self {
        Self {
            items: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Push `item`, returning the element evicted to make room, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.limit {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Pop the newest element.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    /// Newest element.
    pub fn top(&self) -> Option<&T> {
        self.items.back()
    }

    /// Newest element, mutably.
    pub fn top_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Maximum number of elements.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit, dropping the oldest elements that no longer fit.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        while self.items.len() > self.limit {
            self.items.pop_front();
        }
    }

    /// Elements from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
