//! Fixed-capacity stack used by tree traversal.

/// A LIFO stack with room for `N` items and no heap allocation.
///
/// Pushing onto a full stack is a caller bug: it trips a debug assertion
/// and then panics on the out-of-bounds write.
#[derive(Debug, Clone)]
pub struct Stack<T, const N: usize> {
    items: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> Stack<T, N> {
    /// Empty stack.
    pub fn new() -> Self {
        Self {
            items: [T::default(); N],
            len: 0,
        }
    }

    /// Push an item.
    #[inline]
    pub fn push(&mut self, item: T) {
        debug_assert!(self.len < N, "stack overflow: capacity is {N}");
        self.items[self.len] = item;
        self.len += 1;
    }

    /// Pop the most recently pushed item.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.items[self.len])
    }

    /// The most recently pushed item.
    #[inline]
    pub fn top(&self) -> Option<&T> {
        self.len.checked_sub(1).map(|i| &self.items[i])
    }

    /// Mutable access to the most recently pushed item.
    #[inline]
    pub fn top_mut(&mut self) -> Option<&mut T> {
        self.len.checked_sub(1).map(move |i| &mut self.items[i])
    }

    /// Whether the stack holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of items on the stack.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Remove every item.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Maximum number of items.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T: Copy + Default, const N: usize> Default for Stack<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifo_order() {
        let mut stack: Stack<u32, 4> = Stack::new();
        assert!(stack.is_empty());
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.top(), Some(&3));
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut stack: Stack<u8, 3> = Stack::new();
        for i in 0..3 {
            stack.push(i);
        }
        assert_eq!(stack.len(), stack.capacity());
        if let Some(top) = stack.top_mut() {
            *top = 9;
        }
        assert_eq!(stack.pop(), Some(9));
        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_overflow_panics() {
        let mut stack: Stack<u8, 2> = Stack::new();
        stack.push(0);
        stack.push(1);
        stack.push(2);
    }
}
