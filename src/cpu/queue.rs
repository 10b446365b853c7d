/// Capacity is tracked explicitly and grows in chunks of this many entries.
pub const QUEUE_GROWTH: usize = 16;

/// Pending-request queue.  Indexable like a vector, with batch removal by position so the issue
/// engine can pull requests out of the middle of its reorder window in one pass.
#[derive(Debug, Clone)]
pub struct RequestQueue<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(QUEUE_GROWTH),
            capacity: QUEUE_GROWTH,
        }
    }

    pub fn empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sets the capacity to `new_capacity`, dropping entries from the back if they no longer fit.
    pub fn resize(&mut self, new_capacity: usize) {
        self.items.truncate(new_capacity);
        if new_capacity > self.items.capacity() {
            self.items.reserve_exact(new_capacity - self.items.len());
        }
        self.capacity = new_capacity;
    }

    pub fn push_back(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            self.resize(self.capacity + QUEUE_GROWTH);
        }
        self.items.push(item);
    }

    /// Panics if `index >= size()`.
    pub fn at(&self, index: usize) -> &T {
        &self.items[index]
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Removes the given ascending positions.  Survivors keep their relative order.
    pub fn erase(&mut self, indices: &[usize]) {
        let _ = self.extract(indices);
    }

    /// Like `erase`, but hands the removed entries back in ascending position order.
    pub fn extract(&mut self, indices: &[usize]) -> Vec<T> {
        if indices.is_empty() {
            return Vec::new();
        }
        debug_assert!(
            indices.windows(2).all(|pair| pair[0] < pair[1]),
            "erase indices must be strictly ascending"
        );

        let mut removed = Vec::with_capacity(indices.len());
        let mut kept = Vec::with_capacity(self.capacity);
        let mut skip = indices.iter().copied().peekable();
        for (pos, item) in self.items.drain(..).enumerate() {
            if skip.peek() == Some(&pos) {
                let _ = skip.next();
                removed.push(item);
            } else {
                kept.push(item);
            }
        }
        self.items = kept;
        removed
    }
}
