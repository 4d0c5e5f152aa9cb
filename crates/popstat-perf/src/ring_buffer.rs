use std::collections::VecDeque;

/// Fixed-capacity FIFO: pushing into a full buffer drops the oldest item.
#[derive(Debug, Clone)]
pub(crate) struct RingBuffer<T> {
    capacity: usize,
    buf: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub(crate) fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buf.len() >= self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(item);
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.buf.iter()
    }

    pub(crate) fn last(&self) -> Option<&T> {
        self.buf.back()
    }

    pub(crate) fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.buf.iter().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }
}
