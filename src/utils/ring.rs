use std::fmt::Debug;
use std::mem::MaybeUninit;

/// A growable double-ended ring buffer.
///
/// Backs the pending queue of [`TimelinePool`](crate::pool::TimelinePool), where
/// flight records are pushed at the back on submission and popped from the front
/// on reclaim. All pushes and pops are amortized O(1) at both ends.
///
/// Storage is always a power of two so index arithmetic can mask instead of
/// taking a modulo. One slot is kept permanently empty as a sentinel, making
/// `tail == head` unambiguously mean "empty": the usable capacity is
/// `storage - 1` slots.
pub struct RingDeque<T> {
    buf: Box<[MaybeUninit<T>]>,
    /// Index of the front element.
    tail: usize,
    /// One past the index of the back element.
    head: usize,
}

/// Initial storage size. 7 usable slots.
const MIN_SLOTS: usize = 8;

impl<T> RingDeque<T> {
    pub fn new() -> Self {
        Self {
            buf: Box::new_uninit_slice(MIN_SLOTS),
            tail: 0,
            head: 0,
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.buf.len() - 1
    }

    /// Number of elements currently in the deque.
    #[inline]
    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail) & self.mask()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tail == self.head
    }

    /// Number of elements the deque can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn push_back(&mut self, value: T) {
        if self.len() == self.capacity() {
            self.grow();
        }
        self.buf[self.head].write(value);
        self.head = (self.head + 1) & self.mask();
    }

    pub fn push_front(&mut self, value: T) {
        if self.len() == self.capacity() {
            self.grow();
        }
        self.tail = self.tail.wrapping_sub(1) & self.mask();
        self.buf[self.tail].write(value);
    }

    /// Removes and returns the front element, or `None` if the deque is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // Safety: the slot at `tail` is initialized whenever the deque is
        // non-empty, and advancing `tail` gives up ownership of it.
        let value = unsafe { self.buf[self.tail].assume_init_read() };
        self.tail = (self.tail + 1) & self.mask();
        Some(value)
    }

    /// Removes and returns the back element, or `None` if the deque is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.head = self.head.wrapping_sub(1) & self.mask();
        // Safety: `head` was just moved back onto the last initialized slot.
        let value = unsafe { self.buf[self.head].assume_init_read() };
        Some(value)
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Returns the element at logical position `index` from the front.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        let slot = (self.tail + index) & self.mask();
        // Safety: slots within `len()` of `tail` are initialized.
        Some(unsafe { self.buf[slot].assume_init_ref() })
    }

    /// Iterates front to back. Reversible for back-to-front traversal.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            deque: self,
            range: 0..self.len(),
        }
    }

    /// Doubles the storage and restores ring contiguity.
    ///
    /// After doubling, the occupied slots must again form one contiguous span
    /// or wrap cleanly around the new end. Whichever of the two logical spans
    /// is shorter gets relocated.
    fn grow(&mut self) {
        let old_slots = self.buf.len();
        let mut buf: Box<[MaybeUninit<T>]> = Box::new_uninit_slice(old_slots * 2);
        // Safety: bitwise move of the old storage; the old allocation is
        // dropped without running destructors, so no element is dropped twice.
        unsafe {
            std::ptr::copy_nonoverlapping(self.buf.as_ptr(), buf.as_mut_ptr(), old_slots);
        }
        if self.tail > self.head {
            // Wrapped: [tail..old_slots) holds the front span, [0..head) the
            // back span. Relocate the shorter one.
            let front_span = old_slots - self.tail;
            let back_span = self.head;
            unsafe {
                if back_span <= front_span {
                    // Move the back span just past the old storage end.
                    std::ptr::copy_nonoverlapping(
                        buf.as_ptr(),
                        buf.as_mut_ptr().add(old_slots),
                        back_span,
                    );
                    self.head += old_slots;
                } else {
                    // Move the front span against the new storage end.
                    std::ptr::copy_nonoverlapping(
                        buf.as_ptr().add(self.tail),
                        buf.as_mut_ptr().add(self.tail + old_slots),
                        front_span,
                    );
                    self.tail += old_slots;
                }
            }
        }
        self.buf = buf;
    }
}

impl<T> Default for RingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RingDeque<T> {
    fn drop(&mut self) {
        while self.pop_front().is_some() {}
    }
}

impl<T: Debug> Debug for RingDeque<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for RingDeque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut deque = Self::new();
        for value in iter {
            deque.push_back(value);
        }
        deque
    }
}

pub struct Iter<'a, T> {
    deque: &'a RingDeque<T>,
    range: std::ops::Range<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.range.next()?;
        self.deque.get(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let index = self.range.next_back()?;
        self.deque.get(index)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RingDeque<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
