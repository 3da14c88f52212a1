use crate::{Vec, vec};

use super::RuntimeError;

/// Fixed-capacity operand stack.
///
/// All slots are allocated up front. `sp` is the index of the next free slot,
/// so it doubles as the number of live values. Popping only moves `sp`; the
/// popped value stays in its slot until a later push overwrites it, which is
/// what [`Stack::last_popped`] reads.
///
/// # Examples
///
/// ```ignore
/// use monk_core::vm::Stack;
///
/// let mut stack = Stack::new(4, 0);
/// stack.push(42)?;
/// stack.push(17)?;
/// assert_eq!(stack.pop()?, 17);
/// assert_eq!(stack.last_popped(), Some(17));
/// assert_eq!(stack.top(), Some(42));
/// ```
pub struct Stack<T> {
    /// Backing storage; always `capacity` long.
    slots: Vec<T>,
    sp: usize,
}

impl<T: Copy> Stack<T> {
    /// Creates a stack of `capacity` slots, all set to `fill`.
    pub fn new(capacity: usize, fill: T) -> Self {
        Self {
            slots: vec![fill; capacity],
            sp: 0,
        }
    }

    /// Pushes a value onto the stack.
    ///
    /// Fails with [`RuntimeError::StackOverflow`] when every slot is live;
    /// the values already on the stack are left untouched.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), RuntimeError> {
        let Some(slot) = self.slots.get_mut(self.sp) else {
            return Err(RuntimeError::StackOverflow {
                capacity: self.slots.len(),
            });
        };
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    /// Removes and returns the top value.
    ///
    /// Fails with [`RuntimeError::StackUnderflow`] on an empty stack. Compiled
    /// code never gets there; hand-assembled or deserialized streams can.
    #[inline]
    pub fn pop(&mut self) -> Result<T, RuntimeError> {
        let sp = self.sp.checked_sub(1).ok_or(RuntimeError::StackUnderflow)?;
        self.sp = sp;
        Ok(self.slots[sp])
    }

    /// Returns the top value without removing it.
    #[inline]
    pub fn top(&self) -> Option<T> {
        self.sp.checked_sub(1).map(|index| self.slots[index])
    }

    /// Returns the value in slot `sp`: the one most recently popped, unless
    /// it has been overwritten since. `None` only when the stack is full.
    #[inline]
    pub fn last_popped(&self) -> Option<T> {
        self.slots.get(self.sp).copied()
    }

    /// Number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.sp
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    /// Maximum number of live values.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live values, bottom first.
    #[cfg(test)]
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.sp]
    }
}
