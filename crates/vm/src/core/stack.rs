use std::{collections::VecDeque, fmt::Display};

use alloy::primitives::U256;

use crate::{core::constants::MAX_STACK_SIZE, error::ExceptionalHalt};

/// The [`Stack`] struct represents the EVM stack.
/// It is a LIFO data structure holding at most [`MAX_STACK_SIZE`] words.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Stack {
    /// The stack items in LIFO order.
    ///
    /// The front of the deque represents the top of the stack.
    pub stack: VecDeque<U256>,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Creates a new [`Stack`].
    ///
    /// ```
    /// use meridian_vm::core::stack::Stack;
    ///
    /// let stack = Stack::new();
    /// assert_eq!(stack.size(), 0);
    /// ```
    pub fn new() -> Stack {
        Stack { stack: VecDeque::with_capacity(MAX_STACK_SIZE) }
    }

    /// Push a value onto the stack.
    ///
    /// ```
    /// use meridian_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x00)).expect("stack has room");
    /// assert_eq!(stack.size(), 1);
    /// ```
    pub fn push(&mut self, value: U256) -> Result<(), ExceptionalHalt> {
        if self.stack.len() >= MAX_STACK_SIZE {
            return Err(ExceptionalHalt::StackOverflow);
        }
        self.stack.push_front(value);
        Ok(())
    }

    /// Pop a value off the stack.
    ///
    /// ```
    /// use meridian_vm::{core::stack::Stack, ExceptionalHalt};
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x01)).expect("stack has room");
    ///
    /// assert_eq!(stack.pop(), Ok(U256::from(0x01)));
    /// assert_eq!(stack.pop(), Err(ExceptionalHalt::StackUnderflow));
    /// ```
    pub fn pop(&mut self) -> Result<U256, ExceptionalHalt> {
        self.stack.pop_front().ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// Pop n values off the stack, top first. Nothing is popped if fewer than n values are
    /// available.
    ///
    /// ```
    /// use meridian_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// for i in 0..3 {
    ///     stack.push(U256::from(i)).expect("stack has room");
    /// }
    ///
    /// // stack is now [0x02, 0x01, 0x00]
    /// let values = stack.pop_n(2).expect("enough values");
    /// assert_eq!(values, vec![U256::from(2), U256::from(1)]);
    /// assert_eq!(stack.size(), 1);
    /// ```
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<U256>, ExceptionalHalt> {
        if self.stack.len() < n {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        Ok(self.stack.drain(0..n).collect())
    }

    /// Swap the top value and the nth value below it (`SWAPn`).
    ///
    /// ```
    /// use meridian_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x00)).expect("stack has room");
    /// stack.push(U256::from(0x01)).expect("stack has room");
    ///
    /// // stack is now [0x01, 0x00]
    /// stack.swap(1).expect("two values");
    ///
    /// // stack is now [0x00, 0x01]
    /// assert_eq!(stack.peek(0), Ok(U256::from(0x00)));
    /// assert_eq!(stack.peek(1), Ok(U256::from(0x01)));
    /// ```
    pub fn swap(&mut self, n: usize) -> Result<(), ExceptionalHalt> {
        if n == 0 || self.stack.len() <= n {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.stack.swap(0, n);
        Ok(())
    }

    /// Duplicate the nth value on the stack (`DUPn`, 1-indexed).
    ///
    /// ```
    /// use meridian_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x07)).expect("stack has room");
    ///
    /// // stack is now [0x07]
    /// stack.dup(1).expect("one value");
    ///
    /// // stack is now [0x07, 0x07]
    /// assert_eq!(stack.size(), 2);
    /// assert_eq!(stack.peek(1), Ok(U256::from(0x07)));
    /// ```
    pub fn dup(&mut self, n: usize) -> Result<(), ExceptionalHalt> {
        let index = n.checked_sub(1).ok_or(ExceptionalHalt::StackUnderflow)?;
        let value = self.peek(index)?;
        self.push(value)
    }

    /// Peek at the value `index` positions below the top of the stack.
    ///
    /// ```
    /// use meridian_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x00)).expect("stack has room");
    ///
    /// // stack is now [0x00]
    /// assert_eq!(stack.peek(0), Ok(U256::from(0x00)));
    /// assert!(stack.peek(1).is_err());
    /// ```
    pub fn peek(&self, index: usize) -> Result<U256, ExceptionalHalt> {
        self.stack.get(index).copied().ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// Get the size of the stack
    pub fn size(&self) -> usize {
        self.stack.len()
    }

    /// Check if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns a copy of the stack, top first.
    pub fn snapshot(&self) -> Vec<U256> {
        self.stack.iter().copied().collect()
    }
}

impl Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items: Vec<String> = self.stack.iter().map(|value| format!("{value:#x}")).collect();
        write!(f, "[{}]", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use crate::{
        core::{constants::MAX_STACK_SIZE, stack::Stack},
        error::ExceptionalHalt,
    };

    fn stack_of(values: &[u64]) -> Stack {
        let mut stack = Stack::new();
        for value in values {
            stack.push(U256::from(*value)).expect("stack has room");
        }
        stack
    }

    #[test]
    fn test_push_pop() {
        let mut stack = stack_of(&[1, 2]);
        assert_eq!(stack.pop(), Ok(U256::from(2)));
        assert_eq!(stack.pop(), Ok(U256::from(1)));
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), Err(ExceptionalHalt::StackUnderflow));
    }

    #[test]
    fn test_overflow() {
        let mut stack = Stack::new();
        for i in 0..MAX_STACK_SIZE {
            stack.push(U256::from(i)).expect("stack has room");
        }
        assert_eq!(stack.push(U256::ZERO), Err(ExceptionalHalt::StackOverflow));
        assert_eq!(stack.size(), MAX_STACK_SIZE);
        assert_eq!(stack.dup(1), Err(ExceptionalHalt::StackOverflow));
    }

    #[test]
    fn test_pop_n() {
        let mut stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.pop_n(2), Ok(vec![U256::from(3), U256::from(2)]));
        assert_eq!(stack.pop_n(2), Err(ExceptionalHalt::StackUnderflow));
        assert_eq!(stack.size(), 1);
    }

    #[test]
    fn test_swap() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.swap(2).expect("three values");
        assert_eq!(stack.snapshot(), vec![U256::from(1), U256::from(2), U256::from(3)]);
        assert_eq!(stack.swap(3), Err(ExceptionalHalt::StackUnderflow));
    }

    #[test]
    fn test_dup() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.dup(3).expect("three values");
        assert_eq!(stack.peek(0), Ok(U256::from(1)));
        assert_eq!(stack.size(), 4);
        assert_eq!(stack.dup(5), Err(ExceptionalHalt::StackUnderflow));
    }

    #[test]
    fn test_display() {
        let stack = stack_of(&[1, 255]);
        assert_eq!(stack.to_string(), "[0xff, 0x1]");
    }
}
