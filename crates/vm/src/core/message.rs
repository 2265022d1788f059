use alloy::primitives::{Address, Bytes, U256};

/// Whether a message runs existing code or deploys new code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Runs the code at `code_address`.
    Call,
    /// Runs `data` as init code and deploys its output at `to`.
    Create,
}

/// The input of a call frame.
///
/// Messages are immutable once built. Nested messages are derived from the running frame's
/// message with the `nested_*` helpers, which increase the depth by exactly one and propagate the
/// static flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Call or create.
    pub kind: MessageKind,
    /// The account that sent the message (`CALLER`).
    pub sender: Address,
    /// The account whose storage and balance the frame runs against (`ADDRESS`).
    pub to: Address,
    /// The account whose code is run. Differs from `to` for `CALLCODE` and `DELEGATECALL`.
    pub code_address: Address,
    /// The value attached to the message (`CALLVALUE`).
    pub value: U256,
    /// Gas available to the frame.
    pub gas: u64,
    /// Calldata for calls, init code for creates.
    pub data: Bytes,
    /// Nesting depth, `0` for the outermost frame.
    pub depth: usize,
    /// Whether state modifications are forbidden.
    pub is_static: bool,
    /// Whether `value` moves from `sender` to `to`. False for `DELEGATECALL`, which only
    /// inherits the parent's value, and for `CALLCODE`, which sends value to itself.
    pub is_transferring_value: bool,
}

impl Message {
    /// A top-level message calling `to`.
    ///
    /// ```
    /// use alloy::primitives::{Address, Bytes, U256};
    /// use meridian_vm::core::message::Message;
    ///
    /// let to = Address::repeat_byte(0x11);
    /// let message = Message::call(Address::ZERO, to, U256::ZERO, 100_000, Bytes::new());
    /// assert_eq!(message.code_address, to);
    /// assert_eq!(message.depth, 0);
    /// ```
    pub fn call(sender: Address, to: Address, value: U256, gas: u64, data: Bytes) -> Self {
        Self {
            kind: MessageKind::Call,
            sender,
            to,
            code_address: to,
            value,
            gas,
            data,
            depth: 0,
            is_static: false,
            is_transferring_value: true,
        }
    }

    /// A top-level message deploying `init_code` at `address`.
    pub fn create(
        sender: Address,
        address: Address,
        value: U256,
        gas: u64,
        init_code: Bytes,
    ) -> Self {
        Self { kind: MessageKind::Create, ..Self::call(sender, address, value, gas, init_code) }
    }

    /// Returns true for contract creation messages.
    pub fn is_create(&self) -> bool {
        self.kind == MessageKind::Create
    }

    fn nested(
        &self,
        to: Address,
        code_address: Address,
        value: U256,
        gas: u64,
        data: Bytes,
    ) -> Self {
        Self {
            kind: MessageKind::Call,
            sender: self.to,
            to,
            code_address,
            value,
            gas,
            data,
            depth: self.depth + 1,
            is_static: self.is_static,
            is_transferring_value: true,
        }
    }

    /// The message of a `CALL` from this frame.
    pub fn nested_call(&self, to: Address, value: U256, gas: u64, data: Bytes) -> Self {
        self.nested(to, to, value, gas, data)
    }

    /// The message of a `CALLCODE` from this frame: runs `code_address`'s code against this
    /// frame's account.
    pub fn nested_callcode(
        &self,
        code_address: Address,
        value: U256,
        gas: u64,
        data: Bytes,
    ) -> Self {
        let message = self.nested(self.to, code_address, value, gas, data);
        Self { is_transferring_value: false, ..message }
    }

    /// The message of a `DELEGATECALL` from this frame: keeps this frame's sender and value.
    pub fn nested_delegatecall(&self, code_address: Address, gas: u64, data: Bytes) -> Self {
        Self {
            sender: self.sender,
            is_transferring_value: false,
            ..self.nested(self.to, code_address, self.value, gas, data)
        }
    }

    /// The message of a `STATICCALL` from this frame.
    ///
    /// ```
    /// use alloy::primitives::{Address, Bytes, U256};
    /// use meridian_vm::core::message::Message;
    ///
    /// let to = Address::repeat_byte(1);
    /// let parent = Message::call(Address::ZERO, to, U256::ZERO, 0, Bytes::new());
    /// let child = parent.nested_staticcall(Address::repeat_byte(2), 0, Bytes::new());
    /// let grandchild = child.nested_call(Address::repeat_byte(3), U256::ZERO, 0, Bytes::new());
    ///
    /// assert!(child.is_static && grandchild.is_static);
    /// assert_eq!(grandchild.depth, 2);
    /// assert_eq!(grandchild.sender, Address::repeat_byte(2));
    /// ```
    pub fn nested_staticcall(&self, to: Address, gas: u64, data: Bytes) -> Self {
        Self { is_static: true, ..self.nested(to, to, U256::ZERO, gas, data) }
    }

    /// The message of a `CREATE` or `CREATE2` from this frame.
    pub fn nested_create(
        &self,
        address: Address,
        value: U256,
        gas: u64,
        init_code: Bytes,
    ) -> Self {
        Self { kind: MessageKind::Create, ..self.nested(address, address, value, gas, init_code) }
    }
}
