use std::fmt;

use super::*;

/// A decoded EVM instruction.
///
/// Opcode families carry their operand: `Push(n)` reads `n` immediate bytes, `Dup(n)` and
/// `Swap(n)` address the `n`th stack item, `Log(n)` takes `n` topics. Bytes without a defined
/// opcode decode to [`Instruction::Invalid`], as does the designated `INVALID` (0xfe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Instruction {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Sha3,
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    BlobHash,
    BlobBaseFee,
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,
    TLoad,
    TStore,
    MCopy,
    Push0,
    /// `PUSH1`..`PUSH32`, carrying the number of immediate bytes.
    Push(u8),
    /// `DUP1`..`DUP16`.
    Dup(u8),
    /// `SWAP1`..`SWAP16`.
    Swap(u8),
    /// `LOG0`..`LOG4`, carrying the number of topics.
    Log(u8),
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    /// An undefined opcode, or the designated `INVALID` instruction.
    Invalid(u8),
    SelfDestruct,
}

impl Instruction {
    /// Decodes an opcode byte.
    ///
    /// ```
    /// use meridian_vm::core::opcodes::Instruction;
    ///
    /// assert_eq!(Instruction::decode(0x01), Instruction::Add);
    /// assert_eq!(Instruction::decode(0x61), Instruction::Push(2));
    /// assert_eq!(Instruction::decode(0xa3), Instruction::Log(3));
    /// assert_eq!(Instruction::decode(0x0c), Instruction::Invalid(0x0c));
    /// ```
    pub const fn decode(opcode: u8) -> Self {
        match opcode {
            STOP => Self::Stop,
            ADD => Self::Add,
            MUL => Self::Mul,
            SUB => Self::Sub,
            DIV => Self::Div,
            SDIV => Self::SDiv,
            MOD => Self::Mod,
            SMOD => Self::SMod,
            ADDMOD => Self::AddMod,
            MULMOD => Self::MulMod,
            EXP => Self::Exp,
            SIGNEXTEND => Self::SignExtend,
            LT => Self::Lt,
            GT => Self::Gt,
            SLT => Self::Slt,
            SGT => Self::Sgt,
            EQ => Self::Eq,
            ISZERO => Self::IsZero,
            AND => Self::And,
            OR => Self::Or,
            XOR => Self::Xor,
            NOT => Self::Not,
            BYTE => Self::Byte,
            SHL => Self::Shl,
            SHR => Self::Shr,
            SAR => Self::Sar,
            SHA3 => Self::Sha3,
            ADDRESS => Self::Address,
            BALANCE => Self::Balance,
            ORIGIN => Self::Origin,
            CALLER => Self::Caller,
            CALLVALUE => Self::CallValue,
            CALLDATALOAD => Self::CallDataLoad,
            CALLDATASIZE => Self::CallDataSize,
            CALLDATACOPY => Self::CallDataCopy,
            CODESIZE => Self::CodeSize,
            CODECOPY => Self::CodeCopy,
            GASPRICE => Self::GasPrice,
            EXTCODESIZE => Self::ExtCodeSize,
            EXTCODECOPY => Self::ExtCodeCopy,
            RETURNDATASIZE => Self::ReturnDataSize,
            RETURNDATACOPY => Self::ReturnDataCopy,
            EXTCODEHASH => Self::ExtCodeHash,
            BLOCKHASH => Self::BlockHash,
            COINBASE => Self::Coinbase,
            TIMESTAMP => Self::Timestamp,
            NUMBER => Self::Number,
            DIFFICULTY => Self::Difficulty,
            GASLIMIT => Self::GasLimit,
            CHAINID => Self::ChainId,
            SELFBALANCE => Self::SelfBalance,
            BASEFEE => Self::BaseFee,
            BLOBHASH => Self::BlobHash,
            BLOBBASEFEE => Self::BlobBaseFee,
            POP => Self::Pop,
            MLOAD => Self::MLoad,
            MSTORE => Self::MStore,
            MSTORE8 => Self::MStore8,
            SLOAD => Self::SLoad,
            SSTORE => Self::SStore,
            JUMP => Self::Jump,
            JUMPI => Self::JumpI,
            PC => Self::Pc,
            MSIZE => Self::MSize,
            GAS => Self::Gas,
            JUMPDEST => Self::JumpDest,
            TLOAD => Self::TLoad,
            TSTORE => Self::TStore,
            MCOPY => Self::MCopy,
            PUSH0 => Self::Push0,
            PUSH1..=PUSH32 => Self::Push(opcode - PUSH1 + 1),
            DUP1..=DUP16 => Self::Dup(opcode - DUP1 + 1),
            SWAP1..=SWAP16 => Self::Swap(opcode - SWAP1 + 1),
            LOG0..=LOG4 => Self::Log(opcode - LOG0),
            CREATE => Self::Create,
            CALL => Self::Call,
            CALLCODE => Self::CallCode,
            RETURN => Self::Return,
            DELEGATECALL => Self::DelegateCall,
            CREATE2 => Self::Create2,
            STATICCALL => Self::StaticCall,
            REVERT => Self::Revert,
            SELFDESTRUCT => Self::SelfDestruct,
            other => Self::Invalid(other),
        }
    }

    /// Returns the opcode byte this instruction was decoded from.
    pub const fn opcode(self) -> u8 {
        match self {
            Self::Stop => STOP,
            Self::Add => ADD,
            Self::Mul => MUL,
            Self::Sub => SUB,
            Self::Div => DIV,
            Self::SDiv => SDIV,
            Self::Mod => MOD,
            Self::SMod => SMOD,
            Self::AddMod => ADDMOD,
            Self::MulMod => MULMOD,
            Self::Exp => EXP,
            Self::SignExtend => SIGNEXTEND,
            Self::Lt => LT,
            Self::Gt => GT,
            Self::Slt => SLT,
            Self::Sgt => SGT,
            Self::Eq => EQ,
            Self::IsZero => ISZERO,
            Self::And => AND,
            Self::Or => OR,
            Self::Xor => XOR,
            Self::Not => NOT,
            Self::Byte => BYTE,
            Self::Shl => SHL,
            Self::Shr => SHR,
            Self::Sar => SAR,
            Self::Sha3 => SHA3,
            Self::Address => ADDRESS,
            Self::Balance => BALANCE,
            Self::Origin => ORIGIN,
            Self::Caller => CALLER,
            Self::CallValue => CALLVALUE,
            Self::CallDataLoad => CALLDATALOAD,
            Self::CallDataSize => CALLDATASIZE,
            Self::CallDataCopy => CALLDATACOPY,
            Self::CodeSize => CODESIZE,
            Self::CodeCopy => CODECOPY,
            Self::GasPrice => GASPRICE,
            Self::ExtCodeSize => EXTCODESIZE,
            Self::ExtCodeCopy => EXTCODECOPY,
            Self::ReturnDataSize => RETURNDATASIZE,
            Self::ReturnDataCopy => RETURNDATACOPY,
            Self::ExtCodeHash => EXTCODEHASH,
            Self::BlockHash => BLOCKHASH,
            Self::Coinbase => COINBASE,
            Self::Timestamp => TIMESTAMP,
            Self::Number => NUMBER,
            Self::Difficulty => DIFFICULTY,
            Self::GasLimit => GASLIMIT,
            Self::ChainId => CHAINID,
            Self::SelfBalance => SELFBALANCE,
            Self::BaseFee => BASEFEE,
            Self::BlobHash => BLOBHASH,
            Self::BlobBaseFee => BLOBBASEFEE,
            Self::Pop => POP,
            Self::MLoad => MLOAD,
            Self::MStore => MSTORE,
            Self::MStore8 => MSTORE8,
            Self::SLoad => SLOAD,
            Self::SStore => SSTORE,
            Self::Jump => JUMP,
            Self::JumpI => JUMPI,
            Self::Pc => PC,
            Self::MSize => MSIZE,
            Self::Gas => GAS,
            Self::JumpDest => JUMPDEST,
            Self::TLoad => TLOAD,
            Self::TStore => TSTORE,
            Self::MCopy => MCOPY,
            Self::Push0 => PUSH0,
            Self::Push(n) => PUSH1 + n - 1,
            Self::Dup(n) => DUP1 + n - 1,
            Self::Swap(n) => SWAP1 + n - 1,
            Self::Log(n) => LOG0 + n,
            Self::Create => CREATE,
            Self::Call => CALL,
            Self::CallCode => CALLCODE,
            Self::Return => RETURN,
            Self::DelegateCall => DELEGATECALL,
            Self::Create2 => CREATE2,
            Self::StaticCall => STATICCALL,
            Self::Revert => REVERT,
            Self::Invalid(opcode) => opcode,
            Self::SelfDestruct => SELFDESTRUCT,
        }
    }

    /// Returns the table entry for this instruction, or `None` for undefined opcodes.
    #[inline]
    pub const fn info(self) -> Option<OpCodeInfo> {
        OPCODE_INFO_TABLE[self.opcode() as usize]
    }

    /// Returns the mnemonic of this instruction.
    #[inline]
    pub fn name(self) -> &'static str {
        opcode_name(self.opcode())
    }

    /// Returns the fork that introduced this instruction.
    ///
    /// ```
    /// use meridian_vm::core::{hardfork::HardFork, opcodes::Instruction};
    ///
    /// assert_eq!(Instruction::Push0.activation(), HardFork::Shanghai);
    /// assert_eq!(Instruction::Add.activation(), HardFork::Frontier);
    /// ```
    pub const fn activation(self) -> HardFork {
        match self.info() {
            Some(info) => info.since(),
            None => HardFork::Frontier,
        }
    }

    /// Returns true if the instruction is defined and active under `fork`.
    pub const fn is_active(self, fork: HardFork) -> bool {
        !matches!(self, Self::Invalid(_)) && fork.is_active(self.activation())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(opcode) if *opcode != INVALID => write!(f, "unknown({opcode:#04x})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_inverse_of_opcode() {
        for byte in 0..=u8::MAX {
            assert_eq!(Instruction::decode(byte).opcode(), byte);
        }
    }

    #[test]
    fn test_defined_opcodes_decode_to_valid_instructions() {
        for byte in 0..=u8::MAX {
            let defined = OPCODE_INFO_TABLE[byte as usize].is_some() && byte != INVALID;
            assert_eq!(
                !matches!(Instruction::decode(byte), Instruction::Invalid(_)),
                defined,
                "opcode {byte:#04x}"
            );
        }
    }

    #[test]
    fn test_activation() {
        assert!(!Instruction::Push0.is_active(HardFork::London));
        assert!(Instruction::Push0.is_active(HardFork::Shanghai));
        assert!(!Instruction::Revert.is_active(HardFork::SpuriousDragon));
        assert!(Instruction::Revert.is_active(HardFork::Latest));
        assert!(!Instruction::Invalid(INVALID).is_active(HardFork::Latest));
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::Push(32).to_string(), "PUSH32");
        assert_eq!(Instruction::Invalid(0xfe).to_string(), "INVALID");
        assert_eq!(Instruction::Invalid(0x0c).to_string(), "unknown(0x0c)");
    }
}
