use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::{state::MemorySpace, symbol::OperandKind};

// Assembly errors

/// Problems found while turning source text into a program. Nothing is executed if one of these
/// is produced.
#[derive(Debug, Error, Diagnostic)]
pub enum AsmError {
    #[error("line {line}: expected an instruction mnemonic")]
    #[diagnostic(
        code(parse::malformed),
        help("each line holds one instruction, like `ADDVV VR1 VR2 VR3`")
    )]
    MalformedInstruction {
        line: usize,
        #[source_code]
        src: String,
        #[label("no mnemonic")]
        span: SourceSpan,
    },

    #[error("line {line}: unknown instruction `{mnemonic}`")]
    #[diagnostic(
        code(parse::unknown_mnemonic),
        help("check the list of available instructions in the documentation")
    )]
    UnknownMnemonic {
        line: usize,
        mnemonic: String,
        #[source_code]
        src: String,
        #[label("unknown instruction")]
        span: SourceSpan,
    },

    #[error("line {line}: `{mnemonic}` takes {expected} operand(s), found {found}")]
    #[diagnostic(code(parse::operand_count))]
    OperandCountMismatch {
        line: usize,
        mnemonic: String,
        expected: usize,
        found: usize,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("line {line}: expected {expected}, found {found}")]
    #[diagnostic(
        code(parse::operand_type),
        help("scalar registers are written `SR0`..`SR7`, vector registers `VR0`..`VR7`")
    )]
    OperandTypeMismatch {
        line: usize,
        expected: OperandKind,
        found: OperandKind,
        #[source_code]
        src: String,
        #[label("wrong operand type")]
        span: SourceSpan,
    },

    #[error("line {line}: `{token}` is not a register or integer")]
    #[diagnostic(code(parse::invalid_operand))]
    InvalidOperand {
        line: usize,
        token: String,
        #[source_code]
        src: String,
        #[label("invalid operand")]
        span: SourceSpan,
    },

    #[error("line {line}: register `{token}` does not exist")]
    #[diagnostic(
        code(parse::register_range),
        help("register indices range from 0 to 7")
    )]
    RegisterIndexOutOfRange {
        line: usize,
        token: String,
        #[source_code]
        src: String,
        #[label("out of range")]
        span: SourceSpan,
    },

    #[error("line {line}: immediate `{token}` does not fit in 16 bits")]
    #[diagnostic(
        code(parse::immediate_range),
        help("immediates range from -32,768 to 32,767")
    )]
    ImmediateOutOfRange {
        line: usize,
        token: String,
        #[source_code]
        src: String,
        #[label("out of range")]
        span: SourceSpan,
    },

    #[error("program never halts")]
    #[diagnostic(
        code(parse::missing_halt),
        help("add a `HALT` instruction; it does not need to be the last line")
    )]
    MissingHalt,
}

impl AsmError {
    /// Source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedInstruction { line, .. }
            | Self::UnknownMnemonic { line, .. }
            | Self::OperandCountMismatch { line, .. }
            | Self::OperandTypeMismatch { line, .. }
            | Self::InvalidOperand { line, .. }
            | Self::RegisterIndexOutOfRange { line, .. }
            | Self::ImmediateOutOfRange { line, .. } => Some(*line),
            Self::MissingHalt => None,
        }
    }
}

// Decode errors

/// Problems found while turning machine words back into a program.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum DecodeError {
    #[error("word {index} ({word:#010x}) does not encode any instruction")]
    #[diagnostic(code(decode::unknown_encoding))]
    UnknownEncoding { index: usize, word: u32 },

    #[error("word {index} ({word:#010x}) has a non-zero shift field")]
    #[diagnostic(code(decode::shift))]
    NonZeroShift { index: usize, word: u32 },

    #[error("word {index} ({word:#010x}): unused {field} field holds {value:#07b}")]
    #[diagnostic(
        code(decode::unused_field),
        help("register fields that no operand reads or writes must be zero")
    )]
    NonZeroUnusedField {
        index: usize,
        word: u32,
        field: &'static str,
        value: u32,
    },

    #[error("word {index} ({word:#010x}): register field {field:#07b} does not name a register")]
    #[diagnostic(code(decode::register_range))]
    RegisterIndexOutOfRange { index: usize, word: u32, field: u32 },

    #[error("word {index} ({word:#010x}): `{mnemonic}` expects a {expected} in operand {position}")]
    #[diagnostic(code(decode::operand_type))]
    OperandTypeMismatch {
        index: usize,
        word: u32,
        mnemonic: &'static str,
        position: usize,
        expected: OperandKind,
    },

    #[error("binary is {len} bytes long, which is not a whole number of 32-bit words")]
    #[diagnostic(code(decode::truncated))]
    TruncatedBinary { len: usize },
}

// Runtime faults

/// Conditions that stop a running program.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum Fault {
    #[error("{space} address {addr} is outside of 0..{size}")]
    #[diagnostic(code(run::memory_range))]
    MemoryAddressOutOfRange {
        space: MemorySpace,
        addr: i64,
        size: usize,
    },

    #[error("vector length {value} is outside of 0..=64")]
    #[diagnostic(code(run::vector_length))]
    VectorLengthOutOfRange { value: i32 },

    #[error("division by zero")]
    #[diagnostic(code(run::divide_by_zero))]
    DivideByZero,

    #[error("branch target {target} is outside of the program")]
    #[diagnostic(code(run::branch_range))]
    BranchOutOfRange { target: i64 },
}

// Memory image errors

/// Problems found while reading a memory image file.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ImageError {
    #[error("line {line}: `{text}` is not a 32-bit integer")]
    #[diagnostic(
        code(image::invalid_word),
        help("memory images hold one decimal integer per line")
    )]
    InvalidWord { line: usize, text: String },

    #[error("image holds {len} words but {space} only has {size}")]
    #[diagnostic(code(image::too_large))]
    TooLarge {
        space: MemorySpace,
        len: usize,
        size: usize,
    },
}
