// Parsing
mod parser;
pub use parser::{parse_line, AsmParser, OperandToken, ParsedInstr};
mod air;
pub use air::{Air, AirStmt, Instr};
pub mod catalog;
pub use catalog::{CatalogEntry, Class, Format, Mnemonic};
pub mod codec;
mod span;
mod symbol;
pub use symbol::{Operand, OperandKind, Register};

// Running
mod runtime;
pub use runtime::{RunEnvironment, RunStatus};
mod state;
pub use state::{MachineState, Memory, MemorySpace, VectorMask, MAX_VECTOR_LEN};
mod trace;
pub use trace::Trace;

// Files and terminal
pub mod dump;
pub mod env;
pub mod output;

mod error;
pub use error::{AsmError, DecodeError, Fault, ImageError};

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
