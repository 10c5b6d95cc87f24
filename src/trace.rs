use std::fmt;

use crate::{
    air::Instr,
    catalog::{Class, Mnemonic},
    symbol::OperandKind,
};

/// Dynamic instruction flow of a run, one line per executed instruction.
///
/// Lines are plain assembly with extra run-time detail:
///
/// - anything touching a vector register ends with the vector length in effect,
/// - memory instructions list their effective addresses in place of the address operands,
///   e.g. `LVWS VR1 (0, 4, 8) 3`,
/// - branches become `B (<next pc>)`.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Trace {
    lines: Vec<String>,
}

impl Trace {
    pub fn new() -> Self {
        Trace { lines: Vec::new() }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Record an executed instruction. `accesses` are the `(lane, address)` pairs it touched
    /// and `next` is the program counter it handed control to.
    pub fn record(&mut self, instr: &Instr, vlen: usize, accesses: &[(usize, i64)], next: usize) {
        let mnemonic = instr.mnemonic();
        let mut line = match mnemonic.class() {
            Class::Branch => format!("B ({next})"),
            Class::Memory => {
                let addrs = accesses
                    .iter()
                    .map(|(_, addr)| addr.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{mnemonic} {} ({addrs})", instr.operands()[0])
            }
            _ => instr.to_string(),
        };
        let is_vector = instr
            .operands()
            .iter()
            .any(|op| op.kind() == OperandKind::Vector);
        if is_vector {
            line.push_str(&format!(" {vlen}"));
        }
        self.lines.push(line);
    }

    /// Close the trace with the halting instruction.
    pub fn finish(&mut self) {
        self.lines.push(Mnemonic::HALT.to_string());
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}
