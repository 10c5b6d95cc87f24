use std::fmt;

use crate::{
    catalog::Mnemonic,
    codec,
    error::DecodeError,
    symbol::{Operand, Register},
};

/// Assembly intermediate representation: the validated instruction sequence of a program.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Air {
    ast: Vec<AirStmt>,
}

impl Air {
    pub fn new() -> Self {
        Air { ast: Vec::new() }
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) {
        self.ast.push(stmt)
    }

    pub fn get(&self, idx: usize) -> Option<&AirStmt> {
        self.ast.get(idx)
    }

    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AirStmt> {
        self.ast.iter()
    }

    /// Machine words for every statement, in program order.
    pub fn emit(&self) -> Vec<u32> {
        self.ast.iter().map(AirStmt::emit).collect()
    }

    /// Binary file contents: little-endian words.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.emit()
            .into_iter()
            .flat_map(u32::to_le_bytes)
            .collect()
    }

    /// Rebuild a program from machine words. Line numbers become 1-based word positions.
    pub fn from_words(words: &[u32]) -> Result<Air, DecodeError> {
        let ast = words
            .iter()
            .enumerate()
            .map(|(idx, word)| {
                Ok(AirStmt {
                    instr: codec::decode(idx, *word)?,
                    line: idx + 1,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Air { ast })
    }

    /// Rebuild a program from a binary produced by [`Air::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Air, DecodeError> {
        if bytes.len() % 4 != 0 {
            return Err(DecodeError::TruncatedBinary { len: bytes.len() });
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect();
        Air::from_words(&words)
    }
}

impl<'a> IntoIterator for &'a Air {
    type Item = &'a AirStmt;
    type IntoIter = std::slice::Iter<'a, AirStmt>;

    fn into_iter(self) -> Self::IntoIter {
        self.ast.iter()
    }
}

/// Single instruction together with where it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AirStmt {
    pub instr: Instr,
    /// Source line, or word position for decoded binaries
    pub line: usize,
}

impl AirStmt {
    pub fn emit(&self) -> u32 {
        codec::encode(&self.instr)
    }
}

/// A mnemonic with operands that match its catalog signature.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Instr {
    mnemonic: Mnemonic,
    operands: Vec<Operand>,
}

impl Instr {
    /// Returns `None` if the operands do not match the signature of `mnemonic`.
    pub fn new(mnemonic: Mnemonic, operands: Vec<Operand>) -> Option<Instr> {
        let signature = mnemonic.entry().signature;
        let matches = operands.len() == signature.len()
            && operands
                .iter()
                .zip(signature)
                .all(|(op, kind)| op.kind() == *kind);
        matches.then(|| Instr::new_unchecked(mnemonic, operands))
    }

    /// Caller has already checked `operands` against the signature.
    pub(crate) fn new_unchecked(mnemonic: Mnemonic, operands: Vec<Operand>) -> Instr {
        debug_assert_eq!(operands.len(), mnemonic.entry().arity());
        Instr { mnemonic, operands }
    }

    pub fn mnemonic(&self) -> Mnemonic {
        self.mnemonic
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Register in operand slot `n`.
    pub(crate) fn reg(&self, n: usize) -> Register {
        match self.operands.get(n) {
            Some(Operand::Scalar(reg) | Operand::Vector(reg)) => *reg,
            _ => unreachable!("operand {n} of {} is not a register", self.mnemonic),
        }
    }

    /// Immediate in operand slot `n`.
    pub(crate) fn imm(&self, n: usize) -> i16 {
        match self.operands.get(n) {
            Some(Operand::Imm(val)) => *val,
            _ => unreachable!("operand {n} of {} is not an immediate", self.mnemonic),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for op in &self.operands {
            write!(f, " {op}")?;
        }
        Ok(())
    }
}
