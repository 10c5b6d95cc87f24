use std::{fmt, str::FromStr};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

/// Insertion-ordered map with a fast non-cryptographic hasher.
pub type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Number of registers in each register file.
pub const REG_COUNT: usize = 8;

/// Offset added to vector register indices inside a 5-bit encoded register field.
pub const VECTOR_FIELD_BASE: u32 = 0b10000;

/// Index of a register inside either register file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Register {
    pub const ALL: [Register; REG_COUNT] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
    ];

    /// Returns `None` for indices outside of `0..8`.
    pub fn from_index(idx: u32) -> Option<Register> {
        Self::ALL.get(idx as usize).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Register {
    type Err = ();

    // Only the numeric part of the token, prefixes are handled by `Operand`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Register::R0),
            "1" => Ok(Register::R1),
            "2" => Ok(Register::R2),
            "3" => Ok(Register::R3),
            "4" => Ok(Register::R4),
            "5" => Ok(Register::R5),
            "6" => Ok(Register::R6),
            "7" => Ok(Register::R7),
            _ => Err(()),
        }
    }
}

/// What an operand slot of an instruction accepts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OperandKind {
    Scalar,
    Vector,
    Imm,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::Scalar => write!(f, "scalar register"),
            OperandKind::Vector => write!(f, "vector register"),
            OperandKind::Imm => write!(f, "immediate"),
        }
    }
}

/// A resolved operand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Operand {
    Scalar(Register),
    Vector(Register),
    Imm(i16),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Scalar(_) => OperandKind::Scalar,
            Operand::Vector(_) => OperandKind::Vector,
            Operand::Imm(_) => OperandKind::Imm,
        }
    }

    /// 5-bit register field value. Immediates do not live in register fields.
    pub fn reg_field(&self) -> u32 {
        match self {
            Operand::Scalar(reg) => reg.index() as u32,
            Operand::Vector(reg) => reg.index() as u32 + VECTOR_FIELD_BASE,
            Operand::Imm(_) => 0,
        }
    }

    /// Inverse of [`Operand::reg_field`]. `None` if the index is not a valid register.
    pub fn from_reg_field(field: u32) -> Option<Operand> {
        if field >= VECTOR_FIELD_BASE {
            Register::from_index(field - VECTOR_FIELD_BASE).map(Operand::Vector)
        } else {
            Register::from_index(field).map(Operand::Scalar)
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Scalar(reg) => write!(f, "SR{}", reg.index()),
            Operand::Vector(reg) => write!(f, "VR{}", reg.index()),
            Operand::Imm(val) => write!(f, "{val}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_field_layout() {
        assert_eq!(Operand::Scalar(Register::R0).reg_field(), 0b00000);
        assert_eq!(Operand::Scalar(Register::R7).reg_field(), 0b00111);
        assert_eq!(Operand::Vector(Register::R0).reg_field(), 0b10000);
        assert_eq!(Operand::Vector(Register::R5).reg_field(), 0b10101);
    }

    #[test]
    fn reg_field_rejects_gaps() {
        // 8..16 and 24..32 do not name a register
        assert_eq!(Operand::from_reg_field(8), None);
        assert_eq!(Operand::from_reg_field(15), None);
        assert_eq!(Operand::from_reg_field(24), None);
        assert_eq!(
            Operand::from_reg_field(0b10011),
            Some(Operand::Vector(Register::R3))
        );
    }
}
