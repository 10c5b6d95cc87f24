//! Static instruction table.
//!
//! Every mnemonic the assembler understands has exactly one [`CatalogEntry`]. The table is
//! ordered the same way as [`Mnemonic`], so `CATALOG[m as usize]` is the entry for `m`.

use std::fmt;

use lazy_static::lazy_static;

use crate::symbol::{FxMap, OperandKind};

use OperandKind::{Imm as I, Scalar as S, Vector as V};

/// Bit layout used to encode an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Format {
    R,
    I,
    /// Encoded as the all-ones sentinel.
    Halt,
}

/// Groups instructions by how the engine executes them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Class {
    VectorArith,
    VectorPredicate,
    ScalarAlu,
    Memory,
    Branch,
    MaskControl,
    Shuffle,
    Halt,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[allow(clippy::upper_case_acronyms)]
pub enum Mnemonic {
    ADDVV,
    SUBVV,
    MULVV,
    DIVVV,
    ADDVS,
    SUBVS,
    MULVS,
    DIVVS,
    SEQVV,
    SNEVV,
    SGTVV,
    SLTVV,
    SGEVV,
    SLEVV,
    SEQVS,
    SNEVS,
    SGTVS,
    SLTVS,
    SGEVS,
    SLEVS,
    CVM,
    POP,
    MTCL,
    MFCL,
    LV,
    SV,
    LVWS,
    SVWS,
    LVI,
    SVI,
    LS,
    SS,
    ADD,
    SUB,
    AND,
    OR,
    XOR,
    SLL,
    SRL,
    SRA,
    BEQ,
    BNE,
    BGT,
    BLT,
    BGE,
    BLE,
    UNPACKLO,
    UNPACKHI,
    PACKLO,
    PACKHI,
    HALT,
}

impl Mnemonic {
    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn class(self) -> Class {
        self.entry().class
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of one instruction.
#[derive(Debug)]
pub struct CatalogEntry {
    pub mnemonic: Mnemonic,
    pub name: &'static str,
    pub format: Format,
    pub class: Class,
    /// 6-bit primary opcode.
    pub opcode: u8,
    /// 6-bit function code, absent for I-type instructions.
    pub funct: Option<u8>,
    /// Operand kinds in source order.
    pub signature: &'static [OperandKind],
}

impl CatalogEntry {
    pub fn arity(&self) -> usize {
        self.signature.len()
    }

    /// Whether the first source operand is moved into the first read-register field and the
    /// destination field is left empty.
    pub fn reassigns_dest(&self) -> bool {
        self.class == Class::VectorPredicate || self.mnemonic == Mnemonic::MTCL
    }
}

const fn r(
    mnemonic: Mnemonic,
    name: &'static str,
    class: Class,
    opcode: u8,
    funct: u8,
    signature: &'static [OperandKind],
) -> CatalogEntry {
    CatalogEntry {
        mnemonic,
        name,
        format: Format::R,
        class,
        opcode,
        funct: Some(funct),
        signature,
    }
}

const fn i(mnemonic: Mnemonic, name: &'static str, class: Class, opcode: u8) -> CatalogEntry {
    CatalogEntry {
        mnemonic,
        name,
        format: Format::I,
        class,
        opcode,
        funct: None,
        signature: &[S, S, I],
    }
}

const VV_OP: u8 = 0b100000;
const VS_OP: u8 = 0b100001;

#[rustfmt::skip]
pub static CATALOG: [CatalogEntry; 51] = {
    use Class::*;
    use Mnemonic as M;
    [
        r(M::ADDVV, "ADDVV", VectorArith, VV_OP, 0b000000, &[V, V, V]),
        r(M::SUBVV, "SUBVV", VectorArith, VV_OP, 0b000001, &[V, V, V]),
        r(M::MULVV, "MULVV", VectorArith, VV_OP, 0b000010, &[V, V, V]),
        r(M::DIVVV, "DIVVV", VectorArith, VV_OP, 0b000011, &[V, V, V]),
        r(M::ADDVS, "ADDVS", VectorArith, VS_OP, 0b000000, &[V, V, S]),
        r(M::SUBVS, "SUBVS", VectorArith, VS_OP, 0b000001, &[V, V, S]),
        r(M::MULVS, "MULVS", VectorArith, VS_OP, 0b000010, &[V, V, S]),
        r(M::DIVVS, "DIVVS", VectorArith, VS_OP, 0b000011, &[V, V, S]),
        r(M::SEQVV, "SEQVV", VectorPredicate, VV_OP, 0b000100, &[V, V]),
        r(M::SNEVV, "SNEVV", VectorPredicate, VV_OP, 0b000101, &[V, V]),
        r(M::SGTVV, "SGTVV", VectorPredicate, VV_OP, 0b000110, &[V, V]),
        r(M::SLTVV, "SLTVV", VectorPredicate, VV_OP, 0b000111, &[V, V]),
        r(M::SGEVV, "SGEVV", VectorPredicate, VV_OP, 0b001000, &[V, V]),
        r(M::SLEVV, "SLEVV", VectorPredicate, VV_OP, 0b001001, &[V, V]),
        r(M::SEQVS, "SEQVS", VectorPredicate, VS_OP, 0b000100, &[V, S]),
        r(M::SNEVS, "SNEVS", VectorPredicate, VS_OP, 0b000101, &[V, S]),
        r(M::SGTVS, "SGTVS", VectorPredicate, VS_OP, 0b000110, &[V, S]),
        r(M::SLTVS, "SLTVS", VectorPredicate, VS_OP, 0b000111, &[V, S]),
        r(M::SGEVS, "SGEVS", VectorPredicate, VS_OP, 0b001000, &[V, S]),
        r(M::SLEVS, "SLEVS", VectorPredicate, VS_OP, 0b001001, &[V, S]),
        r(M::CVM, "CVM", MaskControl, 0b000001, 0b000000, &[]),
        r(M::POP, "POP", MaskControl, 0b000010, 0b000001, &[S]),
        r(M::MTCL, "MTCL", MaskControl, 0b000011, 0b000010, &[S]),
        r(M::MFCL, "MFCL", MaskControl, 0b000100, 0b000011, &[S]),
        r(M::LV, "LV", Memory, 0b100010, 0b000000, &[V, S]),
        r(M::SV, "SV", Memory, 0b100011, 0b000000, &[V, S]),
        r(M::LVWS, "LVWS", Memory, 0b100100, 0b000000, &[V, S, S]),
        r(M::SVWS, "SVWS", Memory, 0b100101, 0b000000, &[V, S, S]),
        r(M::LVI, "LVI", Memory, 0b100110, 0b000000, &[V, S, V]),
        r(M::SVI, "SVI", Memory, 0b100111, 0b000000, &[V, S, V]),
        i(M::LS, "LS", Memory, 0b000101),
        i(M::SS, "SS", Memory, 0b000110),
        r(M::ADD, "ADD", ScalarAlu, 0b000000, 0b000000, &[S, S, S]),
        r(M::SUB, "SUB", ScalarAlu, 0b000000, 0b000001, &[S, S, S]),
        r(M::AND, "AND", ScalarAlu, 0b000000, 0b000010, &[S, S, S]),
        r(M::OR, "OR", ScalarAlu, 0b000000, 0b000011, &[S, S, S]),
        r(M::XOR, "XOR", ScalarAlu, 0b000000, 0b000100, &[S, S, S]),
        r(M::SLL, "SLL", ScalarAlu, 0b000000, 0b000101, &[S, S, S]),
        r(M::SRL, "SRL", ScalarAlu, 0b000000, 0b000110, &[S, S, S]),
        r(M::SRA, "SRA", ScalarAlu, 0b000000, 0b000111, &[S, S, S]),
        i(M::BEQ, "BEQ", Branch, 0b001000),
        i(M::BNE, "BNE", Branch, 0b001001),
        i(M::BGT, "BGT", Branch, 0b001010),
        i(M::BLT, "BLT", Branch, 0b001011),
        i(M::BGE, "BGE", Branch, 0b001100),
        i(M::BLE, "BLE", Branch, 0b001101),
        r(M::UNPACKLO, "UNPACKLO", Shuffle, VV_OP, 0b001010, &[V, V, V]),
        r(M::UNPACKHI, "UNPACKHI", Shuffle, VV_OP, 0b001011, &[V, V, V]),
        r(M::PACKLO, "PACKLO", Shuffle, VV_OP, 0b001100, &[V, V, V]),
        r(M::PACKHI, "PACKHI", Shuffle, VV_OP, 0b001101, &[V, V, V]),
        CatalogEntry {
            mnemonic: M::HALT,
            name: "HALT",
            format: Format::Halt,
            class: Halt,
            opcode: 0b111111,
            funct: Some(0b111111),
            signature: &[],
        },
    ]
};

lazy_static! {
    static ref BY_NAME: FxMap<&'static str, &'static CatalogEntry> =
        CATALOG.iter().map(|entry| (entry.name, entry)).collect();
}

/// Look up a mnemonic by name. Names are matched case-insensitively.
pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    BY_NAME
        .get(name)
        .or_else(|| BY_NAME.get(name.to_ascii_uppercase().as_str()))
        .copied()
}

/// Find the entry a machine word was encoded from, by opcode and (for R-type) function code.
pub fn lookup_encoding(opcode: u8, funct: u8) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| match entry.format {
        Format::I => entry.opcode == opcode,
        Format::R => entry.opcode == opcode && entry.funct == Some(funct),
        Format::Halt => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_enum() {
        for (idx, entry) in CATALOG.iter().enumerate() {
            assert_eq!(entry.mnemonic as usize, idx, "{} is out of place", entry.name);
            assert_eq!(format!("{:?}", entry.mnemonic), entry.name);
        }
    }

    #[test]
    fn encodings_are_unique() {
        for (a_idx, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[a_idx + 1..] {
                let clash = match (a.format, b.format) {
                    (Format::I, _) | (_, Format::I) => a.opcode == b.opcode,
                    _ => a.opcode == b.opcode && a.funct == b.funct,
                };
                assert!(!clash, "{} and {} share an encoding", a.name, b.name);
            }
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(lookup("ADDVV").unwrap().mnemonic, Mnemonic::ADDVV);
        assert_eq!(lookup("unpackhi").unwrap().mnemonic, Mnemonic::UNPACKHI);
        assert!(lookup("FOOBAR").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn lookup_by_encoding() {
        assert_eq!(lookup_encoding(0b100001, 0b000100).unwrap().name, "SEQVS");
        // Immediate bits overlap the funct position for I-type words
        assert_eq!(lookup_encoding(0b001010, 0b111111).unwrap().name, "BGT");
        assert!(lookup_encoding(0b100000, 0b111111).is_none());
        assert!(lookup_encoding(0b111111, 0b111111).is_none());
    }

    #[test]
    fn only_predicates_and_mtcl_drop_dest() {
        let reassigned: Vec<_> = CATALOG
            .iter()
            .filter(|entry| entry.reassigns_dest())
            .map(|entry| entry.name)
            .collect();
        assert_eq!(reassigned.len(), 13);
        assert!(reassigned.contains(&"MTCL"));
        assert!(!reassigned.contains(&"SUBVV"));
        assert!(!reassigned.contains(&"SUBVS"));
    }
}
