//! Bit layouts of machine words.
//!
//! ```text
//! R-type: | opcode:6 | src1:5 | src2:5 | dest:5 | shift:5 | funct:6 |
//! I-type: | opcode:6 | src1:5 | dest:5 |      immediate:16          |
//! ```
//!
//! `HALT` is always the word `0xFFFFFFFF`.

use crate::{
    air::Instr,
    catalog::{self, Format, Mnemonic},
    error::DecodeError,
    symbol::{Operand, OperandKind},
};

pub const HALT_WORD: u32 = 0xFFFF_FFFF;

const OPCODE_SHIFT: u32 = 26;
const SRC1_SHIFT: u32 = 21;
const SRC2_SHIFT: u32 = 16;
const DEST_SHIFT: u32 = 11;
const SHIFT_SHIFT: u32 = 6;
/// Destination of an I-type word sits where src2 is in an R-type word
const I_DEST_SHIFT: u32 = SRC2_SHIFT;

const REG_MASK: u32 = 0b11111;
const FUNCT_MASK: u32 = 0b111111;
const IMM_MASK: u32 = 0xFFFF;

/// Register fields of an R-type word, named by role.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct RFields {
    src1: u32,
    src2: u32,
    dest: u32,
}

fn field(word: u32, shift: u32) -> u32 {
    (word >> shift) & REG_MASK
}

pub fn encode(instr: &Instr) -> u32 {
    let entry = instr.mnemonic().entry();
    let reg = |n: usize| {
        instr
            .operands()
            .get(n)
            .map(Operand::reg_field)
            .unwrap_or(0)
    };

    let word = match entry.format {
        Format::Halt => HALT_WORD,
        Format::R => {
            let fields = if entry.reassigns_dest() {
                // Result goes to the mask or length register, so every named operand is read
                RFields {
                    src1: reg(0),
                    src2: reg(1),
                    dest: 0,
                }
            } else {
                RFields {
                    src1: reg(1),
                    src2: reg(2),
                    dest: reg(0),
                }
            };
            (entry.opcode as u32) << OPCODE_SHIFT
                | fields.src1 << SRC1_SHIFT
                | fields.src2 << SRC2_SHIFT
                | fields.dest << DEST_SHIFT
                | entry.funct.map(u32::from).unwrap_or(0)
        }
        Format::I => {
            let imm = instr.imm(2) as u16 as u32 & IMM_MASK;
            (entry.opcode as u32) << OPCODE_SHIFT
                | reg(1) << SRC1_SHIFT
                | reg(0) << I_DEST_SHIFT
                | imm
        }
    };
    log::trace!("{instr} => {word:#034b}");
    word
}

/// Decode the word at position `index` of a binary.
pub fn decode(index: usize, word: u32) -> Result<Instr, DecodeError> {
    if word == HALT_WORD {
        return Ok(Instr::new_unchecked(Mnemonic::HALT, Vec::new()));
    }

    let opcode = (word >> OPCODE_SHIFT) as u8;
    let funct = (word & FUNCT_MASK) as u8;
    let entry = catalog::lookup_encoding(opcode, funct)
        .ok_or(DecodeError::UnknownEncoding { index, word })?;

    let slots: Vec<u32> = match entry.format {
        Format::R => {
            if field(word, SHIFT_SHIFT) != 0 {
                return Err(DecodeError::NonZeroShift { index, word });
            }
            let fields = RFields {
                src1: field(word, SRC1_SHIFT),
                src2: field(word, SRC2_SHIFT),
                dest: field(word, DEST_SHIFT),
            };
            // Fields in the order operands are taken from them
            let ordered = if entry.reassigns_dest() {
                [("src1", fields.src1), ("src2", fields.src2), ("dest", fields.dest)]
            } else {
                [("dest", fields.dest), ("src1", fields.src1), ("src2", fields.src2)]
            };
            let (used, unused) = ordered.split_at(entry.arity());
            if let Some((name, value)) = unused.iter().find(|(_, value)| *value != 0) {
                return Err(DecodeError::NonZeroUnusedField {
                    index,
                    word,
                    field: *name,
                    value: *value,
                });
            }
            used.iter().map(|(_, value)| *value).collect()
        }
        Format::I => vec![field(word, I_DEST_SHIFT), field(word, SRC1_SHIFT)],
        Format::Halt => return Err(DecodeError::UnknownEncoding { index, word }),
    };

    let mut operands = Vec::with_capacity(entry.arity());
    for (position, expected) in entry.signature.iter().enumerate() {
        let operand = match expected {
            OperandKind::Imm => Operand::Imm((word & IMM_MASK) as u16 as i16),
            _ => {
                let field = slots[position];
                Operand::from_reg_field(field).ok_or(DecodeError::RegisterIndexOutOfRange {
                    index,
                    word,
                    field,
                })?
            }
        };
        if operand.kind() != *expected {
            return Err(DecodeError::OperandTypeMismatch {
                index,
                word,
                mnemonic: entry.name,
                position: position + 1,
                expected: *expected,
            });
        }
        operands.push(operand);
    }
    Ok(Instr::new_unchecked(entry.mnemonic, operands))
}
