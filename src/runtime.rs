use std::cmp::Ordering;

use crate::{
    air::{Air, AirStmt, Instr},
    catalog::{Class, Mnemonic},
    error::{DecodeError, Fault},
    state::{Lanes, MachineState},
    symbol::Operand,
    trace::Trace,
};

/// Where a simulation run currently stands.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RunStatus {
    Running,
    /// Reached a `HALT`, or stepped past the last instruction.
    Halted,
    /// Stopped by `fault` while executing the instruction on `line`.
    Faulted { line: usize, fault: Fault },
}

/// Next value of the program counter after an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Next,
    Jump(i64),
}

/// Binary integer operations shared by the scalar and vector units.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sra,
}

impl AluOp {
    fn apply(self, lhs: i32, rhs: i32) -> Result<i32, Fault> {
        // Shift amounts use the low 5 bits
        let shamt = rhs as u32 & 0x1F;
        Ok(match self {
            AluOp::Add => lhs.wrapping_add(rhs),
            AluOp::Sub => lhs.wrapping_sub(rhs),
            AluOp::Mul => lhs.wrapping_mul(rhs),
            AluOp::Div => {
                if rhs == 0 {
                    return Err(Fault::DivideByZero);
                }
                lhs.wrapping_div(rhs)
            }
            AluOp::And => lhs & rhs,
            AluOp::Or => lhs | rhs,
            AluOp::Xor => lhs ^ rhs,
            AluOp::Sll => lhs.wrapping_shl(shamt),
            AluOp::Srl => ((lhs as u32) >> shamt) as i32,
            AluOp::Sra => lhs >> shamt,
        })
    }
}

/// Comparisons used by vector predicates and branches.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Cmp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Cmp {
    fn test(self, lhs: i32, rhs: i32) -> bool {
        let ord = lhs.cmp(&rhs);
        match self {
            Cmp::Eq => ord == Ordering::Equal,
            Cmp::Ne => ord != Ordering::Equal,
            Cmp::Gt => ord == Ordering::Greater,
            Cmp::Lt => ord == Ordering::Less,
            Cmp::Ge => ord != Ordering::Less,
            Cmp::Le => ord != Ordering::Greater,
        }
    }
}

fn alu_op(mnemonic: Mnemonic) -> AluOp {
    use Mnemonic as M;
    match mnemonic {
        M::ADDVV | M::ADDVS | M::ADD => AluOp::Add,
        M::SUBVV | M::SUBVS | M::SUB => AluOp::Sub,
        M::MULVV | M::MULVS => AluOp::Mul,
        M::DIVVV | M::DIVVS => AluOp::Div,
        M::AND => AluOp::And,
        M::OR => AluOp::Or,
        M::XOR => AluOp::Xor,
        M::SLL => AluOp::Sll,
        M::SRL => AluOp::Srl,
        M::SRA => AluOp::Sra,
        _ => unreachable!("{mnemonic} is not an arithmetic instruction"),
    }
}

fn cmp_op(mnemonic: Mnemonic) -> Cmp {
    use Mnemonic as M;
    match mnemonic {
        M::SEQVV | M::SEQVS | M::BEQ => Cmp::Eq,
        M::SNEVV | M::SNEVS | M::BNE => Cmp::Ne,
        M::SGTVV | M::SGTVS | M::BGT => Cmp::Gt,
        M::SLTVV | M::SLTVS | M::BLT => Cmp::Lt,
        M::SGEVV | M::SGEVS | M::BGE => Cmp::Ge,
        M::SLEVV | M::SLEVS | M::BLE => Cmp::Le,
        _ => unreachable!("{mnemonic} is not a comparison"),
    }
}

/// Executes one program against one machine state.
pub struct RunEnvironment {
    air: Air,
    state: MachineState,
    pc: usize,
    status: RunStatus,
    steps: u64,
    trace: Option<Trace>,
}

impl RunEnvironment {
    /// Start a run at the first instruction with a freshly reset machine.
    pub fn new(air: Air) -> RunEnvironment {
        RunEnvironment {
            air,
            state: MachineState::new(),
            pc: 0,
            status: RunStatus::Running,
            steps: 0,
            trace: None,
        }
    }

    /// Start a run from assembled machine words.
    pub fn from_raw(raw: &[u32]) -> Result<RunEnvironment, DecodeError> {
        Ok(RunEnvironment::new(Air::from_words(raw)?))
    }

    /// Replace the initial machine state, e.g. with preloaded memories.
    pub fn with_state(mut self, state: MachineState) -> Self {
        self.state = state;
        self
    }

    /// Record the dynamic instruction flow while running.
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Trace::new());
        self
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    pub fn program(&self) -> &Air {
        &self.air
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Number of instructions executed so far, not counting `HALT`.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Run until the program halts or faults. There is no step limit; use [`Self::step`] to
    /// bound execution.
    pub fn run(&mut self) -> &RunStatus {
        while self.status == RunStatus::Running {
            self.step();
        }
        &self.status
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> &RunStatus {
        if self.status != RunStatus::Running {
            return &self.status;
        }
        let Some(stmt) = self.air.get(self.pc) else {
            log::debug!("end of program at {}", self.pc);
            if let Some(trace) = &mut self.trace {
                trace.finish();
            }
            self.status = RunStatus::Halted;
            return &self.status;
        };

        if stmt.instr.mnemonic() == Mnemonic::HALT {
            log::debug!("{:>4}: HALT", self.pc);
            if let Some(trace) = &mut self.trace {
                trace.finish();
            }
            self.status = RunStatus::Halted;
            return &self.status;
        }

        log::debug!("{:>4}: {}", self.pc, stmt.instr);
        let accesses = match &self.trace {
            Some(_) => self.state.memory_accesses(&stmt.instr),
            None => Vec::new(),
        };
        let vlen = self.state.vlen();

        let next = match self.state.execute(&stmt.instr, self.pc) {
            Ok(Flow::Next) => Ok(self.pc + 1),
            Ok(Flow::Jump(target)) if (0..self.air.len() as i64).contains(&target) => {
                Ok(target as usize)
            }
            Ok(Flow::Jump(target)) => Err(Fault::BranchOutOfRange { target }),
            Err(fault) => Err(fault),
        };
        self.steps += 1;

        match next {
            Ok(next) => {
                if let Some(trace) = &mut self.trace {
                    trace.record(&stmt.instr, vlen, &accesses, next);
                }
                self.pc = next;
            }
            Err(fault) => {
                log::debug!("line {}: {}", stmt.line, fault);
                self.status = RunStatus::Faulted {
                    line: stmt.line,
                    fault,
                };
            }
        }
        &self.status
    }

    /// Statement that the program counter points at.
    pub fn current(&self) -> Option<&AirStmt> {
        self.air.get(self.pc)
    }
}

impl MachineState {
    /// Effective addresses touched by a memory instruction, paired with the lane they belong
    /// to. Masked-off lanes are not included. Empty for every other instruction.
    pub(crate) fn memory_accesses(&self, instr: &Instr) -> Vec<(usize, i64)> {
        use Mnemonic as M;
        let base = |n: usize| self.sreg(instr.reg(n)) as i64;
        match instr.mnemonic() {
            M::LV | M::SV => {
                let base = base(1);
                self.active_lanes()
                    .map(|lane| (lane, base + lane as i64))
                    .collect()
            }
            M::LVWS | M::SVWS => {
                let (base, stride) = (base(1), base(2));
                self.active_lanes()
                    .map(|lane| (lane, base + stride * lane as i64))
                    .collect()
            }
            M::LVI | M::SVI => {
                let base = base(1);
                let offsets = self.vreg(instr.reg(2));
                self.active_lanes()
                    .map(|lane| (lane, base + offsets[lane] as i64))
                    .collect()
            }
            M::LS | M::SS => vec![(0, base(1) + instr.imm(2) as i64)],
            _ => Vec::new(),
        }
    }

    fn execute(&mut self, instr: &Instr, pc: usize) -> Result<Flow, Fault> {
        use Mnemonic as M;
        let mnemonic = instr.mnemonic();
        match mnemonic.class() {
            Class::VectorArith => {
                let op = alu_op(mnemonic);
                let (dest, src) = (instr.reg(0), instr.reg(1));
                let src2 = instr.operands()[2];
                let lanes: Vec<usize> = self.active_lanes().collect();
                for lane in lanes {
                    let lhs = self.vreg(src)[lane];
                    let rhs = self.lane_operand(src2, lane);
                    self.vreg_mut(dest)[lane] = op.apply(lhs, rhs)?;
                }
            }
            Class::VectorPredicate => {
                let cmp = cmp_op(mnemonic);
                let (src, rhs) = (instr.reg(0), instr.operands()[1]);
                // Not predicated itself: every lane below the vector length is rewritten
                for lane in 0..self.vlen() {
                    let bit = cmp.test(self.vreg(src)[lane], self.lane_operand(rhs, lane));
                    self.mask.set(lane, bit);
                }
            }
            Class::ScalarAlu => {
                let val = alu_op(mnemonic)
                    .apply(self.sreg(instr.reg(1)), self.sreg(instr.reg(2)))?;
                *self.sreg_mut(instr.reg(0)) = val;
            }
            Class::Memory => {
                let accesses = self.memory_accesses(instr);
                let reg = instr.reg(0);
                match mnemonic {
                    M::LV | M::LVWS | M::LVI => {
                        for (lane, addr) in accesses {
                            let val = self.vmem.read(addr)?;
                            self.vreg_mut(reg)[lane] = val;
                        }
                    }
                    M::SV | M::SVWS | M::SVI => {
                        for (lane, addr) in accesses {
                            let val = self.vreg(reg)[lane];
                            self.vmem.write(addr, val)?;
                        }
                    }
                    M::LS => {
                        for (_, addr) in accesses {
                            *self.sreg_mut(reg) = self.smem.read(addr)?;
                        }
                    }
                    M::SS => {
                        for (_, addr) in accesses {
                            let val = self.sreg(reg);
                            self.smem.write(addr, val)?;
                        }
                    }
                    _ => unreachable!("{mnemonic} is not a memory instruction"),
                }
            }
            Class::Branch => {
                let lhs = self.sreg(instr.reg(0));
                let rhs = self.sreg(instr.reg(1));
                if cmp_op(mnemonic).test(lhs, rhs) {
                    return Ok(Flow::Jump(pc as i64 + instr.imm(2) as i64));
                }
            }
            Class::MaskControl => match mnemonic {
                M::CVM => self.mask.clear(),
                M::POP => *self.sreg_mut(instr.reg(0)) = self.mask.count_ones() as i32,
                M::MTCL => self.set_vlen(self.sreg(instr.reg(0)))?,
                M::MFCL => *self.sreg_mut(instr.reg(0)) = self.vlen() as i32,
                _ => unreachable!("{mnemonic} is not a mask instruction"),
            },
            Class::Shuffle => {
                let len = self.vlen();
                let lhs = *self.vreg(instr.reg(1));
                let rhs = *self.vreg(instr.reg(2));
                let dest = self.vreg_mut(instr.reg(0));
                match mnemonic {
                    M::UNPACKLO => unpack(dest, &lhs, &rhs, len, 0),
                    M::UNPACKHI => unpack(dest, &lhs, &rhs, len, len / 2),
                    M::PACKLO => pack(dest, &lhs, &rhs, len, 0),
                    M::PACKHI => pack(dest, &lhs, &rhs, len, 1),
                    _ => unreachable!("{mnemonic} is not a shuffle"),
                }
            }
            // Handled by the run loop before dispatch
            Class::Halt => {}
        }
        Ok(Flow::Next)
    }

    /// Value of a vector-or-scalar operand for one lane. Scalars are broadcast.
    fn lane_operand(&self, op: Operand, lane: usize) -> i32 {
        match op {
            Operand::Vector(reg) => self.vreg(reg)[lane],
            Operand::Scalar(reg) => self.sreg(reg),
            Operand::Imm(val) => val as i32,
        }
    }
}

/// Interleave lanes of `lhs` and `rhs` starting at lane `offset` of each:
/// `dest = [lhs[o], rhs[o], lhs[o+1], rhs[o+1], ...]` over the first `len` lanes.
fn unpack(dest: &mut Lanes, lhs: &Lanes, rhs: &Lanes, len: usize, offset: usize) {
    for k in 0..len.div_ceil(2) {
        dest[2 * k] = lhs[offset + k];
        if 2 * k + 1 < len {
            dest[2 * k + 1] = rhs[offset + k];
        }
    }
}

/// Take every second lane of `lhs` then of `rhs`, starting at `parity`:
/// `dest = [lhs[p], lhs[p+2], ..., rhs[p], rhs[p+2], ...]` over the first `len` lanes.
fn pack(dest: &mut Lanes, lhs: &Lanes, rhs: &Lanes, len: usize, parity: usize) {
    let half = len / 2;
    for k in 0..half {
        dest[k] = lhs[2 * k + parity];
        dest[half + k] = rhs[2 * k + parity];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AsmParser;
    use crate::state::MemorySpace;
    use crate::symbol::Register::*;

    fn program(src: &str) -> RunEnvironment {
        RunEnvironment::new(AsmParser::new(src).parse().unwrap())
    }

    fn ramp(start: i32, step: i32) -> Lanes {
        std::array::from_fn(|lane| start + step * lane as i32)
    }

    #[test]
    fn end_to_end_vector_add() {
        let mut env = program("MTCL SR0   # SR0 preloaded = 4\nADDVV VR2 VR0 VR1\nHALT\n");
        let state = env.state_mut();
        *state.sreg_mut(R0) = 4;
        *state.vreg_mut(R0) = ramp(1, 1);
        *state.vreg_mut(R1) = ramp(10, 10);
        *state.vreg_mut(R2) = [-7; 64];

        assert_eq!(env.run(), &RunStatus::Halted);
        assert_eq!(env.pc(), 2);
        assert_eq!(env.steps(), 2);
        let v2 = env.state().vreg(R2);
        assert_eq!(&v2[..4], &[11, 22, 33, 44]);
        assert!(v2[4..].iter().all(|lane| *lane == -7));
    }

    #[test]
    fn cvm_then_pop_counts_all_lanes() {
        let mut env = program("SEQVS VR0 SR1\nCVM\nPOP SR2\nHALT\n");
        *env.state_mut().sreg_mut(R1) = 1;
        env.run();
        assert_eq!(env.state().sreg(R2), 64);
    }

    #[test]
    fn vector_length_round_trip() {
        let mut env = program("MTCL SR0\nMFCL SR1\nADDVS VR1 VR0 SR2\nHALT\n");
        let state = env.state_mut();
        *state.sreg_mut(R0) = 10;
        *state.sreg_mut(R2) = 1;
        *state.vreg_mut(R1) = [99; 64];
        env.run();

        let state = env.state();
        assert_eq!(state.sreg(R1), 10);
        assert!(state.vreg(R1)[..10].iter().all(|lane| *lane == 1));
        assert!(state.vreg(R1)[10..].iter().all(|lane| *lane == 99));
    }

    #[test]
    fn full_mask_behaves_unmasked() {
        let src = "SEQVS VR0 SR0\nADDVV VR2 VR0 VR1\nHALT\n";
        let mut masked = program(src);
        let state = masked.state_mut();
        *state.sreg_mut(R0) = 5;
        *state.vreg_mut(R0) = [5; 64];
        *state.vreg_mut(R1) = ramp(0, 3);
        state.mask.set(7, false);
        masked.run();
        assert_eq!(masked.state().mask.count_ones(), 64);

        let mut plain = program("ADDVV VR2 VR0 VR1\nHALT\n");
        *plain.state_mut().vreg_mut(R0) = [5; 64];
        *plain.state_mut().vreg_mut(R1) = ramp(0, 3);
        plain.run();
        assert_eq!(masked.state().vreg(R2), plain.state().vreg(R2));
    }

    #[test]
    fn masked_lanes_are_skipped() {
        let mut env = program("SGTVS VR0 SR0\nSUBVS VR1 VR0 SR0\nHALT\n");
        let state = env.state_mut();
        *state.sreg_mut(R0) = 3;
        *state.vreg_mut(R0) = ramp(0, 1);
        env.run();
        let state = env.state();
        assert!(!state.mask.is_set(3));
        assert!(state.mask.is_set(4));
        assert_eq!(&state.vreg(R1)[..6], &[0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn predicate_leaves_lanes_past_length() {
        let mut env = program("MTCL SR0\nSNEVV VR0 VR1\nHALT\n");
        *env.state_mut().sreg_mut(R0) = 2;
        env.state_mut().mask.set(10, false);
        env.run();
        let mask = env.state().mask;
        // VR0 == VR1 everywhere, so the first two lanes become 0
        assert!(!mask.is_set(0) && !mask.is_set(1));
        assert!(mask.is_set(2));
        assert!(!mask.is_set(10));
    }

    // Expected outcome for lhs = 1, 2, 3 against rhs = 2
    const COMPARISONS: [(&str, [bool; 3]); 6] = [
        ("EQ", [false, true, false]),
        ("NE", [true, false, true]),
        ("GT", [false, false, true]),
        ("LT", [true, false, false]),
        ("GE", [false, true, true]),
        ("LE", [true, true, false]),
    ];

    #[test]
    fn every_predicate_comparison() {
        for (cmp, expected) in COMPARISONS {
            for (form, rhs) in [("VV", "VR1"), ("VS", "SR0")] {
                let src = format!("S{cmp}{form} VR0 {rhs}\nHALT\n");
                let mut env = program(&src);
                let state = env.state_mut();
                *state.sreg_mut(R0) = 2;
                *state.vreg_mut(R0) = ramp(1, 1);
                *state.vreg_mut(R1) = [2; 64];
                state.set_vlen(3).unwrap();
                env.run();

                let mask = env.state().mask;
                let bits: Vec<bool> = (0..3).map(|lane| mask.is_set(lane)).collect();
                assert_eq!(bits, expected, "S{cmp}{form}");
                assert!(mask.is_set(3), "S{cmp}{form} wrote past the vector length");
            }
        }
    }

    #[test]
    fn every_branch_comparison() {
        for (cmp, expected) in COMPARISONS {
            for (lhs, taken) in (1..=3).zip(expected) {
                // A taken branch skips the MFCL
                let src = format!("B{cmp} SR1 SR2 2\nMFCL SR3\nHALT\n");
                let mut env = program(&src);
                *env.state_mut().sreg_mut(R1) = lhs;
                *env.state_mut().sreg_mut(R2) = 2;
                assert_eq!(env.run(), &RunStatus::Halted);
                let skipped = env.state().sreg(R3) == 0;
                assert_eq!(skipped, taken, "B{cmp} with {lhs} against 2");
                assert_eq!(env.steps(), if taken { 1 } else { 2 });
            }
        }
    }

    #[test]
    fn scalar_store_then_load() {
        let mut env = program("SS SR1 SR0 4\nLS SR2 SR0 4\nHALT\n");
        *env.state_mut().sreg_mut(R0) = 100;
        *env.state_mut().sreg_mut(R1) = -55;
        env.run();
        assert_eq!(env.state().sreg(R2), -55);
        assert_eq!(env.state().smem.read(104), Ok(-55));
    }

    #[test]
    fn scalar_alu() {
        let src = "ADD SR2 SR0 SR1\nSUB SR3 SR0 SR1\nAND SR4 SR0 SR1\nOR SR5 SR0 SR1\n\
                   XOR SR6 SR0 SR1\nSRA SR7 SR0 SR1\nHALT\n";
        let mut env = program(src);
        *env.state_mut().sreg_mut(R0) = -16;
        *env.state_mut().sreg_mut(R1) = 2;
        env.run();
        let regs = env.state().scalar_regs();
        assert_eq!(&regs[2..], &[-14, -18, 0, -14, -14, -4]);
    }

    #[test]
    fn logical_shifts() {
        let mut env = program("SLL SR2 SR0 SR1\nSRL SR3 SR0 SR1\nHALT\n");
        *env.state_mut().sreg_mut(R0) = -1;
        *env.state_mut().sreg_mut(R1) = 28;
        env.run();
        assert_eq!(env.state().sreg(R2), -1 << 28);
        assert_eq!(env.state().sreg(R3), 0xF);
    }

    #[test]
    fn division_by_zero_faults() {
        let mut env = program("CVM\nDIVVS VR1 VR0 SR0\nHALT\n");
        assert_eq!(
            env.run(),
            &RunStatus::Faulted {
                line: 2,
                fault: Fault::DivideByZero
            }
        );
        assert_eq!(env.pc(), 1);
    }

    #[test]
    fn division_truncates() {
        let mut env = program("DIVVS VR1 VR0 SR0\nMULVV VR2 VR1 VR1\nHALT\n");
        *env.state_mut().sreg_mut(R0) = 2;
        *env.state_mut().vreg_mut(R0) = ramp(-3, 1);
        env.run();
        assert_eq!(&env.state().vreg(R1)[..4], &[-1, -1, 0, 0]);
        assert_eq!(&env.state().vreg(R2)[..4], &[1, 1, 0, 0]);
    }

    #[test]
    fn branch_is_pc_relative() {
        // Count SR1 down from 3 to 0, adding SR2 into SR3 each time
        let src = "ADD SR3 SR3 SR2\nSUB SR1 SR1 SR2\nBNE SR1 SR0 -2\nHALT\n";
        let mut env = program(src);
        *env.state_mut().sreg_mut(R1) = 3;
        *env.state_mut().sreg_mut(R2) = 1;
        env.run();
        assert_eq!(env.status(), &RunStatus::Halted);
        assert_eq!(env.state().sreg(R3), 3);
        assert_eq!(env.pc(), 3);
    }

    #[test]
    fn branch_out_of_program_faults() {
        let mut env = program("BEQ SR0 SR0 10\nHALT\n");
        assert_eq!(
            env.run(),
            &RunStatus::Faulted {
                line: 1,
                fault: Fault::BranchOutOfRange { target: 10 }
            }
        );
    }

    #[test]
    fn falling_off_the_end_halts() {
        let mut env = program("BEQ SR0 SR0 2\nHALT\nCVM\n");
        assert_eq!(env.run(), &RunStatus::Halted);
        assert_eq!(env.pc(), 3);
    }

    #[test]
    fn vector_length_out_of_range() {
        let mut env = program("MTCL SR0\nHALT\n");
        *env.state_mut().sreg_mut(R0) = 65;
        assert!(matches!(
            env.run(),
            RunStatus::Faulted {
                fault: Fault::VectorLengthOutOfRange { value: 65 },
                ..
            }
        ));
        assert_eq!(env.state().vlen(), 64);
    }

    #[test]
    fn load_store_vectors() {
        let src = "LV VR1 SR0\nSVWS VR1 SR1 SR2\nLVWS VR2 SR1 SR2\nHALT\n";
        let mut state = MachineState::new();
        state.vmem.load(&(0..64).collect::<Vec<_>>()).unwrap();
        *state.sreg_mut(R1) = 1000;
        *state.sreg_mut(R2) = 3;
        let mut env = program(src).with_state(state);
        env.run();

        let state = env.state();
        assert_eq!(state.vreg(R1), &ramp(0, 1));
        assert_eq!(state.vmem.read(1000 + 3 * 5), Ok(5));
        assert_eq!(state.vmem.read(1001), Ok(0));
        assert_eq!(state.vreg(R2), state.vreg(R1));
    }

    #[test]
    fn masked_store_skips_lanes() {
        let mut env = program("SLTVS VR0 SR1\nSV VR0 SR0\nHALT\n");
        let state = env.state_mut();
        *state.vreg_mut(R0) = ramp(1, 1);
        *state.sreg_mut(R1) = 3;
        state.set_vlen(5).unwrap();
        env.run();
        let words = &env.state().vmem.words()[..6];
        assert_eq!(words, &[1, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn gather_and_scatter() {
        let mut state = MachineState::new();
        state.vmem.load(&[10, 11, 12, 13, 14, 15, 16, 17]).unwrap();
        state.set_vlen(4).unwrap();
        *state.vreg_mut(R1) = [0; 64];
        state.vreg_mut(R1)[..4].copy_from_slice(&[3, 0, 2, 1]);
        *state.sreg_mut(R0) = 4;
        *state.sreg_mut(R2) = 100;
        let mut env = program("LVI VR2 SR0 VR1\nSVI VR2 SR2 VR1\nHALT\n").with_state(state);
        env.run();

        let state = env.state();
        assert_eq!(&state.vreg(R2)[..4], &[17, 14, 16, 15]);
        assert_eq!(&state.vmem.words()[100..104], &[14, 15, 16, 17]);
    }

    #[test]
    fn memory_fault_keeps_earlier_lanes() {
        let mut env = program("SV VR0 SR0\nHALT\n");
        *env.state_mut().sreg_mut(R0) = 128000 - 2;
        *env.state_mut().vreg_mut(R0) = [9; 64];
        assert_eq!(
            env.run(),
            &RunStatus::Faulted {
                line: 1,
                fault: Fault::MemoryAddressOutOfRange {
                    space: MemorySpace::Vector,
                    addr: 128000,
                    size: 128000
                }
            }
        );
        assert_eq!(&env.state().vmem.words()[127998..], &[9, 9]);
    }

    #[test]
    fn shuffles() {
        let src = "UNPACKLO VR2 VR0 VR1\nUNPACKHI VR3 VR0 VR1\nPACKLO VR4 VR0 VR1\n\
                   PACKHI VR5 VR0 VR1\nHALT\n";
        let mut env = program(src);
        let state = env.state_mut();
        *state.vreg_mut(R0) = ramp(0, 1);
        *state.vreg_mut(R1) = ramp(100, 1);
        for reg in [R2, R3, R4, R5] {
            *state.vreg_mut(reg) = [-1; 64];
        }
        state.set_vlen(8).unwrap();
        env.run();

        let state = env.state();
        assert_eq!(&state.vreg(R2)[..9], &[0, 100, 1, 101, 2, 102, 3, 103, -1]);
        assert_eq!(&state.vreg(R3)[..8], &[4, 104, 5, 105, 6, 106, 7, 107]);
        assert_eq!(&state.vreg(R4)[..9], &[0, 2, 4, 6, 100, 102, 104, 106, -1]);
        assert_eq!(&state.vreg(R5)[..8], &[1, 3, 5, 7, 101, 103, 105, 107]);
    }

    #[test]
    fn shuffle_in_place() {
        let mut env = program("UNPACKLO VR0 VR0 VR1\nHALT\n");
        *env.state_mut().vreg_mut(R0) = ramp(0, 1);
        *env.state_mut().vreg_mut(R1) = ramp(100, 1);
        env.run();
        assert_eq!(&env.state().vreg(R0)[..4], &[0, 100, 1, 101]);
        assert_eq!(env.state().vreg(R0)[63], 131);
    }

    #[test]
    fn runs_from_machine_words() {
        let air = AsmParser::new("MFCL SR1\nHALT\n").parse().unwrap();
        let mut env = RunEnvironment::from_raw(&air.emit()).unwrap();
        env.run();
        assert_eq!(env.state().sreg(R1), 64);
        assert_eq!(env.current().unwrap().line, 2);
    }

    #[test]
    fn step_is_bounded_by_caller() {
        let mut env = program("BEQ SR0 SR0 0\nHALT\n");
        for _ in 0..100 {
            env.step();
        }
        assert_eq!(env.status(), &RunStatus::Running);
        assert_eq!(env.steps(), 100);
    }
}
