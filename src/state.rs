use std::fmt;

use crate::{error::Fault, symbol::Register, symbol::REG_COUNT};

/// Maximum vector length, and the number of lanes in every vector register.
pub const MAX_VECTOR_LEN: usize = 64;
/// Scalar data memory: 32 KB of 32-bit words.
pub const SCALAR_MEM_WORDS: usize = 8000;
/// Vector data memory: 512 KB of 32-bit words.
pub const VECTOR_MEM_WORDS: usize = 128000;

/// One vector register worth of lanes.
pub type Lanes = [i32; MAX_VECTOR_LEN];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MemorySpace {
    Scalar,
    Vector,
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemorySpace::Scalar => write!(f, "scalar memory"),
            MemorySpace::Vector => write!(f, "vector memory"),
        }
    }
}

/// Word-addressable data memory. Every access is range checked.
#[derive(Clone, Debug)]
pub struct Memory {
    space: MemorySpace,
    words: Vec<i32>,
}

impl Memory {
    pub fn new(space: MemorySpace) -> Self {
        let size = match space {
            MemorySpace::Scalar => SCALAR_MEM_WORDS,
            MemorySpace::Vector => VECTOR_MEM_WORDS,
        };
        Memory {
            space,
            words: vec![0; size],
        }
    }

    /// Copy `image` to the start of memory. The rest keeps its current contents.
    pub fn load(&mut self, image: &[i32]) -> Result<(), Fault> {
        if image.len() > self.words.len() {
            return Err(self.out_of_range(image.len() as i64 - 1));
        }
        self.words[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn read(&self, addr: i64) -> Result<i32, Fault> {
        let idx = self.check(addr)?;
        Ok(self.words[idx])
    }

    pub fn write(&mut self, addr: i64, val: i32) -> Result<(), Fault> {
        let idx = self.check(addr)?;
        self.words[idx] = val;
        Ok(())
    }

    pub fn space(&self) -> MemorySpace {
        self.space
    }

    pub fn words(&self) -> &[i32] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn check(&self, addr: i64) -> Result<usize, Fault> {
        if addr < 0 || addr >= self.words.len() as i64 {
            return Err(self.out_of_range(addr));
        }
        Ok(addr as usize)
    }

    fn out_of_range(&self, addr: i64) -> Fault {
        Fault::MemoryAddressOutOfRange {
            space: self.space,
            addr,
            size: self.words.len(),
        }
    }
}

/// Per-lane enable flags for predicated vector instructions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VectorMask([bool; MAX_VECTOR_LEN]);

impl Default for VectorMask {
    fn default() -> Self {
        VectorMask([true; MAX_VECTOR_LEN])
    }
}

impl VectorMask {
    #[inline]
    pub fn is_set(&self, lane: usize) -> bool {
        self.0[lane]
    }

    #[inline]
    pub fn set(&mut self, lane: usize, val: bool) {
        self.0[lane] = val;
    }

    /// Enable every lane.
    pub fn clear(&mut self) {
        self.0 = [true; MAX_VECTOR_LEN];
    }

    /// Number of enabled lanes.
    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|bit| **bit).count()
    }

    pub fn bits(&self) -> &[bool; MAX_VECTOR_LEN] {
        &self.0
    }
}

/// Complete architectural state of one simulation run.
#[derive(Clone, Debug)]
pub struct MachineState {
    sreg: [i32; REG_COUNT],
    /// Boxed since 8 x 64 words is too large to move around comfortably
    vreg: Box<[Lanes; REG_COUNT]>,
    vlen: usize,
    pub mask: VectorMask,
    pub smem: Memory,
    pub vmem: Memory,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineState {
    pub fn new() -> Self {
        MachineState {
            sreg: [0; REG_COUNT],
            vreg: Box::new([[0; MAX_VECTOR_LEN]; REG_COUNT]),
            vlen: MAX_VECTOR_LEN,
            mask: VectorMask::default(),
            smem: Memory::new(MemorySpace::Scalar),
            vmem: Memory::new(MemorySpace::Vector),
        }
    }

    #[inline]
    pub fn sreg(&self, reg: Register) -> i32 {
        self.sreg[reg.index()]
    }

    #[inline]
    pub fn sreg_mut(&mut self, reg: Register) -> &mut i32 {
        &mut self.sreg[reg.index()]
    }

    #[inline]
    pub fn vreg(&self, reg: Register) -> &Lanes {
        &self.vreg[reg.index()]
    }

    #[inline]
    pub fn vreg_mut(&mut self, reg: Register) -> &mut Lanes {
        &mut self.vreg[reg.index()]
    }

    pub fn scalar_regs(&self) -> &[i32; REG_COUNT] {
        &self.sreg
    }

    pub fn vector_regs(&self) -> &[Lanes; REG_COUNT] {
        &self.vreg
    }

    /// Current vector length, always within `0..=64`.
    #[inline]
    pub fn vlen(&self) -> usize {
        self.vlen
    }

    pub fn set_vlen(&mut self, value: i32) -> Result<(), Fault> {
        match usize::try_from(value) {
            Ok(len) if len <= MAX_VECTOR_LEN => {
                self.vlen = len;
                Ok(())
            }
            _ => Err(Fault::VectorLengthOutOfRange { value }),
        }
    }

    /// Lanes that a predicated instruction should touch.
    pub fn active_lanes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.vlen).filter(|lane| self.mask.is_set(*lane))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let state = MachineState::new();
        assert_eq!(state.vlen(), 64);
        assert_eq!(state.mask.count_ones(), 64);
        assert_eq!(state.smem.len(), 8000);
        assert_eq!(state.vmem.len(), 128000);
        assert!(state.scalar_regs().iter().all(|r| *r == 0));
    }

    #[test]
    fn memory_bounds() {
        let mut mem = Memory::new(MemorySpace::Scalar);
        mem.write(7999, 42).unwrap();
        assert_eq!(mem.read(7999), Ok(42));
        assert_eq!(
            mem.read(8000),
            Err(Fault::MemoryAddressOutOfRange {
                space: MemorySpace::Scalar,
                addr: 8000,
                size: 8000
            })
        );
        assert!(mem.write(-1, 0).is_err());
    }

    #[test]
    fn memory_image_too_large() {
        let mut mem = Memory::new(MemorySpace::Scalar);
        assert!(mem.load(&vec![1; 8001]).is_err());
        mem.load(&[1, 2, 3]).unwrap();
        assert_eq!(&mem.words()[..4], &[1, 2, 3, 0]);
    }

    #[test]
    fn vector_length_bounds() {
        let mut state = MachineState::new();
        state.set_vlen(0).unwrap();
        assert_eq!(state.vlen(), 0);
        state.set_vlen(64).unwrap();
        assert_eq!(
            state.set_vlen(65),
            Err(Fault::VectorLengthOutOfRange { value: 65 })
        );
        assert!(state.set_vlen(-1).is_err());
        assert_eq!(state.vlen(), 64);
    }

    #[test]
    fn active_lanes_respect_mask_and_length() {
        let mut state = MachineState::new();
        state.set_vlen(4).unwrap();
        state.mask.set(1, false);
        assert_eq!(state.active_lanes().collect::<Vec<_>>(), vec![0, 2, 3]);
        state.mask.clear();
        assert_eq!(state.active_lanes().count(), 4);
    }
}
