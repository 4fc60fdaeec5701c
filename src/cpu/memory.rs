//! LC-3 memory.
//!
//! A flat 64K-word address space. The top page (`0xFE00..=0xFFFF`) holds
//! the device registers, which are intercepted by [`crate::cpu::mmio`];
//! this type only ever sees raw cells.

use crate::image::LoadError;

/// The number of addressable words.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Highest valid address.
pub const MAX_ADDRESS: u16 = 0xFFFF;

/// Raw word memory.
#[derive(Clone)]
pub struct Memory {
    cells: Box<[u16]>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy `words` into memory starting at `origin`.
    ///
    /// Nothing is written unless the whole block fits below `0xFFFF`.
    pub fn load_block(&mut self, origin: u16, words: &[u16]) -> Result<(), LoadError> {
        let start = origin as usize;
        let last = start + words.len().saturating_sub(1);
        if last > MAX_ADDRESS as usize {
            return Err(LoadError::InputTooLarge {
                origin,
                len: words.len(),
            });
        }

        self.cells[start..start + words.len()].copy_from_slice(words);
        Ok(())
    }

    /// Copy out `count` cells starting at `start` as `(address, value)`
    /// pairs. Stops at the top of memory.
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u16)> {
        let start = start as usize;
        let end = (start + count).min(MEMORY_SIZE);
        (start..end).map(|i| (i as u16, self.cells[i])).collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}
