//! The register file.
//!
//! A fixed number of signed 64-bit cells, all starting at zero. Register 0 is
//! the accumulator (ACC). Reads past the end see 0; writes past the end are
//! refused so the caller can report an invalid operand.

use serde::{Serialize, Deserialize};

/// Index of the accumulator.
pub const ACC: usize = 0;

/// The register file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    cells: Vec<i64>,
}

impl RegisterFile {
    /// Create a register file of `count` zeroed cells.
    pub fn new(count: usize) -> Self {
        Self {
            cells: vec![0; count],
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The accumulator.
    #[inline]
    pub fn acc(&self) -> i64 {
        self.read(ACC)
    }

    #[inline]
    pub fn set_acc(&mut self, value: i64) {
        // The file always holds at least the accumulator.
        if let Some(cell) = self.cells.get_mut(ACC) {
            *cell = value;
        }
    }

    /// Read a register. Indices past the end read as 0.
    #[inline]
    pub fn read(&self, index: usize) -> i64 {
        self.cells.get(index).copied().unwrap_or(0)
    }

    /// Write a register. Returns `false`, leaving everything untouched, if
    /// `index` is past the end.
    #[inline]
    pub fn write(&mut self, index: usize, value: i64) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Zero registers `0..span` (clamped to the file size).
    pub fn clear_range(&mut self, span: usize) {
        let end = span.min(self.cells.len());
        self.cells[..end].fill(0);
    }

    /// All cells in index order.
    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    /// `(index, value)` for every register holding a non-zero value.
    pub fn non_zero(&self) -> Vec<(usize, i64)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, v)| (i, *v))
            .collect()
    }
}

impl std::fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show non-zero cells
        f.debug_struct("RegisterFile")
            .field("acc", &self.acc())
            .field("non_zero", &self.non_zero())
            .field("total", &self.cells.len())
            .finish()
    }
}
