// src/container/layout.rs
//! Canonical indexing over 1-D, row and column cell arrays

use crate::container::{CellArray, ContainerError, Element};

/// Orientation of a reference array, derived once from its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLayout {
    /// Shape `(n,)`
    Flat(usize),
    /// Shape `(1, n)`; `(1, 1)` is treated as a row
    Row(usize),
    /// Shape `(n, 1)`
    Column(usize),
}

impl CellLayout {
    pub fn from_shape(shape: &[usize]) -> Result<Self, ContainerError> {
        match *shape {
            [n] => Ok(CellLayout::Flat(n)),
            [1, n] => Ok(CellLayout::Row(n)),
            [n, 1] => Ok(CellLayout::Column(n)),
            _ => Err(ContainerError::UnsupportedShape { shape: shape.to_vec() }),
        }
    }

    pub fn of(cells: &CellArray) -> Result<Self, ContainerError> {
        Self::from_shape(cells.shape())
    }

    /// Number of logical elements
    pub fn len(&self) -> usize {
        match *self {
            CellLayout::Flat(n) | CellLayout::Row(n) | CellLayout::Column(n) => n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage index of logical element `i`
    pub fn index(&self, i: usize) -> Option<Vec<usize>> {
        if i >= self.len() {
            return None;
        }
        Some(match self {
            CellLayout::Flat(_) => vec![i],
            CellLayout::Row(_) => vec![0, i],
            CellLayout::Column(_) => vec![i, 0],
        })
    }

    pub fn get<'a>(&self, cells: &'a CellArray, i: usize) -> Option<&'a Element> {
        let index = self.index(i)?;
        cells.get(index.as_slice())
    }
}
