//! Durable storage for placed blocks
//!
//! The live game never reads from a store after startup; the in-memory grid is
//! authoritative and stores only mirror its mutations.

use log::debug;
use shared::Cell;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read block file {0}: {1}")]
    Read(PathBuf, io::Error),

    #[error("Failed to write block file {0}: {1}")]
    Write(PathBuf, io::Error),

    #[error("Failed to decode block file {0}: {1}")]
    Decode(PathBuf, bincode::Error),

    #[error("Failed to encode blocks: {0}")]
    Encode(bincode::Error),
}

/// Persistence seam for the block grid.
pub trait BlockStore: Send {
    fn load_all(&mut self) -> Result<Vec<Cell>, StoreError>;
    fn insert(&mut self, cell: Cell) -> Result<(), StoreError>;
    fn remove(&mut self, cells: &[Cell]) -> Result<(), StoreError>;
}

/// Keeps blocks for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    cells: HashSet<Cell>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        Self {
            cells: cells.into_iter().collect(),
        }
    }
}

impl BlockStore for MemoryBlockStore {
    fn load_all(&mut self) -> Result<Vec<Cell>, StoreError> {
        Ok(self.cells.iter().copied().collect())
    }

    fn insert(&mut self, cell: Cell) -> Result<(), StoreError> {
        self.cells.insert(cell);
        Ok(())
    }

    fn remove(&mut self, cells: &[Cell]) -> Result<(), StoreError> {
        for cell in cells {
            self.cells.remove(cell);
        }
        Ok(())
    }
}

/// Stores the block set as a bincode-encoded list in a single file.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileBlockStore {
    path: PathBuf,
    cells: HashSet<Cell>,
}

impl FileBlockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cells: HashSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let mut cells: Vec<Cell> = self.cells.iter().copied().collect();
        cells.sort();
        let data = bincode::serialize(&cells).map_err(StoreError::Encode)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).map_err(|e| StoreError::Write(temp_path.clone(), e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::Write(self.path.clone(), e))?;

        debug!("Wrote {} blocks to {}", cells.len(), self.path.display());
        Ok(())
    }
}

impl BlockStore for FileBlockStore {
    fn load_all(&mut self) -> Result<Vec<Cell>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.cells.clear();
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::Read(self.path.clone(), e)),
        };

        let cells: Vec<Cell> =
            bincode::deserialize(&data).map_err(|e| StoreError::Decode(self.path.clone(), e))?;
        self.cells = cells.iter().copied().collect();
        Ok(cells)
    }

    fn insert(&mut self, cell: Cell) -> Result<(), StoreError> {
        if self.cells.insert(cell) {
            self.flush()?;
        }
        Ok(())
    }

    fn remove(&mut self, cells: &[Cell]) -> Result<(), StoreError> {
        let mut changed = false;
        for cell in cells {
            changed |= self.cells.remove(cell);
        }
        if changed {
            self.flush()?;
        }
        Ok(())
    }
}
