//! The authoritative obstacle grid
//!
//! Holds the live set of occupied cells in memory and mirrors every mutation to
//! a [`BlockStore`] through a background writer task. Store failures after
//! startup are logged and otherwise ignored so that gameplay continues with the
//! in-memory set.

use crate::store::{BlockStore, StoreError};
use log::{error, info};
use shared::{Cell, GridQuery};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Mutations forwarded to the store writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Insert(Cell),
    Remove(Vec<Cell>),
}

pub struct BlockGrid {
    cells: HashSet<Cell>,
    store_tx: Option<mpsc::UnboundedSender<StoreOp>>,
}

impl BlockGrid {
    /// Creates an empty grid with no durable backing.
    pub fn new() -> Self {
        Self {
            cells: HashSet::new(),
            store_tx: None,
        }
    }

    /// Loads every block from `store` and spawns the writer task that keeps it
    /// in sync. Must be called from within a tokio runtime.
    pub fn load<S: BlockStore + 'static>(
        mut store: S,
    ) -> Result<(Self, JoinHandle<()>), StoreError> {
        let cells: HashSet<Cell> = store.load_all()?.into_iter().collect();
        info!("Loaded {} blocks", cells.len());

        let (store_tx, store_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_store_writer(store, store_rx));

        Ok((
            Self {
                cells,
                store_tx: Some(store_tx),
            },
            writer,
        ))
    }

    /// Marks a cell as occupied. Returns `true` if the cell was previously free.
    pub fn add(&mut self, cell: Cell) -> bool {
        if !self.cells.insert(cell) {
            return false;
        }
        self.persist(StoreOp::Insert(cell));
        true
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Lists every occupied cell in a stable order.
    pub fn list_all(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.cells.iter().copied().collect();
        cells.sort();
        cells
    }

    /// Frees every cell within `radius` cells (Chebyshev distance) of `center`.
    /// Returns the cells that were actually removed.
    pub fn clear_near(&mut self, center: Cell, radius: i32) -> Vec<Cell> {
        let mut removed = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let cell = Cell::new(center.x + dx, center.y + dy);
                if self.cells.remove(&cell) {
                    removed.push(cell);
                }
            }
        }

        if !removed.is_empty() {
            self.persist(StoreOp::Remove(removed.clone()));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn persist(&self, op: StoreOp) {
        if let Some(store_tx) = &self.store_tx {
            if let Err(e) = store_tx.send(op) {
                error!("Block store writer is gone, dropping {:?}", e.0);
            }
        }
    }
}

impl Default for BlockGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl GridQuery for BlockGrid {
    fn is_blocked(&self, cell: Cell) -> bool {
        self.contains(cell)
    }
}

impl FromIterator<Cell> for BlockGrid {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
            store_tx: None,
        }
    }
}

/// Applies queued mutations to the store until every sender is dropped.
async fn run_store_writer<S: BlockStore>(
    mut store: S,
    mut store_rx: mpsc::UnboundedReceiver<StoreOp>,
) {
    while let Some(op) = store_rx.recv().await {
        let result = match &op {
            StoreOp::Insert(cell) => store.insert(*cell),
            StoreOp::Remove(cells) => store.remove(cells),
        };
        if let Err(e) = result {
            error!("Failed to persist {:?}: {}", op, e);
        }
    }
}
