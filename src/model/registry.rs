// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Id-keyed tables for surfaces and universes
//!
//! Deck-assigned ids are reserved up front so that generated objects
//! (macrobody members, transformed clones, auxiliary universes) always land
//! past the highest explicit id.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};
use crate::geometry::{Boundary, Surface, SurfaceKind};
use crate::model::cell::Cell;
use crate::model::universe::{CellUniverse, Universe};

/// Monotone id source that never re-issues a reserved id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: 1 }
    }

    /// Mark an id as taken.
    pub fn reserve(&mut self, id: u32) {
        self.next = self.next.max(id + 1);
    }

    /// Hand out the next free id.
    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new()
    }
}

/// All surfaces of a model, keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceTable {
    surfaces: AHashMap<u32, Surface>,
    allocator: IdAllocator,
}

impl SurfaceTable {
    pub fn new() -> Self {
        SurfaceTable {
            surfaces: AHashMap::new(),
            allocator: IdAllocator::new(),
        }
    }

    pub fn reserve(&mut self, id: u32) {
        self.allocator.reserve(id);
    }

    /// Insert a surface under its own id, reserving the id.
    pub fn insert(&mut self, surface: Surface) {
        self.allocator.reserve(surface.id);
        self.surfaces.insert(surface.id, surface);
    }

    /// Insert a surface under a freshly allocated id.
    pub fn insert_auto(&mut self, boundary: Boundary, kind: SurfaceKind) -> u32 {
        let id = self.allocator.allocate();
        self.surfaces.insert(
            id,
            Surface {
                id,
                boundary,
                kind,
            },
        );
        id
    }

    pub fn contains(&self, id: u32) -> bool {
        self.surfaces.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.surfaces.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl Default for SurfaceTable {
    fn default() -> Self {
        SurfaceTable::new()
    }
}

/// All universes of a model. Universe 0 is the root and always exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseTable {
    universes: AHashMap<u32, Universe>,
    allocator: IdAllocator,
    root: u32,
}

impl UniverseTable {
    pub fn new() -> Self {
        let root = 0;
        let mut universes = AHashMap::new();
        universes.insert(root, Universe::Cells(CellUniverse::new(root)));
        UniverseTable {
            universes,
            allocator: IdAllocator::new(),
            root,
        }
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    pub fn reserve(&mut self, id: u32) {
        self.allocator.reserve(id);
    }

    /// Create an empty cell universe under `id` unless one already exists.
    pub fn ensure(&mut self, id: u32) {
        self.allocator.reserve(id);
        self.universes
            .entry(id)
            .or_insert_with(|| Universe::Cells(CellUniverse::new(id)));
    }

    /// Replace whatever is registered under the universe's id.
    pub fn insert(&mut self, universe: Universe) {
        self.allocator.reserve(universe.id());
        self.universes.insert(universe.id(), universe);
    }

    /// Create an empty cell universe under a freshly allocated id.
    pub fn insert_auto(&mut self) -> u32 {
        let id = self.allocator.allocate();
        self.universes
            .insert(id, Universe::Cells(CellUniverse::new(id)));
        id
    }

    /// Add a cell to a cell universe, creating the universe on first touch.
    pub fn add_cell(&mut self, universe: u32, cell: Cell) -> Result<()> {
        self.ensure(universe);
        match self.universes.get_mut(&universe) {
            Some(Universe::Cells(cells)) => {
                cells.add_cell(cell);
                Ok(())
            }
            _ => Err(ConvertError::unsupported(format!(
                "cell {} placed into lattice universe {}",
                cell.id, universe
            ))),
        }
    }

    pub fn get(&self, id: u32) -> Option<&Universe> {
        self.universes.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Universe> {
        self.universes.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Universe> {
        self.universes.values()
    }

    pub fn len(&self) -> usize {
        self.universes.len()
    }
}

impl Default for UniverseTable {
    fn default() -> Self {
        UniverseTable::new()
    }
}
