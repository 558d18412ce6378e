// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Material interning
//!
//! MCNP assigns density on the cell, so one material card can appear with
//! several densities. Each distinct (material, density) pair becomes its own
//! entry; the first density keeps the deck id and later ones move past the
//! highest deck id.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::model::registry::IdAllocator;
use crate::record::CellRecord;

/// Unit of the stored density magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DensityUnits {
    /// Atoms per barn-centimeter, from positive deck densities.
    AtomPerBarnCm,
    /// Grams per cubic centimeter, from negative deck densities.
    GramPerCm3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: u32,
    pub name: String,
    /// Id of the deck material card this entry was split from.
    pub mcnp_id: u32,
    pub density: f64,
    pub units: DensityUnits,
}

/// All materials of a model, with a lookup from deck (material, density)
/// pairs to the interned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialTable {
    materials: Vec<Material>,
    #[serde(with = "index_entries")]
    index: AHashMap<(u32, u64), u32>,
}

/// Serialize the tuple-keyed index as a sequence of entries; JSON maps
/// only allow string keys.
mod index_entries {
    use ahash::AHashMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        index: &AHashMap<(u32, u64), u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<((u32, u64), u32)> =
            index.iter().map(|(key, value)| (*key, *value)).collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<AHashMap<(u32, u64), u32>, D::Error> {
        let entries = Vec::<((u32, u64), u32)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Collapse the two float zeros onto one key.
fn density_key(density: f64) -> u64 {
    if density == 0.0 {
        0.0f64.to_bits()
    } else {
        density.to_bits()
    }
}

impl MaterialTable {
    /// Intern every (material, density) pair used by non-void cells.
    pub fn from_cells(cells: &[CellRecord]) -> Self {
        let mut pairs: Vec<(u32, f64)> = Vec::new();
        let mut seen: AHashSet<(u32, u64)> = AHashSet::new();
        for record in cells {
            if record.material > 0 && seen.insert((record.material as u32, density_key(record.density)))
            {
                pairs.push((record.material as u32, record.density));
            }
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let mut allocator = IdAllocator::new();
        for (mcnp_id, _) in &pairs {
            allocator.reserve(*mcnp_id);
        }

        let mut materials = Vec::with_capacity(pairs.len());
        let mut index = AHashMap::with_capacity(pairs.len());
        let mut claimed: AHashSet<u32> = AHashSet::new();
        for (mcnp_id, density) in pairs {
            let id = if claimed.insert(mcnp_id) {
                mcnp_id
            } else {
                allocator.allocate()
            };
            let (magnitude, units) = if density > 0.0 {
                (density, DensityUnits::AtomPerBarnCm)
            } else {
                (density.abs(), DensityUnits::GramPerCm3)
            };
            index.insert((mcnp_id, density_key(density)), id);
            materials.push(Material {
                id,
                name: format!("M{mcnp_id} with density {density}"),
                mcnp_id,
                density: magnitude,
                units,
            });
        }
        MaterialTable { materials, index }
    }

    /// Interned id for a cell's (material, density) pair.
    pub fn lookup(&self, material: i32, density: f64) -> Option<u32> {
        if material <= 0 {
            return None;
        }
        self.index
            .get(&(material as u32, density_key(density)))
            .copied()
    }

    pub fn get(&self, id: u32) -> Option<&Material> {
        self.materials.iter().find(|material| material.id == id)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
