// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Surface canonicalizer
//!
//! Finds surfaces that describe the same locus and maps every duplicate onto
//! the one with the smallest id, with a sign marking mirrored orientation.
//! Only transmission-boundary, non-composite surfaces participate; boundary
//! semantics must never merge with interior surfaces.

use std::collections::BTreeMap;

use ahash::AHashMap;
use approx::relative_eq;
use rayon::prelude::*;

use crate::geometry::{Boundary, SurfaceClass};
use crate::model::SurfaceTable;

/// Outcome of comparing two coefficient vectors of the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMatch {
    /// Same locus, same orientation.
    Identical,
    /// Same locus, opposite orientation.
    Mirrored,
    Distinct,
}

/// Map from duplicate surface ids to their canonical signed id. Ids absent
/// from the map are their own canonical representative.
#[derive(Debug, Clone, Default)]
pub struct SurfaceEquivalence {
    map: AHashMap<u32, i32>,
}

impl SurfaceEquivalence {
    pub fn empty() -> Self {
        SurfaceEquivalence::default()
    }

    /// Canonical signed id of a duplicate, or `None` when the id is already
    /// canonical.
    pub fn lookup(&self, id: u32) -> Option<i32> {
        self.map.get(&id).copied()
    }

    /// Rewrite a signed surface reference, composing the reference's side
    /// with the duplicate's orientation.
    pub fn lookup_signed(&self, signed: i32) -> i32 {
        match self.map.get(&signed.unsigned_abs()) {
            None => signed,
            Some(&canonical) => {
                if signed < 0 {
                    -canonical
                } else {
                    canonical
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        self.map.iter().map(|(&id, &canonical)| (id, canonical))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Tolerance comparison of two coefficient vectors. Vectors of different
/// lengths never match, so typed and generic forms of the same plane stay
/// separate.
pub fn default_comparator(a: &[f64], b: &[f64]) -> SurfaceMatch {
    if a.len() != b.len() {
        return SurfaceMatch::Distinct;
    }
    let close = |x: &f64, y: f64| relative_eq!(*x, y, epsilon = 1e-12, max_relative = 1e-9);
    if a.iter().zip(b).all(|(x, y)| close(x, *y)) {
        SurfaceMatch::Identical
    } else if a.iter().zip(b).all(|(x, y)| close(x, -*y)) {
        SurfaceMatch::Mirrored
    } else {
        SurfaceMatch::Distinct
    }
}

/// Scan the table for duplicate surfaces with the default comparator.
pub fn find_identical_surfaces(table: &SurfaceTable) -> SurfaceEquivalence {
    find_identical_surfaces_with(table, default_comparator)
}

/// Scan the table for duplicate surfaces. The pair scan within each class
/// bucket runs in parallel; relation order stays deterministic, so the
/// smallest id always wins as the representative.
pub fn find_identical_surfaces_with<F>(table: &SurfaceTable, comparator: F) -> SurfaceEquivalence
where
    F: Fn(&[f64], &[f64]) -> SurfaceMatch + Sync,
{
    let mut buckets: BTreeMap<SurfaceClass, Vec<(u32, Vec<f64>)>> = BTreeMap::new();
    for id in table.ids() {
        let surface = match table.get(id) {
            Some(surface) => surface,
            None => continue,
        };
        if surface.boundary != Boundary::Transmission {
            continue;
        }
        if let Some((class, coefficients)) = surface.kind.comparison_key() {
            buckets.entry(class).or_default().push((id, coefficients));
        }
    }

    let mut forest = SignedForest::new();
    for bucket in buckets.values() {
        let mut pairs = Vec::with_capacity(bucket.len().saturating_sub(1) * bucket.len() / 2);
        for i in 0..bucket.len() {
            for j in i + 1..bucket.len() {
                pairs.push((i, j));
            }
        }
        let relations: Vec<(u32, u32, bool)> = pairs
            .par_iter()
            .filter_map(|&(i, j)| match comparator(&bucket[i].1, &bucket[j].1) {
                SurfaceMatch::Identical => Some((bucket[i].0, bucket[j].0, false)),
                SurfaceMatch::Mirrored => Some((bucket[i].0, bucket[j].0, true)),
                SurfaceMatch::Distinct => None,
            })
            .collect();
        for (a, b, mirrored) in relations {
            forest.union(a, b, mirrored);
        }
    }

    let mut map = AHashMap::new();
    for bucket in buckets.values() {
        for &(id, _) in bucket {
            let (root, flipped) = forest.find(id);
            if root != id {
                let canonical = root as i32;
                map.insert(id, if flipped { -canonical } else { canonical });
            }
        }
    }
    SurfaceEquivalence { map }
}

/// Union-find over surface ids carrying a relative-orientation bit on every
/// link. The smallest id in a set becomes its root.
struct SignedForest {
    parent: AHashMap<u32, (u32, bool)>,
}

impl SignedForest {
    fn new() -> Self {
        SignedForest {
            parent: AHashMap::new(),
        }
    }

    /// Root of `id` and whether `id` is mirrored relative to it, with path
    /// compression.
    fn find(&mut self, id: u32) -> (u32, bool) {
        match self.parent.get(&id).copied() {
            None => (id, false),
            Some((parent, flip)) => {
                let (root, above) = self.find(parent);
                let total = flip ^ above;
                self.parent.insert(id, (root, total));
                (root, total)
            }
        }
    }

    /// Record that `a` and `b` are the same surface, mirrored or not. A
    /// relation between already-joined surfaces is ignored; the first
    /// recorded orientation wins.
    fn union(&mut self, a: u32, b: u32, mirrored: bool) {
        let (root_a, flip_a) = self.find(a);
        let (root_b, flip_b) = self.find(b);
        if root_a == root_b {
            return;
        }
        let flip = flip_a ^ flip_b ^ mirrored;
        if root_a < root_b {
            self.parent.insert(root_b, (root_a, flip));
        } else {
            self.parent.insert(root_a, (root_b, flip));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::surfaces::build_surface_table;
    use crate::record::{SurfaceRecord, TransformTable};

    fn table(records: Vec<SurfaceRecord>) -> SurfaceTable {
        build_surface_table(&records, &TransformTable::new()).unwrap()
    }

    #[test]
    fn test_identical_planes_merge_to_smallest_id() {
        let table = table(vec![
            SurfaceRecord::new(4, "px", vec![1.0]),
            SurfaceRecord::new(2, "px", vec![1.0]),
            SurfaceRecord::new(7, "px", vec![1.0]),
        ]);
        let equivalence = find_identical_surfaces(&table);
        assert_eq!(equivalence.lookup(4), Some(2));
        assert_eq!(equivalence.lookup(7), Some(2));
        assert_eq!(equivalence.lookup(2), None);
        assert_eq!(equivalence.len(), 2);
    }

    #[test]
    fn test_mirrored_planes_compose_signs() {
        let table = table(vec![
            SurfaceRecord::new(1, "p", vec![1.0, 0.0, 0.0, 5.0]),
            SurfaceRecord::new(3, "p", vec![-1.0, 0.0, 0.0, -5.0]),
        ]);
        let equivalence = find_identical_surfaces(&table);
        assert_eq!(equivalence.lookup(3), Some(-1));
        // The negative side of the mirrored duplicate is the positive side
        // of the canonical surface.
        assert_eq!(equivalence.lookup_signed(-3), 1);
        assert_eq!(equivalence.lookup_signed(3), -1);
        assert_eq!(equivalence.lookup_signed(1), 1);
    }

    #[test]
    fn test_transitive_chain_keeps_orientation() {
        // 1 mirrors 2, 2 mirrors 3, so 1 and 3 agree.
        let table = table(vec![
            SurfaceRecord::new(1, "p", vec![0.0, 1.0, 0.0, 2.0]),
            SurfaceRecord::new(2, "p", vec![0.0, -1.0, 0.0, -2.0]),
            SurfaceRecord::new(3, "p", vec![0.0, 1.0, 0.0, 2.0]),
        ]);
        let equivalence = find_identical_surfaces(&table);
        assert_eq!(equivalence.lookup(2), Some(-1));
        assert_eq!(equivalence.lookup(3), Some(1));
    }

    #[test]
    fn test_typed_and_generic_planes_stay_separate() {
        // A degenerate two-point card gives a typed axis plane whose
        // one-entry key never matches the generic four-entry key.
        let table = table(vec![
            SurfaceRecord::new(1, "px", vec![3.0]),
            SurfaceRecord::new(2, "x", vec![3.0, 1.0, 3.0, 2.0]),
        ]);
        let equivalence = find_identical_surfaces(&table);
        assert!(equivalence.is_empty());
    }

    #[test]
    fn test_boundary_and_composite_exclusions() {
        let mut reflective = SurfaceRecord::new(2, "px", vec![1.0]);
        reflective.reflective = true;
        let table = table(vec![
            SurfaceRecord::new(1, "px", vec![1.0]),
            reflective,
            // Macrobody member planes participate, the composite does not;
            // nothing here coincides with surface 1.
            SurfaceRecord::new(3, "rpp", vec![2.0, 3.0, 2.0, 3.0, 2.0, 3.0]),
        ]);
        let equivalence = find_identical_surfaces(&table);
        assert_eq!(equivalence.lookup(2), None);
        assert_eq!(equivalence.lookup(1), None);
        assert_eq!(equivalence.lookup(3), None);
    }

    #[test]
    fn test_member_surfaces_participate() {
        let table = table(vec![
            SurfaceRecord::new(1, "rpp", vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
            SurfaceRecord::new(2, "rpp", vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
        ]);
        let equivalence = find_identical_surfaces(&table);
        // Six faces each; the second body's members fold onto the first's.
        assert_eq!(equivalence.len(), 6);
        for (duplicate, canonical) in equivalence.iter() {
            assert!(duplicate > 8);
            assert!((3..=8).contains(&(canonical.unsigned_abs())));
        }
    }

    #[test]
    fn test_scan_is_idempotent() {
        let table = table(vec![
            SurfaceRecord::new(1, "cz", vec![0.5]),
            SurfaceRecord::new(2, "cz", vec![0.5]),
            SurfaceRecord::new(3, "so", vec![9.0]),
        ]);
        let first = find_identical_surfaces(&table);
        let second = find_identical_surfaces(&table);
        assert_eq!(first.len(), second.len());
        for (id, canonical) in first.iter() {
            assert_eq!(second.lookup(id), Some(canonical));
            // Canonical representatives map to themselves.
            assert_eq!(first.lookup_signed(canonical), canonical);
        }
    }
}
