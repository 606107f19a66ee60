//! The OBJ position cache and per-chunk vertex deduplication maps
//! (`SPEC_FULL.md` §3 "OBJ position cache" / "OBJ chunk deduplication state").

use std::collections::{BTreeMap, HashMap};

/// Bounded original-index → byte-offset map for one attribute stream
/// (vertex, texcoord, or normal declarations).
///
/// Eviction removes the smallest key once the map exceeds its capacity, as
/// specified rather than strict insertion-order FIFO.
#[derive(Debug)]
pub struct PositionCache {
    capacity: usize,
    entries: BTreeMap<u64, u64>,
}

impl PositionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
        }
    }

    /// The greatest cached key `<= index`, if any.
    pub fn floor(&self, index: u64) -> Option<(u64, u64)> {
        self.entries.range(..=index).next_back().map(|(&k, &v)| (k, v))
    }

    pub fn insert(&mut self, index: u64, offset: u64) {
        self.entries.insert(index, offset);
        while self.entries.len() > self.capacity {
            if let Some((&smallest, _)) = self.entries.iter().next() {
                self.entries.remove(&smallest);
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-chunk dedup state: one original-index → slot map per attribute
/// stream. Two face-vertex tokens reuse a slot only when every index they
/// carry (vertex, and texcoord/normal when present) resolves to the same
/// slot (`SPEC_FULL.md` §9, open question 1).
#[derive(Debug, Default)]
pub struct DedupMaps {
    vertex: HashMap<u64, u32>,
    texcoord: HashMap<u64, u32>,
    normal: HashMap<u64, u32>,
}

impl DedupMaps {
    pub fn find(&self, vertex: u64, texcoord: Option<u64>, normal: Option<u64>) -> Option<u32> {
        let slot = *self.vertex.get(&vertex)?;
        if let Some(t) = texcoord {
            if *self.texcoord.get(&t)? != slot {
                return None;
            }
        }
        if let Some(n) = normal {
            if *self.normal.get(&n)? != slot {
                return None;
            }
        }
        Some(slot)
    }

    pub fn record(&mut self, slot: u32, vertex: u64, texcoord: Option<u64>, normal: Option<u64>) {
        self.vertex.insert(vertex, slot);
        if let Some(t) = texcoord {
            self.texcoord.insert(t, slot);
        }
        if let Some(n) = normal {
            self.normal.insert(n, slot);
        }
    }
}
