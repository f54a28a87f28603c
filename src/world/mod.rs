//! Static catalog of worlds, data centers, and regions; resolves a caller's
//! "world or data center" token into a disjoint union.
//!
//! Immutable once constructed (spec §5 "WorldDcResolver is fully immutable
//! after construction; all accesses are lock-free") — every accessor here
//! hands back owned copies or read-only references into data that never
//! changes after `WorldDcResolver::new`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::AppError;
use crate::gamedata::Catalog;
use crate::models::{DataCenter, Region, World};

/// The result of resolving a "worldOrDc" token per spec §4.A.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldOrDc {
    World(World),
    Dc(DataCenter),
}

pub struct WorldDcResolver {
    worlds_by_id: BTreeMap<i32, World>,
    worlds_by_name: HashMap<String, i32>,
    data_centers: Vec<DataCenter>,
    data_centers_by_name: HashMap<String, usize>,
    regions: Vec<Region>,
    marketable_items: BTreeSet<i32>,
    stack_sizes: HashMap<i32, i32>,
}

impl WorldDcResolver {
    pub fn new(catalog: Catalog) -> Self {
        let worlds_by_id: BTreeMap<i32, World> =
            catalog.worlds.into_iter().map(|w| (w.id, w)).collect();

        let worlds_by_name: HashMap<String, i32> = worlds_by_id
            .values()
            .map(|w| (canonical_case(&w.name), w.id))
            .collect();

        let data_centers_by_name: HashMap<String, usize> = catalog
            .data_centers
            .iter()
            .enumerate()
            .map(|(idx, dc)| (dc.name.to_ascii_lowercase(), idx))
            .collect();

        Self {
            worlds_by_id,
            worlds_by_name,
            data_centers: catalog.data_centers,
            data_centers_by_name,
            regions: catalog.regions,
            marketable_items: catalog.marketable_items,
            stack_sizes: catalog.stack_sizes,
        }
    }

    pub fn worlds_by_id(&self) -> &BTreeMap<i32, World> {
        &self.worlds_by_id
    }

    pub fn worlds_by_name(&self) -> HashMap<String, i32> {
        self.worlds_by_name.clone()
    }

    pub fn world_ids(&self) -> BTreeSet<i32> {
        self.worlds_by_id.keys().copied().collect()
    }

    pub fn marketable_items(&self) -> &BTreeSet<i32> {
        &self.marketable_items
    }

    pub fn stack_size(&self, item_id: i32) -> Option<i32> {
        self.stack_sizes.get(&item_id).copied()
    }

    pub fn data_centers(&self) -> &[DataCenter] {
        &self.data_centers
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn is_marketable(&self, item_id: i32) -> bool {
        self.marketable_items.contains(&item_id)
    }

    /// Resolve a "worldOrDc" path token per spec §4.A:
    /// 1. If it parses as a positive integer matching a known world id, that world.
    /// 2. Else, canonicalize case (`upper(first) + lower(rest)`, ASCII-only)
    ///    and look up a world name.
    /// 3. Else, case-insensitive exact match against a data center name.
    /// 4. Else `NotFound`.
    pub fn resolve(&self, token: &str) -> Result<WorldOrDc, AppError> {
        if let Ok(id) = token.parse::<i32>() {
            if id > 0 {
                if let Some(world) = self.worlds_by_id.get(&id) {
                    return Ok(WorldOrDc::World(world.clone()));
                }
            }
        }

        let canonical = canonical_case(token);
        if let Some(&id) = self.worlds_by_name.get(&canonical) {
            if let Some(world) = self.worlds_by_id.get(&id) {
                return Ok(WorldOrDc::World(world.clone()));
            }
        }

        let lowered = token.to_ascii_lowercase();
        if let Some(&idx) = self.data_centers_by_name.get(&lowered) {
            return Ok(WorldOrDc::Dc(self.data_centers[idx].clone()));
        }

        Err(AppError::NotFound)
    }
}

/// `upper(first) + lower(rest)`, ASCII-only (spec §9 "World name normalization").
fn canonical_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let mut out = String::with_capacity(s.len());
            out.push(first.to_ascii_uppercase());
            out.push_str(&chars.as_str().to_ascii_lowercase());
            out
        }
    }
}
