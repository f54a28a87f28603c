//! Loads the static world/data-center/region/item catalog and applies the
//! inclusion and exclusion rules a fresh catalog snapshot is subject to
//! before `WorldDcResolver` ever sees it (spec §4.A "Loading rules").
//!
//! The snapshot itself is produced by an external game-data extraction
//! process we treat as an out-of-scope collaborator (spec §1); this module
//! only knows how to read its JSON shape and filter it.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{DataCenter, Region, World};

const BUNDLED_SNAPSHOT: &str = include_str!("worlds.json");

const FORCE_INCLUDED_WORLDS: [i32; 4] = [408, 409, 410, 411];
const EXCLUDED_WORLD: i32 = 25;

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    regions: Vec<RawRegion>,
    data_centers: Vec<RawDataCenter>,
    worlds: Vec<RawWorld>,
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    id: i32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawDataCenter {
    id: i32,
    name: String,
    region_id: i32,
}

#[derive(Debug, Deserialize)]
struct RawWorld {
    id: i32,
    name: String,
    data_center_id: i32,
    is_public: bool,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    item_id: i32,
    stack_size: i32,
    item_search_category_row_id: i32,
}

/// The filtered, ready-to-consume catalog that `WorldDcResolver` is built from.
pub struct Catalog {
    pub worlds: Vec<World>,
    pub data_centers: Vec<DataCenter>,
    pub regions: Vec<Region>,
    pub marketable_items: BTreeSet<i32>,
    pub stack_sizes: HashMap<i32, i32>,
}

/// Reads `GAME_DATA_PATH` if set, otherwise falls back to the bundled
/// snapshot embedded at compile time. A missing or malformed override path
/// is a startup-fatal error (spec §6, exit code 1).
pub fn load(path_override: Option<&str>) -> Result<Catalog> {
    let raw_text = match path_override {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read game-data snapshot at {path}"))?,
        None => BUNDLED_SNAPSHOT.to_string(),
    };

    let raw: RawSnapshot =
        serde_json::from_str(&raw_text).context("game-data snapshot is not valid JSON")?;

    Ok(build_catalog(raw))
}

fn build_catalog(raw: RawSnapshot) -> Catalog {
    let mut worlds = Vec::new();
    for w in &raw.worlds {
        if w.id == EXCLUDED_WORLD {
            continue;
        }
        let force_included = FORCE_INCLUDED_WORLDS.contains(&w.id);
        if force_included || (w.data_center_id > 0 && w.is_public) {
            worlds.push(World {
                id: w.id,
                name: w.name.clone(),
                data_center_id: w.data_center_id,
                is_public: w.is_public || force_included,
            });
        }
    }

    let included_world_ids: BTreeSet<i32> = worlds.iter().map(|w| w.id).collect();

    let region_names: HashMap<i32, String> =
        raw.regions.iter().map(|r| (r.id, r.name.clone())).collect();

    let mut data_centers = Vec::new();
    for dc in &raw.data_centers {
        if !(dc.id > 0 && dc.id < 99) {
            continue;
        }
        let member_worlds: Vec<i32> = worlds
            .iter()
            .filter(|w| w.data_center_id == dc.id)
            .map(|w| w.id)
            .collect();
        if member_worlds.is_empty() {
            continue;
        }
        data_centers.push(DataCenter {
            id: dc.id,
            name: dc.name.clone(),
            region: region_names.get(&dc.region_id).cloned().unwrap_or_default(),
            world_ids: member_worlds,
        });
    }

    let mut regions: Vec<Region> = raw
        .regions
        .iter()
        .map(|r| Region {
            id: r.id,
            name: r.name.clone(),
        })
        .collect();

    let (static_regions, static_dcs, static_worlds) = static_asian_catalog();
    regions.extend(static_regions);
    data_centers.extend(static_dcs);
    worlds.extend(static_worlds);

    let mut marketable_items = BTreeSet::new();
    let mut stack_sizes = HashMap::new();
    for item in &raw.items {
        if item.item_search_category_row_id >= 1 {
            marketable_items.insert(item.item_id);
            stack_sizes.insert(item.item_id, item.stack_size);
        }
    }

    let _ = included_world_ids;
    Catalog {
        worlds,
        data_centers,
        regions,
        marketable_items,
        stack_sizes,
    }
}

/// Static catalogs for regions absent from the upstream game-data snapshot
/// (Chinese and Korean client releases publish their own world lists).
fn static_asian_catalog() -> (Vec<Region>, Vec<DataCenter>, Vec<World>) {
    let regions = vec![
        Region {
            id: 100,
            name: "China".to_string(),
        },
        Region {
            id: 101,
            name: "Korea".to_string(),
        },
    ];

    let data_centers = vec![
        DataCenter {
            id: 201,
            name: "Meteor".to_string(),
            region: "China".to_string(),
            world_ids: vec![1001, 1002],
        },
        DataCenter {
            id: 202,
            name: "Chocobo".to_string(),
            region: "Korea".to_string(),
            world_ids: vec![2001],
        },
    ];

    let worlds = vec![
        World {
            id: 1001,
            name: "Shenhuo".to_string(),
            data_center_id: 201,
            is_public: true,
        },
        World {
            id: 1002,
            name: "Yuzhou".to_string(),
            data_center_id: 201,
            is_public: true,
        },
        World {
            id: 2001,
            name: "Moogle".to_string(),
            data_center_id: 202,
            is_public: true,
        },
    ];

    (regions, data_centers, worlds)
}
