//! Static content tables: unit and building stats, per-call resource
//! generation and the starting endowment.
//!
//! The engine only ever reads a [`Catalog`]. The built-in [`STANDARD`] table is
//! used unless `CATALOG_PATH` points at a JSON file of the same shape.

use crate::game::{
    error::GameError,
    types::{BuildingType, Resource, ResourcePool, UnitType},
};
use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::{collections::HashMap, path::Path, time::Duration};

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitStats {
    pub name: String,
    pub health: u32,
    pub attack: u32,
    pub cost: ResourcePool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "buildTime")]
    pub build_time: Duration,
    pub icon: String,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingStats {
    pub name: String,
    pub health: u32,
    pub cost: ResourcePool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "buildTime")]
    pub build_time: Duration,
    pub icon: String,
    #[serde(default)]
    pub produces: Vec<UnitType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub units: HashMap<UnitType, UnitStats>,
    pub buildings: HashMap<BuildingType, BuildingStats>,
    #[serde(default)]
    pub generation: HashMap<BuildingType, ResourcePool>,
    pub initial_resources: ResourcePool,
}

/// Built-in content, shared read-only.
pub static STANDARD: Lazy<Catalog> = Lazy::new(Catalog::standard);

fn unit(name: &str, health: u32, attack: u32, cost: ResourcePool, ms: u64, icon: &str) -> UnitStats {
    UnitStats {
        name: name.into(),
        health,
        attack,
        cost,
        build_time: Duration::from_millis(ms),
        icon: icon.into(),
    }
}

fn building(
    name: &str,
    health: u32,
    cost: ResourcePool,
    ms: u64,
    icon: &str,
    produces: &[UnitType],
) -> BuildingStats {
    BuildingStats {
        name: name.into(),
        health,
        cost,
        build_time: Duration::from_millis(ms),
        icon: icon.into(),
        produces: produces.to_vec(),
    }
}

impl Catalog {
    /// The stock tables. `tower` deliberately has no building entry.
    pub fn standard() -> Self {
        use Resource::{Food, Gold, Wood};

        let units = HashMap::from([
            (
                UnitType::Peasant,
                unit("Paysan", 50, 5, [(Gold, 50), (Food, 1)].into(), 3000, "👨‍🌾"),
            ),
            (
                UnitType::Soldier,
                unit("Soldat", 100, 15, [(Gold, 100), (Food, 2)].into(), 5000, "⚔️"),
            ),
            (
                UnitType::Archer,
                unit("Archer", 80, 20, [(Gold, 120), (Wood, 50)].into(), 4000, "🏹"),
            ),
            (
                UnitType::Knight,
                unit("Chevalier", 200, 30, [(Gold, 250), (Food, 3)].into(), 8000, "🛡️"),
            ),
            (
                UnitType::Mage,
                unit("Mage", 70, 35, [(Gold, 200), (Food, 2)].into(), 6000, "🧙‍♂️"),
            ),
        ]);

        let buildings = HashMap::from([
            (
                BuildingType::TownHall,
                building(
                    "Hôtel de Ville",
                    500,
                    [(Gold, 500), (Wood, 300)].into(),
                    10000,
                    "🏛️",
                    &[UnitType::Peasant],
                ),
            ),
            (
                BuildingType::Barracks,
                building(
                    "Caserne",
                    300,
                    [(Gold, 200), (Wood, 150)].into(),
                    8000,
                    "🏰",
                    &[UnitType::Soldier, UnitType::Archer],
                ),
            ),
            (
                BuildingType::Farm,
                building("Ferme", 200, [(Gold, 100), (Wood, 100)].into(), 5000, "🚜", &[]),
            ),
            (
                BuildingType::Mine,
                building("Mine", 250, [(Gold, 150), (Wood, 200)].into(), 6000, "⛏️", &[]),
            ),
            (
                BuildingType::Stable,
                building(
                    "Écurie",
                    280,
                    [(Gold, 300), (Wood, 200)].into(),
                    7000,
                    "🐎",
                    &[UnitType::Knight],
                ),
            ),
        ]);

        let generation: HashMap<BuildingType, ResourcePool> = HashMap::from([
            (BuildingType::Farm, [(Food, 2)].into()),
            (BuildingType::Mine, [(Gold, 3)].into()),
            (BuildingType::TownHall, [(Gold, 1)].into()),
        ]);

        Catalog {
            units,
            buildings,
            generation,
            initial_resources: [(Gold, 500), (Wood, 300), (Food, 100)].into(),
        }
    }

    /// Read a JSON catalog from disk.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing catalog {}", path.display()))
    }

    pub fn unit(&self, kind: UnitType) -> Result<&UnitStats, GameError> {
        self.units
            .get(&kind)
            .ok_or_else(|| GameError::InvalidCatalogEntry(format!("unit type {kind:?}")))
    }

    pub fn building(&self, kind: BuildingType) -> Result<&BuildingStats, GameError> {
        self.buildings
            .get(&kind)
            .ok_or_else(|| GameError::InvalidCatalogEntry(format!("building type {kind:?}")))
    }

    /// Per-call income of a building kind, if it generates anything.
    pub fn generation(&self, kind: BuildingType) -> Option<&ResourcePool> {
        self.generation.get(&kind)
    }
}
