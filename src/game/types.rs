use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Fresh random id for a newly created entity or record.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Tradeable resource kinds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Gold,
    Wood,
    Food,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::Gold => "gold",
            Resource::Wood => "wood",
            Resource::Food => "food",
        };
        f.write_str(name)
    }
}

/// Resource kind → amount. Also used for catalog costs and generation rates.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ResourcePool(BTreeMap<Resource, u32>);

impl ResourcePool {
    pub fn get(&self, resource: Resource) -> u32 {
        self.0.get(&resource).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        self.0.iter().map(|(r, n)| (*r, *n))
    }

    /// `Err` names the first resource that falls short of `cost`.
    pub fn can_pay(&self, cost: &ResourcePool) -> Result<(), Resource> {
        match cost.iter().find(|(r, n)| self.get(*r) < *n) {
            Some((r, _)) => Err(r),
            None => Ok(()),
        }
    }

    /// Deduct `cost`. Callers check [`ResourcePool::can_pay`] first.
    pub fn pay(&mut self, cost: &ResourcePool) {
        for (r, n) in cost.iter() {
            let slot = self.0.entry(r).or_insert(0);
            *slot = slot.saturating_sub(n);
        }
    }

    pub fn add(&mut self, income: &ResourcePool) {
        for (r, n) in income.iter() {
            let slot = self.0.entry(r).or_insert(0);
            *slot = slot.saturating_add(n);
        }
    }
}

impl<const N: usize> From<[(Resource, u32); N]> for ResourcePool {
    fn from(entries: [(Resource, u32); N]) -> Self {
        ResourcePool(BTreeMap::from(entries))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Peasant,
    Soldier,
    Archer,
    Knight,
    Mage,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    TownHall,
    Barracks,
    Farm,
    Mine,
    Tower,
    Stable,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Player,
    Enemy,
}

/// One unit on the map.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Unit {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: UnitType,
    pub x: i32,
    pub y: i32,
    pub health: u32,
    pub owner: Owner,
    #[serde(default)]
    pub selected: bool,
}

/// One building; occupies its cell exclusively.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Building {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BuildingType,
    pub x: i32,
    pub y: i32,
    pub health: u32,
    pub owner: Owner,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub resources: ResourcePool,
    pub units: Vec<Unit>,
    pub buildings: Vec<Building>,
}

impl Player {
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn building(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Drop every unit and building whose health reached zero.
    pub fn purge_destroyed(&mut self) {
        self.units.retain(|u| u.health > 0);
        self.buildings.retain(|b| b.health > 0);
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Playing,
    Paused,
    Victory,
    Defeat,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MapSize {
    pub width: i32,
    pub height: i32,
}

impl Default for MapSize {
    fn default() -> Self {
        MapSize {
            width: 20,
            height: 20,
        }
    }
}

/// Full game snapshot, stored and replaced as one document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameState {
    pub id: String,
    pub player: Player,
    pub enemy: Player,
    #[serde(default)]
    pub selected_units: BTreeSet<String>,
    #[serde(default)]
    pub selected_building: Option<String>,
    #[serde(default)]
    pub game_status: GameStatus,
    #[serde(default)]
    pub map_size: MapSize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameState {
    /// True when any unit or building of either side stands on (x, y).
    pub fn occupied(&self, x: i32, y: i32) -> bool {
        [&self.player, &self.enemy].iter().any(|p| {
            p.units.iter().any(|u| u.x == x && u.y == y)
                || p.buildings.iter().any(|b| b.x == x && b.y == y)
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Move,
    Attack,
    Build,
    Produce,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Move => "move",
            ActionKind::Attack => "attack",
            ActionKind::Build => "build",
            ActionKind::Produce => "produce",
        }
    }
}

/// Append-only audit record. Never read back by the engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameAction {
    pub game_id: String,
    pub action_type: ActionKind,
    pub unit_id: Option<String>,
    pub building_id: Option<String>,
    pub target_x: Option<i32>,
    pub target_y: Option<i32>,
    pub target_id: Option<String>,
    pub build_type: Option<BuildingType>,
    pub timestamp: DateTime<Utc>,
}

impl GameAction {
    pub fn new(game_id: &str, action_type: ActionKind, timestamp: DateTime<Utc>) -> Self {
        GameAction {
            game_id: game_id.to_owned(),
            action_type,
            unit_id: None,
            building_id: None,
            target_x: None,
            target_y: None,
            target_id: None,
            build_type: None,
            timestamp,
        }
    }
}

/// In-progress unit build, stored apart from the game snapshot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnitProduction {
    pub id: String,
    pub game_id: String,
    pub building_id: String,
    pub unit_type: UnitType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
}
