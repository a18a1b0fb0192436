//! Core simulation state for the taiga ecosystem workspace.
//!
//! One tick equals one simulated day. The world owns the terrain oracle, the
//! species catalog, the agent arena, and a single seeded RNG; every mutation
//! of agent state flows through the world so the strictly turn-based update
//! order stays observable and reproducible.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use taiga_terrain::{TerrainError, TerrainGenerator, TerrainParams};
use thiserror::Error;
use tracing::{debug, info};

new_key_type! {
    /// Stable handle for agents backed by a generational slot map.
    pub struct AgentId;
}

/// High level simulation clock (ticks processed since boot).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Continuous 2D map position in pixel units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Feeding strategy of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diet {
    Herbivore,
    Carnivore,
}

/// Cosmetic sex marker; no behavioral rule reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Index of a species inside its catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SpeciesId(u16);

impl SpeciesId {
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Immutable biological parameters for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    pub diet: Diet,
    /// Adult body mass; drives carcass calorie content. Must be positive.
    pub adult_body_mass: f64,
    /// Age in days before the reproduction gate can open.
    pub age_at_first_birth: u32,
    /// Maximum longevity in dataset units; lifespan in days is this times 30.
    pub max_longevity: f64,
    /// Home range area; its square root scales per-tick step length.
    pub home_range: f64,
}

/// Errors raised while building a species catalog.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("species {name:?} must have a positive adult body mass (got {value})")]
    NonPositiveBodyMass { name: String, value: f64 },
    #[error("species {name:?} must have a positive home range (got {value})")]
    NonPositiveHomeRange { name: String, value: f64 },
    #[error("species {name:?} must have a positive maximum longevity (got {value})")]
    NonPositiveLongevity { name: String, value: f64 },
    #[error("species {name:?} appears more than once")]
    DuplicateSpecies { name: String },
}

/// Read-only registry of validated species records.
///
/// Constructed once at startup; the world and its agents reference entries by
/// [`SpeciesId`] and never mutate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesCatalog {
    entries: Vec<Species>,
    by_name: HashMap<String, SpeciesId>,
}

impl SpeciesCatalog {
    /// Validate and index a list of species records.
    pub fn from_species(species: Vec<Species>) -> Result<Self, CatalogError> {
        let mut catalog = Self {
            entries: Vec::with_capacity(species.len()),
            by_name: HashMap::with_capacity(species.len()),
        };
        for record in species {
            if !(record.adult_body_mass > 0.0) {
                return Err(CatalogError::NonPositiveBodyMass {
                    name: record.name,
                    value: record.adult_body_mass,
                });
            }
            if !(record.home_range > 0.0) {
                return Err(CatalogError::NonPositiveHomeRange {
                    name: record.name,
                    value: record.home_range,
                });
            }
            if !(record.max_longevity > 0.0) {
                return Err(CatalogError::NonPositiveLongevity {
                    name: record.name,
                    value: record.max_longevity,
                });
            }
            let id = SpeciesId(catalog.entries.len() as u16);
            if catalog.by_name.insert(record.name.clone(), id).is_some() {
                return Err(CatalogError::DuplicateSpecies { name: record.name });
            }
            catalog.entries.push(record);
        }
        Ok(catalog)
    }

    /// The built-in boreal dataset: wolf, moose, beaver.
    #[must_use]
    pub fn reference() -> Self {
        let rows = [
            Species {
                name: "wolf".to_string(),
                diet: Diet::Carnivore,
                adult_body_mass: 31.0,
                age_at_first_birth: 547,
                max_longevity: 354.0,
                home_range: 159.86,
            },
            Species {
                name: "moose".to_string(),
                diet: Diet::Herbivore,
                adult_body_mass: 461.0,
                age_at_first_birth: 1216,
                max_longevity: 324.0,
                home_range: 71.75,
            },
            Species {
                name: "beaver".to_string(),
                diet: Diet::Herbivore,
                adult_body_mass: 18.0,
                age_at_first_birth: 220,
                max_longevity: 180.0,
                home_range: 5.5,
            },
        ];
        let mut catalog = Self {
            entries: Vec::with_capacity(rows.len()),
            by_name: HashMap::with_capacity(rows.len()),
        };
        for record in rows {
            let id = SpeciesId(catalog.entries.len() as u16);
            catalog.by_name.insert(record.name.clone(), id);
            catalog.entries.push(record);
        }
        catalog
    }

    /// Fetch a species record by id.
    #[must_use]
    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.entries.get(id.index())
    }

    /// Resolve a species name to its id.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<SpeciesId> {
        self.by_name.get(name).copied()
    }

    /// Number of species in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the catalog holds no species.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(id, record)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, record)| (SpeciesId(index as u16), record))
    }
}

/// The eight controller-driven movement directions.
///
/// `ALL` lists them in external action order (indices 0..8); `North` points
/// toward decreasing `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compass {
    North,
    South,
    West,
    East,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Compass {
    /// All directions in external action order.
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::South,
        Self::West,
        Self::East,
        Self::NorthWest,
        Self::NorthEast,
        Self::SouthWest,
        Self::SouthEast,
    ];

    /// Decode an external action index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::North),
            1 => Some(Self::South),
            2 => Some(Self::West),
            3 => Some(Self::East),
            4 => Some(Self::NorthWest),
            5 => Some(Self::NorthEast),
            6 => Some(Self::SouthWest),
            7 => Some(Self::SouthEast),
            _ => None,
        }
    }

    /// Unit-cell offset; diagonals are deliberately not normalized, so a
    /// diagonal step covers `sqrt(2)` times the step length.
    #[must_use]
    pub const fn offset(self) -> (f32, f32) {
        match self {
            Self::North => (0.0, -1.0),
            Self::South => (0.0, 1.0),
            Self::West => (-1.0, 0.0),
            Self::East => (1.0, 0.0),
            Self::NorthWest => (-1.0, -1.0),
            Self::NorthEast => (1.0, -1.0),
            Self::SouthWest => (-1.0, 1.0),
            Self::SouthEast => (1.0, 1.0),
        }
    }
}

/// Age assigned to agents at spawn time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialAge {
    /// Every agent starts at age zero.
    #[default]
    Newborn,
    /// Ages drawn uniformly from `[0, max_longevity * 30)`.
    UniformLifespan,
}

/// Errors that can occur when constructing or driving world state.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Terrain construction failed.
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    /// The referenced species is not part of this world's catalog.
    #[error("species {0:?} is not present in the catalog")]
    UnknownSpecies(SpeciesId),
    /// Rejection sampling exhausted its attempt budget without finding land.
    /// Terrain parameters must guarantee that land exists.
    #[error("no spawnable land found after {attempts} placement attempts")]
    NoSpawnableLand { attempts: u32 },
    /// A caller-supplied position lies outside the map.
    #[error("position ({x}, {y}) lies outside the map")]
    OutOfBounds { x: f32, y: f32 },
}

/// Static configuration for a taiga world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Width of the map in pixel units.
    pub map_width: u32,
    /// Height of the map in pixel units.
    pub map_height: u32,
    /// Fractal parameters for the altitude field.
    pub terrain: TerrainParams,
    /// Optional RNG seed for reproducible worlds; also seeds the terrain.
    pub rng_seed: Option<u64>,
    /// Radius of the carnivore feeding scan, in map units.
    pub predation_radius: f32,
    /// Multiplier applied to `sqrt(home_range)` to derive step length.
    pub step_length_scale: f64,
    /// Fraction of carcass calories lost per tick once an agent is dead.
    pub decay_rate: f64,
    /// Consecutive starvation days beyond which an agent dies.
    pub starvation_death_threshold: u32,
    /// Starvation days at or above which the reproduction gate stays closed.
    pub reproduction_starvation_limit: u32,
    /// Per-tick probability of a reproduction attempt once gates allow it.
    pub reproduction_chance: f64,
    /// Carcass calories per unit of adult body mass.
    pub calories_per_body_mass: f64,
    /// Attempt budget for the autonomous movement retry loop.
    pub max_move_attempts: u32,
    /// Carcass removal threshold as a fraction of initial calories.
    pub corpse_epsilon: f64,
    /// Attempt budget per spawn placement before failing fast.
    pub spawn_attempt_limit: u32,
    /// Vegetation capacity per terrain cell (extension point, unconsumed).
    pub resource_cap: f32,
    /// Upper bound on per-cell vegetation regrowth rate.
    pub resource_regen_multiplier: f32,
    /// Age profile assigned at spawn time.
    pub initial_age: InitialAge,
    /// Maximum number of recent tick summaries retained in memory.
    pub history_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map_width: 400,
            map_height: 400,
            terrain: TerrainParams::default(),
            rng_seed: None,
            predation_radius: 10.0,
            step_length_scale: 0.25,
            decay_rate: 0.01,
            starvation_death_threshold: 30,
            reproduction_starvation_limit: 10,
            reproduction_chance: 0.01,
            calories_per_body_mass: 1500.0,
            max_move_attempts: 10,
            corpse_epsilon: 1e-6,
            spawn_attempt_limit: 10_000,
            resource_cap: 10_000.0,
            resource_regen_multiplier: 1500.0,
            initial_age: InitialAge::Newborn,
            history_capacity: 256,
        }
    }
}

impl WorldConfig {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), WorldError> {
        if self.map_width == 0 || self.map_height == 0 {
            return Err(WorldError::InvalidConfig(
                "map dimensions must be non-zero",
            ));
        }
        if !(self.predation_radius > 0.0) {
            return Err(WorldError::InvalidConfig(
                "predation_radius must be positive",
            ));
        }
        if !(self.step_length_scale > 0.0) {
            return Err(WorldError::InvalidConfig(
                "step_length_scale must be positive",
            ));
        }
        if !(self.decay_rate > 0.0 && self.decay_rate <= 1.0) {
            return Err(WorldError::InvalidConfig(
                "decay_rate must lie in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.reproduction_chance) {
            return Err(WorldError::InvalidConfig(
                "reproduction_chance must lie in [0, 1]",
            ));
        }
        if !(self.calories_per_body_mass > 0.0) {
            return Err(WorldError::InvalidConfig(
                "calories_per_body_mass must be positive",
            ));
        }
        if self.max_move_attempts == 0 {
            return Err(WorldError::InvalidConfig(
                "max_move_attempts must be at least 1",
            ));
        }
        if !(self.corpse_epsilon > 0.0 && self.corpse_epsilon < 1.0) {
            return Err(WorldError::InvalidConfig(
                "corpse_epsilon must lie in (0, 1)",
            ));
        }
        if self.spawn_attempt_limit == 0 {
            return Err(WorldError::InvalidConfig(
                "spawn_attempt_limit must be at least 1",
            ));
        }
        if !(self.resource_cap > 0.0) || self.resource_regen_multiplier < 0.0 {
            return Err(WorldError::InvalidConfig(
                "resource capacity must be positive and regen non-negative",
            ));
        }
        if self.history_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "history_capacity must be at least 1",
            ));
        }
        Ok(())
    }

    /// Returns the configured seed, generating one from entropy if absent.
    fn resolve_seed(&self) -> u64 {
        self.rng_seed.unwrap_or_else(rand::random)
    }
}

/// Vegetation stock for one terrain cell.
///
/// Initialized at world construction and regrown/consumed by nothing yet:
/// herbivore feeding is a stub, so these values are write-once. The grid
/// stays in the model as the hook vegetation consumption will attach to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceBlock {
    pub resources: f32,
    pub regen_rate: f32,
}

/// Per-cell vegetation grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGrid {
    width: u32,
    height: u32,
    cap: f32,
    cells: Vec<ResourceBlock>,
}

impl ResourceGrid {
    /// Build a grid with every cell at capacity and a random regen rate.
    fn generate(
        width: u32,
        height: u32,
        cap: f32,
        regen_multiplier: f32,
        rng: &mut SmallRng,
    ) -> Self {
        let len = (width as usize) * (height as usize);
        let mut cells = Vec::with_capacity(len);
        for _ in 0..len {
            cells.push(ResourceBlock {
                resources: cap,
                regen_rate: rng.random::<f32>() * regen_multiplier,
            });
        }
        Self {
            width,
            height,
            cap,
            cells,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Capacity shared by every cell.
    #[must_use]
    pub const fn cap(&self) -> f32 {
        self.cap
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Immutable access to a specific cell.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<&ResourceBlock> {
        if x < self.width && y < self.height {
            Some(&self.cells[self.offset(x, y)])
        } else {
            None
        }
    }
}

/// Mutable lifecycle state of one organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub species: SpeciesId,
    pub diet: Diet,
    pub alive: bool,
    /// Age in days; increments once per tick, corpses included.
    pub age: u32,
    /// Individual lifespan in days, sampled once at creation.
    pub max_age: f64,
    pub sex: Sex,
    pub position: Position,
    /// Per-tick movement distance in map units.
    pub step_length: f32,
    /// Edible calories; the carcass value once the agent dies.
    pub meat_calories: f64,
    /// Calories at creation; anchors the carcass removal threshold.
    pub initial_calories: f64,
    /// Consecutive days without a successful feeding event.
    pub starvation_days: u32,
}

/// Read-only projection of an agent for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub species: SpeciesId,
    pub diet: Diet,
    pub position: Position,
    pub alive: bool,
    pub meat_calories: f64,
}

/// Dense agent storage with generational handles.
///
/// Iteration order is creation order, and compaction preserves the relative
/// order of survivors; the feeding scan's first-match rule depends on both.
#[derive(Debug, Default)]
pub struct AgentArena {
    slots: SlotMap<AgentId, usize>,
    handles: Vec<AgentId>,
    agents: Vec<Agent>,
}

impl AgentArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            handles: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// Number of stored agents, corpses included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true when no agents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Returns true if `id` refers to a stored agent.
    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.slots.contains_key(id)
    }

    /// Returns the dense index for `id`, if present.
    #[must_use]
    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Borrow an agent by handle.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index_of(id).map(|index| &self.agents[index])
    }

    /// Dense slice of agents in creation order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Iterate `(handle, agent)` pairs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.handles.iter().copied().zip(self.agents.iter())
    }

    /// Clone the agent stored under `id`.
    #[must_use]
    pub fn snapshot(&self, id: AgentId) -> Option<Agent> {
        self.get(id).cloned()
    }

    /// Insert a new agent and return its handle.
    pub fn insert(&mut self, agent: Agent) -> AgentId {
        let index = self.agents.len();
        self.agents.push(agent);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    fn handle_at(&self, index: usize) -> AgentId {
        self.handles[index]
    }

    fn agent(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    fn agent_mut(&mut self, index: usize) -> &mut Agent {
        &mut self.agents[index]
    }

    /// Drop every agent rejected by `keep`, preserving the order of the rest.
    fn compact<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Agent) -> bool,
    {
        let mut write = 0;
        for read in 0..self.handles.len() {
            let id = self.handles[read];
            if !keep(&self.agents[read]) {
                self.slots.remove(id);
                continue;
            }
            if write != read {
                self.handles[write] = id;
                self.agents.swap(read, write);
            }
            if let Some(slot) = self.slots.get_mut(id) {
                *slot = write;
            }
            write += 1;
        }
        let removed = self.handles.len() - write;
        self.handles.truncate(write);
        self.agents.truncate(write);
        removed
    }
}

/// Per-tick outcome counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: Tick,
    /// Agents alive after the sweep.
    pub living: usize,
    /// Dead agents still decaying in the registry.
    pub corpses: usize,
    /// Agents that died of age or starvation during this sweep.
    pub deaths: usize,
    /// Successful predation kills.
    pub kills: usize,
    /// Successful carcass scavenging events.
    pub scavenges: usize,
    /// Reproduction gates that opened (no offspring is created yet).
    pub reproduction_attempts: usize,
    /// Fully decayed carcasses compacted out after the sweep.
    pub removed: usize,
}

#[derive(Debug, Default)]
struct SweepStats {
    deaths: usize,
    kills: usize,
    scavenges: usize,
    reproduction_attempts: usize,
}

/// Aggregate world state: terrain, vegetation, catalog, agents, clock, RNG.
pub struct WorldState {
    config: WorldConfig,
    catalog: SpeciesCatalog,
    seed: u64,
    tick: Tick,
    rng: SmallRng,
    terrain: TerrainGenerator,
    resources: ResourceGrid,
    arena: AgentArena,
    history: VecDeque<TickSummary>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .field("tick", &self.tick)
            .field("agent_count", &self.arena.len())
            .finish()
    }
}

impl WorldState {
    /// Instantiate a new world from a configuration and species catalog.
    pub fn new(config: WorldConfig, catalog: SpeciesCatalog) -> Result<Self, WorldError> {
        config.validate()?;
        let seed = config.resolve_seed();
        let mut rng = SmallRng::seed_from_u64(seed);
        let terrain = TerrainGenerator::new(
            seed,
            config.map_width,
            config.map_height,
            config.terrain.clone(),
        )?;
        let resources = ResourceGrid::generate(
            config.map_width,
            config.map_height,
            config.resource_cap,
            config.resource_regen_multiplier,
            &mut rng,
        );
        let history_capacity = config.history_capacity;
        info!(
            seed,
            width = config.map_width,
            height = config.map_height,
            "world initialised"
        );
        Ok(Self {
            config,
            catalog,
            seed,
            tick: Tick::zero(),
            rng,
            terrain,
            resources,
            arena: AgentArena::new(),
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Immutable access to configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The seed actually driving this world's RNG and terrain.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Borrow the world RNG mutably for deterministic sampling.
    #[must_use]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Read-only access to the terrain oracle.
    #[must_use]
    pub fn terrain(&self) -> &TerrainGenerator {
        &self.terrain
    }

    /// Read-only access to the vegetation grid.
    #[must_use]
    pub fn resources(&self) -> &ResourceGrid {
        &self.resources
    }

    /// Read-only access to the species catalog.
    #[must_use]
    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    /// Read-only access to the agent arena.
    #[must_use]
    pub fn agents(&self) -> &AgentArena {
        &self.arena
    }

    /// Number of stored agents, corpses included.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.arena.len()
    }

    /// Iterate over retained tick summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    /// Project an agent into its external read view.
    #[must_use]
    pub fn view(&self, id: AgentId) -> Option<AgentView> {
        let agent = self.arena.get(id)?;
        Some(AgentView {
            id,
            species: agent.species,
            diet: agent.diet,
            position: agent.position,
            alive: agent.alive,
            meat_calories: agent.meat_calories,
        })
    }

    /// Iterate read views over every stored agent in creation order.
    pub fn views(&self) -> impl Iterator<Item = AgentView> {
        self.arena.iter().map(|(id, agent)| AgentView {
            id,
            species: agent.species,
            diet: agent.diet,
            position: agent.position,
            alive: agent.alive,
            meat_calories: agent.meat_calories,
        })
    }

    /// Count living agents per catalog species.
    #[must_use]
    pub fn population_by_species(&self) -> Vec<(SpeciesId, usize)> {
        let mut counts = vec![0usize; self.catalog.len()];
        for agent in self.arena.agents() {
            if agent.alive {
                counts[agent.species.index()] += 1;
            }
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(index, count)| (SpeciesId(index as u16), count))
            .collect()
    }

    /// Draw the default population sizing rule: each species gets a uniform
    /// count in `[30, 60]`, multiplied by 30 for herbivores.
    pub fn default_population_counts(&mut self) -> Vec<(SpeciesId, usize)> {
        const MIN_AGENTS: u32 = 30;
        const HERBIVORE_MULTIPLIER: usize = 30;
        let diets: Vec<(SpeciesId, Diet)> = self
            .catalog
            .iter()
            .map(|(id, species)| (id, species.diet))
            .collect();
        diets
            .into_iter()
            .map(|(id, diet)| {
                let mut count = self.rng.random_range(MIN_AGENTS..=MIN_AGENTS * 2) as usize;
                if diet == Diet::Herbivore {
                    count *= HERBIVORE_MULTIPLIER;
                }
                (id, count)
            })
            .collect()
    }

    /// Spawn `count` agents per entry, each placed on a rejection-sampled
    /// land cell. Fails fast when the terrain offers no land within the
    /// configured attempt budget.
    pub fn spawn_initial_population(
        &mut self,
        counts: &[(SpeciesId, usize)],
    ) -> Result<Vec<AgentId>, WorldError> {
        let mut spawned = Vec::new();
        for &(species_id, count) in counts {
            let name = self
                .catalog
                .get(species_id)
                .ok_or(WorldError::UnknownSpecies(species_id))?
                .name
                .clone();
            for _ in 0..count {
                spawned.push(self.spawn_agent(species_id)?);
            }
            info!(species = %name, count, "spawned initial population");
        }
        Ok(spawned)
    }

    /// Spawn one agent of `species` on a rejection-sampled land cell.
    pub fn spawn_agent(&mut self, species: SpeciesId) -> Result<AgentId, WorldError> {
        if self.catalog.get(species).is_none() {
            return Err(WorldError::UnknownSpecies(species));
        }
        let (x, y) = self.sample_spawn_cell()?;
        let agent = self.build_agent(species, Position::new(x as f32, y as f32))?;
        Ok(self.arena.insert(agent))
    }

    /// Spawn one agent of `species` at a caller-chosen in-bounds position.
    ///
    /// Intended for external controllers placing subjects deliberately; the
    /// movement rules keep the agent on land from the next tick onward.
    pub fn spawn_agent_at(
        &mut self,
        species: SpeciesId,
        position: Position,
    ) -> Result<AgentId, WorldError> {
        let width = self.config.map_width as f32;
        let height = self.config.map_height as f32;
        if !(position.x >= 0.0 && position.x < width && position.y >= 0.0 && position.y < height)
        {
            return Err(WorldError::OutOfBounds {
                x: position.x,
                y: position.y,
            });
        }
        let agent = self.build_agent(species, position)?;
        Ok(self.arena.insert(agent))
    }

    fn sample_spawn_cell(&mut self) -> Result<(u32, u32), WorldError> {
        let limit = self.config.spawn_attempt_limit;
        for attempt in 0..limit {
            let x = self.rng.random_range(0..self.config.map_width);
            let y = self.rng.random_range(0..self.config.map_height);
            if self.terrain.is_land(x, y) {
                if attempt > limit / 2 {
                    debug!(attempt, "spawn placement consumed most of its attempt budget");
                }
                return Ok((x, y));
            }
        }
        Err(WorldError::NoSpawnableLand { attempts: limit })
    }

    fn build_agent(
        &mut self,
        species_id: SpeciesId,
        position: Position,
    ) -> Result<Agent, WorldError> {
        let species = self
            .catalog
            .get(species_id)
            .ok_or(WorldError::UnknownSpecies(species_id))?;
        let lifespan_days = species.max_longevity * 30.0;
        let age = match self.config.initial_age {
            InitialAge::Newborn => 0,
            InitialAge::UniformLifespan => self.rng.random_range(0.0..lifespan_days) as u32,
        };
        let max_age = lifespan_days * self.rng.random_range(0.5..1.0);
        let sex = if self.rng.random::<f64>() > 0.5 {
            Sex::Male
        } else {
            Sex::Female
        };
        let step_length = (species.home_range.sqrt() * self.config.step_length_scale) as f32;
        let meat_calories = species.adult_body_mass * self.config.calories_per_body_mass;
        Ok(Agent {
            species: species_id,
            diet: species.diet,
            alive: true,
            age,
            max_age,
            sex,
            position,
            step_length,
            meat_calories,
            initial_calories: meat_calories,
            starvation_days: 0,
        })
    }

    /// Advance the world by one tick.
    ///
    /// Agents update strictly one at a time in creation/retention order; a
    /// turn may mutate other agents (predation, scavenging) through the
    /// world before the next turn begins. After the sweep, fully decayed
    /// carcasses are compacted out without disturbing survivor order.
    pub fn step(&mut self) -> TickSummary {
        let next_tick = self.tick.next();
        let mut stats = SweepStats::default();
        let present = self.arena.len();
        for index in 0..present {
            self.update_agent(index, &mut stats);
        }

        let epsilon = self.config.corpse_epsilon;
        let removed = self
            .arena
            .compact(|agent| agent.alive || agent.meat_calories >= agent.initial_calories * epsilon);
        if removed > 0 {
            debug!(removed, tick = next_tick.0, "compacted fully decayed carcasses");
        }

        self.tick = next_tick;
        let mut living = 0;
        let mut corpses = 0;
        for agent in self.arena.agents() {
            if agent.alive {
                living += 1;
            } else {
                corpses += 1;
            }
        }
        let summary = TickSummary {
            tick: next_tick,
            living,
            corpses,
            deaths: stats.deaths,
            kills: stats.kills,
            scavenges: stats.scavenges,
            reproduction_attempts: stats.reproduction_attempts,
            removed,
        };
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary.clone());
        summary
    }

    /// One agent's turn: aging, the death check, then decay or the live
    /// branch (feeding, reproduction gate, movement).
    fn update_agent(&mut self, index: usize, stats: &mut SweepStats) {
        {
            let threshold = self.config.starvation_death_threshold;
            let decay_rate = self.config.decay_rate;
            let agent = self.arena.agent_mut(index);
            agent.age = agent.age.saturating_add(1);
            // The death check precedes and gates every other effect this tick.
            if agent.alive
                && (f64::from(agent.age) > agent.max_age || agent.starvation_days > threshold)
            {
                agent.alive = false;
                stats.deaths += 1;
            }
            if !agent.alive {
                agent.meat_calories -= agent.meat_calories * decay_rate;
                return;
            }
        }
        self.feed(index, stats);
        self.maybe_reproduce(index, stats);
        self.wander(index);
    }

    fn feed(&mut self, index: usize, stats: &mut SweepStats) {
        match self.arena.agent(index).diet {
            Diet::Herbivore => self.graze(index),
            Diet::Carnivore => self.hunt(index, stats),
        }
    }

    /// Vegetation consumption is an unimplemented extension point; the
    /// resource grid is never drawn down and herbivores never starve.
    fn graze(&mut self, _index: usize) {}

    /// Scan neighbors in registry order and resolve at most one feeding
    /// event: the first neighbor that is either a live herbivore (kill) or a
    /// calorie-bearing carcass (scavenge). An empty scan is a starvation day.
    fn hunt(&mut self, index: usize, stats: &mut SweepStats) {
        let radius = self.config.predation_radius;
        for other in self.neighbor_indices(index, radius) {
            let candidate = self.arena.agent(other);
            let (alive, diet, calories) =
                (candidate.alive, candidate.diet, candidate.meat_calories);
            if alive && diet == Diet::Herbivore {
                self.arena.agent_mut(other).alive = false;
                let hunter = self.arena.agent_mut(index);
                hunter.starvation_days = 0;
                hunter.meat_calories += calories * 0.5;
                stats.kills += 1;
                return;
            }
            if !alive && calories > 0.0 {
                let share = calories * 0.5;
                {
                    let hunter = self.arena.agent_mut(index);
                    hunter.starvation_days = 0;
                    hunter.meat_calories += share;
                }
                self.arena.agent_mut(other).meat_calories = share;
                stats.scavenges += 1;
                return;
            }
        }
        self.arena.agent_mut(index).starvation_days += 1;
    }

    fn maybe_reproduce(&mut self, index: usize, stats: &mut SweepStats) {
        let agent = self.arena.agent(index);
        let Some(species) = self.catalog.get(agent.species) else {
            return;
        };
        if agent.age > species.age_at_first_birth
            && agent.starvation_days < self.config.reproduction_starvation_limit
            && self.rng.random::<f64>() < self.config.reproduction_chance
        {
            stats.reproduction_attempts += 1;
            self.reproduce(index);
        }
    }

    /// Offspring creation is stubbed: the gate and its RNG draw are real,
    /// the birth is not.
    fn reproduce(&mut self, _index: usize) {}

    /// Autonomous movement: bounded retries at a random heading, rejecting
    /// out-of-bounds and ocean candidates. Exhausting the budget leaves the
    /// agent in place.
    fn wander(&mut self, index: usize) {
        let (origin, step) = {
            let agent = self.arena.agent(index);
            (agent.position, agent.step_length)
        };
        let width = self.config.map_width as f32;
        let height = self.config.map_height as f32;
        for _ in 0..self.config.max_move_attempts {
            let heading = self.rng.random_range(0.0..std::f32::consts::TAU);
            let candidate_x = origin.x + heading.cos() * step;
            let candidate_y = origin.y + heading.sin() * step;
            if candidate_x < 0.0
                || candidate_x >= width
                || candidate_y < 0.0
                || candidate_y >= height
            {
                continue;
            }
            let x = candidate_x.clamp(0.0, width - 1.0);
            let y = candidate_y.clamp(0.0, height - 1.0);
            if self.terrain.is_land(x as u32, y as u32) {
                self.arena.agent_mut(index).position = Position::new(x, y);
                return;
            }
        }
    }

    /// Controller-driven movement: a single candidate in one of the eight
    /// compass directions, silently rejected at map bounds or ocean.
    /// Returns whether the agent moved. Dead agents never move.
    pub fn move_directed(&mut self, id: AgentId, direction: Compass) -> bool {
        let Some(index) = self.arena.index_of(id) else {
            return false;
        };
        let (origin, step, alive) = {
            let agent = self.arena.agent(index);
            (agent.position, agent.step_length, agent.alive)
        };
        if !alive {
            return false;
        }
        let (dx, dy) = direction.offset();
        let candidate_x = origin.x + dx * step;
        let candidate_y = origin.y + dy * step;
        let width = self.config.map_width as f32;
        let height = self.config.map_height as f32;
        if candidate_x < 0.0 || candidate_x >= width || candidate_y < 0.0 || candidate_y >= height
        {
            return false;
        }
        let x = candidate_x.clamp(0.0, width - 1.0);
        let y = candidate_y.clamp(0.0, height - 1.0);
        if !self.terrain.is_land(x as u32, y as u32) {
            return false;
        }
        self.arena.agent_mut(index).position = Position::new(x, y);
        true
    }

    /// Linear scan over the registry: every other agent that is alive or
    /// still holds carcass calories, within `radius` of `origin`. Order is
    /// registry (creation) order. O(n) by design; the feeding rule's
    /// first-match semantics depend on the scan order.
    #[must_use]
    pub fn find_within_radius(&self, origin: AgentId, radius: f32) -> Vec<AgentId> {
        let Some(origin_index) = self.arena.index_of(origin) else {
            return Vec::new();
        };
        self.neighbor_indices(origin_index, radius)
            .into_iter()
            .map(|index| self.arena.handle_at(index))
            .collect()
    }

    fn neighbor_indices(&self, origin: usize, radius: f32) -> Vec<usize> {
        let origin_position = self.arena.agent(origin).position;
        let mut neighbors = Vec::new();
        for (index, agent) in self.arena.agents().iter().enumerate() {
            if index == origin {
                continue;
            }
            if !(agent.alive || agent.meat_calories > 0.0) {
                continue;
            }
            if origin_position.distance(agent.position) <= radius {
                neighbors.push(index);
            }
        }
        neighbors
    }
}
