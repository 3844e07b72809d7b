use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::coords::{CubeCoord, Direction};
use crate::types::Resource;

pub type HexId = u16;
pub type CornerId = u16;
pub type EdgeId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Harbor {
    /// 3:1 on every resource.
    Generic,
    /// 2:1 on one resource.
    Special(Resource),
}

impl Harbor {
    pub fn ratio(self) -> u8 {
        match self {
            Harbor::Generic => 3,
            Harbor::Special(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locality {
    Settlement { owner: usize },
    City { owner: usize },
}

impl Locality {
    pub fn owner(self) -> usize {
        match self {
            Locality::Settlement { owner } | Locality::City { owner } => owner,
        }
    }

    /// Resource cards produced per matching roll.
    pub fn yield_multiplier(self) -> u8 {
        match self {
            Locality::Settlement { .. } => 1,
            Locality::City { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hex {
    pub id: HexId,
    pub coord: CubeCoord,
    pub resource: Option<Resource>,
    pub number: Option<u8>,
    pub corners: [CornerId; 6],
    pub edges: [EdgeId; 6],
}

impl Hex {
    pub fn is_desert(&self) -> bool {
        self.resource.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corner {
    pub id: CornerId,
    pub hexes: SmallVec<[HexId; 3]>,
    pub neighbors: SmallVec<[CornerId; 3]>,
    pub edges: SmallVec<[EdgeId; 3]>,
    pub harbor: Option<Harbor>,
    pub locality: Option<Locality>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub corners: [CornerId; 2],
    pub hexes: SmallVec<[HexId; 2]>,
    pub harbor: Option<Harbor>,
    pub road: Option<usize>,
}

impl Edge {
    pub fn touches(&self, corner: CornerId) -> bool {
        self.corners.contains(&corner)
    }

    pub fn other_end(&self, corner: CornerId) -> Option<CornerId> {
        match self.corners {
            [a, b] if a == corner => Some(b),
            [a, b] if b == corner => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TileTemplate {
    Land,
    Port(Direction),
}

#[derive(Debug, Clone)]
pub struct MapTemplate {
    pub numbers: Vec<u8>,
    pub port_resources: Vec<Option<Resource>>,
    pub tile_resources: Vec<Option<Resource>>,
    pub topology: Vec<(CubeCoord, TileTemplate)>,
}

impl MapTemplate {
    pub fn base() -> &'static MapTemplate {
        &BASE_TEMPLATE
    }

    pub fn mini() -> &'static MapTemplate {
        &MINI_TEMPLATE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapType {
    #[default]
    Base,
    Tournament,
    Mini,
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MapType::Base => "BASE",
            MapType::Tournament => "TOURNAMENT",
            MapType::Mini => "MINI",
        };
        write!(f, "{label}")
    }
}

impl FromStr for MapType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Ok(MapType::Base),
            "tournament" => Ok(MapType::Tournament),
            "mini" => Ok(MapType::Mini),
            _ => Err(format!("unknown map type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MapShuffleOverrides<'a> {
    pub numbers: Option<&'a [u8]>,
    pub port_resources: Option<&'a [Option<Resource>]>,
    pub tile_resources: Option<&'a [Option<Resource>]>,
}

/// The fixed hex graph of one match plus the pieces standing on it.
///
/// Hexes, corners and edges live in dense arenas indexed by their ids.
/// Adjacency is computed once in [`Board::from_template`] and never changes;
/// only localities, roads and the robber move afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    hexes: Vec<Hex>,
    corners: Vec<Corner>,
    edges: Vec<Edge>,
    robber: HexId,
}

impl Board {
    pub fn build_with_rng(map_type: MapType, rng: &mut impl rand::Rng) -> Self {
        match map_type {
            MapType::Base => {
                Board::from_template(MapTemplate::base(), MapShuffleOverrides::default(), rng)
            }
            MapType::Mini => {
                Board::from_template(MapTemplate::mini(), MapShuffleOverrides::default(), rng)
            }
            MapType::Tournament => Board::from_template(
                MapTemplate::base(),
                MapShuffleOverrides {
                    numbers: Some(&TOURNAMENT_NUMBERS),
                    port_resources: Some(&TOURNAMENT_PORTS),
                    tile_resources: Some(&TOURNAMENT_TILES),
                },
                rng,
            ),
        }
    }

    pub fn from_template(
        template: &MapTemplate,
        overrides: MapShuffleOverrides<'_>,
        rng: &mut impl rand::Rng,
    ) -> Self {
        let mut numbers = shuffled_or_fixed(&template.numbers, overrides.numbers, rng);
        let mut tile_resources =
            shuffled_or_fixed(&template.tile_resources, overrides.tile_resources, rng);
        let mut port_resources =
            shuffled_or_fixed(&template.port_resources, overrides.port_resources, rng);

        let mut builder = GraphBuilder::default();
        for (coord, kind) in &template.topology {
            if let TileTemplate::Land = kind {
                let resource = tile_resources.pop().flatten();
                let number = resource.and_then(|_| numbers.pop());
                builder.add_hex(*coord, resource, number);
            }
        }
        for (coord, kind) in &template.topology {
            if let TileTemplate::Port(direction) = kind {
                let harbor = match port_resources.pop().flatten() {
                    Some(resource) => Harbor::Special(resource),
                    None => Harbor::Generic,
                };
                builder.attach_harbor(*coord, *direction, harbor);
            }
        }
        builder.finish()
    }

    pub fn hexes(&self) -> &[Hex] {
        &self.hexes
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn hex(&self, id: HexId) -> Option<&Hex> {
        self.hexes.get(id as usize)
    }

    pub fn corner(&self, id: CornerId) -> Option<&Corner> {
        self.corners.get(id as usize)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id as usize)
    }

    pub fn robber(&self) -> HexId {
        self.robber
    }

    pub fn locality_at(&self, corner: CornerId) -> Option<Locality> {
        self.corner(corner).and_then(|c| c.locality)
    }

    pub fn road_at(&self, edge: EdgeId) -> Option<usize> {
        self.edge(edge).and_then(|e| e.road)
    }

    /// Distinct owners of localities on the corners of `hex`.
    pub fn owners_around(&self, hex: HexId) -> Vec<usize> {
        let Some(hex) = self.hex(hex) else {
            return Vec::new();
        };
        let mut owners: Vec<usize> = hex
            .corners
            .iter()
            .filter_map(|corner| self.locality_at(*corner))
            .map(Locality::owner)
            .collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    }

    pub fn roads_of(&self, player: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |edge| edge.road == Some(player))
    }

    pub(crate) fn set_locality(&mut self, corner: CornerId, locality: Locality) {
        if let Some(slot) = self.corners.get_mut(corner as usize) {
            slot.locality = Some(locality);
        }
    }

    pub(crate) fn set_road(&mut self, edge: EdgeId, owner: usize) {
        if let Some(slot) = self.edges.get_mut(edge as usize) {
            slot.road = Some(owner);
        }
    }

    pub(crate) fn set_robber(&mut self, hex: HexId) {
        self.robber = hex;
    }
}

fn shuffled_or_fixed<T: Clone>(
    template: &[T],
    fixed: Option<&[T]>,
    rng: &mut impl rand::Rng,
) -> Vec<T> {
    match fixed {
        Some(values) => values.to_vec(),
        None => {
            let mut values = template.to_vec();
            values.shuffle(rng);
            values
        }
    }
}

/// Corners are keyed by the three hex positions meeting at them and edges by
/// the two hex positions they separate, so shared geometry collapses to one id
/// no matter which hex reaches it first.
#[derive(Default)]
struct GraphBuilder {
    hexes: Vec<Hex>,
    corners: Vec<Corner>,
    edges: Vec<Edge>,
    corner_keys: HashMap<[CubeCoord; 3], CornerId>,
    edge_keys: HashMap<[CubeCoord; 2], EdgeId>,
}

impl GraphBuilder {
    fn add_hex(&mut self, coord: CubeCoord, resource: Option<Resource>, number: Option<u8>) {
        let hex_id = self.hexes.len() as HexId;
        let mut corners = [0; 6];
        for (i, direction) in Direction::CLOCKWISE.iter().enumerate() {
            let mut key = [
                coord,
                coord.neighbor(*direction),
                coord.neighbor(direction.clockwise_next()),
            ];
            key.sort();
            let corner = self.corner_for(key);
            let slot = &mut self.corners[corner as usize];
            if !slot.hexes.contains(&hex_id) {
                slot.hexes.push(hex_id);
            }
            corners[i] = corner;
        }

        let mut edges = [0; 6];
        for (i, direction) in Direction::CLOCKWISE.iter().enumerate() {
            let mut key = [coord, coord.neighbor(*direction)];
            key.sort();
            let ends = [corners[(i + 5) % 6], corners[i]];
            let edge = self.edge_for(key, ends);
            let slot = &mut self.edges[edge as usize];
            if !slot.hexes.contains(&hex_id) {
                slot.hexes.push(hex_id);
            }
            edges[i] = edge;
        }

        self.hexes.push(Hex {
            id: hex_id,
            coord,
            resource,
            number,
            corners,
            edges,
        });
    }

    fn corner_for(&mut self, key: [CubeCoord; 3]) -> CornerId {
        if let Some(id) = self.corner_keys.get(&key) {
            return *id;
        }
        let id = self.corners.len() as CornerId;
        self.corners.push(Corner {
            id,
            hexes: SmallVec::new(),
            neighbors: SmallVec::new(),
            edges: SmallVec::new(),
            harbor: None,
            locality: None,
        });
        self.corner_keys.insert(key, id);
        id
    }

    fn edge_for(&mut self, key: [CubeCoord; 2], ends: [CornerId; 2]) -> EdgeId {
        if let Some(id) = self.edge_keys.get(&key) {
            return *id;
        }
        let id = self.edges.len() as EdgeId;
        self.edges.push(Edge {
            id,
            corners: ends,
            hexes: SmallVec::new(),
            harbor: None,
            road: None,
        });
        self.edge_keys.insert(key, id);
        let [a, b] = ends;
        self.corners[a as usize].edges.push(id);
        self.corners[a as usize].neighbors.push(b);
        self.corners[b as usize].edges.push(id);
        self.corners[b as usize].neighbors.push(a);
        id
    }

    /// A port tile faces `direction`; its harbor sits on the shared edge.
    fn attach_harbor(&mut self, port: CubeCoord, direction: Direction, harbor: Harbor) {
        let mut key = [port, port.neighbor(direction)];
        key.sort();
        let Some(&edge) = self.edge_keys.get(&key) else {
            tracing::warn!(?port, %direction, "port tile does not face land; skipping harbor");
            return;
        };
        let slot = &mut self.edges[edge as usize];
        slot.harbor = Some(harbor);
        let ends = slot.corners;
        for corner in ends {
            self.corners[corner as usize].harbor = Some(harbor);
        }
    }

    fn finish(self) -> Board {
        let robber = self
            .hexes
            .iter()
            .find(|hex| hex.is_desert())
            .map(|hex| hex.id)
            .unwrap_or(0);
        Board {
            hexes: self.hexes,
            corners: self.corners,
            edges: self.edges,
            robber,
        }
    }
}

static TOURNAMENT_NUMBERS: Lazy<Vec<u8>> =
    Lazy::new(|| vec![10, 8, 3, 6, 2, 5, 10, 8, 4, 11, 12, 9, 5, 4, 9, 11, 3, 6]);

static TOURNAMENT_PORTS: Lazy<Vec<Option<Resource>>> = Lazy::new(|| {
    vec![
        None,
        Some(Resource::Sheep),
        None,
        Some(Resource::Ore),
        Some(Resource::Wheat),
        None,
        Some(Resource::Wood),
        Some(Resource::Brick),
        None,
    ]
});

// Popped from the back, so the centre hex is the desert.
static TOURNAMENT_TILES: Lazy<Vec<Option<Resource>>> = Lazy::new(|| {
    vec![
        Some(Resource::Wood),
        Some(Resource::Sheep),
        Some(Resource::Sheep),
        Some(Resource::Wood),
        Some(Resource::Wheat),
        Some(Resource::Wood),
        Some(Resource::Wheat),
        Some(Resource::Brick),
        Some(Resource::Sheep),
        Some(Resource::Brick),
        Some(Resource::Sheep),
        Some(Resource::Wheat),
        Some(Resource::Wheat),
        Some(Resource::Ore),
        Some(Resource::Brick),
        Some(Resource::Ore),
        Some(Resource::Wood),
        Some(Resource::Ore),
        None,
    ]
});

static BASE_TEMPLATE: Lazy<MapTemplate> = Lazy::new(|| MapTemplate {
    numbers: vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12],
    port_resources: vec![
        Some(Resource::Wood),
        Some(Resource::Brick),
        Some(Resource::Sheep),
        Some(Resource::Wheat),
        Some(Resource::Ore),
        None,
        None,
        None,
        None,
    ],
    tile_resources: vec![
        Some(Resource::Wood),
        Some(Resource::Wood),
        Some(Resource::Wood),
        Some(Resource::Wood),
        Some(Resource::Brick),
        Some(Resource::Brick),
        Some(Resource::Brick),
        Some(Resource::Sheep),
        Some(Resource::Sheep),
        Some(Resource::Sheep),
        Some(Resource::Sheep),
        Some(Resource::Wheat),
        Some(Resource::Wheat),
        Some(Resource::Wheat),
        Some(Resource::Wheat),
        Some(Resource::Ore),
        Some(Resource::Ore),
        Some(Resource::Ore),
        None,
    ],
    topology: base_topology(),
});

static MINI_TEMPLATE: Lazy<MapTemplate> = Lazy::new(|| MapTemplate {
    numbers: vec![3, 4, 5, 6, 8, 9, 10],
    port_resources: vec![],
    tile_resources: vec![
        Some(Resource::Wood),
        None,
        Some(Resource::Brick),
        Some(Resource::Sheep),
        Some(Resource::Wheat),
        Some(Resource::Wheat),
        Some(Resource::Ore),
    ],
    topology: mini_topology(),
});

fn base_topology() -> Vec<(CubeCoord, TileTemplate)> {
    use TileTemplate::*;
    vec![
        (CubeCoord::new(0, 0, 0), Land),
        (CubeCoord::new(1, -1, 0), Land),
        (CubeCoord::new(0, -1, 1), Land),
        (CubeCoord::new(-1, 0, 1), Land),
        (CubeCoord::new(-1, 1, 0), Land),
        (CubeCoord::new(0, 1, -1), Land),
        (CubeCoord::new(1, 0, -1), Land),
        (CubeCoord::new(2, -2, 0), Land),
        (CubeCoord::new(1, -2, 1), Land),
        (CubeCoord::new(0, -2, 2), Land),
        (CubeCoord::new(-1, -1, 2), Land),
        (CubeCoord::new(-2, 0, 2), Land),
        (CubeCoord::new(-2, 1, 1), Land),
        (CubeCoord::new(-2, 2, 0), Land),
        (CubeCoord::new(-1, 2, -1), Land),
        (CubeCoord::new(0, 2, -2), Land),
        (CubeCoord::new(1, 1, -2), Land),
        (CubeCoord::new(2, 0, -2), Land),
        (CubeCoord::new(2, -1, -1), Land),
        (CubeCoord::new(3, -3, 0), Port(Direction::West)),
        (CubeCoord::new(1, -3, 2), Port(Direction::NorthWest)),
        (CubeCoord::new(-1, -2, 3), Port(Direction::NorthWest)),
        (CubeCoord::new(-3, 0, 3), Port(Direction::NorthEast)),
        (CubeCoord::new(-3, 2, 1), Port(Direction::East)),
        (CubeCoord::new(-2, 3, -1), Port(Direction::East)),
        (CubeCoord::new(0, 3, -3), Port(Direction::SouthEast)),
        (CubeCoord::new(2, 1, -3), Port(Direction::SouthWest)),
        (CubeCoord::new(3, -1, -2), Port(Direction::SouthWest)),
    ]
}

fn mini_topology() -> Vec<(CubeCoord, TileTemplate)> {
    use TileTemplate::*;
    vec![
        (CubeCoord::new(0, 0, 0), Land),
        (CubeCoord::new(1, -1, 0), Land),
        (CubeCoord::new(0, -1, 1), Land),
        (CubeCoord::new(-1, 0, 1), Land),
        (CubeCoord::new(-1, 1, 0), Land),
        (CubeCoord::new(0, 1, -1), Land),
        (CubeCoord::new(1, 0, -1), Land),
    ]
}
