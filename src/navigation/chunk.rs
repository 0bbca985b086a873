//! Per-chunk navigation data read by the field builders. Each chunk of the
//! map carries a stack of tile layers: the static terrain cost, a count of
//! dynamic occluders, per-faction occupancy, and the connected-component
//! (island) ids used to reason about reachability. The field builders are
//! pure readers of this data.
//!

use crate::prelude::*;

/// Sentinel terrain cost marking a tile as impassable (a wall or cliff)
pub const COST_IMPASSABLE: u8 = u8::MAX;
/// Upper bound on the number of factions that can occupy tiles
pub const MAX_FACTIONS: usize = 16;
/// Sentinel marking a tile as belonging to no connected component
pub const ISLAND_NONE: u16 = u16::MAX;

/// Bitmask over faction ids, bit `i` set meaning faction `i`
pub type FactionMask = u16;

/// A rectangular span of tiles along a chunk edge joining two adjacent
/// chunks. Portals are immutable for the lifetime of their chunk and are
/// stored by value wherever they are referenced, so a target built from one
/// never dangles.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Portal {
	/// Chunk this portal belongs to
	chunk: ChunkCoord,
	/// Inclusive corner tiles of the span within the owning chunk
	endpoints: [FieldCell; 2],
	/// Chunk on the far side of the shared edge
	connected_chunk: ChunkCoord,
	/// Inclusive corner tiles of the connected span within the neighbour chunk
	connected_endpoints: [FieldCell; 2],
}

impl Portal {
	/// Create a new instance of [Portal]
	pub fn new(
		chunk: ChunkCoord,
		endpoints: [FieldCell; 2],
		connected_chunk: ChunkCoord,
		connected_endpoints: [FieldCell; 2],
	) -> Self {
		Portal {
			chunk,
			endpoints,
			connected_chunk,
			connected_endpoints,
		}
	}
	/// Get the chunk this portal belongs to
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Get the inclusive corner tiles of the span
	pub fn get_endpoints(&self) -> [FieldCell; 2] {
		self.endpoints
	}
	/// Get the chunk on the far side of the shared edge
	pub fn get_connected_chunk(&self) -> ChunkCoord {
		self.connected_chunk
	}
	/// Get the inclusive corner tiles of the connected span
	pub fn get_connected_endpoints(&self) -> [FieldCell; 2] {
		self.connected_endpoints
	}
}

/// One navigation layer's worth of data for a single chunk of the map
#[derive(Clone)]
pub struct NavChunk {
	/// Static terrain cost per tile, [COST_IMPASSABLE] marking walls
	cost_base: [[u8; FIELD_RES_C]; FIELD_RES_R],
	/// Count of dynamic occluders standing on each tile
	blockers: [[u8; FIELD_RES_C]; FIELD_RES_R],
	/// Faction occupancy per tile, one bit per faction id
	factions: [[FactionMask; FIELD_RES_C]; FIELD_RES_R],
	/// Map-wide connected-component id per tile
	islands: [[u16; FIELD_RES_C]; FIELD_RES_R],
	/// Chunk-local connected-component id per tile
	local_islands: [[u16; FIELD_RES_C]; FIELD_RES_R],
	/// Portals along this chunk's edges, fixed once the chunk is built
	portals: Vec<Portal>,
}

impl Default for NavChunk {
	fn default() -> Self {
		NavChunk {
			cost_base: [[1; FIELD_RES_C]; FIELD_RES_R],
			blockers: [[0; FIELD_RES_C]; FIELD_RES_R],
			factions: [[0; FIELD_RES_C]; FIELD_RES_R],
			islands: [[ISLAND_NONE; FIELD_RES_C]; FIELD_RES_R],
			local_islands: [[ISLAND_NONE; FIELD_RES_C]; FIELD_RES_R],
			portals: Vec::new(),
		}
	}
}

impl NavChunk {
	/// Get the terrain cost of a tile
	pub fn cost_base(&self, cell: FieldCell) -> u8 {
		self.cost_base[cell.get_row()][cell.get_column()]
	}
	/// Set the terrain cost of a tile
	pub fn set_cost_base(&mut self, value: u8, cell: FieldCell) {
		self.cost_base[cell.get_row()][cell.get_column()] = value;
	}
	/// Get the dynamic occluder count of a tile
	pub fn blockers(&self, cell: FieldCell) -> u8 {
		self.blockers[cell.get_row()][cell.get_column()]
	}
	/// Set the dynamic occluder count of a tile
	pub fn set_blockers(&mut self, value: u8, cell: FieldCell) {
		self.blockers[cell.get_row()][cell.get_column()] = value;
	}
	/// Get the faction occupancy mask of a tile
	pub fn factions(&self, cell: FieldCell) -> FactionMask {
		self.factions[cell.get_row()][cell.get_column()]
	}
	/// Set the faction occupancy mask of a tile
	pub fn set_factions(&mut self, mask: FactionMask, cell: FieldCell) {
		self.factions[cell.get_row()][cell.get_column()] = mask;
	}
	/// Get the map-wide island id of a tile
	pub fn island(&self, cell: FieldCell) -> u16 {
		self.islands[cell.get_row()][cell.get_column()]
	}
	/// Set the map-wide island id of a tile
	pub fn set_island(&mut self, value: u16, cell: FieldCell) {
		self.islands[cell.get_row()][cell.get_column()] = value;
	}
	/// Get the chunk-local island id of a tile
	pub fn local_island(&self, cell: FieldCell) -> u16 {
		self.local_islands[cell.get_row()][cell.get_column()]
	}
	/// Set the chunk-local island id of a tile
	pub fn set_local_island(&mut self, value: u16, cell: FieldCell) {
		self.local_islands[cell.get_row()][cell.get_column()] = value;
	}
	/// Get the portals along this chunk's edges
	pub fn portals(&self) -> &[Portal] {
		&self.portals
	}
	/// Record a portal along this chunk's edges. Portals must all be in
	/// place before any field is built over the chunk
	pub fn add_portal(&mut self, portal: Portal) {
		self.portals.push(portal);
	}
	/// Whether a tile can be walked over: impassable terrain always fails,
	/// and any dynamic occluder fails
	pub fn passable(&self, cell: FieldCell) -> bool {
		if self.cost_base(cell) == COST_IMPASSABLE {
			return false;
		}
		if self.blockers(cell) > 0 {
			return false;
		}
		true
	}
	/// Whether a tile can be walked over by a unit whose at-war factions are
	/// `enemies`. A tile occupied exclusively by enemy factions counts as
	/// passable so that combat units can close with enemy formations;
	/// otherwise dynamic occluders fail as usual
	pub fn passable_for(&self, cell: FieldCell, enemies: FactionMask) -> bool {
		if self.cost_base(cell) == COST_IMPASSABLE {
			return false;
		}
		let occupants = self.factions(cell);
		if occupants & !enemies == 0 {
			return true;
		}
		if self.blockers(cell) > 0 {
			return false;
		}
		true
	}
}
