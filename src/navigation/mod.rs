//! Flow-field navigation over a chunked tile map.
//!
//! The map is divided into fixed-size chunks of `FIELD_RES_R x FIELD_RES_C`
//! tiles, and each chunk carries several layers of navigation data
//! ([NavChunk]) plus the derived fields: an [IntegrationField] of
//! cumulative costs, a [FlowField] of per-tile movement directions and a
//! [LosField] of per-tile visibility towards a target. A higher-level
//! planner decides which `(chunk, target)` pairs need fields; this module
//! computes them.
//!
//! ## Useful definitions
//!
//! * Chunk - a fixed-size rectangular tile block, the unit of caching for
//!   flow and LOS fields
//! * Integration field - per-tile scalar cost to the nearest seed tile,
//!   produced by uniform-cost expansion
//! * Flow field - per-tile 8-way direction guiding agents towards a
//!   target, derived from the integration gradient
//! * LOS field - per-tile visibility bits relative to a target; agents on
//!   a visible tile abandon the grid and walk straight at the goal
//! * Portal - a span of edge tiles joining two adjacent chunks; portal
//!   targets keep agents flowing over chunk boundaries
//! * Island - a connected component of walkable tiles, map-wide
//!   (`islands`) or within a single chunk (`local_islands`)
//! * Wavefront blocker - a tile inside the shadow cast by an impassable
//!   corner relative to the LOS target
//!
//! ## Construction flow
//!
//! A field request names a chunk, a layer, an optional faction and a
//! [FieldTarget]. The target is turned into a seed frontier of cost-zero
//! tiles, the integration pass propagates costs outwards over the chunk,
//! and the flow derivation points every reachable tile at its cheapest
//! neighbour. Requests for adjacent chunks chain LOS fields by seeding
//! each from the previous chunk's shared edge.
//!
//! Field construction runs on worker tasks and only ever reads chunk
//! data; the scheduler guarantees chunk state is not mutated while a
//! batch of builds is in flight. Per-request scratch space is a pair of
//! `FIELD_RES_R x FIELD_RES_C` arrays plus the entity list of an enemies
//! query, so workers need either a generous stack or heap-backed buffers.
//!

pub mod chunk;
pub mod flow_field;
pub mod frontier;
pub mod integration_field;
pub mod los_field;
pub mod recovery;
pub mod target;
pub mod utilities;

use std::collections::BTreeMap;

use crate::prelude::*;
use bevy::prelude::*;

/// The navigation layers a map carries, one chunk grid per layer. The
/// 4-bit layer nibble of [FlowFieldId] bounds this to 16 variants
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
#[repr(u8)]
pub enum NavLayer {
	/// Land-bound movement
	#[default]
	Ground = 0,
	/// Water-bound movement
	Water = 1,
	/// Movement over both land and water
	Amphibious = 2,
}

impl NavLayer {
	/// Decode a layer nibble stored in an id
	fn from_bits(bits: u64) -> NavLayer {
		match bits {
			0 => NavLayer::Ground,
			1 => NavLayer::Water,
			2 => NavLayer::Amphibious,
			_ => {
				debug_assert!(false, "unknown layer bits {bits}");
				NavLayer::Ground
			}
		}
	}
}

/// The navigation state of the whole map: a dense row-major grid of
/// [NavChunk] per populated layer. Field builders borrow this read-only
#[derive(Component)]
pub struct NavWorld {
	/// Number of chunk columns in the grid
	columns: u32,
	/// Number of chunk rows in the grid
	rows: u32,
	/// Chunk grids per navigation layer
	layers: BTreeMap<NavLayer, Vec<NavChunk>>,
}

impl NavWorld {
	/// Create a new instance of [NavWorld] with no layers populated
	pub fn new(columns: u32, rows: u32) -> Self {
		if columns == 0 || rows == 0 {
			panic!("A NavWorld needs at least one chunk, got {columns}x{rows}");
		}
		NavWorld {
			columns,
			rows,
			layers: BTreeMap::new(),
		}
	}
	/// Get the number of chunk columns
	pub fn get_columns(&self) -> u32 {
		self.columns
	}
	/// Get the number of chunk rows
	pub fn get_rows(&self) -> u32 {
		self.rows
	}
	/// Populate a layer with default chunks
	pub fn add_layer(&mut self, layer: NavLayer) {
		let count = (self.columns * self.rows) as usize;
		self.layers
			.insert(layer, (0..count).map(|_| NavChunk::default()).collect());
	}
	/// Get a chunk of a layer
	///
	/// NB: this will panic on an unpopulated layer or an out-of-bounds
	/// coordinate
	pub fn chunk(&self, layer: NavLayer, coord: ChunkCoord) -> &NavChunk {
		let Some(chunks) = self.layers.get(&layer) else {
			panic!("Layer {layer:?} has not been populated");
		};
		&chunks[(coord.get_row() * self.columns + coord.get_column()) as usize]
	}
	/// Get a mutable chunk of a layer
	///
	/// NB: this will panic on an unpopulated layer or an out-of-bounds
	/// coordinate
	pub fn chunk_mut(&mut self, layer: NavLayer, coord: ChunkCoord) -> &mut NavChunk {
		let Some(chunks) = self.layers.get_mut(&layer) else {
			panic!("Layer {layer:?} has not been populated");
		};
		&mut chunks[(coord.get_row() * self.columns + coord.get_column()) as usize]
	}
}

/// Deterministic 64-bit key of a `(chunk, target, layer)` field request,
/// packed as `{layer:4 | kind:4 | payload:40 | chunk_r:8 | chunk_c:8}`
/// where the payload is the portal endpoints, the target tile or the
/// requesting faction. Identical requests produce identical ids, which is
/// what makes the [FlowFieldCache] work
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct FlowFieldId(u64);

impl FlowFieldId {
	/// Compute the id of a field request.
	///
	/// NB: portal-mask targets are transient combinations that are never
	/// cached; asking for their id is a programming error and panics
	pub fn new(chunk: ChunkCoord, target: &FieldTarget, layer: NavLayer) -> Self {
		debug_assert!(chunk.get_row() < 256 && chunk.get_column() < 256);
		let header = ((layer as u64) << 60) | (target_kind(target) << 56);
		let chunk_bits = ((chunk.get_row() as u64) << 8) | (chunk.get_column() as u64);
		let payload = match target {
			FieldTarget::Portal(portal) => {
				let [start, end] = portal.get_endpoints();
				((start.get_row() as u64) << 40)
					| ((start.get_column() as u64) << 32)
					| ((end.get_row() as u64) << 24)
					| ((end.get_column() as u64) << 16)
			}
			FieldTarget::Tile(tile) => {
				((tile.get_row() as u64) << 24) | ((tile.get_column() as u64) << 16)
			}
			FieldTarget::Enemies(enemies) => (enemies.faction_id as u64) << 24,
			FieldTarget::PortalMask(_) => {
				panic!("Portal-mask fields are transient and never cached")
			}
		};
		FlowFieldId(header | payload | chunk_bits)
	}
	/// Get the layer the field was requested for
	pub fn layer(&self) -> NavLayer {
		NavLayer::from_bits(self.0 >> 60)
	}
	/// Get the raw packed bits
	pub fn to_bits(&self) -> u64 {
		self.0
	}
}

/// Discriminant nibble of a target kind within a [FlowFieldId]
fn target_kind(target: &FieldTarget) -> u64 {
	match target {
		FieldTarget::Tile(_) => 0,
		FieldTarget::Portal(_) => 1,
		FieldTarget::Enemies(_) => 2,
		FieldTarget::PortalMask(_) => 3,
	}
}

/// Identifies a movement destination: the layer and faction of the
/// request plus the goal tile. LOS chains read their faction and layer
/// back out of this id, packed as
/// `{layer:4 | faction:8 | chunk_r:8 | chunk_c:8 | tile_r:8 | tile_c:8}`
/// with `0xFF` standing in for "no faction"
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct DestId(u64);

impl DestId {
	/// Compute the id of a destination
	pub fn new(layer: NavLayer, faction_id: Option<u8>, target: TileDesc) -> Self {
		debug_assert!(target.get_chunk().get_row() < 256 && target.get_chunk().get_column() < 256);
		debug_assert!(faction_id.map_or(true, |f| (f as usize) < MAX_FACTIONS));
		let faction_bits = faction_id.map_or(0xFF, |f| f as u64);
		DestId(
			((layer as u64) << 40)
				| (faction_bits << 32)
				| ((target.get_chunk().get_row() as u64) << 24)
				| ((target.get_chunk().get_column() as u64) << 16)
				| ((target.get_cell().get_row() as u64) << 8)
				| (target.get_cell().get_column() as u64),
		)
	}
	/// Get the layer of the destination
	pub fn layer(&self) -> NavLayer {
		NavLayer::from_bits((self.0 >> 40) & 0xF)
	}
	/// Get the faction that requested the destination
	pub fn faction_id(&self) -> Option<u8> {
		match (self.0 >> 32) & 0xFF {
			0xFF => None,
			f => Some(f as u8),
		}
	}
	/// Get the goal tile of the destination
	pub fn target(&self) -> TileDesc {
		TileDesc::new(
			ChunkCoord::new(((self.0 >> 24) & 0xFF) as u32, ((self.0 >> 16) & 0xFF) as u32),
			FieldCell::new(((self.0 >> 8) & 0xFF) as usize, (self.0 & 0xFF) as usize),
		)
	}
}
