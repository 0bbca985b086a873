//! A [FlowField] is a 2D array of 8-way movement directions guiding agents
//! across one chunk towards a target. It is derived from an
//! [IntegrationField] by pointing every reachable tile at its
//! cheapest neighbour.
//!
//! Cardinal directions are preferred over diagonals on ties, and a diagonal
//! is only ever picked when both of the cardinal tiles sharing an edge with
//! it are themselves reachable - the flow must never steer an agent across
//! the corner of an impassable tile.
//!
//! Tiles left at infinite integration cost are not written at all: when a
//! chunk is split into several passable islands a planner may layer fields
//! for different islands into the same [FlowField], and untouched tiles
//! preserve the flow computed for the other islands.
//!

use std::collections::BTreeMap;

use crate::prelude::*;
use bevy::prelude::*;

/// The 8-way movement direction of a single tile, `None` marking a goal
/// tile or one with no derived flow
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Reflect)]
pub enum FlowDir {
	/// No movement, a goal tile or an untouched one
	#[default]
	None,
	North,
	NorthEast,
	East,
	SouthEast,
	South,
	SouthWest,
	West,
	NorthWest,
}

impl FlowDir {
	/// Unit (or diagonal-unit) vector of the direction on the XZ plane,
	/// north being negative `z` and east positive `x`
	pub fn unit_vector(self) -> Vec2 {
		/// Length of each diagonal component so the vector stays unit
		const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;
		match self {
			FlowDir::None => Vec2::new(0.0, 0.0),
			FlowDir::North => Vec2::new(0.0, -1.0),
			FlowDir::NorthEast => Vec2::new(DIAG, -DIAG),
			FlowDir::East => Vec2::new(1.0, 0.0),
			FlowDir::SouthEast => Vec2::new(DIAG, DIAG),
			FlowDir::South => Vec2::new(0.0, 1.0),
			FlowDir::SouthWest => Vec2::new(-DIAG, DIAG),
			FlowDir::West => Vec2::new(-1.0, 0.0),
			FlowDir::NorthWest => Vec2::new(-DIAG, -DIAG),
		}
	}
	/// Row/column step of the direction, rows growing southwards
	pub fn step(self) -> (i32, i32) {
		match self {
			FlowDir::None => (0, 0),
			FlowDir::North => (-1, 0),
			FlowDir::NorthEast => (-1, 1),
			FlowDir::East => (0, 1),
			FlowDir::SouthEast => (1, 1),
			FlowDir::South => (1, 0),
			FlowDir::SouthWest => (1, -1),
			FlowDir::West => (0, -1),
			FlowDir::NorthWest => (-1, -1),
		}
	}
}

/// Per-tile movement directions steering agents across one chunk towards
/// the stored target
#[derive(Clone)]
pub struct FlowField {
	/// Chunk this field steers across
	chunk: ChunkCoord,
	/// What the field guides agents towards
	target: FieldTarget,
	/// Movement direction per tile
	field: [[FlowDir; FIELD_RES_C]; FIELD_RES_R],
}

impl Field<FlowDir> for FlowField {
	/// Get a reference to the field array
	fn get(&self) -> &[[FlowDir; FIELD_RES_C]; FIELD_RES_R] {
		&self.field
	}
	/// Retrieve a field cell value
	fn get_cell(&self, cell: FieldCell) -> FlowDir {
		self.field[cell.get_row()][cell.get_column()]
	}
	/// Set a field cell to a value
	fn set_cell(&mut self, value: FlowDir, cell: FieldCell) {
		self.field[cell.get_row()][cell.get_column()] = value;
	}
}

impl FlowField {
	/// Create an inert all-`None` field for a chunk. This is a valid output
	/// in its own right: a request whose target has no reachable seed
	/// produces exactly this
	pub fn new(chunk: ChunkCoord) -> Self {
		FlowField {
			chunk,
			target: FieldTarget::Tile(FieldCell::new(0, 0)),
			field: [[FlowDir::None; FIELD_RES_C]; FIELD_RES_R],
		}
	}
	/// Get the chunk this field steers across
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Get the target the field guides agents towards
	pub fn get_target(&self) -> FieldTarget {
		self.target
	}
	/// Record the target the field guides agents towards
	pub fn set_target(&mut self, target: FieldTarget) {
		self.target = target;
	}
	/// Map the integration gradient to a direction per tile. Unreachable
	/// tiles are left untouched, seed tiles (cost `0`) become `None`
	pub fn apply_integration(&mut self, intf: &IntegrationField) {
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = FieldCell::new(r, c);
				let cost = intf.get_cell(cell);
				if cost == INTEGRATION_UNREACHABLE {
					continue;
				}
				if cost == 0.0 {
					self.set_cell(FlowDir::None, cell);
					continue;
				}
				self.set_cell(flow_dir(intf, cell), cell);
			}
		}
	}
	/// Rewrite every seed (cost `0`) tile to point out of the chunk across
	/// the portal edge, keeping agents moving over the boundary instead of
	/// stalling on the goal tiles
	pub fn fixup_portal_edges(&mut self, intf: &IntegrationField, portal: &Portal) {
		let own = portal.get_chunk();
		let other = portal.get_connected_chunk();
		let up = other.get_row() < own.get_row();
		let down = other.get_row() > own.get_row();
		let left = other.get_column() < own.get_column();
		let right = other.get_column() > own.get_column();
		debug_assert!(up ^ down ^ left ^ right);
		let dir = if up {
			FlowDir::North
		} else if down {
			FlowDir::South
		} else if left {
			FlowDir::West
		} else {
			FlowDir::East
		};
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = FieldCell::new(r, c);
				if intf.get_cell(cell) == 0.0 {
					self.set_cell(dir, cell);
				}
			}
		}
	}
}

/// Direction from `cell` to its minimum-cost neighbour. Cardinals win ties
/// over diagonals and a diagonal is only admissible when both of its
/// shared-edge cardinals are reachable. The caller guarantees `cell` has a
/// finite non-zero cost, so a finite neighbour exists by construction
pub(crate) fn flow_dir(intf: &IntegrationField, cell: FieldCell) -> FlowDir {
	let r = cell.get_row();
	let c = cell.get_column();
	let f = intf.get();

	let mut min_cost = INTEGRATION_UNREACHABLE;
	if r > 0 {
		min_cost = min_cost.min(f[r - 1][c]);
	}
	if r < FIELD_RES_R - 1 {
		min_cost = min_cost.min(f[r + 1][c]);
	}
	if c > 0 {
		min_cost = min_cost.min(f[r][c - 1]);
	}
	if c < FIELD_RES_C - 1 {
		min_cost = min_cost.min(f[r][c + 1]);
	}

	// Diagonal candidates only count when both side tiles sharing an edge
	// with the corner tile are reachable, so the flow never steers from a
	// passable region into an impassable one
	let nw_ok = r > 0 && c > 0 && f[r - 1][c].is_finite() && f[r][c - 1].is_finite();
	let ne_ok =
		r > 0 && c < FIELD_RES_C - 1 && f[r - 1][c].is_finite() && f[r][c + 1].is_finite();
	let sw_ok =
		r < FIELD_RES_R - 1 && c > 0 && f[r + 1][c].is_finite() && f[r][c - 1].is_finite();
	let se_ok = r < FIELD_RES_R - 1
		&& c < FIELD_RES_C - 1
		&& f[r + 1][c].is_finite()
		&& f[r][c + 1].is_finite();

	if nw_ok {
		min_cost = min_cost.min(f[r - 1][c - 1]);
	}
	if ne_ok {
		min_cost = min_cost.min(f[r - 1][c + 1]);
	}
	if sw_ok {
		min_cost = min_cost.min(f[r + 1][c - 1]);
	}
	if se_ok {
		min_cost = min_cost.min(f[r + 1][c + 1]);
	}

	debug_assert!(min_cost < INTEGRATION_UNREACHABLE);

	// Prioritise the cardinal directions over the diagonal ones
	if r > 0 && f[r - 1][c] == min_cost {
		FlowDir::North
	} else if r < FIELD_RES_R - 1 && f[r + 1][c] == min_cost {
		FlowDir::South
	} else if c < FIELD_RES_C - 1 && f[r][c + 1] == min_cost {
		FlowDir::East
	} else if c > 0 && f[r][c - 1] == min_cost {
		FlowDir::West
	} else if nw_ok && f[r - 1][c - 1] == min_cost {
		FlowDir::NorthWest
	} else if ne_ok && f[r - 1][c + 1] == min_cost {
		FlowDir::NorthEast
	} else if sw_ok && f[r + 1][c - 1] == min_cost {
		FlowDir::SouthWest
	} else if se_ok && f[r + 1][c + 1] == min_cost {
		FlowDir::SouthEast
	} else {
		debug_assert!(false, "no neighbour carries the minimum cost");
		FlowDir::None
	}
}

/// Compute a [FlowField] over one chunk for the given target. The seed
/// frontier is derived from the target, costs are propagated outwards and
/// the gradient mapped to directions; portal targets then have their seed
/// tiles pointed across the chunk boundary. An unreachable target yields an
/// untouched (inert) field
#[allow(clippy::too_many_arguments)]
pub fn flow_field_update(
	chunk_coord: ChunkCoord,
	world: &NavWorld,
	dims: &MapDimensions,
	layer: NavLayer,
	faction_id: Option<u8>,
	target: FieldTarget,
	positions: &impl PositionQuery,
	factions: &impl FactionQuery,
	flow: &mut FlowField,
) {
	let chunk = world.chunk(layer, chunk_coord);
	let enemies = faction_id.map(|f| factions.enemies_of(f));
	let seeds = initial_frontier(&target, chunk, dims, false, faction_id, positions, factions);

	let mut integration = IntegrationField::default();
	let mut frontier = Frontier::new();
	integration.seed(&mut frontier, &seeds);

	flow.set_target(target);
	integration.build(&mut frontier, chunk, enemies);
	flow.apply_integration(&integration);
	fixup(&target, &integration, flow, chunk);
}

/// Each generated [FlowField] is placed into this cache so that multiple
/// actors can read from the same dataset. Entries are keyed by the
/// deterministic [FlowFieldId] of their `(chunk, target, layer)` request
#[derive(Component, Default)]
pub struct FlowFieldCache(BTreeMap<FlowFieldId, FlowField>);

impl FlowFieldCache {
	/// Get a [FlowField] by its id. Returns [None] if the cache doesn't
	/// contain a record
	pub fn get_field(&self, id: FlowFieldId) -> Option<&FlowField> {
		self.0.get(&id)
	}
	/// Insert a [FlowField] into the cache
	pub fn insert_field(&mut self, id: FlowFieldId, field: FlowField) {
		self.0.insert(id, field);
	}
	/// Remove a [FlowField] from the cache (when chunk data changed under it)
	pub fn remove_field(&mut self, id: FlowFieldId) {
		self.0.remove(&id);
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Write a hand-crafted cost into the neighbours of (4, 4)
	fn craft(values: &[(FieldCell, f32)]) -> IntegrationField {
		let mut intf = IntegrationField::default();
		for (cell, cost) in values {
			intf.set_cell(*cost, *cell);
		}
		intf
	}
	#[test]
	fn cardinal_wins_tie_in_fixed_order() {
		let intf = craft(&[
			(FieldCell::new(4, 4), 6.0),
			(FieldCell::new(3, 4), 5.0), // north
			(FieldCell::new(5, 4), 5.0), // south
			(FieldCell::new(4, 5), 5.0), // east
			(FieldCell::new(4, 3), 5.0), // west
			(FieldCell::new(5, 5), 5.0), // south-east
		]);
		assert_eq!(FlowDir::North, flow_dir(&intf, FieldCell::new(4, 4)));
	}
	#[test]
	fn south_beats_east_and_diagonals() {
		let intf = craft(&[
			(FieldCell::new(4, 4), 6.0),
			(FieldCell::new(3, 4), 7.0), // north
			(FieldCell::new(5, 4), 5.0), // south
			(FieldCell::new(4, 5), 5.0), // east
			(FieldCell::new(4, 3), 7.0), // west
			(FieldCell::new(5, 5), 5.0), // south-east
		]);
		assert_eq!(FlowDir::South, flow_dir(&intf, FieldCell::new(4, 4)));
	}
	#[test]
	fn diagonal_chosen_when_strictly_cheaper() {
		let intf = craft(&[
			(FieldCell::new(4, 4), 6.0),
			(FieldCell::new(3, 4), 7.0),
			(FieldCell::new(5, 4), 7.0), // south, reachable
			(FieldCell::new(4, 5), 7.0), // east, reachable
			(FieldCell::new(4, 3), 7.0),
			(FieldCell::new(5, 5), 5.0), // south-east
		]);
		assert_eq!(FlowDir::SouthEast, flow_dir(&intf, FieldCell::new(4, 4)));
	}
	#[test]
	fn corner_cut_rejected() {
		// south-east is the cheapest tile but south is unreachable, the
		// flow must not cut the corner
		let intf = craft(&[
			(FieldCell::new(4, 4), 6.0),
			(FieldCell::new(3, 4), 9.0), // north
			(FieldCell::new(4, 5), 7.0), // east
			(FieldCell::new(4, 3), 9.0), // west
			(FieldCell::new(5, 5), 1.0), // south-east, inadmissible
		]);
		assert_eq!(FlowDir::East, flow_dir(&intf, FieldCell::new(4, 4)));
	}
	#[test]
	fn seeds_become_none_and_unreachable_untouched() {
		let chunk = NavChunk::default();
		let seed = FieldCell::new(2, 2);
		let mut intf = IntegrationField::default();
		let mut frontier = Frontier::new();
		intf.seed(&mut frontier, &[seed]);
		intf.build(&mut frontier, &chunk, None);

		let mut flow = FlowField::new(ChunkCoord::new(0, 0));
		flow.apply_integration(&intf);
		assert_eq!(FlowDir::None, flow.get_cell(seed));
		// every other tile received a direction
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = FieldCell::new(r, c);
				if cell != seed {
					assert_ne!(FlowDir::None, flow.get_cell(cell));
				}
			}
		}
	}
	#[test]
	fn unreachable_tiles_preserve_previous_flow() {
		let mut chunk = NavChunk::default();
		// wall off the column 0 strip so it is unreachable from (4, 4)
		for r in 0..FIELD_RES_R {
			chunk.set_cost_base(COST_IMPASSABLE, FieldCell::new(r, 1));
		}
		let mut intf = IntegrationField::default();
		let mut frontier = Frontier::new();
		intf.seed(&mut frontier, &[FieldCell::new(4, 4)]);
		intf.build(&mut frontier, &chunk, None);

		let mut flow = FlowField::new(ChunkCoord::new(0, 0));
		flow.set_cell(FlowDir::South, FieldCell::new(3, 0));
		flow.apply_integration(&intf);
		// the walled-off island keeps the flow a previous pass gave it
		assert_eq!(FlowDir::South, flow.get_cell(FieldCell::new(3, 0)));
	}
	#[test]
	fn gradient_descends_to_seed() {
		let mut chunk = NavChunk::default();
		// wall spanning columns 0..=3 on row 4
		for c in 0..4 {
			chunk.set_cost_base(COST_IMPASSABLE, FieldCell::new(4, c));
		}
		let seed = FieldCell::new(7, 0);
		let mut intf = IntegrationField::default();
		let mut frontier = Frontier::new();
		intf.seed(&mut frontier, &[seed]);
		intf.build(&mut frontier, &chunk, None);
		let mut flow = FlowField::new(ChunkCoord::new(0, 0));
		flow.apply_integration(&intf);

		// follow the flow from above the wall, asserting strictly
		// non-increasing integration cost and arrival at the seed
		let mut cell = FieldCell::new(0, 0);
		let mut steps = 0;
		while cell != seed {
			let dir = flow.get_cell(cell);
			assert_ne!(FlowDir::None, dir);
			let (dr, dc) = dir.step();
			let next = FieldCell::new(
				(cell.get_row() as i32 + dr) as usize,
				(cell.get_column() as i32 + dc) as usize,
			);
			assert!(chunk.passable(next), "flow points into the wall at {cell:?}");
			assert!(intf.get_cell(next) < intf.get_cell(cell));
			cell = next;
			steps += 1;
			assert!(steps < FIELD_RES_R * FIELD_RES_C, "flow does not terminate");
		}
	}
	#[test]
	fn portal_fixup_points_over_the_edge() {
		let portal = Portal::new(
			ChunkCoord::new(0, 0),
			[
				FieldCell::new(0, FIELD_RES_C - 1),
				FieldCell::new(3, FIELD_RES_C - 1),
			],
			ChunkCoord::new(0, 1),
			[FieldCell::new(0, 0), FieldCell::new(3, 0)],
		);
		let chunk = NavChunk::default();
		let seeds: Vec<FieldCell> = (0..4).map(|r| FieldCell::new(r, FIELD_RES_C - 1)).collect();
		let mut intf = IntegrationField::default();
		let mut frontier = Frontier::new();
		intf.seed(&mut frontier, &seeds);
		intf.build(&mut frontier, &chunk, None);
		let mut flow = FlowField::new(ChunkCoord::new(0, 0));
		flow.apply_integration(&intf);
		flow.fixup_portal_edges(&intf, &portal);
		for seed in seeds {
			assert_eq!(FlowDir::East, flow.get_cell(seed));
		}
	}
}
