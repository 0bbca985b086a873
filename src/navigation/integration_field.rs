//! An [IntegrationField] is a 2D array of cumulative costs to reach the
//! nearest seed tile, produced by a uniform-cost expansion over a chunk.
//!
//! All cells start at infinity. The seed tiles of the requested target are
//! set to `0` and queued, then the frontier is drained: for every popped
//! tile its 4-connected passable neighbours are relaxed with
//! `cost(tile) + cost_base(neighbour)`. Diagonals are never relaxed here -
//! they are recovered by the flow derivation, which may only pick a
//! diagonal when both of its shared-edge cardinals are reachable.
//!
//! Tiles holding dynamic occluders are priced at [COST_IMPASSABLE] rather
//! than skipped outright, so a faction-aware query can still walk through
//! enemy-only tiles at a steep price.
//!
//! The `build_nonpass` variant inverts the rules: it expands through any
//! tile but relaxes only impassable ones, which lets the island-recovery
//! planner flood cost through blocked terrain.
//!

use crate::prelude::*;

/// Integration cost of a tile that cannot be reached from any seed
pub const INTEGRATION_UNREACHABLE: f32 = f32::INFINITY;

/// Cumulative cost to the nearest seed tile, per tile of one chunk
#[derive(Clone)]
pub struct IntegrationField([[f32; FIELD_RES_C]; FIELD_RES_R]);

impl Default for IntegrationField {
	fn default() -> Self {
		IntegrationField([[INTEGRATION_UNREACHABLE; FIELD_RES_C]; FIELD_RES_R])
	}
}

impl Field<f32> for IntegrationField {
	/// Get a reference to the field array
	fn get(&self) -> &[[f32; FIELD_RES_C]; FIELD_RES_R] {
		&self.0
	}
	/// Retrieve a field cell value
	fn get_cell(&self, cell: FieldCell) -> f32 {
		self.0[cell.get_row()][cell.get_column()]
	}
	/// Set a field cell to a value
	fn set_cell(&mut self, value: f32, cell: FieldCell) {
		self.0[cell.get_row()][cell.get_column()] = value;
	}
}

impl IntegrationField {
	/// Zero the given seed cells and queue each on the frontier
	pub fn seed(&mut self, frontier: &mut Frontier, seeds: &[FieldCell]) {
		for seed in seeds {
			self.set_cell(0.0, *seed);
			frontier.push(0.0, *seed);
		}
	}
	/// Drain the frontier relaxing passable 4-connected neighbours. With
	/// `enemies` given, tiles occupied exclusively by those factions count
	/// as passable
	pub fn build(&mut self, frontier: &mut Frontier, chunk: &NavChunk, enemies: Option<FactionMask>) {
		while let Some(curr) = frontier.pop() {
			for (neighbour, cost) in passable_neighbours(chunk, curr, enemies) {
				let total = self.get_cell(curr) + cost as f32;
				if total < self.get_cell(neighbour) {
					self.set_cell(total, neighbour);
					if !frontier.contains(neighbour) {
						frontier.push(total, neighbour);
					}
				}
			}
		}
	}
	/// Drain the frontier expanding through any tile but relaxing only
	/// impassable neighbours, flooding cost through blocked terrain
	pub fn build_nonpass(&mut self, frontier: &mut Frontier, chunk: &NavChunk) {
		while let Some(curr) = frontier.pop() {
			for (neighbour, cost) in open_neighbours(chunk, curr) {
				if chunk.passable(neighbour) {
					continue;
				}
				let total = self.get_cell(curr) + cost as f32;
				if total < self.get_cell(neighbour) {
					self.set_cell(total, neighbour);
					if !frontier.contains(neighbour) {
						frontier.push(total, neighbour);
					}
				}
			}
		}
	}
}

/// Passable orthogonal neighbours of `cell` with their entry costs. A
/// neighbour holding dynamic occluders is priced at [COST_IMPASSABLE]
pub(crate) fn passable_neighbours(
	chunk: &NavChunk,
	cell: FieldCell,
	enemies: Option<FactionMask>,
) -> Vec<(FieldCell, u8)> {
	let mut neighbours = Vec::new();
	for n in cell.orthogonal_neighbours() {
		let passable = match enemies {
			Some(mask) => chunk.passable_for(n, mask),
			None => chunk.passable(n),
		};
		if !passable {
			continue;
		}
		let mut cost = chunk.cost_base(n);
		if chunk.blockers(n) > 0 {
			cost = COST_IMPASSABLE;
		}
		neighbours.push((n, cost));
	}
	neighbours
}

/// All orthogonal neighbours of `cell` with their entry costs, no
/// passability filter. A neighbour holding dynamic occluders is priced at
/// [COST_IMPASSABLE]
pub(crate) fn open_neighbours(chunk: &NavChunk, cell: FieldCell) -> Vec<(FieldCell, u8)> {
	let mut neighbours = Vec::new();
	for n in cell.orthogonal_neighbours() {
		let mut cost = chunk.cost_base(n);
		if chunk.blockers(n) > 0 {
			cost = COST_IMPASSABLE;
		}
		neighbours.push((n, cost));
	}
	neighbours
}
