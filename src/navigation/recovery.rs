//! Island recovery: fields that guide agents out of terrain they should
//! not be standing on. Dynamic blockers can strand an agent on an
//! impassable tile, or leave it on a different chunk-local island than its
//! goal; these passes build a flow that walks it back to sensible ground.
//!

use std::collections::VecDeque;

use crate::navigation::flow_field::flow_dir;
use crate::prelude::*;

/// All pathable tiles ringing the impassable island that `start` is part
/// of: a breadth-first walk through blocked tiles whose terminations are
/// the first passable tiles reached
pub fn passable_frontier(chunk: &NavChunk, start: FieldCell) -> Vec<FieldCell> {
	debug_assert!(!chunk.passable(start));
	let mut out = Vec::new();
	let mut visited = [[false; FIELD_RES_C]; FIELD_RES_R];
	let mut queue = VecDeque::new();
	queue.push_back(start);
	visited[start.get_row()][start.get_column()] = true;

	while let Some(curr) = queue.pop_front() {
		if chunk.passable(curr) {
			out.push(curr);
			continue;
		}
		for n in curr.orthogonal_neighbours() {
			if visited[n.get_row()][n.get_column()] {
				continue;
			}
			visited[n.get_row()][n.get_column()] = true;
			queue.push_back(n);
		}
	}
	out
}

/// Closest tiles of the requested chunk-local island to `target`, by a
/// breadth-first ring search bounded to the first Manhattan distance at
/// which any qualifying tile appears. Tiles must be standable, on the
/// given map-wide island (when one is named) and on the requested local
/// island
fn closest_tiles_local(
	chunk: &NavChunk,
	target: FieldCell,
	local_iid: u16,
	global_iid: u16,
) -> Vec<FieldCell> {
	let mut out = Vec::new();
	let mut visited = [[false; FIELD_RES_C]; FIELD_RES_R];
	let mut queue = VecDeque::new();
	queue.push_back(target);
	visited[target.get_row()][target.get_column()] = true;
	let mut first_dist: Option<i32> = None;

	while let Some(curr) = queue.pop_front() {
		for n in curr.orthogonal_neighbours() {
			if visited[n.get_row()][n.get_column()] {
				continue;
			}
			visited[n.get_row()][n.get_column()] = true;
			queue.push_back(n);
		}

		// rings expand in strictly increasing Manhattan distance, so the
		// first qualifying distance bounds the whole result set
		let dist = target.manhattan(curr);
		if let Some(first) = first_dist {
			if dist > first {
				break;
			}
		}
		if chunk.cost_base(curr) == COST_IMPASSABLE {
			continue;
		}
		if chunk.blockers(curr) > 0 {
			continue;
		}
		if global_iid != ISLAND_NONE && chunk.island(curr) != global_iid {
			continue;
		}
		if local_iid != ISLAND_NONE && chunk.local_island(curr) != local_iid {
			continue;
		}
		if first_dist.is_none() {
			first_dist = Some(dist);
		}
		out.push(curr);
	}
	out
}

/// Build a flow that leads an agent standing on blocked terrain to the
/// nearest pathable tile. The passable ring of the blocked island seeds
/// the integration, cost floods back through the blocked tiles only, and
/// every blocked tile receives a direction downhill towards the ring
pub fn flow_field_update_to_nearest_pathable(
	chunk: &NavChunk,
	start: FieldCell,
	flow: &mut FlowField,
) {
	let seeds = passable_frontier(chunk, start);

	let mut integration = IntegrationField::default();
	let mut frontier = Frontier::new();
	integration.seed(&mut frontier, &seeds);
	integration.build_nonpass(&mut frontier, chunk);

	for r in 0..FIELD_RES_R {
		for c in 0..FIELD_RES_C {
			let cell = FieldCell::new(r, c);
			let cost = integration.get_cell(cell);
			if cost == INTEGRATION_UNREACHABLE || cost == 0.0 {
				continue;
			}
			flow.set_cell(flow_dir(&integration, cell), cell);
		}
	}
}

/// Rebuild a flow for an agent whose goal lies on a different chunk-local
/// island: every natural seed is replaced by the closest tiles of the
/// agent's island, keeping only the globally minimal-distance set, and the
/// standard integration runs from those. A target that is completely
/// blocked off falls back to seeding regardless of blockers
#[allow(clippy::too_many_arguments)]
pub fn flow_field_update_island_to_nearest(
	local_iid: u16,
	world: &NavWorld,
	dims: &MapDimensions,
	layer: NavLayer,
	faction_id: Option<u8>,
	positions: &impl PositionQuery,
	factions: &impl FactionQuery,
	flow: &mut FlowField,
) {
	let chunk_coord = flow.get_chunk();
	let chunk = world.chunk(layer, chunk_coord);
	let enemies = faction_id.map(|f| factions.enemies_of(f));
	let target = flow.get_target();

	let mut seeds = initial_frontier(&target, chunk, dims, false, faction_id, positions, factions);
	if seeds.is_empty() {
		seeds = initial_frontier(&target, chunk, dims, true, faction_id, positions, factions);
	}

	// the replacement seed set may hold duplicates where rings from
	// different seeds meet; the integration pass tolerates them
	let mut min_dist = i32::MAX;
	let mut island_seeds: Vec<FieldCell> = Vec::new();
	for curr in seeds {
		let curr_giid = chunk.island(curr);
		let curr_liid = chunk.local_island(curr);

		if curr_liid == local_iid {
			if min_dist > 0 {
				island_seeds.clear();
			}
			min_dist = 0;
			island_seeds.push(curr);
			continue;
		}

		let closest = closest_tiles_local(chunk, curr, local_iid, curr_giid);
		let Some(first) = closest.first() else {
			continue;
		};
		let dist = first.manhattan(curr);
		if dist < min_dist {
			min_dist = dist;
			island_seeds.clear();
		}
		if dist > min_dist {
			continue;
		}
		island_seeds.extend(closest);
	}

	let mut integration = IntegrationField::default();
	let mut frontier = Frontier::new();
	integration.seed(&mut frontier, &island_seeds);
	integration.build(&mut frontier, chunk, enemies);
	flow.apply_integration(&integration);
	fixup(&target, &integration, flow, chunk);
}
