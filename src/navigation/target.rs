//! Target selection: deriving the seed frontier a field propagates from.
//! A field request names a target - a tile, a portal span, a set of
//! portals, or "the enemies inside this chunk" - and the frontier is the
//! set of cost-zero tiles the integration pass expands outwards from.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// World-space padding applied to a chunk's bounds when querying for
/// enemy entities whose footprints may overhang the chunk edge
pub const SEARCH_BUFFER: f32 = 64.0;
/// Upper bound on entities considered by one chunk query
pub const MAX_ENTS_PER_CHUNK: usize = 4096;

/// Enemy-presence goal: every tile of the chunk occupied by a visible
/// at-war entity becomes a seed
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EnemiesTarget {
	/// Faction requesting the field; its at-war set defines "enemy"
	pub faction_id: u8,
	/// Chunk whose enemy-occupied tiles become seeds
	pub chunk: ChunkCoord,
}

/// What a flow field steers towards
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FieldTarget {
	/// A single tile in the chunk
	Tile(FieldCell),
	/// Every passable tile spanning a portal edge. The portal is held by
	/// value so the target outlives the chunk structure it was read from
	Portal(Portal),
	/// The union of the chunk's portals selected by bit index
	PortalMask(u64),
	/// Tiles occupied by visible at-war entities
	Enemies(EnemiesTarget),
}

/// Build the seed frontier for a target. An empty result is not an error:
/// it yields a valid, inert all-`None` flow field
pub fn initial_frontier(
	target: &FieldTarget,
	chunk: &NavChunk,
	dims: &MapDimensions,
	ignore_blockers: bool,
	faction_id: Option<u8>,
	positions: &impl PositionQuery,
	factions: &impl FactionQuery,
) -> Vec<FieldCell> {
	let enemies = faction_id.map(|f| factions.enemies_of(f));
	match target {
		FieldTarget::Tile(tile) => tile_frontier(*tile, chunk, ignore_blockers, enemies),
		FieldTarget::Portal(portal) => portal_frontier(portal, chunk, enemies),
		FieldTarget::PortalMask(mask) => portalmask_frontier(*mask, chunk, enemies),
		FieldTarget::Enemies(enemies_target) => {
			enemies_frontier(enemies_target, dims, positions, factions)
		}
	}
}

/// Frontier of a tile target: the tile itself when it can be stood on, or
/// unconditionally when blockers are ignored
fn tile_frontier(
	tile: FieldCell,
	chunk: &NavChunk,
	ignore_blockers: bool,
	enemies: Option<FactionMask>,
) -> Vec<FieldCell> {
	if ignore_blockers {
		return vec![tile];
	}
	let passable = match enemies {
		Some(mask) => chunk.passable_for(tile, mask),
		None => chunk.passable(tile),
	};
	if passable {
		vec![tile]
	} else {
		Vec::new()
	}
}

/// Frontier of a portal target: every passable tile of the span
fn portal_frontier(
	portal: &Portal,
	chunk: &NavChunk,
	enemies: Option<FactionMask>,
) -> Vec<FieldCell> {
	let [start, end] = portal.get_endpoints();
	let mut out = Vec::new();
	for r in start.get_row()..=end.get_row() {
		for c in start.get_column()..=end.get_column() {
			let cell = FieldCell::new(r, c);
			// portals only ever span walkable terrain
			debug_assert!(chunk.cost_base(cell) != COST_IMPASSABLE);
			let passable = match enemies {
				Some(mask) => chunk.passable_for(cell, mask),
				None => chunk.passable(cell),
			};
			if passable {
				out.push(cell);
			}
		}
	}
	out
}

/// Frontier of a portal-mask target: the union of the selected portals'
/// frontiers
fn portalmask_frontier(mask: u64, chunk: &NavChunk, enemies: Option<FactionMask>) -> Vec<FieldCell> {
	let mut out = Vec::new();
	for (i, portal) in chunk.portals().iter().enumerate() {
		if mask & (1u64 << i) == 0 {
			continue;
		}
		out.extend(portal_frontier(portal, chunk, enemies));
	}
	out
}

/// Whether an entity counts as an enemy worth steering towards: hostile
/// faction, able to fight, and not hidden by the fog of war
fn enemy_ent(
	faction_id: u8,
	enemies: FactionMask,
	ent: &EntityRecord,
	factions: &impl FactionQuery,
) -> bool {
	if ent.faction_id == faction_id {
		return false;
	}
	if !ent.flags.contains(EntityFlags::COMBATABLE) {
		return false;
	}
	debug_assert!((ent.faction_id as usize) < MAX_FACTIONS);
	if enemies & (1u16 << ent.faction_id) == 0 {
		return false;
	}
	if !factions.fog_visible(ent) {
		return false;
	}
	true
}

/// Frontier of an enemies target: query the position service over the
/// chunk's padded bounds, filter to visible at-war combatants, rasterise
/// each footprint (building OBB or selection circle) and seed the unique
/// touched tiles inside the chunk
fn enemies_frontier(
	target: &EnemiesTarget,
	dims: &MapDimensions,
	positions: &impl PositionQuery,
	factions: &impl FactionQuery,
) -> Vec<FieldCell> {
	let bounds = dims.chunk_bounds(target.chunk);
	let mut ents = positions.ents_in_rect(
		bounds.min - Vec2::splat(SEARCH_BUFFER),
		bounds.max + Vec2::splat(SEARCH_BUFFER),
	);
	ents.truncate(MAX_ENTS_PER_CHUNK);
	let enemies = factions.enemies_of(target.faction_id);

	let mut has_enemy = [[false; FIELD_RES_C]; FIELD_RES_R];
	for ent in &ents {
		if !enemy_ent(target.faction_id, enemies, ent, factions) {
			continue;
		}
		let tiles = match (ent.flags.contains(EntityFlags::BUILDING), ent.obb) {
			(true, Some(obb)) => dims.tiles_under_obb(&obb),
			_ => dims.tiles_under_circle(ent.pos, ent.selection_radius),
		};
		for tile in tiles {
			if tile.get_chunk() != target.chunk {
				continue;
			}
			has_enemy[tile.get_cell().get_row()][tile.get_cell().get_column()] = true;
		}
	}

	let mut out = Vec::new();
	for (r, row) in has_enemy.iter().enumerate() {
		for (c, occupied) in row.iter().enumerate() {
			if *occupied {
				out.push(FieldCell::new(r, c));
			}
		}
	}
	out
}

/// Post-pass over a freshly derived flow: portal targets have their seed
/// tiles pointed out across the chunk boundary so agents keep moving over
/// it instead of stalling on the cost-zero tiles
pub fn fixup(
	target: &FieldTarget,
	integration: &IntegrationField,
	flow: &mut FlowField,
	chunk: &NavChunk,
) {
	match target {
		FieldTarget::Portal(portal) => flow.fixup_portal_edges(integration, portal),
		FieldTarget::PortalMask(mask) => {
			for (i, portal) in chunk.portals().iter().enumerate() {
				if mask & (1u64 << i) == 0 {
					continue;
				}
				flow.fixup_portal_edges(integration, portal);
			}
		}
		_ => {}
	}
}
