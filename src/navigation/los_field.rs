//! A [LosField] records which tiles of a chunk have a straight, unobstructed
//! sight line to a target tile. Agents standing on a visible tile can walk
//! directly at the target instead of following the flow field, which removes
//! the grid-quantised wobble near the goal.
//!
//! The field is built as an expanding wavefront from the target. When the
//! wavefront touches a sight-blocking tile that forms a corner (blocked on
//! one side, clear on the opposite side along either axis) the corner casts
//! a shadow: a line is rasterised from the corner directly away from the
//! target until it leaves the chunk, and every tile it touches is flagged
//! as wavefront-blocked so visibility can never leak around the corner.
//!
//! Chunks other than the one containing the target inherit the shared-edge
//! tiles of the previously computed neighbour: blocked seam tiles re-cast
//! their shadows into the new chunk and visible seam tiles seed the new
//! wavefront, making the visibility set seamless across chunk borders. The
//! caller drives the chunk-to-chunk chain and may stop requesting fields at
//! any point.
//!
//! Finally the visible set is shrunk by one tile around every shadow so
//! that a tile is only marked visible when every point inside it can see
//! the target, a property the movement code relies on.
//!

use crate::prelude::*;

bitflags::bitflags! {
	/// Per-tile visibility state relative to the LOS target
	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	pub struct LosFlags: u8 {
		/// A straight sight line from the tile to the target is unobstructed
		const VISIBLE = 0b0000_0001;
		/// The tile lies in the shadow cast by a sight-blocking corner
		const WAVEFRONT_BLOCKED = 0b0000_0010;
	}
}

/// Per-tile visibility bits for one chunk relative to a target tile
#[derive(Clone)]
pub struct LosField {
	/// Chunk the visibility was computed for
	chunk: ChunkCoord,
	/// Visibility bits per tile
	field: [[LosFlags; FIELD_RES_C]; FIELD_RES_R],
}

impl Field<LosFlags> for LosField {
	/// Get a reference to the field array
	fn get(&self) -> &[[LosFlags; FIELD_RES_C]; FIELD_RES_R] {
		&self.field
	}
	/// Retrieve a field cell value
	fn get_cell(&self, cell: FieldCell) -> LosFlags {
		self.field[cell.get_row()][cell.get_column()]
	}
	/// Set a field cell to a value
	fn set_cell(&mut self, value: LosFlags, cell: FieldCell) {
		self.field[cell.get_row()][cell.get_column()] = value;
	}
}

impl LosField {
	/// Create an all-clear field for a chunk
	pub fn new(chunk: ChunkCoord) -> Self {
		LosField {
			chunk,
			field: [[LosFlags::empty(); FIELD_RES_C]; FIELD_RES_R],
		}
	}
	/// Get the chunk the visibility was computed for
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Clear every tile and rebind the field to a chunk
	pub fn reset(&mut self, chunk: ChunkCoord) {
		self.chunk = chunk;
		self.field = [[LosFlags::empty(); FIELD_RES_C]; FIELD_RES_R];
	}
	/// Whether the tile has an unobstructed sight line to the target
	pub fn visible(&self, cell: FieldCell) -> bool {
		self.get_cell(cell).contains(LosFlags::VISIBLE)
	}
	/// Whether the tile lies in a corner shadow
	pub fn wavefront_blocked(&self, cell: FieldCell) -> bool {
		self.get_cell(cell).contains(LosFlags::WAVEFRONT_BLOCKED)
	}
	/// Union flags into a tile
	fn insert_flags(&mut self, flags: LosFlags, cell: FieldCell) {
		self.field[cell.get_row()][cell.get_column()] |= flags;
	}
}

/// Build the [LosField] of one chunk for the destination described by
/// `dest`. For the chunk containing `target` the wavefront starts at the
/// target tile; for any other chunk `prev` must hold the already-computed
/// field of the adjacent chunk the sight line arrives through, and the
/// shared edge seeds the wavefront
#[allow(clippy::too_many_arguments)]
pub fn los_field_create(
	dest: DestId,
	chunk_coord: ChunkCoord,
	target: TileDesc,
	world: &NavWorld,
	dims: &MapDimensions,
	factions: &impl FactionQuery,
	out: &mut LosField,
	prev: Option<&LosField>,
) {
	let chunk = world.chunk(dest.layer(), chunk_coord);
	let enemies = dest.faction_id().map(|f| factions.enemies_of(f));
	out.reset(chunk_coord);

	let mut integration = IntegrationField::default();
	let mut frontier = Frontier::new();

	if chunk_coord == target.get_chunk() {
		// origin chunk: the wavefront starts at the target itself
		debug_assert!(prev.is_none());
		frontier.push(0.0, target.get_cell());
		integration.set_cell(0.0, target.get_cell());
	} else {
		// downstream chunk: carry the `visible` and `wavefront blocked`
		// flags over the shared edge. Blocked seam tiles re-cast their
		// shadow lines into this chunk and visible seam tiles seed the
		// frontier, keeping the LOS seamless across the border
		let Some(prev) = prev else {
			debug_assert!(false, "downstream chunk requires the neighbouring field");
			return;
		};
		seed_from_seam(prev, chunk_coord, target, dims, out, &mut frontier, &mut integration);
	}

	while let Some(curr) = frontier.pop() {
		for (neighbour, cost) in los_neighbours(chunk, out, curr, enemies) {
			if cost > 1 {
				// sight-blocking boundary; only corners cast shadows
				if !is_los_corner(chunk, neighbour) {
					continue;
				}
				create_wavefront_blocked_line(
					target,
					TileDesc::new(chunk_coord, neighbour),
					dims,
					out,
				);
			} else {
				out.insert_flags(LosFlags::VISIBLE, neighbour);
				let new_cost = integration.get_cell(curr) + 1.0;
				if new_cost < integration.get_cell(neighbour) {
					integration.set_cell(new_cost, neighbour);
					if !frontier.contains(neighbour) {
						frontier.push(new_cost, neighbour);
					}
				}
			}
		}
	}

	pad_wavefront(out);
}

/// Copy the shared-edge tiles of the neighbouring chunk's field into `out`,
/// re-casting shadow lines for blocked seam tiles and seeding the frontier
/// with visible ones
fn seed_from_seam(
	prev: &LosField,
	chunk_coord: ChunkCoord,
	target: TileDesc,
	dims: &MapDimensions,
	out: &mut LosField,
	frontier: &mut Frontier,
	integration: &mut IntegrationField,
) {
	let prev_chunk = prev.get_chunk();
	/// Seam orientation and the edge indices on either side of it
	struct Seam {
		/// Seam runs along a column (`true`) or a row (`false`)
		vertical: bool,
		/// Fixed row/column index of the seam in the chunk being built
		curr_edge: usize,
		/// Fixed row/column index of the seam in the neighbouring chunk
		prev_edge: usize,
	}
	let seam = if prev_chunk.get_row() < chunk_coord.get_row() {
		Seam {
			vertical: false,
			curr_edge: 0,
			prev_edge: FIELD_RES_R - 1,
		}
	} else if prev_chunk.get_row() > chunk_coord.get_row() {
		Seam {
			vertical: false,
			curr_edge: FIELD_RES_R - 1,
			prev_edge: 0,
		}
	} else if prev_chunk.get_column() < chunk_coord.get_column() {
		Seam {
			vertical: true,
			curr_edge: 0,
			prev_edge: FIELD_RES_C - 1,
		}
	} else if prev_chunk.get_column() > chunk_coord.get_column() {
		Seam {
			vertical: true,
			curr_edge: FIELD_RES_C - 1,
			prev_edge: 0,
		}
	} else {
		debug_assert!(false, "neighbouring field is not adjacent");
		return;
	};

	let span = if seam.vertical { FIELD_RES_R } else { FIELD_RES_C };
	for i in 0..span {
		let (curr_cell, prev_cell) = if seam.vertical {
			(
				FieldCell::new(i, seam.curr_edge),
				FieldCell::new(i, seam.prev_edge),
			)
		} else {
			(
				FieldCell::new(seam.curr_edge, i),
				FieldCell::new(seam.prev_edge, i),
			)
		};
		out.set_cell(prev.get_cell(prev_cell), curr_cell);
		if out.wavefront_blocked(curr_cell) {
			create_wavefront_blocked_line(
				target,
				TileDesc::new(chunk_coord, curr_cell),
				dims,
				out,
			);
		}
		if out.visible(curr_cell) {
			frontier.push(0.0, curr_cell);
			integration.set_cell(0.0, curr_cell);
		}
	}
}

/// Orthogonal neighbours of `cell` with their sight costs, skipping any
/// tile already lying in a shadow. Tiles that cannot be walked by the
/// querying faction are priced at [COST_IMPASSABLE]
fn los_neighbours(
	chunk: &NavChunk,
	los: &LosField,
	cell: FieldCell,
	enemies: Option<FactionMask>,
) -> Vec<(FieldCell, u8)> {
	let mut neighbours = Vec::new();
	for n in cell.orthogonal_neighbours() {
		if los.wavefront_blocked(n) {
			continue;
		}
		let passable = match enemies {
			Some(mask) => chunk.passable_for(n, mask),
			None => chunk.passable(n),
		};
		let cost = if passable {
			chunk.cost_base(n)
		} else {
			COST_IMPASSABLE
		};
		neighbours.push((n, cost));
	}
	neighbours
}

/// Whether a sight-blocking tile forms a corner: blocked on one side and
/// clear on the opposite side, along either axis
pub(crate) fn is_los_corner(chunk: &NavChunk, cell: FieldCell) -> bool {
	/// Whether the tile blocks sight outright
	fn blocked(chunk: &NavChunk, cell: FieldCell) -> bool {
		chunk.cost_base(cell) == COST_IMPASSABLE || chunk.blockers(cell) > 0
	}
	let r = cell.get_row();
	let c = cell.get_column();
	if r > 0 && r < FIELD_RES_R - 1 {
		let north = blocked(chunk, FieldCell::new(r - 1, c));
		let south = blocked(chunk, FieldCell::new(r + 1, c));
		if north ^ south {
			return true;
		}
	}
	if c > 0 && c < FIELD_RES_C - 1 {
		let west = blocked(chunk, FieldCell::new(r, c - 1));
		let east = blocked(chunk, FieldCell::new(r, c + 1));
		if west ^ east {
			return true;
		}
	}
	false
}

/// Flag the shadow a corner casts: rasterise a line starting at the corner
/// and extending directly away from the target until it leaves the chunk,
/// marking every touched tile as wavefront-blocked.
///
/// Bresenham is run on integer deltas obtained by scaling the normalised
/// slope by 1000, keeping 3 decimal digits of precision
pub(crate) fn create_wavefront_blocked_line(
	target: TileDesc,
	corner: TileDesc,
	dims: &MapDimensions,
	out: &mut LosField,
) {
	let target_centre = dims.tile_centre(target);
	let corner_centre = dims.tile_centre(corner);
	let away = corner_centre - target_centre;
	if away.length_squared() < f32::EPSILON {
		return;
	}
	let dir = away.normalize();

	let dx = (dir.x.abs() * 1000.0) as i32;
	let dy = -((dir.y.abs() * 1000.0) as i32);
	let step_c: i32 = if dir.x > 0.0 { 1 } else { -1 };
	let step_r: i32 = if dir.y > 0.0 { 1 } else { -1 };
	let mut err = dx + dy;

	let mut r = corner.get_cell().get_row() as i32;
	let mut c = corner.get_cell().get_column() as i32;
	loop {
		out.insert_flags(
			LosFlags::WAVEFRONT_BLOCKED,
			FieldCell::new(r as usize, c as usize),
		);
		let e2 = 2 * err;
		if e2 >= dy {
			err += dy;
			c += step_c;
		}
		if e2 <= dx {
			err += dx;
			r += step_r;
		}
		if r < 0 || r >= FIELD_RES_R as i32 || c < 0 || c >= FIELD_RES_C as i32 {
			break;
		}
	}
}

/// Clear visibility on every tile whose 3x3 neighbourhood holds a shadow
/// tile. A tile only stays visible when every point inside it can see the
/// target, which lets the movement code raycast from anywhere on the tile
pub(crate) fn pad_wavefront(out: &mut LosField) {
	for r in 0..FIELD_RES_R {
		for c in 0..FIELD_RES_C {
			if !out.wavefront_blocked(FieldCell::new(r, c)) {
				continue;
			}
			for rr in r.saturating_sub(1)..=(r + 1).min(FIELD_RES_R - 1) {
				for cc in c.saturating_sub(1)..=(c + 1).min(FIELD_RES_C - 1) {
					let cell = FieldCell::new(rr, cc);
					let flags = out.get_cell(cell) - LosFlags::VISIBLE;
					out.set_cell(flags, cell);
				}
			}
		}
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Faction stub where nobody is at war and everything is visible
	struct NoWars;
	impl FactionQuery for NoWars {
		fn enemies_of(&self, _faction_id: u8) -> FactionMask {
			0
		}
		fn fog_visible(&self, _ent: &EntityRecord) -> bool {
			true
		}
	}
	/// One-layer world of the given chunk grid with a mutation applied
	fn world_with(columns: u32, rows: u32, build: impl FnOnce(&mut NavChunk)) -> NavWorld {
		let mut world = NavWorld::new(columns, rows);
		world.add_layer(NavLayer::Ground);
		build(world.chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 0)));
		world
	}
	#[test]
	fn open_chunk_fully_visible() {
		let world = world_with(1, 1, |_| {});
		let dims = MapDimensions::new(1, 1, 1.0, bevy::math::Vec2::ZERO);
		let target = TileDesc::new(ChunkCoord::new(0, 0), FieldCell::new(4, 4));
		let dest = DestId::new(NavLayer::Ground, None, target);
		let mut los = LosField::new(ChunkCoord::new(0, 0));
		los_field_create(
			dest,
			ChunkCoord::new(0, 0),
			target,
			&world,
			&dims,
			&NoWars,
			&mut los,
			None,
		);
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = FieldCell::new(r, c);
				if cell == target.get_cell() {
					continue;
				}
				assert!(los.visible(cell), "{cell:?} should see the target");
			}
		}
	}
	#[test]
	fn corner_casts_shadow_and_padding_holds() {
		// a two-tile wall whose upper end forms a corner relative to the
		// target in the chunk's top-left
		let world = world_with(1, 1, |chunk| {
			chunk.set_cost_base(COST_IMPASSABLE, FieldCell::new(3, 3));
			chunk.set_cost_base(COST_IMPASSABLE, FieldCell::new(4, 3));
		});
		let dims = MapDimensions::new(1, 1, 1.0, bevy::math::Vec2::ZERO);
		let target = TileDesc::new(ChunkCoord::new(0, 0), FieldCell::new(0, 0));
		let dest = DestId::new(NavLayer::Ground, None, target);
		let mut los = LosField::new(ChunkCoord::new(0, 0));
		los_field_create(
			dest,
			ChunkCoord::new(0, 0),
			target,
			&world,
			&dims,
			&NoWars,
			&mut los,
			None,
		);
		// the shadow cone behind the wall holds blocked tiles
		let mut any_blocked = false;
		for r in 4..FIELD_RES_R {
			for c in 3..FIELD_RES_C {
				if los.wavefront_blocked(FieldCell::new(r, c)) {
					any_blocked = true;
				}
			}
		}
		assert!(any_blocked, "the corner cast no shadow");
		// padding: no visible tile touches a shadow tile
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				if !los.visible(FieldCell::new(r, c)) {
					continue;
				}
				for rr in r.saturating_sub(1)..=(r + 1).min(FIELD_RES_R - 1) {
					for cc in c.saturating_sub(1)..=(c + 1).min(FIELD_RES_C - 1) {
						assert!(
							!los.wavefront_blocked(FieldCell::new(rr, cc)),
							"visible tile ({r}, {c}) touches a shadow at ({rr}, {cc})"
						);
					}
				}
			}
		}
		// tiles well in front of the wall keep their sight line
		assert!(los.visible(FieldCell::new(0, 8)));
		assert!(los.visible(FieldCell::new(8, 0)));
	}
	#[test]
	fn shadow_lines_mirror_for_mirrored_corners() {
		let dims = MapDimensions::new(1, 1, 1.0, bevy::math::Vec2::ZERO);
		let chunk_coord = ChunkCoord::new(0, 0);
		let mid = FIELD_RES_C / 2;
		let target = TileDesc::new(chunk_coord, FieldCell::new(8, mid));

		// corners equidistant left and right of the target
		let east = TileDesc::new(chunk_coord, FieldCell::new(11, mid + 3));
		let west = TileDesc::new(chunk_coord, FieldCell::new(11, mid - 3));
		let mut los_east = LosField::new(chunk_coord);
		let mut los_west = LosField::new(chunk_coord);
		create_wavefront_blocked_line(target, east, &dims, &mut los_east);
		create_wavefront_blocked_line(target, west, &dims, &mut los_west);

		// the two shadow lines must be mirror images through the target column
		for r in 0..FIELD_RES_R {
			assert!(!los_east.wavefront_blocked(FieldCell::new(r, 0)));
			for c in 1..FIELD_RES_C {
				let mirrored = FieldCell::new(r, 2 * mid - c);
				assert_eq!(
					los_east.wavefront_blocked(FieldCell::new(r, c)),
					los_west.wavefront_blocked(mirrored),
					"asymmetric shadow at ({r}, {c})"
				);
			}
		}
	}
	#[test]
	fn downstream_chunk_inherits_seam() {
		let mut world = NavWorld::new(2, 1);
		world.add_layer(NavLayer::Ground);
		let dims = MapDimensions::new(2, 1, 1.0, bevy::math::Vec2::ZERO);
		let origin_chunk = ChunkCoord::new(0, 0);
		let next_chunk = ChunkCoord::new(0, 1);
		let target = TileDesc::new(origin_chunk, FieldCell::new(4, 4));
		let dest = DestId::new(NavLayer::Ground, None, target);

		let mut first = LosField::new(origin_chunk);
		los_field_create(
			dest,
			origin_chunk,
			target,
			&world,
			&dims,
			&NoWars,
			&mut first,
			None,
		);
		let mut second = LosField::new(next_chunk);
		los_field_create(
			dest,
			next_chunk,
			target,
			&world,
			&dims,
			&NoWars,
			&mut second,
			Some(&first),
		);
		// the shared edge flags carried over and the open chunk lit up
		for r in 0..FIELD_RES_R {
			assert_eq!(
				first.visible(FieldCell::new(r, FIELD_RES_C - 1)),
				second.visible(FieldCell::new(r, 0)),
			);
		}
		assert!(second.visible(FieldCell::new(4, 10)));
	}
}
