//! Map geometry and the spawnable bundle tying the navigation and region
//! components together
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The geometry of the map: how many chunks it spans, how large a tile is
/// in world units and where the minimum corner sits on the XZ plane.
/// Positions grow east along `x` (columns) and south along `z` (rows)
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct MapDimensions {
	/// Number of chunk columns
	chunk_columns: u32,
	/// Number of chunk rows
	chunk_rows: u32,
	/// World-space edge length of a single tile
	tile_size: f32,
	/// World-space position of the map's minimum corner
	origin: Vec2,
}

impl MapDimensions {
	/// Create a new instance of [MapDimensions]
	pub fn new(chunk_columns: u32, chunk_rows: u32, tile_size: f32, origin: Vec2) -> Self {
		if chunk_columns == 0 || chunk_rows == 0 {
			panic!("A map needs at least one chunk, got {chunk_columns}x{chunk_rows}");
		}
		if tile_size <= 0.0 {
			panic!("Tile size must be positive, got {tile_size}");
		}
		MapDimensions {
			chunk_columns,
			chunk_rows,
			tile_size,
			origin,
		}
	}
	/// Get the number of chunk columns
	pub fn get_chunk_columns(&self) -> u32 {
		self.chunk_columns
	}
	/// Get the number of chunk rows
	pub fn get_chunk_rows(&self) -> u32 {
		self.chunk_rows
	}
	/// Get the world-space edge length of a single tile
	pub fn get_tile_size(&self) -> f32 {
		self.tile_size
	}
	/// Get the world-space position of the map's minimum corner
	pub fn get_origin(&self) -> Vec2 {
		self.origin
	}
	/// World-space edge length of a chunk along `x`
	pub fn chunk_len_x(&self) -> f32 {
		FIELD_RES_C as f32 * self.tile_size
	}
	/// World-space edge length of a chunk along `z`
	pub fn chunk_len_z(&self) -> f32 {
		FIELD_RES_R as f32 * self.tile_size
	}
	/// Axis-aligned world bounds of a chunk
	pub fn chunk_bounds(&self, chunk: ChunkCoord) -> Rect {
		let min = self.origin
			+ Vec2::new(
				chunk.get_column() as f32 * self.chunk_len_x(),
				chunk.get_row() as f32 * self.chunk_len_z(),
			);
		Rect::from_corners(min, min + Vec2::new(self.chunk_len_x(), self.chunk_len_z()))
	}
	/// Axis-aligned world bounds of a tile
	pub fn tile_bounds(&self, tile: TileDesc) -> Rect {
		let (gz, gx) = self.global_indices(tile);
		let min = self.origin + Vec2::new(gx as f32, gz as f32) * self.tile_size;
		Rect::from_corners(min, min + Vec2::splat(self.tile_size))
	}
	/// World-space centre of a tile
	pub fn tile_centre(&self, tile: TileDesc) -> Vec2 {
		let (gz, gx) = self.global_indices(tile);
		self.origin + Vec2::new(gx as f32 + 0.5, gz as f32 + 0.5) * self.tile_size
	}
	/// The tile containing a world-space point, or [None] off the map
	pub fn tile_at(&self, point: Vec2) -> Option<TileDesc> {
		let local = (point - self.origin) / self.tile_size;
		if local.x < 0.0 || local.y < 0.0 {
			return None;
		}
		let gx = local.x as usize;
		let gz = local.y as usize;
		if gx >= (self.chunk_columns as usize) * FIELD_RES_C
			|| gz >= (self.chunk_rows as usize) * FIELD_RES_R
		{
			return None;
		}
		Some(self.tile_from_global(gz, gx))
	}
	/// The chunk containing a world-space point, or [None] off the map
	pub fn chunk_at(&self, point: Vec2) -> Option<ChunkCoord> {
		self.tile_at(point).map(|tile| tile.get_chunk())
	}
	/// Tiles whose bounds a circle footprint overlaps
	pub fn tiles_under_circle(&self, centre: Vec2, radius: f32) -> Vec<TileDesc> {
		let mut out = Vec::new();
		let pad = Vec2::splat(radius);
		for (gz, gx) in self.global_range(centre - pad, centre + pad) {
			let tile = self.tile_from_global(gz, gx);
			let bounds = self.tile_bounds(tile);
			let closest = centre.clamp(bounds.min, bounds.max);
			if closest.distance_squared(centre) <= radius * radius {
				out.push(tile);
			}
		}
		out
	}
	/// Tiles whose bounds an oriented-box footprint overlaps
	pub fn tiles_under_obb(&self, obb: &Obb2) -> Vec<TileDesc> {
		let corners = obb.corners();
		let mut min = corners[0];
		let mut max = corners[0];
		for corner in &corners[1..] {
			min = min.min(*corner);
			max = max.max(*corner);
		}
		let mut out = Vec::new();
		for (gz, gx) in self.global_range(min, max) {
			let tile = self.tile_from_global(gz, gx);
			if obb.overlaps_rect(self.tile_bounds(tile)) {
				out.push(tile);
			}
		}
		out
	}
	/// Map-global `(row, column)` tile indices of a tile
	fn global_indices(&self, tile: TileDesc) -> (usize, usize) {
		(
			tile.get_chunk().get_row() as usize * FIELD_RES_R + tile.get_cell().get_row(),
			tile.get_chunk().get_column() as usize * FIELD_RES_C + tile.get_cell().get_column(),
		)
	}
	/// Build a [TileDesc] from map-global tile indices
	fn tile_from_global(&self, gz: usize, gx: usize) -> TileDesc {
		TileDesc::new(
			ChunkCoord::new((gz / FIELD_RES_R) as u32, (gx / FIELD_RES_C) as u32),
			FieldCell::new(gz % FIELD_RES_R, gx % FIELD_RES_C),
		)
	}
	/// Iterate the map-global tile indices covered by a world-space
	/// rectangle, clamped to the map
	fn global_range(&self, min: Vec2, max: Vec2) -> impl Iterator<Item = (usize, usize)> {
		let local_min = (min - self.origin) / self.tile_size;
		let local_max = (max - self.origin) / self.tile_size;
		let last_gx = (self.chunk_columns as usize) * FIELD_RES_C - 1;
		let last_gz = (self.chunk_rows as usize) * FIELD_RES_R - 1;
		let gx_min = (local_min.x.floor().max(0.0) as usize).min(last_gx);
		let gz_min = (local_min.y.floor().max(0.0) as usize).min(last_gz);
		let gx_max = (local_max.x.floor().max(0.0) as usize).min(last_gx);
		let gz_max = (local_max.y.floor().max(0.0) as usize).min(last_gz);
		(gz_min..=gz_max).flat_map(move |gz| (gx_min..=gx_max).map(move |gx| (gz, gx)))
	}
}

/// Everything a game session spawns to navigate one map: the geometry,
/// the per-layer chunk grids, the flow-field cache and the region store
#[derive(Bundle)]
pub struct NavRegionBundle {
	/// Geometry of the map
	map_dimensions: MapDimensions,
	/// Per-layer navigation chunk grids
	nav_world: NavWorld,
	/// Cache of generated flow fields
	flow_cache: FlowFieldCache,
	/// Named region index
	region_store: RegionStore,
}

impl NavRegionBundle {
	/// Create a new instance of [NavRegionBundle] with the ground layer
	/// populated
	pub fn new(chunk_columns: u32, chunk_rows: u32, tile_size: f32, origin: Vec2) -> Self {
		let map_dimensions = MapDimensions::new(chunk_columns, chunk_rows, tile_size, origin);
		let mut nav_world = NavWorld::new(chunk_columns, chunk_rows);
		nav_world.add_layer(NavLayer::Ground);
		NavRegionBundle {
			map_dimensions,
			nav_world,
			flow_cache: FlowFieldCache::default(),
			region_store: RegionStore::new(map_dimensions),
		}
	}
}
