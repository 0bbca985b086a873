//! Coordinate primitives and field-array access shared by the navigation layers
//!

use bevy::prelude::*;

/// Number of tile rows in every chunk field array
pub const FIELD_RES_R: usize = 64;
/// Number of tile columns in every chunk field array
pub const FIELD_RES_C: usize = 64;

/// Defines required access to the 2D array backing a field
pub trait Field<T> {
	/// Get a reference to the field array
	fn get(&self) -> &[[T; FIELD_RES_C]; FIELD_RES_R];
	/// Retrieve a field cell value
	fn get_cell(&self, cell: FieldCell) -> T;
	/// Set a field cell to a value
	fn set_cell(&mut self, value: T, cell: FieldCell);
}

/// Identifies a tile within a chunk by its `(row, column)` indices
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct FieldCell((usize, usize));

impl FieldCell {
	/// Create a new instance of [FieldCell]
	pub fn new(row: usize, column: usize) -> Self {
		FieldCell((row, column))
	}
	/// Get the tile `(row, column)` tuple
	pub fn get(&self) -> (usize, usize) {
		self.0
	}
	/// Get the tile row
	pub fn get_row(&self) -> usize {
		self.0 .0
	}
	/// Get the tile column
	pub fn get_column(&self) -> usize {
		self.0 .1
	}
	/// Based on a tile's `(row, column)` position find its orthogonal
	/// neighbours within the field bounds (up to 4)
	pub fn orthogonal_neighbours(&self) -> Vec<FieldCell> {
		let (row, column) = self.0;
		let mut neighbours = Vec::new();
		if row > 0 {
			neighbours.push(FieldCell::new(row - 1, column)); // northern tile
		}
		if column < FIELD_RES_C - 1 {
			neighbours.push(FieldCell::new(row, column + 1)); // eastern tile
		}
		if row < FIELD_RES_R - 1 {
			neighbours.push(FieldCell::new(row + 1, column)); // southern tile
		}
		if column > 0 {
			neighbours.push(FieldCell::new(row, column - 1)); // western tile
		}
		neighbours
	}
	/// Manhattan distance between this tile and another
	pub fn manhattan(&self, other: FieldCell) -> i32 {
		let dr = (self.get_row() as i32 - other.get_row() as i32).abs();
		let dc = (self.get_column() as i32 - other.get_column() as i32).abs();
		dr + dc
	}
}

/// Identifies a chunk within the map by its `(row, column)` indices
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct ChunkCoord((u32, u32));

impl ChunkCoord {
	/// Create a new instance of [ChunkCoord]
	pub fn new(row: u32, column: u32) -> Self {
		ChunkCoord((row, column))
	}
	/// Get the chunk `(row, column)` tuple
	pub fn get(&self) -> (u32, u32) {
		self.0
	}
	/// Get the chunk row
	pub fn get_row(&self) -> u32 {
		self.0 .0
	}
	/// Get the chunk column
	pub fn get_column(&self) -> u32 {
		self.0 .1
	}
}

/// Fully qualifies a tile on the map: the chunk it lives in and the cell
/// within that chunk's field arrays
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Reflect)]
pub struct TileDesc {
	/// Chunk holding the tile
	chunk: ChunkCoord,
	/// Position of the tile within the chunk
	cell: FieldCell,
}

impl TileDesc {
	/// Create a new instance of [TileDesc]
	pub fn new(chunk: ChunkCoord, cell: FieldCell) -> Self {
		TileDesc { chunk, cell }
	}
	/// Get the chunk holding the tile
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Get the tile position within its chunk
	pub fn get_cell(&self) -> FieldCell {
		self.cell
	}
}
