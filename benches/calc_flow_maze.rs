//! Measure a FlowField generation over a serpentine maze of impassable
//! walls, the worst case for the cost propagation
//!

use bevy::math::Vec2;
use bevy_rts_nav_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Position stub with no entities
struct NoEnts;
impl PositionQuery for NoEnts {
	fn ents_in_rect(&self, _min: Vec2, _max: Vec2) -> Vec<EntityRecord> {
		Vec::new()
	}
	fn ents_in_circle(&self, _centre: Vec2, _radius: f32) -> Vec<EntityRecord> {
		Vec::new()
	}
	fn entity(&self, _uid: u32) -> Option<EntityRecord> {
		None
	}
}

/// Faction stub where nobody is at war
struct NoWars;
impl FactionQuery for NoWars {
	fn enemies_of(&self, _faction_id: u8) -> FactionMask {
		0
	}
	fn fog_visible(&self, _ent: &EntityRecord) -> bool {
		true
	}
}

/// Carve a serpentine corridor: every fourth row is a wall with a single
/// gap, alternating ends
fn maze_world() -> NavWorld {
	let mut world = NavWorld::new(1, 1);
	world.add_layer(NavLayer::Ground);
	let chunk = world.chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 0));
	for r in (2..FIELD_RES_R - 1).step_by(4) {
		let gap = if (r / 4) % 2 == 0 { FIELD_RES_C - 1 } else { 0 };
		for c in 0..FIELD_RES_C {
			if c != gap {
				chunk.set_cost_base(COST_IMPASSABLE, FieldCell::new(r, c));
			}
		}
	}
	world
}

/// Build one flow field towards a corner tile through the maze
fn flow_maze(world: &NavWorld, dims: &MapDimensions) {
	let chunk = ChunkCoord::new(0, 0);
	let mut flow = FlowField::new(chunk);
	flow_field_update(
		chunk,
		world,
		dims,
		NavLayer::Ground,
		None,
		FieldTarget::Tile(FieldCell::new(0, 0)),
		&NoEnts,
		&NoWars,
		&mut flow,
	);
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(100);
	let world = maze_world();
	let dims = MapDimensions::new(1, 1, 1.0, Vec2::ZERO);
	group.bench_function("calc_flow_maze", |b| {
		b.iter(|| flow_maze(black_box(&world), black_box(&dims)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
