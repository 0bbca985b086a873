//! Named regions: geometric zones over the map that track which entities
//! stand inside them and announce boundary crossings.
//!
//! A region is a named circle or rectangle on the XZ plane. The position
//! service reports entity movement through [RegionStore::add_ref] /
//! [RegionStore::remove_ref], and once per game tick
//! [RegionStore::update] diffs each touched region's membership against
//! the previous tick, emitting an entered or exited event per change.
//!
//! Lookups are kept cheap with a coarse two-level index: every chunk of
//! the map owns a bucket listing the regions whose shapes intersect it,
//! so a moving entity only tests the handful of regions bucketed at its
//! chunk instead of every region on the map.
//!
//! Region names are shared [Arc] strings: events carry a clone of the
//! owning region's name, so a name outlives the tick that dispatches its
//! final event even when the region itself has already been removed.
//!
//! The store is a plain value owned by the game session (one per spawned
//! map bundle) and is driven from the main tick thread.
//!

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::prelude::*;
use bevy::prelude::*;

/// Movement deltas at or below this distance are ignored by
/// [RegionStore::set_pos]
pub const REGION_EPSILON: f32 = 1.0 / 1024.0;

/// Geometric footprint of a region on the XZ plane
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RegionShape {
	/// A circle of the given radius around the region position
	Circle {
		/// Radius in world units
		radius: f32,
	},
	/// An axis-aligned rectangle centred on the region position
	Rectangle {
		/// Side length along `x`
		xlen: f32,
		/// Side length along `z`
		zlen: f32,
	},
}

/// The direction of a membership transition
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegionEventKind {
	/// The entity crossed into the region
	Entered,
	/// The entity crossed out of the region
	Exited,
}

/// Announced on the engine event bus whenever an entity crosses a region
/// boundary
#[derive(Event, Clone, Debug)]
pub struct RegionEvent {
	/// Entity that crossed the boundary
	pub uid: u32,
	/// Name of the region, shared with the region's own storage
	pub name: Arc<str>,
	/// Whether the entity entered or exited
	pub kind: RegionEventKind,
}

/// Stable handle to a region slot. Buckets and the dirty set refer to
/// regions through handles; a handle is only ever freed after the
/// region's final events have been recorded
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct RegionHandle(u32);

/// A named zone and the entities currently and previously inside it
struct Region {
	/// Owned name, shared into events
	name: Arc<str>,
	/// Geometric footprint
	shape: RegionShape,
	/// Centre position on the XZ plane
	pos: Vec2,
	/// Entities inside as of the latest bookkeeping; sorted when diffed
	curr: Vec<u32>,
	/// Entities inside as of the previous update tick, kept sorted
	prev: Vec<u32>,
}

/// Whether a point lies inside a region's shape
fn region_contains(shape: RegionShape, pos: Vec2, point: Vec2) -> bool {
	match shape {
		RegionShape::Circle { radius } => point.distance_squared(pos) <= radius * radius,
		RegionShape::Rectangle { xlen, zlen } => {
			(point.x - pos.x).abs() <= xlen / 2.0 && (point.y - pos.y).abs() <= zlen / 2.0
		}
	}
}

/// Axis-aligned bounds of a region's shape
fn shape_bounds(shape: RegionShape, pos: Vec2) -> Rect {
	match shape {
		RegionShape::Circle { radius } => {
			Rect::from_corners(pos - Vec2::splat(radius), pos + Vec2::splat(radius))
		}
		RegionShape::Rectangle { xlen, zlen } => {
			let half = Vec2::new(xlen / 2.0, zlen / 2.0);
			Rect::from_corners(pos - half, pos + half)
		}
	}
}

/// Whether a region's shape geometrically intersects a chunk's bounds
fn region_intersects_chunk(shape: RegionShape, pos: Vec2, chunk: Rect) -> bool {
	match shape {
		RegionShape::Circle { radius } => {
			let closest = pos.clamp(chunk.min, chunk.max);
			closest.distance_squared(pos) <= radius * radius
		}
		RegionShape::Rectangle { .. } => {
			let bounds = shape_bounds(shape, pos);
			bounds.min.x <= chunk.max.x
				&& chunk.min.x <= bounds.max.x
				&& bounds.min.y <= chunk.max.y
				&& chunk.min.y <= bounds.max.y
		}
	}
}

/// Spatial index of named regions, owned by the game session. All
/// mutation runs on the main tick thread; events accumulate internally
/// and are drained at a fixed tick phase
#[derive(Component)]
pub struct RegionStore {
	/// Map geometry used to bucket regions by chunk
	dims: MapDimensions,
	/// Region slots; removed slots are recycled through `free`
	slots: Vec<Option<Region>>,
	/// Indices of vacant slots
	free: Vec<u32>,
	/// Name lookup into the slot arena
	by_name: HashMap<Arc<str>, RegionHandle>,
	/// Per-chunk buckets of the regions whose shapes intersect the chunk
	intersecting: Vec<Vec<RegionHandle>>,
	/// Regions whose membership changed since the last update
	dirty: BTreeSet<RegionHandle>,
	/// Events accumulated for dispatch at the next tick phase
	pending: Vec<RegionEvent>,
	/// Debug-draw toggle read by external tooling
	render: bool,
}

impl RegionStore {
	/// Create a new instance of [RegionStore] over the given map geometry
	pub fn new(dims: MapDimensions) -> Self {
		let bucket_count = (dims.get_chunk_columns() * dims.get_chunk_rows()) as usize;
		RegionStore {
			dims,
			slots: Vec::new(),
			free: Vec::new(),
			by_name: HashMap::new(),
			intersecting: vec![Vec::new(); bucket_count],
			dirty: BTreeSet::new(),
			pending: Vec::new(),
			render: false,
		}
	}
	/// Create a circular region. Fails with `false` when the name is
	/// already in use; the store is unchanged in that case
	pub fn add_circle(
		&mut self,
		positions: &impl PositionQuery,
		name: &str,
		pos: Vec2,
		radius: f32,
	) -> bool {
		self.add(positions, name, RegionShape::Circle { radius }, pos)
	}
	/// Create a rectangular region. Fails with `false` when the name is
	/// already in use; the store is unchanged in that case
	pub fn add_rectangle(
		&mut self,
		positions: &impl PositionQuery,
		name: &str,
		pos: Vec2,
		xlen: f32,
		zlen: f32,
	) -> bool {
		self.add(positions, name, RegionShape::Rectangle { xlen, zlen }, pos)
	}
	/// Shared creation path: claim the name, bucket the shape and take the
	/// initial membership census
	fn add(
		&mut self,
		positions: &impl PositionQuery,
		name: &str,
		shape: RegionShape,
		pos: Vec2,
	) -> bool {
		if self.by_name.contains_key(name) {
			error!("Region name '{name}' is already in use");
			return false;
		}
		let name: Arc<str> = Arc::from(name);
		let region = Region {
			name: name.clone(),
			shape,
			pos,
			curr: Vec::new(),
			prev: Vec::new(),
		};
		let handle = self.alloc(region);
		self.by_name.insert(name, handle);
		self.buckets_insert(handle, shape, pos);
		self.update_ents(handle, positions);
		true
	}
	/// Destroy a region. An exited event is recorded synchronously for
	/// every current member before the region's storage is released
	pub fn remove(&mut self, name: &str) {
		let Some(handle) = self.by_name.remove(name) else {
			return;
		};
		let Some(region) = self.slots[handle.0 as usize].take() else {
			return;
		};
		let mut uids = region.curr.clone();
		uids.sort_unstable();
		for uid in uids {
			self.pending.push(RegionEvent {
				uid,
				name: region.name.clone(),
				kind: RegionEventKind::Exited,
			});
		}
		self.buckets_remove(handle, region.shape, region.pos);
		self.dirty.remove(&handle);
		self.free.push(handle.0);
	}
	/// Move a region. Deltas at or below [REGION_EPSILON] are ignored.
	/// Returns `false` for an unknown name
	pub fn set_pos(&mut self, positions: &impl PositionQuery, name: &str, pos: Vec2) -> bool {
		let Some(&handle) = self.by_name.get(name) else {
			return false;
		};
		let (shape, old_pos) = {
			let region = self.region(handle);
			(region.shape, region.pos)
		};
		if old_pos.distance(pos) <= REGION_EPSILON {
			return true;
		}
		self.buckets_remove(handle, shape, old_pos);
		self.region_mut(handle).pos = pos;
		self.buckets_insert(handle, shape, pos);
		self.update_ents(handle, positions);
		true
	}
	/// Get a region's position, or [None] for an unknown name
	pub fn get_pos(&self, name: &str) -> Option<Vec2> {
		let handle = self.by_name.get(name)?;
		Some(self.region(*handle).pos)
	}
	/// Get the entities currently inside a region, or [None] for an
	/// unknown name
	pub fn ents(&self, name: &str) -> Option<&[u32]> {
		let handle = self.by_name.get(name)?;
		Some(&self.region(*handle).curr)
	}
	/// Whether an entity is currently inside a region
	pub fn contains_ent(&self, name: &str, uid: u32) -> bool {
		let Some(handle) = self.by_name.get(name) else {
			return false;
		};
		self.region(*handle).curr.contains(&uid)
	}
	/// Record that an entity arrived at `newpos`. Called by the position
	/// service for every placement; dead and cosmetic entities are ignored
	pub fn add_ref(&mut self, positions: &impl PositionQuery, uid: u32, newpos: Vec2) {
		let Some(ent) = positions.entity(uid) else {
			return;
		};
		if ent.flags.intersects(EntityFlags::ZOMBIE | EntityFlags::MARKER) {
			return;
		}
		for handle in self.candidates_at(newpos) {
			let region = self.region(handle);
			if !region_contains(region.shape, region.pos, newpos) {
				continue;
			}
			if region.curr.contains(&uid) {
				continue;
			}
			self.region_mut(handle).curr.push(uid);
			self.dirty.insert(handle);
		}
	}
	/// Record that an entity left `oldpos`. Called by the position service
	/// before every move
	pub fn remove_ref(&mut self, uid: u32, oldpos: Vec2) {
		for handle in self.candidates_at(oldpos) {
			let region = self.region_mut(handle);
			let Some(idx) = region.curr.iter().position(|c| *c == uid) else {
				continue;
			};
			region.curr.remove(idx);
			self.dirty.insert(handle);
		}
	}
	/// Drop an entity from every region at its current position, used when
	/// the entity is destroyed outright
	pub fn remove_ent(&mut self, positions: &impl PositionQuery, uid: u32) {
		let Some(ent) = positions.entity(uid) else {
			return;
		};
		self.remove_ref(uid, ent.pos);
	}
	/// Per-tick membership diff: every dirtied region sorts its rosters
	/// and records one event per change - entries first, then exits, each
	/// in ascending uid order - after which the previous roster catches up
	/// and the dirty set clears. Call once per game tick after movement
	pub fn update(&mut self) {
		let dirty: Vec<RegionHandle> = std::mem::take(&mut self.dirty).into_iter().collect();
		for handle in dirty {
			self.notify_changed(handle);
		}
	}
	/// Drain the events recorded since the last drain, in recording order
	pub fn drain_events(&mut self) -> std::vec::Drain<'_, RegionEvent> {
		self.pending.drain(..)
	}
	/// Toggle the debug rendering flag read by external tooling
	pub fn set_render(&mut self, on: bool) {
		self.render = on;
	}
	/// Get the debug rendering flag
	pub fn get_render(&self) -> bool {
		self.render
	}
	/// Diff one region's membership against the previous tick and record
	/// the transitions
	fn notify_changed(&mut self, handle: RegionHandle) {
		let Some(region) = self.slots[handle.0 as usize].as_mut() else {
			return;
		};
		region.curr.sort_unstable();
		region.prev.sort_unstable();

		let mut entered = Vec::new();
		let mut exited = Vec::new();
		let (mut i, mut j) = (0, 0);
		while i < region.curr.len() && j < region.prev.len() {
			if region.curr[i] < region.prev[j] {
				entered.push(region.curr[i]);
				i += 1;
			} else if region.prev[j] < region.curr[i] {
				exited.push(region.prev[j]);
				j += 1;
			} else {
				i += 1;
				j += 1;
			}
		}
		entered.extend(&region.curr[i..]);
		exited.extend(&region.prev[j..]);

		let name = region.name.clone();
		region.prev = region.curr.clone();
		for uid in entered {
			self.pending.push(RegionEvent {
				uid,
				name: name.clone(),
				kind: RegionEventKind::Entered,
			});
		}
		for uid in exited {
			self.pending.push(RegionEvent {
				uid,
				name: name.clone(),
				kind: RegionEventKind::Exited,
			});
		}
	}
	/// Re-take a region's membership census from the position service
	fn update_ents(&mut self, handle: RegionHandle, positions: &impl PositionQuery) {
		let (shape, pos) = {
			let region = self.region(handle);
			(region.shape, region.pos)
		};
		let ents = match shape {
			RegionShape::Circle { radius } => positions.ents_in_circle(pos, radius),
			RegionShape::Rectangle { .. } => {
				let bounds = shape_bounds(shape, pos);
				positions.ents_in_rect(bounds.min, bounds.max)
			}
		};
		let curr = ents
			.into_iter()
			.filter(|e| !e.flags.intersects(EntityFlags::ZOMBIE | EntityFlags::MARKER))
			.map(|e| e.uid)
			.collect();
		self.region_mut(handle).curr = curr;
		self.dirty.insert(handle);
	}
	/// Handles bucketed at the chunk containing a point; empty off the map
	fn candidates_at(&self, point: Vec2) -> Vec<RegionHandle> {
		let Some(chunk) = self.dims.chunk_at(point) else {
			return Vec::new();
		};
		self.intersecting[self.bucket_index(chunk)].clone()
	}
	/// Row-major bucket index of a chunk
	fn bucket_index(&self, chunk: ChunkCoord) -> usize {
		(chunk.get_row() * self.dims.get_chunk_columns() + chunk.get_column()) as usize
	}
	/// Chunks whose bounds a shape geometrically intersects
	fn intersected_chunks(&self, shape: RegionShape, pos: Vec2) -> Vec<ChunkCoord> {
		let bounds = shape_bounds(shape, pos);
		let origin = self.dims.get_origin();
		let span_x = self.dims.chunk_len_x();
		let span_z = self.dims.chunk_len_z();
		let last_c = self.dims.get_chunk_columns() as i64 - 1;
		let last_r = self.dims.get_chunk_rows() as i64 - 1;
		let min_c = (((bounds.min.x - origin.x) / span_x).floor() as i64).clamp(0, last_c);
		let max_c = (((bounds.max.x - origin.x) / span_x).floor() as i64).clamp(0, last_c);
		let min_r = (((bounds.min.y - origin.y) / span_z).floor() as i64).clamp(0, last_r);
		let max_r = (((bounds.max.y - origin.y) / span_z).floor() as i64).clamp(0, last_r);
		let mut out = Vec::new();
		for r in min_r..=max_r {
			for c in min_c..=max_c {
				let chunk = ChunkCoord::new(r as u32, c as u32);
				if region_intersects_chunk(shape, pos, self.dims.chunk_bounds(chunk)) {
					out.push(chunk);
				}
			}
		}
		out
	}
	/// Add a handle to every chunk bucket the shape intersects
	fn buckets_insert(&mut self, handle: RegionHandle, shape: RegionShape, pos: Vec2) {
		for chunk in self.intersected_chunks(shape, pos) {
			let idx = self.bucket_index(chunk);
			self.intersecting[idx].push(handle);
		}
	}
	/// Remove a handle from every chunk bucket the shape intersects
	fn buckets_remove(&mut self, handle: RegionHandle, shape: RegionShape, pos: Vec2) {
		for chunk in self.intersected_chunks(shape, pos) {
			let idx = self.bucket_index(chunk);
			self.intersecting[idx].retain(|h| *h != handle);
		}
	}
	/// Store a region in a vacant slot
	fn alloc(&mut self, region: Region) -> RegionHandle {
		if let Some(idx) = self.free.pop() {
			self.slots[idx as usize] = Some(region);
			RegionHandle(idx)
		} else {
			self.slots.push(Some(region));
			RegionHandle((self.slots.len() - 1) as u32)
		}
	}
	/// Borrow a live region slot
	///
	/// NB: panics on a stale handle, which would be a bookkeeping bug
	fn region(&self, handle: RegionHandle) -> &Region {
		self.slots[handle.0 as usize]
			.as_ref()
			.expect("stale region handle")
	}
	/// Mutably borrow a live region slot
	///
	/// NB: panics on a stale handle, which would be a bookkeeping bug
	fn region_mut(&mut self, handle: RegionHandle) -> &mut Region {
		self.slots[handle.0 as usize]
			.as_mut()
			.expect("stale region handle")
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Position stub backed by a flat entity list
	struct StubPositions(Vec<EntityRecord>);
	impl PositionQuery for StubPositions {
		fn ents_in_rect(&self, min: Vec2, max: Vec2) -> Vec<EntityRecord> {
			self.0
				.iter()
				.filter(|e| {
					e.pos.x >= min.x && e.pos.x <= max.x && e.pos.y >= min.y && e.pos.y <= max.y
				})
				.cloned()
				.collect()
		}
		fn ents_in_circle(&self, centre: Vec2, radius: f32) -> Vec<EntityRecord> {
			self.0
				.iter()
				.filter(|e| e.pos.distance(centre) <= radius)
				.cloned()
				.collect()
		}
		fn entity(&self, uid: u32) -> Option<EntityRecord> {
			self.0.iter().find(|e| e.uid == uid).cloned()
		}
	}
	fn villager(uid: u32, pos: Vec2) -> EntityRecord {
		EntityRecord {
			uid,
			faction_id: 0,
			flags: EntityFlags::empty(),
			pos,
			selection_radius: 0.5,
			obb: None,
		}
	}
	fn store() -> RegionStore {
		RegionStore::new(MapDimensions::new(2, 1, 1.0, Vec2::ZERO))
	}
	#[test]
	fn duplicate_names_are_rejected() {
		let positions = StubPositions(Vec::new());
		let mut regions = store();
		assert!(regions.add_circle(&positions, "alarm", Vec2::new(5.0, 5.0), 5.0));
		assert!(!regions.add_circle(&positions, "alarm", Vec2::new(20.0, 20.0), 3.0));
		assert!(!regions.add_rectangle(&positions, "alarm", Vec2::new(20.0, 20.0), 2.0, 2.0));
		// the first region is untouched
		assert_eq!(Some(Vec2::new(5.0, 5.0)), regions.get_pos("alarm"));
	}
	#[test]
	fn entity_crossing_in_emits_one_entered() {
		let positions = StubPositions(vec![villager(7, Vec2::new(10.0, 10.0))]);
		let mut regions = store();
		assert!(regions.add_circle(&positions, "alarm", Vec2::new(2.0, 2.0), 5.0));
		regions.update();
		assert!(regions.drain_events().next().is_none());

		// the position service moves uid 7 from (10, 10) to (2, 2)
		regions.remove_ref(7, Vec2::new(10.0, 10.0));
		regions.add_ref(&positions, 7, Vec2::new(2.0, 2.0));
		regions.update();
		let events: Vec<RegionEvent> = regions.drain_events().collect();
		assert_eq!(1, events.len());
		assert_eq!(7, events[0].uid);
		assert_eq!(RegionEventKind::Entered, events[0].kind);
		assert_eq!("alarm", &*events[0].name);
		// settled: a further tick emits nothing
		regions.update();
		assert!(regions.drain_events().next().is_none());
	}
	#[test]
	fn remove_emits_synchronous_exits_for_members() {
		let positions = StubPositions(vec![
			villager(9, Vec2::new(1.0, 1.0)),
			villager(3, Vec2::new(0.0, 1.0)),
			villager(7, Vec2::new(1.0, 0.0)),
		]);
		let mut regions = store();
		assert!(regions.add_circle(&positions, "camp", Vec2::new(0.0, 0.0), 5.0));
		regions.update();
		regions.drain_events();

		regions.remove("camp");
		let events: Vec<RegionEvent> = regions.drain_events().collect();
		assert_eq!(3, events.len());
		assert_eq!(vec![3, 7, 9], events.iter().map(|e| e.uid).collect::<Vec<u32>>());
		assert!(events.iter().all(|e| e.kind == RegionEventKind::Exited));
		// the name is free again
		assert_eq!(None, regions.get_pos("camp"));
		assert!(regions.add_circle(&positions, "camp", Vec2::new(0.0, 0.0), 1.0));
	}
	#[test]
	fn add_then_remove_ref_is_a_noop_before_update() {
		let positions = StubPositions(vec![villager(5, Vec2::new(50.0, 50.0))]);
		let mut regions = store();
		assert!(regions.add_circle(&positions, "zone", Vec2::new(4.0, 4.0), 3.0));
		regions.update();
		regions.drain_events();

		regions.add_ref(&positions, 5, Vec2::new(4.0, 4.0));
		regions.remove_ref(5, Vec2::new(4.0, 4.0));
		regions.update();
		assert!(regions.drain_events().next().is_none());
		assert!(!regions.contains_ent("zone", 5));
	}
	#[test]
	fn set_pos_is_idempotent_and_gated_by_epsilon() {
		let positions = StubPositions(vec![villager(1, Vec2::new(20.0, 20.0))]);
		let mut regions = store();
		assert!(regions.add_circle(&positions, "zone", Vec2::new(4.0, 4.0), 3.0));
		regions.update();
		regions.drain_events();

		// a sub-epsilon nudge is a no-op
		assert!(regions.set_pos(&positions, "zone", Vec2::new(4.0, 4.0 + REGION_EPSILON / 2.0)));
		regions.update();
		assert!(regions.drain_events().next().is_none());

		// moving onto the entity emits one entered event, repeating the
		// same move emits nothing further
		assert!(regions.set_pos(&positions, "zone", Vec2::new(20.0, 20.0)));
		regions.update();
		let events: Vec<RegionEvent> = regions.drain_events().collect();
		assert_eq!(1, events.len());
		assert_eq!(RegionEventKind::Entered, events[0].kind);
		assert!(regions.set_pos(&positions, "zone", Vec2::new(20.0, 20.0)));
		regions.update();
		assert!(regions.drain_events().next().is_none());

		// unknown names are reported
		assert!(!regions.set_pos(&positions, "nowhere", Vec2::ZERO));
	}
	#[test]
	fn diff_emits_entries_then_exits_in_uid_order() {
		let positions = StubPositions(vec![
			villager(1, Vec2::new(4.0, 4.0)),
			villager(2, Vec2::new(4.5, 4.0)),
			villager(3, Vec2::new(4.0, 4.5)),
		]);
		let mut regions = store();
		assert!(regions.add_circle(&positions, "zone", Vec2::new(4.0, 4.0), 3.0));
		regions.update();
		regions.drain_events();

		// uid 1 leaves, uids 5 and 4 arrive
		regions.remove_ref(1, Vec2::new(4.0, 4.0));
		regions.add_ref(
			&StubPositions(vec![villager(5, Vec2::new(4.0, 4.0))]),
			5,
			Vec2::new(4.0, 4.0),
		);
		regions.add_ref(
			&StubPositions(vec![villager(4, Vec2::new(4.0, 4.0))]),
			4,
			Vec2::new(4.0, 4.0),
		);
		regions.update();
		let events: Vec<(u32, RegionEventKind)> = regions
			.drain_events()
			.map(|e| (e.uid, e.kind))
			.collect();
		assert_eq!(
			vec![
				(4, RegionEventKind::Entered),
				(5, RegionEventKind::Entered),
				(1, RegionEventKind::Exited),
			],
			events
		);
	}
	#[test]
	fn zombies_and_markers_are_ignored() {
		let mut corpse = villager(8, Vec2::new(4.0, 4.0));
		corpse.flags = EntityFlags::ZOMBIE;
		let positions = StubPositions(vec![corpse]);
		let mut regions = store();
		assert!(regions.add_circle(&positions, "zone", Vec2::new(4.0, 4.0), 3.0));
		assert_eq!(Some(&[] as &[u32]), regions.ents("zone"));
		regions.add_ref(&positions, 8, Vec2::new(4.0, 4.0));
		assert!(!regions.contains_ent("zone", 8));
	}
	#[test]
	fn region_spans_multiple_chunk_buckets() {
		let positions = StubPositions(Vec::new());
		let mut regions = store();
		// a rectangle straddling the seam between chunk (0,0) and (0,1)
		assert!(regions.add_rectangle(
			&positions,
			"border",
			Vec2::new(FIELD_RES_C as f32, 10.0),
			8.0,
			8.0
		));
		// membership changes are picked up from both sides of the seam
		regions.add_ref(
			&StubPositions(vec![villager(2, Vec2::new(FIELD_RES_C as f32 - 2.0, 10.0))]),
			2,
			Vec2::new(FIELD_RES_C as f32 - 2.0, 10.0),
		);
		regions.add_ref(
			&StubPositions(vec![villager(3, Vec2::new(FIELD_RES_C as f32 + 2.0, 10.0))]),
			3,
			Vec2::new(FIELD_RES_C as f32 + 2.0, 10.0),
		);
		assert!(regions.contains_ent("border", 2));
		assert!(regions.contains_ent("border", 3));
		// moving the region away vacates every bucket it sat in
		assert!(regions.set_pos(&positions, "border", Vec2::new(10.0, 40.0)));
		regions.add_ref(
			&StubPositions(vec![villager(4, Vec2::new(FIELD_RES_C as f32, 10.0))]),
			4,
			Vec2::new(FIELD_RES_C as f32, 10.0),
		);
		assert!(!regions.contains_ent("border", 4));
	}
	#[test]
	fn remove_ent_uses_the_service_position() {
		let positions = StubPositions(vec![villager(6, Vec2::new(4.0, 4.0))]);
		let mut regions = store();
		assert!(regions.add_circle(&positions, "zone", Vec2::new(4.0, 4.0), 3.0));
		regions.update();
		regions.drain_events();
		assert!(regions.contains_ent("zone", 6));

		regions.remove_ent(&positions, 6);
		regions.update();
		let events: Vec<RegionEvent> = regions.drain_events().collect();
		assert_eq!(1, events.len());
		assert_eq!(RegionEventKind::Exited, events[0].kind);
		assert_eq!(6, events[0].uid);
	}
}
