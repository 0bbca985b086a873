//! Read-only queries the embedding game supplies to the navigation and
//! region systems. The position service is the sole authority on entity
//! locations; regions hold plain uids and everything here is a snapshot
//! taken at call time.
//!

use bevy::prelude::*;

use crate::prelude::*;

bitflags::bitflags! {
	/// Entity classification bits consulted by frontier derivation and
	/// region bookkeeping
	#[derive(Clone, Copy, PartialEq, Eq, Debug)]
	pub struct EntityFlags: u32 {
		/// The entity can fight and be fought
		const COMBATABLE = 1 << 0;
		/// The entity is a building with an oriented-box footprint
		const BUILDING = 1 << 1;
		/// The entity is dead but not yet reaped
		const ZOMBIE = 1 << 2;
		/// The entity is a cosmetic marker with no gameplay presence
		const MARKER = 1 << 3;
	}
}

/// Snapshot of one entity as reported by the position service
#[derive(Clone, Debug)]
pub struct EntityRecord {
	/// Stable unique id of the entity
	pub uid: u32,
	/// Faction the entity belongs to
	pub faction_id: u8,
	/// Classification bits
	pub flags: EntityFlags,
	/// Position on the XZ plane
	pub pos: Vec2,
	/// Radius of the entity's selection circle, used as its footprint
	pub selection_radius: f32,
	/// Oriented footprint for buildings
	pub obb: Option<Obb2>,
}

/// An oriented bounding box on the XZ plane
#[derive(Clone, Copy, Debug)]
pub struct Obb2 {
	/// Centre of the box
	pub center: Vec2,
	/// Half extents along the box's own axes
	pub half_extents: Vec2,
	/// Unit direction of the box's local x axis
	pub axis: Vec2,
}

impl Obb2 {
	/// Unit direction of the box's local y axis
	fn perp(&self) -> Vec2 {
		Vec2::new(-self.axis.y, self.axis.x)
	}
	/// The four corners of the box
	pub fn corners(&self) -> [Vec2; 4] {
		let ax = self.axis * self.half_extents.x;
		let ay = self.perp() * self.half_extents.y;
		[
			self.center + ax + ay,
			self.center + ax - ay,
			self.center - ax - ay,
			self.center - ax + ay,
		]
	}
	/// Separating-axis overlap test against an axis-aligned rectangle
	pub fn overlaps_rect(&self, rect: Rect) -> bool {
		/// Project a corner set onto an axis and return the covered interval
		fn project(corners: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
			let mut min = f32::INFINITY;
			let mut max = f32::NEG_INFINITY;
			for corner in corners {
				let d = corner.dot(axis);
				min = min.min(d);
				max = max.max(d);
			}
			(min, max)
		}
		let own = self.corners();
		let other = [
			rect.min,
			Vec2::new(rect.max.x, rect.min.y),
			rect.max,
			Vec2::new(rect.min.x, rect.max.y),
		];
		// strict inequality: shapes that merely touch along an edge do not
		// overlap, so footprints never rasterise sliver tiles
		for axis in [Vec2::X, Vec2::Y, self.axis, self.perp()] {
			let (min_a, max_a) = project(&own, axis);
			let (min_b, max_b) = project(&other, axis);
			if max_a <= min_b || max_b <= min_a {
				return false;
			}
		}
		true
	}
}

/// Spatial queries over entity positions
pub trait PositionQuery {
	/// Entities whose positions fall within the axis-aligned rectangle
	fn ents_in_rect(&self, min: Vec2, max: Vec2) -> Vec<EntityRecord>;
	/// Entities whose positions fall within the circle
	fn ents_in_circle(&self, centre: Vec2, radius: f32) -> Vec<EntityRecord>;
	/// Look up one entity by uid
	fn entity(&self, uid: u32) -> Option<EntityRecord>;
}

/// Faction relationship and fog-of-war queries
pub trait FactionQuery {
	/// Bitmask of the factions the given faction is at war with
	fn enemies_of(&self, faction_id: u8) -> FactionMask;
	/// Whether the entity is visible to the player-controlled factions
	/// through the fog of war
	fn fog_visible(&self, ent: &EntityRecord) -> bool;
}
