//! Defines the Bevy [Plugin] wiring region membership events into the
//! game schedule
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Ordering labels for the systems this plugin schedules
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Region membership diffing and event dispatch, to run after all
	/// movement for the tick has been applied
	Notify,
}

/// Plugin registering [RegionEvent] and its per-tick dispatch
pub struct RtsNavPlugin;

impl Plugin for RtsNavPlugin {
	fn build(&self, app: &mut App) {
		app.add_event::<RegionEvent>()
			.add_systems(Update, dispatch_region_events.in_set(OrderingSet::Notify));
	}
}

/// Run the per-tick membership diff of every region store and forward the
/// recorded transitions to the event bus. Events recorded synchronously
/// during the tick (region removal) are flushed here too, so subscribers
/// observe every transition at one well-defined phase
pub fn dispatch_region_events(
	mut stores: Query<&mut RegionStore>,
	mut events: EventWriter<RegionEvent>,
) {
	for mut store in &mut stores {
		store.update();
		for event in store.drain_events() {
			events.write(event);
		}
	}
}
