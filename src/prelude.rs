//! `use bevy_rts_nav_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::{
	bundle::*,
	environment::*,
	navigation::{
		chunk::*, flow_field::*, frontier::*, integration_field::*, los_field::*, recovery::*,
		target::*, utilities::*, *,
	},
	plugin::*,
	regions::*,
};
