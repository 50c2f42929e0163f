//! Statistics attached to imported activities

mod computer;

pub use computer::*;
pub(crate) use computer::elevation_stats;
