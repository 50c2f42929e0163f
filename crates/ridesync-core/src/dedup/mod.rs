//! Duplicate detection against previously synced activities

mod lookup;
mod resolver;

pub use lookup::*;
pub use resolver::*;
