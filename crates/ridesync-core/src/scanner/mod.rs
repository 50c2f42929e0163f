//! Activity file discovery and archive extraction

mod archive;
mod files;

pub use archive::*;
pub use files::*;
