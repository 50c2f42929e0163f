//! Stream extraction and derived stream computation

mod derived;
mod extractor;

pub use derived::*;
pub use extractor::*;
