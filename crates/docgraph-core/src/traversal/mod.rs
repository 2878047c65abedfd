//! Graph walkers over declared relations
//!
//! - [`clear`] reduces relation targets to identity stubs before a write
//! - [`preload`] replaces identity stubs with their stored documents after a read

mod clear;
mod preload;

pub use clear::clear;
pub use preload::{preload, preload_all, Resolver};
