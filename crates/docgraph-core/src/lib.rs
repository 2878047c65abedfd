//! docgraph core: error and logging facilities, the entity data model with
//! declared relations, and the driver-agnostic Clear and Preload engines.

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod traversal;

pub use errors::{DgError, DgErrorKind, DocGraphError, Result};
pub use model::{Filter, Object, StorableObject};
pub use traversal::{clear, preload, preload_all, Resolver};
