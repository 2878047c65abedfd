//! docgraph store: configuration, connection setup, the identity strategy,
//! document store backends and the repository facade.

pub mod backend;
pub mod config;
pub mod db;
pub mod errors;
pub mod id;
pub mod repo;

pub use backend::{DocumentStore, MemoryStore, MongoStore};
pub use config::{Config, Driver, RepoOptions};
pub use errors::Result;
pub use id::IdType;
pub use repo::{Context, Entity, Repository};
