//! Data model: identity contracts, filters, relation declarations and the
//! audit trail entities embed.

pub mod audit;
pub mod filter;
pub mod object;
pub mod relation;

pub use audit::{Audit, TimeEvent};
pub use filter::Filter;
pub use object::{Object, StorableObject};
pub use relation::{Edge, Field, Graph, Link, Node, RelationKind, Relations, Target};
