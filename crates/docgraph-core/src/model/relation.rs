//! Relation declarations
//!
//! Entity types declare, once per type, which of their fields take part in the
//! object graph. Each declared `Field` pairs a name with an accessor and a role:
//!
//! - `Field::embedded`: the field holds full [`StorableObject`]s; they are
//!   fetched from their own collection ([`RelationKind::EmbeddedFull`]).
//! - `Field::referenced`: the field holds bare [`Object`]s; the declaration
//!   names the collection ([`RelationKind::ReferencedExternal`]).
//! - `Field::nested`: a plain composite (record, optional record or sequence of
//!   records) that the walkers descend into to find deeper relations.
//!
//! Accessors return ordered lists so single, optional and sequence fields look
//! the same to the walkers; an absent optional value yields an empty list.
//!
//! ```
//! use docgraph_core::model::relation::{self, Field, Relations, Target};
//! use docgraph_core::model::{Object, StorableObject};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Customer {
//!     #[serde(rename = "_id")]
//!     id: String,
//!     name: String,
//! }
//!
//! impl Object for Customer {
//!     fn id(&self) -> &str { &self.id }
//!     fn set_id(&mut self, id: String) { self.id = id }
//! }
//! impl StorableObject for Customer {
//!     const COLLECTION: &'static str = "customers";
//! }
//! impl Relations for Customer {}
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Order {
//!     #[serde(rename = "_id")]
//!     id: String,
//!     customer: Customer,
//! }
//!
//! fn order_customer(order: &mut Order) -> Vec<Target<'_>> {
//!     relation::entity(&mut order.customer)
//! }
//!
//! impl Relations for Order {
//!     const FIELDS: &'static [Field<Self>] = &[Field::embedded("customer", order_customer)];
//! }
//! ```

use bson::Document;
use serde::de::DeserializeOwned;

use crate::errors::{serialization, Result};
use crate::model::{Object, StorableObject};

/// How a relation field finds its target collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Target owns its collection (`StorableObject::COLLECTION`)
    EmbeddedFull,
    /// Target only has an identity; the collection is named here
    ReferencedExternal(&'static str),
}

/// One relation target together with the collection it resolves from
pub struct Target<'a> {
    pub(crate) node: &'a mut dyn Node,
    pub(crate) collection: &'static str,
}

impl<'a> Target<'a> {
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn identity(&self) -> &str {
        self.node.identity()
    }
}

/// What a declared field yields when visited
pub enum Link<'a> {
    Relation {
        kind: RelationKind,
        targets: Vec<Target<'a>>,
    },
    Nested(Vec<&'a mut dyn Graph>),
}

/// A visited field: its declared name and its current targets
pub struct Edge<'a> {
    pub name: &'static str,
    pub link: Link<'a>,
}

enum Access<T> {
    Embedded(fn(&mut T) -> Vec<Target<'_>>),
    Referenced(&'static str, fn(&mut T) -> Vec<&mut dyn Node>),
    Nested(fn(&mut T) -> Vec<&mut dyn Graph>),
}

/// Declaration of one graph-participating field of `T`
pub struct Field<T> {
    name: &'static str,
    access: Access<T>,
}

impl<T> Field<T> {
    /// Relation to full entities fetched from their own collection
    pub const fn embedded(name: &'static str, access: fn(&mut T) -> Vec<Target<'_>>) -> Self {
        Self {
            name,
            access: Access::Embedded(access),
        }
    }

    /// Relation to identity-only objects stored in `collection`
    pub const fn referenced(
        name: &'static str,
        collection: &'static str,
        access: fn(&mut T) -> Vec<&mut dyn Node>,
    ) -> Self {
        Self {
            name,
            access: Access::Referenced(collection, access),
        }
    }

    /// Non-relation composite the walkers descend into
    pub const fn nested(name: &'static str, access: fn(&mut T) -> Vec<&mut dyn Graph>) -> Self {
        Self {
            name,
            access: Access::Nested(access),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Relation kind, or `None` for nested composites
    pub fn kind(&self) -> Option<RelationKind> {
        match &self.access {
            Access::Embedded(_) => Some(RelationKind::EmbeddedFull),
            Access::Referenced(collection, _) => Some(RelationKind::ReferencedExternal(collection)),
            Access::Nested(_) => None,
        }
    }

    /// Borrow the field's current targets out of `value`
    pub fn edge<'a>(&self, value: &'a mut T) -> Edge<'a> {
        let link = match &self.access {
            Access::Embedded(access) => Link::Relation {
                kind: RelationKind::EmbeddedFull,
                targets: access(value),
            },
            Access::Referenced(collection, access) => {
                let collection = *collection;
                Link::Relation {
                    kind: RelationKind::ReferencedExternal(collection),
                    targets: access(value)
                        .into_iter()
                        .map(|node| Target { node, collection })
                        .collect(),
                }
            }
            Access::Nested(access) => Link::Nested(access(value)),
        };

        Edge {
            name: self.name,
            link,
        }
    }
}

/// Per-type declaration of graph-participating fields, in visiting order
///
/// Types without relations still implement this (with the default empty list)
/// so they can be relation targets or nested records.
pub trait Relations: Sized + 'static {
    const FIELDS: &'static [Field<Self>] = &[];
}

/// Type-erased view of a value's declared edges
pub trait Graph {
    fn edge_count(&self) -> usize;

    /// The edge at `index`, or `None` past the last declared field
    fn edge(&mut self, index: usize) -> Option<Edge<'_>>;
}

impl<T: Relations> Graph for T {
    fn edge_count(&self) -> usize {
        T::FIELDS.len()
    }

    fn edge(&mut self, index: usize) -> Option<Edge<'_>> {
        T::FIELDS.get(index).map(|field| field.edge(self))
    }
}

/// Type-erased relation target: a graph node with an identity that can be
/// stubbed and re-hydrated
pub trait Node: Graph {
    fn identity(&self) -> &str;

    /// Replace every field with its default, keeping only the identity
    fn reset_to_identity(&mut self);

    /// Overwrite the value with a decoded document
    fn hydrate(&mut self, document: Document) -> Result<()>;
}

impl<T> Node for T
where
    T: Object + Relations + Default + DeserializeOwned,
{
    fn identity(&self) -> &str {
        Object::id(self)
    }

    fn reset_to_identity(&mut self) {
        let id = Object::id(self).to_string();
        *self = T::default();
        self.set_id(id);
    }

    fn hydrate(&mut self, document: Document) -> Result<()> {
        *self = bson::from_document(document).map_err(|e| serialization("hydrate", e))?;
        Ok(())
    }
}

/// Single embedded entity
pub fn entity<U: StorableObject + Node>(value: &mut U) -> Vec<Target<'_>> {
    vec![Target {
        node: value,
        collection: U::COLLECTION,
    }]
}

/// Sequence of embedded entities, in order
pub fn entities<U: StorableObject + Node>(values: &mut [U]) -> Vec<Target<'_>> {
    values
        .iter_mut()
        .map(|value| Target {
            node: value,
            collection: U::COLLECTION,
        })
        .collect()
}

/// Optional embedded entity
pub fn optional_entity<U: StorableObject + Node>(value: &mut Option<U>) -> Vec<Target<'_>> {
    value
        .iter_mut()
        .map(|value| Target {
            node: value,
            collection: U::COLLECTION,
        })
        .collect()
}

/// Single referenced object
pub fn object<U: Node>(value: &mut U) -> Vec<&mut dyn Node> {
    let node: &mut dyn Node = value;
    vec![node]
}

/// Sequence of referenced objects, in order
pub fn objects<U: Node>(values: &mut [U]) -> Vec<&mut dyn Node> {
    values
        .iter_mut()
        .map(|value| value as &mut dyn Node)
        .collect()
}

/// Optional referenced object
pub fn optional_object<U: Node>(value: &mut Option<U>) -> Vec<&mut dyn Node> {
    value
        .iter_mut()
        .map(|value| value as &mut dyn Node)
        .collect()
}

/// Single nested record
pub fn nested<U: Graph>(value: &mut U) -> Vec<&mut dyn Graph> {
    let graph: &mut dyn Graph = value;
    vec![graph]
}

/// Sequence of nested records, in order
pub fn nested_all<U: Graph>(values: &mut [U]) -> Vec<&mut dyn Graph> {
    values
        .iter_mut()
        .map(|value| value as &mut dyn Graph)
        .collect()
}

/// Optional nested record
pub fn optional_nested<U: Graph>(value: &mut Option<U>) -> Vec<&mut dyn Graph> {
    value
        .iter_mut()
        .map(|value| value as &mut dyn Graph)
        .collect()
}
