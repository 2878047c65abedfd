//! Document store backends
//!
//! The repository talks to storage only through [`DocumentStore`]: raw BSON
//! documents in named collections, optionally bound to a session so the call
//! takes part in that session's transaction.

pub mod memory;
pub mod mongo;
mod query;

pub use memory::{MemorySession, MemoryStore};
pub use mongo::MongoStore;

use bson::{Bson, Document};

use crate::errors::Result;

pub trait DocumentStore {
    /// Per-transaction handle
    type Session;

    /// # Errors
    ///
    /// Connection failures.
    fn start_session(&self) -> Result<Self::Session>;

    /// # Errors
    ///
    /// `Transaction` when the session already has an open transaction.
    fn start_transaction(&self, session: &mut Self::Session) -> Result<()>;

    /// # Errors
    ///
    /// `Transaction` when the commit is rejected; nothing was applied.
    fn commit_transaction(&self, session: &mut Self::Session) -> Result<()>;

    /// # Errors
    ///
    /// `Transaction` when the server could not be told to abort.
    fn abort_transaction(&self, session: &mut Self::Session) -> Result<()>;

    /// Insert one document; returns its stored `_id`
    ///
    /// # Errors
    ///
    /// `DuplicateKey` on a unique index violation.
    fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<Bson>;

    /// Insert documents in order; returns their stored `_id`s in the same order
    ///
    /// # Errors
    ///
    /// `DuplicateKey` on a unique index violation.
    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut Self::Session>,
    ) -> Result<Vec<Bson>>;

    /// # Errors
    ///
    /// Transport or query failures. No match is `Ok(None)`.
    fn find_one(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<Option<Document>>;

    /// # Errors
    ///
    /// Transport, query or cursor failures.
    fn find(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<Vec<Document>>;

    /// Apply `update` to the first match; returns the document as it was before
    ///
    /// # Errors
    ///
    /// Transport, query or update-shape failures. No match is `Ok(None)`.
    fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<Option<Document>>;

    /// Apply `update` to the first match; returns the matched count
    ///
    /// # Errors
    ///
    /// Transport, query or update-shape failures.
    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<u64>;

    /// # Errors
    ///
    /// Transport or query failures.
    fn count(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<u64>;

    /// Returns the deleted count
    ///
    /// # Errors
    ///
    /// Transport or query failures.
    fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<u64>;

    /// Run a pipeline with English tertiary collation and disk use allowed
    ///
    /// # Errors
    ///
    /// Transport failures or unsupported stages.
    fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        session: Option<&mut Self::Session>,
    ) -> Result<Vec<Document>>;

    /// One unique index per key document, e.g. `{ "email": 1 }`
    ///
    /// # Errors
    ///
    /// `DuplicateKey` when existing documents already violate an index.
    fn create_unique_indexes(&self, collection: &str, keys: Vec<Document>) -> Result<()>;

    /// # Errors
    ///
    /// `Connection` when the server does not answer.
    fn ping(&self) -> Result<()>;

    /// Release connections
    fn shutdown(self)
    where
        Self: Sized;
}
