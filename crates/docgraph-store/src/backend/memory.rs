//! In-process document store
//!
//! Keeps collections as ordered lists of BSON documents behind one lock.
//! Transactions read and write a private copy of each collection they touch
//! and record every write as a per-`_id` change. Commit replays only those
//! changes onto the live collections (last writer wins per document);
//! aborting drops the copy and the changes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bson::oid::ObjectId;
use bson::{Bson, Document};
use docgraph_core::errors::{DgError, DgErrorKind};

use super::query::{apply_update, index_key, matches, run_pipeline, same_key};
use super::DocumentStore;
use crate::errors::{duplicate_key, poisoned, unsupported, Result};
use crate::id::ID_FIELD;

type Collections = BTreeMap<String, Vec<Document>>;

#[derive(Debug, Default)]
struct State {
    collections: Collections,
    indexes: BTreeMap<String, Vec<Document>>,
}

/// One document-level effect of a transactional write
#[derive(Debug, Clone, PartialEq)]
enum Change {
    Put(Document),
    Remove(Bson),
}

#[derive(Debug, Default)]
struct Transaction {
    staged: Collections,
    changes: BTreeMap<String, Vec<Change>>,
}

#[derive(Debug)]
pub struct MemorySession {
    id: u64,
    transaction: Option<Transaction>,
}

impl MemorySession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    issued: AtomicU64,
    sessions: AtomicU64,
}

fn transaction_error(op: &str, message: &str) -> DgError {
    DgError::new(DgErrorKind::Transaction)
        .with_op(op.to_string())
        .with_message(message.to_string())
}

/// Reject `candidate` if it collides with any other document on `_id` or a
/// unique index; `skip` is the candidate's own position when replacing
fn check_unique(
    collection: &str,
    documents: &[Document],
    unique: &[Document],
    candidate: &Document,
    skip: Option<usize>,
) -> Result<()> {
    let others = documents
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != skip)
        .map(|(_, document)| document);

    if let Some(id) = candidate.get(ID_FIELD) {
        for other in others.clone() {
            if other.get(ID_FIELD) == Some(id) {
                return Err(duplicate_key(collection, &format!("{{ _id: {} }}", id)));
            }
        }
    }

    for keys in unique {
        let key = index_key(candidate, keys);
        for other in others.clone() {
            if same_key(&key, &index_key(other, keys)) {
                return Err(duplicate_key(collection, &keys.to_string()));
            }
        }
    }
    Ok(())
}

fn insert(
    collection: &str,
    documents: &mut Vec<Document>,
    unique: &[Document],
    mut document: Document,
) -> Result<Bson> {
    let id = match document.get(ID_FIELD).cloned() {
        Some(id) => id,
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            let mut with_id = Document::new();
            with_id.insert(ID_FIELD, id.clone());
            for (key, value) in document {
                with_id.insert(key, value);
            }
            document = with_id;
            id
        }
    };

    check_unique(collection, documents, unique, &document, None)?;
    documents.push(document);
    Ok(id)
}

fn update_first(
    collection: &str,
    documents: &mut [Document],
    unique: &[Document],
    filter: &Document,
    update: &Document,
) -> Result<Option<Document>> {
    let mut position = None;
    for (index, document) in documents.iter().enumerate() {
        if matches(document, filter)? {
            position = Some(index);
            break;
        }
    }
    let Some(index) = position else {
        return Ok(None);
    };

    let before = documents[index].clone();
    let mut after = before.clone();
    apply_update(&mut after, update)?;

    if after.get(ID_FIELD) != before.get(ID_FIELD) {
        return Err(unsupported("update", "change to immutable field _id"));
    }
    check_unique(collection, documents, unique, &after, Some(index))?;

    documents[index] = after;
    Ok(Some(before))
}

fn position(documents: &[Document], id: &Bson) -> Option<usize> {
    documents
        .iter()
        .position(|document| document.get(ID_FIELD) == Some(id))
}

/// Changes that turn `before` into `after`, keyed by `_id`
fn diff(before: &[Document], after: &[Document]) -> Vec<Change> {
    let mut changes = Vec::new();
    for document in before {
        if let Some(id) = document.get(ID_FIELD) {
            if position(after, id).is_none() {
                changes.push(Change::Remove(id.clone()));
            }
        }
    }
    for document in after {
        let unchanged = document
            .get(ID_FIELD)
            .and_then(|id| position(before, id))
            .is_some_and(|index| &before[index] == document);
        if !unchanged {
            changes.push(Change::Put(document.clone()));
        }
    }
    changes
}

fn replay(
    collection: &str,
    documents: &mut Vec<Document>,
    unique: &[Document],
    changes: &[Change],
) -> Result<()> {
    for change in changes {
        match change {
            Change::Remove(id) => documents.retain(|document| document.get(ID_FIELD) != Some(id)),
            Change::Put(document) => {
                let existing = document
                    .get(ID_FIELD)
                    .and_then(|id| position(documents, id));
                check_unique(collection, documents, unique, document, existing)?;
                match existing {
                    Some(index) => documents[index] = document.clone(),
                    None => documents.push(document.clone()),
                }
            }
        }
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data operations issued so far (inserts, reads, updates, deletes,
    /// counts and pipelines)
    pub fn issued_queries(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Committed documents of a collection, in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.state
            .lock()
            .map(|state| {
                state
                    .collections
                    .get(collection)
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn with_collection<R>(
        &self,
        op: &str,
        collection: &str,
        write: bool,
        session: Option<&mut MemorySession>,
        f: impl FnOnce(&mut Vec<Document>, &[Document]) -> Result<R>,
    ) -> Result<R> {
        self.issued.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().map_err(|_| poisoned(op))?;
        let State {
            collections,
            indexes,
        } = &mut *state;
        let unique = indexes.get(collection).map(Vec::as_slice).unwrap_or(&[]);

        match session.and_then(|session| session.transaction.as_mut()) {
            Some(transaction) => {
                let documents = transaction
                    .staged
                    .entry(collection.to_string())
                    .or_insert_with(|| collections.get(collection).cloned().unwrap_or_default());
                if !write {
                    return f(documents, unique);
                }
                let before = documents.clone();
                let result = f(documents, unique);
                let changes = diff(&before, documents);
                if !changes.is_empty() {
                    transaction
                        .changes
                        .entry(collection.to_string())
                        .or_default()
                        .extend(changes);
                }
                result
            }
            None => f(collections.entry(collection.to_string()).or_default(), unique),
        }
    }
}

impl DocumentStore for MemoryStore {
    type Session = MemorySession;

    fn start_session(&self) -> Result<MemorySession> {
        Ok(MemorySession {
            id: self.sessions.fetch_add(1, Ordering::SeqCst) + 1,
            transaction: None,
        })
    }

    fn start_transaction(&self, session: &mut MemorySession) -> Result<()> {
        if session.transaction.is_some() {
            return Err(transaction_error(
                "start_transaction",
                "transaction already in progress",
            ));
        }
        session.transaction = Some(Transaction::default());
        Ok(())
    }

    fn commit_transaction(&self, session: &mut MemorySession) -> Result<()> {
        let Some(transaction) = session.transaction.take() else {
            return Err(transaction_error("commit_transaction", "no transaction started"));
        };

        let mut state = self
            .state
            .lock()
            .map_err(|_| poisoned("commit_transaction"))?;

        // replay onto copies so a conflict leaves the live state untouched
        let mut replayed = Vec::with_capacity(transaction.changes.len());
        for (collection, changes) in &transaction.changes {
            let unique = state.indexes.get(collection).map(Vec::as_slice).unwrap_or(&[]);
            let mut documents = state.collections.get(collection).cloned().unwrap_or_default();
            replay(collection, &mut documents, unique, changes)
                .map_err(|err| err.with_op("commit_transaction"))?;
            replayed.push((collection.clone(), documents));
        }
        state.collections.extend(replayed);
        Ok(())
    }

    fn abort_transaction(&self, session: &mut MemorySession) -> Result<()> {
        match session.transaction.take() {
            Some(_) => Ok(()),
            None => Err(transaction_error("abort_transaction", "no transaction started")),
        }
    }

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Bson> {
        self.with_collection("insert_one", collection, true, session, |documents, unique| {
            insert(collection, documents, unique, document)
        })
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut MemorySession>,
    ) -> Result<Vec<Bson>> {
        self.with_collection("insert_many", collection, true, session, |stored, unique| {
            documents
                .into_iter()
                .map(|document| insert(collection, stored, unique, document))
                .collect()
        })
    }

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Option<Document>> {
        self.with_collection("find_one", collection, false, session, |documents, _| {
            for document in documents.iter() {
                if matches(document, &filter)? {
                    return Ok(Some(document.clone()));
                }
            }
            Ok(None)
        })
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Vec<Document>> {
        self.with_collection("find", collection, false, session, |documents, _| {
            let mut found = Vec::new();
            for document in documents.iter() {
                if matches(document, &filter)? {
                    found.push(document.clone());
                }
            }
            Ok(found)
        })
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Option<Document>> {
        self.with_collection(
            "find_one_and_update",
            collection,
            true,
            session,
            |documents, unique| update_first(collection, documents, unique, &filter, &update),
        )
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<u64> {
        self.with_collection("update_one", collection, true, session, |documents, unique| {
            let updated = update_first(collection, documents, unique, &filter, &update)?;
            Ok(u64::from(updated.is_some()))
        })
    }

    fn count(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<u64> {
        self.with_collection("count", collection, false, session, |documents, _| {
            let mut count = 0;
            for document in documents.iter() {
                if matches(document, &filter)? {
                    count += 1;
                }
            }
            Ok(count)
        })
    }

    fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<u64> {
        self.with_collection("delete_many", collection, true, session, |documents, _| {
            let mut kept = Vec::with_capacity(documents.len());
            let mut deleted = 0;
            for document in documents.drain(..) {
                if matches(&document, &filter)? {
                    deleted += 1;
                } else {
                    kept.push(document);
                }
            }
            *documents = kept;
            Ok(deleted)
        })
    }

    fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        session: Option<&mut MemorySession>,
    ) -> Result<Vec<Document>> {
        self.with_collection("aggregate", collection, false, session, |documents, _| {
            run_pipeline(documents.clone(), &pipeline)
        })
    }

    fn create_unique_indexes(&self, collection: &str, keys: Vec<Document>) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| poisoned("create_unique_indexes"))?;
        let State {
            collections,
            indexes,
        } = &mut *state;
        let documents = collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        let existing = indexes.entry(collection.to_string()).or_default();

        for key in keys {
            if existing.contains(&key) {
                continue;
            }
            for (index, document) in documents.iter().enumerate() {
                let value = index_key(document, &key);
                if documents[index + 1..]
                    .iter()
                    .any(|other| same_key(&value, &index_key(other, &key)))
                {
                    return Err(duplicate_key(collection, &key.to_string()));
                }
            }
            existing.push(key);
        }
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(self) {}
}
