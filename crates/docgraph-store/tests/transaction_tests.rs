#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use bson::{Bson, Document};
use common::{customer, memory_repo, options, order, Customer, Order};
use docgraph_core::errors::{DgError, DgErrorKind, Result};
use docgraph_store::backend::MemorySession;
use docgraph_store::{DocumentStore, IdType, MemoryStore, Repository};

/// Memory store whose commit or abort can be made to fail
struct Flaky {
    inner: MemoryStore,
    fail_commit: bool,
    fail_abort: bool,
}

fn refused(op: &str) -> DgError {
    DgError::new(DgErrorKind::Transaction)
        .with_op(op.to_string())
        .with_message("server unreachable")
}

impl DocumentStore for Flaky {
    type Session = MemorySession;

    fn start_session(&self) -> Result<MemorySession> {
        self.inner.start_session()
    }

    fn start_transaction(&self, session: &mut MemorySession) -> Result<()> {
        self.inner.start_transaction(session)
    }

    fn commit_transaction(&self, session: &mut MemorySession) -> Result<()> {
        if self.fail_commit {
            return Err(refused("commit_transaction"));
        }
        self.inner.commit_transaction(session)
    }

    fn abort_transaction(&self, session: &mut MemorySession) -> Result<()> {
        if self.fail_abort {
            return Err(refused("abort_transaction"));
        }
        self.inner.abort_transaction(session)
    }

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Bson> {
        self.inner.insert_one(collection, document, session)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut MemorySession>,
    ) -> Result<Vec<Bson>> {
        self.inner.insert_many(collection, documents, session)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Option<Document>> {
        self.inner.find_one(collection, filter, session)
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Vec<Document>> {
        self.inner.find(collection, filter, session)
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Option<Document>> {
        self.inner
            .find_one_and_update(collection, filter, update, session)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<u64> {
        self.inner.update_one(collection, filter, update, session)
    }

    fn count(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<u64> {
        self.inner.count(collection, filter, session)
    }

    fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<u64> {
        self.inner.delete_many(collection, filter, session)
    }

    fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        session: Option<&mut MemorySession>,
    ) -> Result<Vec<Document>> {
        self.inner.aggregate(collection, pipeline, session)
    }

    fn create_unique_indexes(&self, collection: &str, keys: Vec<Document>) -> Result<()> {
        self.inner.create_unique_indexes(collection, keys)
    }

    fn ping(&self) -> Result<()> {
        self.inner.ping()
    }

    fn shutdown(self) {
        self.inner.shutdown();
    }
}

fn flaky_repo(fail_commit: bool, fail_abort: bool) -> Repository<Flaky> {
    Repository::with_store(
        Flaky {
            inner: MemoryStore::new(),
            fail_commit,
            fail_abort,
        },
        options(IdType::String),
    )
}

#[test]
fn test_commit_applies_every_write() {
    // Given an empty store
    let repo = memory_repo(options(IdType::String));

    // When two dependent writes run in one transaction
    let order_id = repo
        .with_transaction(|ctx| {
            assert!(ctx.in_transaction());
            ctx.create(&mut customer("c1", "Ada"))?;
            let mut placed = order("A-1", customer("c1", "Ada"), vec![]);
            ctx.create(&mut placed)?;
            Ok(placed.id)
        })
        .unwrap();

    // Then both are visible afterwards, and reads preload across them
    let mut loaded = Order::default();
    repo.get_by_id(&order_id, &mut loaded).unwrap();
    assert_eq!(loaded.customer, customer("c1", "Ada"));
}

#[test]
fn test_writes_are_invisible_outside_until_commit() {
    let repo = memory_repo(options(IdType::String));

    repo.with_transaction(|ctx| {
        ctx.create(&mut customer("c1", "Ada"))?;

        // The transaction reads its own write, the outside does not
        assert_eq!(ctx.count::<Customer>(Document::new())?, 1);
        assert_eq!(repo.count::<Customer>(Document::new())?, 0);

        let mut ada = Customer::default();
        ctx.get_by_id("c1", &mut ada)?;
        assert_eq!(ada.name, "Ada");
        Ok(())
    })
    .unwrap();

    assert_eq!(repo.count::<Customer>(Document::new()).unwrap(), 1);
}

#[test]
fn test_writes_outside_the_session_survive_commit() {
    // Given a transaction that writes one customer while a plain call writes another
    let repo = memory_repo(options(IdType::String));

    repo.with_transaction(|ctx| {
        ctx.create(&mut customer("c1", "Ada"))?;
        repo.create(&mut customer("c2", "Grace"))?;
        Ok(())
    })
    .unwrap();

    // Then the commit applies only its own write and both customers exist
    let mut ids: Vec<String> = repo
        .fetch::<Customer>(&[])
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["c1".to_string(), "c2".to_string()]);
}

#[test]
fn test_body_error_rolls_back_and_is_returned() {
    // Given a body that writes and then fails
    let repo = memory_repo(options(IdType::String));

    let err = repo
        .with_transaction(|ctx| {
            ctx.create(&mut customer("c1", "Ada"))?;
            ctx.get_by_id("missing", &mut Customer::default())?;
            Ok(())
        })
        .unwrap_err();

    // Then the body's own error comes back and nothing was persisted
    assert!(err.is_not_found());
    assert_eq!(err.op(), Some("get_by_id"));
    assert!(repo.store().documents("customers").is_empty());
}

#[test]
fn test_abort_failure_does_not_mask_body_error() {
    let repo = flaky_repo(false, true);

    let err = repo
        .with_transaction(|ctx| -> Result<()> {
            ctx.create(&mut customer("c1", "Ada"))?;
            Err(DgError::new(DgErrorKind::InvalidInput).with_message("rejected by caller"))
        })
        .unwrap_err();

    assert_eq!(err.kind(), DgErrorKind::InvalidInput);
    assert_eq!(err.message(), "rejected by caller");
    assert_eq!(err.op(), Some("with_transaction"));
}

#[test]
fn test_commit_failure_is_reported() {
    let repo = flaky_repo(true, false);

    let err = repo
        .with_transaction(|ctx| ctx.create(&mut customer("c1", "Ada")))
        .unwrap_err();

    assert_eq!(err.kind(), DgErrorKind::Transaction);
    assert_eq!(err.op(), Some("commit_transaction"));
    assert!(repo.store().inner.documents("customers").is_empty());
}

#[test]
fn test_contexts_outside_transactions_have_no_session() {
    let repo = memory_repo(options(IdType::String));
    assert!(!repo.context().in_transaction());
}

#[test]
fn test_bulk_operations_inside_transaction() {
    let repo = memory_repo(options(IdType::String));

    repo.with_transaction(|ctx| {
        let mut customers = vec![customer("c1", "Ada"), customer("c2", "Grace")];
        ctx.create_many(&mut customers)?;
        assert_eq!(ctx.delete_all::<Customer>()?, 2);
        ctx.create(&mut customer("c3", "Barbara"))?;
        Ok(())
    })
    .unwrap();

    let stored = repo.store().documents("customers");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get_str("_id").unwrap(), "c3");
}
