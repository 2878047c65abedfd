//! MongoDB backend over the synchronous driver

use bson::{doc, Bson, Document};
use mongodb::options::{AggregateOptions, Collation, CollationStrength, IndexOptions};
use mongodb::sync::{ClientSession, Collection, Cursor, SessionCursor};
use mongodb::IndexModel;

use crate::backend::DocumentStore;
use crate::config::Driver;
use crate::errors::{from_mongo, Result};

pub struct MongoStore {
    driver: Driver,
}

impl MongoStore {
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.driver.database.collection::<Document>(name)
    }
}

/// Aggregation options every pipeline runs with
pub fn aggregate_options() -> AggregateOptions {
    let collation = Collation::builder()
        .locale("en")
        .strength(CollationStrength::Tertiary)
        .build();

    AggregateOptions::builder()
        .collation(collation)
        .allow_disk_use(true)
        .build()
}

fn drain(op: &str, cursor: Cursor<Document>) -> Result<Vec<Document>> {
    cursor
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_mongo(op, e))
}

fn drain_session(
    op: &str,
    mut cursor: SessionCursor<Document>,
    session: &mut ClientSession,
) -> Result<Vec<Document>> {
    cursor
        .iter(session)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_mongo(op, e))
}

impl DocumentStore for MongoStore {
    type Session = ClientSession;

    fn start_session(&self) -> Result<ClientSession> {
        self.driver
            .client
            .start_session(None)
            .map_err(|e| from_mongo("start_session", e))
    }

    fn start_transaction(&self, session: &mut ClientSession) -> Result<()> {
        session
            .start_transaction(None)
            .map_err(|e| from_mongo("start_transaction", e))
    }

    fn commit_transaction(&self, session: &mut ClientSession) -> Result<()> {
        session
            .commit_transaction()
            .map_err(|e| from_mongo("commit_transaction", e))
    }

    fn abort_transaction(&self, session: &mut ClientSession) -> Result<()> {
        session
            .abort_transaction()
            .map_err(|e| from_mongo("abort_transaction", e))
    }

    fn insert_one(
        &self,
        collection: &str,
        document: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<Bson> {
        let collection = self.collection(collection);
        let result = match session {
            Some(session) => collection.insert_one_with_session(document, None, session),
            None => collection.insert_one(document, None),
        }
        .map_err(|e| from_mongo("insert_one", e))?;
        Ok(result.inserted_id)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        session: Option<&mut ClientSession>,
    ) -> Result<Vec<Bson>> {
        let count = documents.len();
        let collection = self.collection(collection);
        let result = match session {
            Some(session) => collection.insert_many_with_session(documents, None, session),
            None => collection.insert_many(documents, None),
        }
        .map_err(|e| from_mongo("insert_many", e))?;

        let mut ids = result.inserted_ids;
        Ok((0..count)
            .map(|index| ids.remove(&index).unwrap_or(Bson::Null))
            .collect())
    }

    fn find_one(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<Option<Document>> {
        let collection = self.collection(collection);
        match session {
            Some(session) => collection.find_one_with_session(filter, None, session),
            None => collection.find_one(filter, None),
        }
        .map_err(|e| from_mongo("find_one", e))
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<Vec<Document>> {
        let collection = self.collection(collection);
        match session {
            Some(session) => {
                let cursor = collection
                    .find_with_session(filter, None, session)
                    .map_err(|e| from_mongo("find", e))?;
                drain_session("find", cursor, session)
            }
            None => {
                let cursor = collection
                    .find(filter, None)
                    .map_err(|e| from_mongo("find", e))?;
                drain("find", cursor)
            }
        }
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<Option<Document>> {
        let collection = self.collection(collection);
        match session {
            Some(session) => {
                collection.find_one_and_update_with_session(filter, update, None, session)
            }
            None => collection.find_one_and_update(filter, update, None),
        }
        .map_err(|e| from_mongo("find_one_and_update", e))
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<u64> {
        let collection = self.collection(collection);
        let result = match session {
            Some(session) => collection.update_one_with_session(filter, update, None, session),
            None => collection.update_one(filter, update, None),
        }
        .map_err(|e| from_mongo("update_one", e))?;
        Ok(result.matched_count)
    }

    fn count(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<u64> {
        let collection = self.collection(collection);
        match session {
            Some(session) => collection.count_documents_with_session(filter, None, session),
            None => collection.count_documents(filter, None),
        }
        .map_err(|e| from_mongo("count", e))
    }

    fn delete_many(
        &self,
        collection: &str,
        filter: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<u64> {
        let collection = self.collection(collection);
        let result = match session {
            Some(session) => collection.delete_many_with_session(filter, None, session),
            None => collection.delete_many(filter, None),
        }
        .map_err(|e| from_mongo("delete_many", e))?;
        Ok(result.deleted_count)
    }

    fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        session: Option<&mut ClientSession>,
    ) -> Result<Vec<Document>> {
        let collection = self.collection(collection);
        match session {
            Some(session) => {
                let cursor = collection
                    .aggregate_with_session(pipeline, aggregate_options(), session)
                    .map_err(|e| from_mongo("aggregate", e))?;
                drain_session("aggregate", cursor, session)
            }
            None => {
                let cursor = collection
                    .aggregate(pipeline, aggregate_options())
                    .map_err(|e| from_mongo("aggregate", e))?;
                drain("aggregate", cursor)
            }
        }
    }

    fn create_unique_indexes(&self, collection: &str, keys: Vec<Document>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let models = keys.into_iter().map(|keys| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        });

        self.collection(collection)
            .create_indexes(models, None)
            .map_err(|e| from_mongo("create_unique_indexes", e))?;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        self.driver
            .database
            .run_command(doc! { "ping": 1 }, None)
            .map_err(|e| from_mongo("ping", e))?;
        Ok(())
    }

    fn shutdown(self) {
        tracing::debug!(database = %self.driver.database.name(), "releasing document store client");
        drop(self.driver);
    }
}
