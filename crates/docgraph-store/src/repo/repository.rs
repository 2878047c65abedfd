use bson::Document;
use docgraph_core::errors::Result;
use docgraph_core::model::{Filter, Graph, StorableObject};
use docgraph_core_types::RequestContext;
use serde::de::DeserializeOwned;

use super::{observed, Context, Entity};
use crate::backend::{DocumentStore, MongoStore};
use crate::config::{Config, RepoOptions};
use crate::db;

/// Persistence facade over one database
///
/// Every call outside [`Repository::with_transaction`] runs on a fresh
/// [`Context`] with its own request id.
pub struct Repository<S: DocumentStore = MongoStore> {
    store: S,
    options: RepoOptions,
}

impl Repository<MongoStore> {
    /// Validate `config`, then adopt its driver handle or dial the server
    ///
    /// # Errors
    ///
    /// `InvalidConfig` from validation, `Connection` when the server does not
    /// answer the initial ping.
    pub fn connect(mut config: Config) -> Result<Self> {
        config.validate()?;

        let driver = match config.driver.take() {
            Some(driver) => driver,
            None => db::connect(&config)?,
        };
        Ok(Self::with_store(MongoStore::new(driver), config.options))
    }
}

impl<S: DocumentStore> Repository<S> {
    pub fn with_store(store: S, options: RepoOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> RepoOptions {
        self.options
    }

    /// A session-less context with a fresh request id
    pub fn context(&self) -> Context<'_, S> {
        self.context_with(RequestContext::new())
    }

    /// A session-less context correlated with the caller's request
    pub fn context_with(&self, request: RequestContext) -> Context<'_, S> {
        Context::new(&self.store, self.options, None, request)
    }

    /// Run `body` inside one transaction
    ///
    /// Commits when `body` succeeds. When it fails the transaction is aborted
    /// and the body's error is returned; a failed abort is only logged.
    ///
    /// # Errors
    ///
    /// `Transaction` when the session cannot be started or the commit is
    /// rejected, otherwise the error `body` returned.
    pub fn with_transaction<R>(
        &self,
        body: impl FnOnce(&mut Context<'_, S>) -> Result<R>,
    ) -> Result<R> {
        self.with_transaction_in(RequestContext::new(), body)
    }

    /// [`Repository::with_transaction`] correlated with the caller's request
    ///
    /// # Errors
    ///
    /// See [`Repository::with_transaction`].
    pub fn with_transaction_in<R>(
        &self,
        request: RequestContext,
        body: impl FnOnce(&mut Context<'_, S>) -> Result<R>,
    ) -> Result<R> {
        let correlation = request.clone();
        let request_id = request.request_id.clone();

        observed("with_transaction", "", &correlation, || {
            let mut session = self.store.start_session()?;
            self.store.start_transaction(&mut session)?;

            let outcome = {
                let mut ctx = Context::new(&self.store, self.options, Some(&mut session), request);
                body(&mut ctx)
            };

            match outcome {
                Ok(value) => {
                    self.store.commit_transaction(&mut session)?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(abort) = self.store.abort_transaction(&mut session) {
                        tracing::warn!(
                            request_id = %request_id,
                            error = %abort,
                            "transaction abort failed after body error"
                        );
                    }
                    Err(err)
                }
            }
        })
    }

    /// # Errors
    ///
    /// See [`Context::create`].
    pub fn create<T: Entity>(&self, entity: &mut T) -> Result<()> {
        self.context().create(entity)
    }

    /// # Errors
    ///
    /// See [`Context::update`].
    pub fn update<T: Entity>(&self, id: &str, entity: &mut T) -> Result<()> {
        self.context().update(id, entity)
    }

    /// # Errors
    ///
    /// See [`Context::get_by_id`].
    pub fn get_by_id<T: Entity>(&self, id: &str, entity: &mut T) -> Result<()> {
        self.context().get_by_id(id, entity)
    }

    /// # Errors
    ///
    /// See [`Context::get_by`].
    pub fn get_by<T: Entity>(&self, entity: &mut T, filters: &[Filter]) -> Result<()> {
        self.context().get_by(entity, filters)
    }

    /// # Errors
    ///
    /// See [`Context::fetch`].
    pub fn fetch<T: Entity>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        self.context().fetch(filters)
    }

    /// # Errors
    ///
    /// See [`Context::fetch_as`].
    pub fn fetch_as<T: Entity, V: From<T>>(&self, filters: &[Filter]) -> Result<Vec<V>> {
        self.context().fetch_as::<T, V>(filters)
    }

    /// # Errors
    ///
    /// See [`Context::aggregate`].
    pub fn aggregate<T, O>(&self, pipeline: &str) -> Result<Option<O>>
    where
        T: StorableObject,
        O: DeserializeOwned + Graph,
    {
        self.context().aggregate::<T, O>(pipeline)
    }

    /// # Errors
    ///
    /// See [`Context::count`].
    pub fn count<T: StorableObject>(&self, filter: Document) -> Result<u64> {
        self.context().count::<T>(filter)
    }

    /// # Errors
    ///
    /// See [`Context::update_one`].
    pub fn update_one<T: StorableObject>(&self, filter: Document, update: Document) -> Result<u64> {
        self.context().update_one::<T>(filter, update)
    }

    /// # Errors
    ///
    /// See [`Context::create_many`].
    pub fn create_many<T: Entity>(&self, entities: &mut [T]) -> Result<()> {
        self.context().create_many(entities)
    }

    /// # Errors
    ///
    /// See [`Context::delete_all`].
    pub fn delete_all<T: StorableObject>(&self) -> Result<u64> {
        self.context().delete_all::<T>()
    }

    /// # Errors
    ///
    /// See [`Context::create_unique_indexes`].
    pub fn create_unique_indexes<T: StorableObject>(&self, keys: &[Document]) -> Result<()> {
        self.context().create_unique_indexes::<T>(keys)
    }

    /// # Errors
    ///
    /// See [`Context::preload`].
    pub fn preload<G: Graph + ?Sized>(&self, graph: &mut G) -> Result<()> {
        self.context().preload(graph)
    }

    /// # Errors
    ///
    /// See [`Context::preload_many`].
    pub fn preload_many<G: Graph>(&self, items: &mut [G]) -> Result<()> {
        self.context().preload_many(items)
    }

    /// # Errors
    ///
    /// `Connection` when the server does not answer.
    pub fn ping(&self) -> Result<()> {
        self.store.ping()
    }

    /// Release the backend's connections
    pub fn disconnect(self) {
        self.store.shutdown();
    }
}
