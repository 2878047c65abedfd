use bson::{doc, Bson, Document};
use docgraph_core::errors::{serialization, DgError, DocGraphError, Result};
use docgraph_core::model::{Filter, Graph, Node, StorableObject};
use docgraph_core::traversal::{self, Resolver};
use docgraph_core_types::{RequestContext, RequestId};
use serde::de::DeserializeOwned;

use super::{observed, Entity};
use crate::backend::DocumentStore;
use crate::config::RepoOptions;
use crate::id::ID_FIELD;

/// Per-call handle onto the store
///
/// Outside a transaction the repository hands out session-less contexts;
/// inside [`Repository::with_transaction`](super::Repository::with_transaction)
/// every call made through the context joins the transaction.
pub struct Context<'a, S: DocumentStore> {
    store: &'a S,
    options: RepoOptions,
    session: Option<&'a mut S::Session>,
    request: RequestContext,
}

/// Parse a pipeline literal (extended JSON array of stage documents)
///
/// # Errors
///
/// `InvalidInput` when the text is not JSON, not an array, or holds a
/// non-document stage.
pub fn parse_pipeline(text: &str) -> Result<Vec<Document>> {
    let invalid = |reason: String| DgError::from(DocGraphError::InvalidPipeline { reason });

    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
    let stages = match Bson::try_from(json).map_err(|e| invalid(e.to_string()))? {
        Bson::Array(stages) => stages,
        other => {
            return Err(invalid(format!(
                "expected an array of stages, found {:?}",
                other.element_type()
            )))
        }
    };

    stages
        .into_iter()
        .map(|stage| match stage {
            Bson::Document(stage) => Ok(stage),
            other => Err(invalid(format!(
                "stage is not a document: {}",
                other
            ))),
        })
        .collect()
}

fn no_results(collection: &str, id: Option<&str>) -> DgError {
    DocGraphError::NoResults {
        collection: collection.to_string(),
        id: id.map(str::to_string),
    }
    .into()
}

impl<'a, S: DocumentStore> Context<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        options: RepoOptions,
        session: Option<&'a mut S::Session>,
        request: RequestContext,
    ) -> Self {
        Self {
            store,
            options,
            session,
            request,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request.request_id
    }

    pub fn options(&self) -> RepoOptions {
        self.options
    }

    /// Whether calls on this context join a transaction
    pub fn in_transaction(&self) -> bool {
        self.session.is_some()
    }

    fn run<R>(
        &mut self,
        op: &'static str,
        collection: &str,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let request = self.request.clone();
        observed(op, collection, &request, || f(self))
    }

    fn store(&mut self) -> (&'a S, Option<&mut S::Session>) {
        (self.store, self.session.as_deref_mut())
    }

    /// Decode a stored document into `target`
    fn hydrate(&self, target: &mut dyn Node, mut document: Document) -> Result<()> {
        self.options.id_type.normalize(&mut document);
        target.hydrate(document)
    }

    fn encode<T: Entity>(&self, op: &str, entity: &mut T) -> Result<Document> {
        if self.options.clear_embedded_fields {
            traversal::clear(entity);
        }
        bson::to_document(&*entity).map_err(|e| serialization(op, e))
    }

    fn load_first<T: Entity>(&mut self, filter: Document, id: Option<&str>, entity: &mut T) -> Result<()> {
        let (store, session) = self.store();
        let document = store
            .find_one(T::COLLECTION, filter, session)?
            .ok_or_else(|| no_results(T::COLLECTION, id))?;

        self.hydrate(entity, document)?;
        if self.options.auto_preload {
            traversal::preload(self, entity)?;
        }
        Ok(())
    }

    fn load_all<T: Entity>(&mut self, filter: Document) -> Result<Vec<T>> {
        let (store, session) = self.store();
        let documents = store.find(T::COLLECTION, filter, session)?;

        let mut entities = Vec::with_capacity(documents.len());
        for document in documents {
            let mut entity = T::default();
            self.hydrate(&mut entity, document)?;
            if self.options.auto_preload {
                traversal::preload(self, &mut entity)?;
            }
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Insert `entity` and write the stored identity back onto it
    ///
    /// Relation targets are reduced to identity stubs first when clearing is
    /// enabled.
    ///
    /// # Errors
    ///
    /// `InvalidId` for a malformed caller-supplied ObjectId, `DuplicateKey`,
    /// or driver failures.
    pub fn create<T: Entity>(&mut self, entity: &mut T) -> Result<()> {
        self.run("create", T::COLLECTION, |ctx| {
            let mut document = ctx.encode("create", entity)?;
            ctx.options.id_type.prepare_insert(&mut document)?;

            let (store, session) = ctx.store();
            let id = store.insert_one(T::COLLECTION, document, session)?;
            entity.set_id(ctx.options.id_type.from_stored(&id)?);
            Ok(())
        })
    }

    /// Overwrite the stored fields of the document with identity `id`
    ///
    /// The identity itself is never rewritten. No concurrency check: the last
    /// writer wins.
    ///
    /// # Errors
    ///
    /// `InvalidId` before any query for a malformed ObjectId, `NotFound` when
    /// no document has that identity.
    pub fn update<T: Entity>(&mut self, id: &str, entity: &mut T) -> Result<()> {
        self.run("update", T::COLLECTION, |ctx| {
            let filter = ctx.options.id_type.filter(id)?;
            let mut fields = ctx.encode("update", entity)?;
            fields.remove(ID_FIELD);

            let (store, session) = ctx.store();
            store
                .find_one_and_update(T::COLLECTION, filter, doc! { "$set": fields }, session)?
                .map(|_| ())
                .ok_or_else(|| no_results(T::COLLECTION, Some(id)))
        })
    }

    /// Load the document with identity `id` into `entity`
    ///
    /// # Errors
    ///
    /// `InvalidId` before any query for a malformed ObjectId, `NotFound` when
    /// nothing matches, or the first preload failure.
    pub fn get_by_id<T: Entity>(&mut self, id: &str, entity: &mut T) -> Result<()> {
        self.run("get_by_id", T::COLLECTION, |ctx| {
            let filter = ctx.options.id_type.filter(id)?;
            ctx.load_first(filter, Some(id), entity)
        })
    }

    /// Load the first document matching every filter into `entity`
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches, or the first preload failure.
    pub fn get_by<T: Entity>(&mut self, entity: &mut T, filters: &[Filter]) -> Result<()> {
        self.run("get_by", T::COLLECTION, |ctx| {
            ctx.load_first(Filter::to_document(filters), None, entity)
        })
    }

    /// Every document matching the filters, decoded in store order
    ///
    /// # Errors
    ///
    /// Driver or decode failures, or the first preload failure.
    pub fn fetch<T: Entity>(&mut self, filters: &[Filter]) -> Result<Vec<T>> {
        self.run("fetch", T::COLLECTION, |ctx| {
            ctx.load_all(Filter::to_document(filters))
        })
    }

    /// [`Context::fetch`] projected into another shape
    ///
    /// # Errors
    ///
    /// Same as [`Context::fetch`].
    pub fn fetch_as<T, V>(&mut self, filters: &[Filter]) -> Result<Vec<V>>
    where
        T: Entity,
        V: From<T>,
    {
        self.run("fetch_as", T::COLLECTION, |ctx| {
            let entities: Vec<T> = ctx.load_all(Filter::to_document(filters))?;
            Ok(entities.into_iter().map(V::from).collect())
        })
    }

    /// Run a pipeline literal over `T`'s collection and decode the first result
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an unparsable pipeline, `Serialization` when the
    /// first result does not decode as `O`, or the first preload failure.
    pub fn aggregate<T, O>(&mut self, pipeline: &str) -> Result<Option<O>>
    where
        T: StorableObject,
        O: DeserializeOwned + Graph,
    {
        self.run("aggregate", T::COLLECTION, |ctx| {
            let stages = parse_pipeline(pipeline)?;
            let (store, session) = ctx.store();
            let results = store.aggregate(T::COLLECTION, stages, session)?;

            let Some(mut first) = results.into_iter().next() else {
                return Ok(None);
            };
            ctx.options.id_type.normalize(&mut first);

            let mut out: O =
                bson::from_document(first).map_err(|e| serialization("aggregate", e))?;
            if ctx.options.auto_preload {
                traversal::preload(ctx, &mut out)?;
            }
            Ok(Some(out))
        })
    }

    /// # Errors
    ///
    /// Driver failures.
    pub fn count<T: StorableObject>(&mut self, filter: Document) -> Result<u64> {
        self.run("count", T::COLLECTION, |ctx| {
            let (store, session) = ctx.store();
            store.count(T::COLLECTION, filter, session)
        })
    }

    /// Apply an update document to the first match; returns the matched count
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub fn update_one<T: StorableObject>(
        &mut self,
        filter: Document,
        update: Document,
    ) -> Result<u64> {
        self.run("update_one", T::COLLECTION, |ctx| {
            let (store, session) = ctx.store();
            store.update_one(T::COLLECTION, filter, update, session)
        })
    }

    /// Insert entities in order and write each stored identity back
    ///
    /// An empty slice issues no write.
    ///
    /// # Errors
    ///
    /// `InvalidId`, `DuplicateKey` (earlier entities stay inserted), or
    /// driver failures.
    pub fn create_many<T: Entity>(&mut self, entities: &mut [T]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        self.run("create_many", T::COLLECTION, |ctx| {
            let mut documents = Vec::with_capacity(entities.len());
            for entity in entities.iter_mut() {
                let mut document = ctx.encode("create_many", entity)?;
                ctx.options.id_type.prepare_insert(&mut document)?;
                documents.push(document);
            }

            let (store, session) = ctx.store();
            let ids = store.insert_many(T::COLLECTION, documents, session)?;
            for (entity, id) in entities.iter_mut().zip(&ids) {
                entity.set_id(ctx.options.id_type.from_stored(id)?);
            }
            Ok(())
        })
    }

    /// Remove every document of `T`'s collection; returns the deleted count
    ///
    /// # Errors
    ///
    /// Driver failures.
    pub fn delete_all<T: StorableObject>(&mut self) -> Result<u64> {
        self.run("delete_all", T::COLLECTION, |ctx| {
            let (store, session) = ctx.store();
            store.delete_many(T::COLLECTION, Document::new(), session)
        })
    }

    /// One unique index per key document, e.g. `doc! { "email": 1 }`
    ///
    /// # Errors
    ///
    /// `DuplicateKey` when stored documents already collide.
    pub fn create_unique_indexes<T: StorableObject>(&mut self, keys: &[Document]) -> Result<()> {
        self.run("create_unique_indexes", T::COLLECTION, |ctx| {
            ctx.store.create_unique_indexes(T::COLLECTION, keys.to_vec())
        })
    }

    /// Hydrate the relations of an object already in memory
    ///
    /// # Errors
    ///
    /// The first resolution failure.
    pub fn preload<G: Graph + ?Sized>(&mut self, graph: &mut G) -> Result<()> {
        self.run("preload", "", |ctx| traversal::preload(ctx, graph))
    }

    /// # Errors
    ///
    /// The first resolution failure.
    pub fn preload_many<G: Graph>(&mut self, items: &mut [G]) -> Result<()> {
        self.run("preload_many", "", |ctx| traversal::preload_all(ctx, items))
    }
}

impl<S: DocumentStore> Resolver for Context<'_, S> {
    fn resolve(&mut self, collection: &str, target: &mut dyn Node) -> Result<()> {
        let id = target.identity().to_string();
        let filter = self.options.id_type.filter(&id)?;

        let (store, session) = self.store();
        let document = store
            .find_one(collection, filter, session)?
            .ok_or_else(|| no_results(collection, Some(&id)))?;

        self.hydrate(target, document)?;
        if self.options.auto_preload {
            traversal::preload(self, target)?;
        }
        Ok(())
    }
}
