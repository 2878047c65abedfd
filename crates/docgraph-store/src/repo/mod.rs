//! Repository facade
//!
//! [`Repository`] owns the backend and the behavior switches; every data
//! operation runs on a [`Context`], which carries the request id for log
//! correlation and, inside [`Repository::with_transaction`], the session.

mod context;
mod repository;

pub use context::{parse_pipeline, Context};
pub use repository::Repository;

use std::time::Instant;

use docgraph_core::errors::{DgError, Result};
use docgraph_core::model::{Relations, StorableObject};
use docgraph_core::{log_op_end, log_op_error, log_op_start};
use docgraph_core_types::{RequestContext, RequestId, TraceId};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A storable entity the repository can encode, decode, clear and preload
pub trait Entity: StorableObject + Relations + Default + Serialize + DeserializeOwned {}

impl<T> Entity for T where T: StorableObject + Relations + Default + Serialize + DeserializeOwned {}

fn annotate(err: DgError, op: &'static str, collection: &str, request_id: &RequestId) -> DgError {
    let mut err = err;
    if err.op().is_none() {
        err = err.with_op(op);
    }
    if err.collection().is_none() && !collection.is_empty() {
        err = err.with_collection(collection.to_string());
    }
    err.with_request_id(request_id.clone())
}

/// Bracket `f` with start/end (or end_error) events carrying the request's
/// correlation ids; `trace_id` is only recorded when the caller supplied one
pub(crate) fn observed<R>(
    op: &'static str,
    collection: &str,
    request: &RequestContext,
    f: impl FnOnce() -> Result<R>,
) -> Result<R> {
    let start = Instant::now();
    let request_id = &request.request_id;
    let trace_id = request.trace_id.as_ref().map(TraceId::as_str);
    log_op_start!(op, collection = collection, request_id = %request_id, trace_id = trace_id);

    match f() {
        Ok(value) => {
            log_op_end!(
                op,
                duration_ms = start.elapsed().as_millis() as u64,
                collection = collection,
                request_id = %request_id,
                trace_id = trace_id
            );
            Ok(value)
        }
        Err(err) => {
            let err = annotate(err, op, collection, request_id);
            log_op_error!(
                op,
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                collection = collection,
                request_id = %request_id,
                trace_id = trace_id
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::errors::DgErrorKind;

    #[test]
    fn test_annotate_fills_missing_context_only() {
        let request_id = RequestId::new();
        let err = annotate(
            DgError::new(DgErrorKind::NotFound),
            "get_by_id",
            "orders",
            &request_id,
        );
        assert_eq!(err.op(), Some("get_by_id"));
        assert_eq!(err.collection(), Some("orders"));
        assert_eq!(err.request_id(), Some(&request_id));

        let err = annotate(
            DgError::new(DgErrorKind::Persistence)
                .with_op("find_one")
                .with_collection("customers"),
            "get_by_id",
            "orders",
            &request_id,
        );
        assert_eq!(err.op(), Some("find_one"));
        assert_eq!(err.collection(), Some("customers"));
    }
}
