//! Filter, update and pipeline evaluation for the in-memory backend
//!
//! Covers the subset of the query language the repository issues: equality
//! on dotted paths with array membership, `$eq`/`$ne`/`$in`, `$set` updates,
//! and the `$match`/`$skip`/`$limit`/`$count` stages.

use bson::{doc, Bson, Document};

use crate::errors::{unsupported, Result};

fn lookup<'a>(value: &'a Bson, path: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = path.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Bson::Document(document) => {
            if let Some(next) = document.get(*head) {
                lookup(next, rest, out);
            }
        }
        Bson::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(next) = items.get(index) {
                    lookup(next, rest, out);
                }
            }
            Err(_) => {
                for item in items {
                    lookup(item, path, out);
                }
            }
        },
        _ => {}
    }
}

/// Every value reachable at a dotted path, descending through arrays
pub(crate) fn values<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((head, rest)) = parts.split_first() {
        if let Some(value) = document.get(*head) {
            lookup(value, rest, &mut out);
        }
    }
    out
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn equals(a: &Bson, b: &Bson) -> bool {
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn contains(candidates: &[&Bson], expected: &Bson) -> bool {
    if matches!(expected, Bson::Null) && candidates.is_empty() {
        return true;
    }
    candidates.iter().any(|candidate| {
        equals(candidate, expected)
            || matches!(candidate, Bson::Array(items) if items.iter().any(|item| equals(item, expected)))
    })
}

fn operator(candidates: &[&Bson], op: &str, argument: &Bson) -> Result<bool> {
    Ok(match op {
        "$eq" => contains(candidates, argument),
        "$ne" => !contains(candidates, argument),
        "$in" => argument
            .as_array()
            .ok_or_else(|| unsupported("find", "$in argument (expected an array)"))?
            .iter()
            .any(|value| contains(candidates, value)),
        other => return Err(unsupported("find", &format!("query operator {}", other))),
    })
}

fn is_operator_document(value: &Bson) -> Option<&Document> {
    value
        .as_document()
        .filter(|document| document.keys().next().is_some_and(|key| key.starts_with('$')))
}

/// Whether `document` satisfies every condition of `filter`
///
/// # Errors
///
/// `InvalidInput` for operators outside the supported subset.
pub(crate) fn matches(document: &Document, filter: &Document) -> Result<bool> {
    for (key, condition) in filter {
        if key.starts_with('$') {
            return Err(unsupported("find", &format!("query operator {}", key)));
        }
        let candidates = values(document, key);
        let satisfied = match is_operator_document(condition) {
            Some(operators) => {
                let mut all = true;
                for (op, argument) in operators {
                    if !operator(&candidates, op, argument)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            None => contains(&candidates, condition),
        };

        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(child)) = document.get_mut(head) {
                set_path(child, rest, value);
            }
        }
    }
}

/// Apply an operator update document in place
///
/// # Errors
///
/// `InvalidInput` for replacement documents or unsupported operators.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> Result<()> {
    if update.is_empty() {
        return Err(unsupported("update", "empty update document"));
    }

    for (op, spec) in update {
        let fields = spec
            .as_document()
            .ok_or_else(|| unsupported("update", &format!("{} argument", op)))?;

        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(document, path, value.clone());
                }
            }
            other => return Err(unsupported("update", &format!("update operator {}", other))),
        }
    }
    Ok(())
}

fn first<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    values(document, path).into_iter().next()
}

/// Values of an index's key fields; missing fields count as null
pub(crate) fn index_key(document: &Document, keys: &Document) -> Vec<Bson> {
    keys.keys()
        .map(|path| first(document, path).cloned().unwrap_or(Bson::Null))
        .collect()
}

/// Whether two index keys collide
pub(crate) fn same_key(a: &[Bson], b: &[Bson]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
}

fn count_argument(stage: &str, value: &Bson) -> Result<usize> {
    number(value)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as usize)
        .ok_or_else(|| unsupported("aggregate", &format!("{} argument", stage)))
}

/// Run pipeline stages over a collection's documents
///
/// # Errors
///
/// `InvalidInput` for unsupported stages or malformed stage arguments.
pub(crate) fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> Result<Vec<Document>> {
    for stage in pipeline {
        let mut entries = stage.iter();
        let (name, spec) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(unsupported("aggregate", "stage shape (expected one operator)")),
        };

        match name.as_str() {
            "$match" => {
                let filter = spec
                    .as_document()
                    .ok_or_else(|| unsupported("aggregate", "$match argument"))?;
                let mut kept = Vec::with_capacity(documents.len());
                for document in documents {
                    if matches(&document, filter)? {
                        kept.push(document);
                    }
                }
                documents = kept;
            }
            "$skip" => {
                let n = count_argument(name, spec)?;
                documents = documents.into_iter().skip(n).collect();
            }
            "$limit" => {
                let n = count_argument(name, spec)?;
                documents.truncate(n);
            }
            "$count" => {
                let field = spec
                    .as_str()
                    .filter(|field| !field.is_empty() && !field.starts_with('$'))
                    .ok_or_else(|| unsupported("aggregate", "$count argument"))?;
                documents = if documents.is_empty() {
                    Vec::new()
                } else {
                    vec![doc! { field: documents.len() as i64 }]
                };
            }
            other => return Err(unsupported("aggregate", &format!("stage {}", other))),
        }
    }
    Ok(documents)
}
