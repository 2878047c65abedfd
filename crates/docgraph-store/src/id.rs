//! Identity strategy
//!
//! A repository stores every `_id` one way for its whole lifetime: either the
//! entity's text identity verbatim, or a driver-generated ObjectId whose text
//! form is 24 hex characters.

use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use docgraph_core::errors::{DgError, DocGraphError, Result};
use serde::{Deserialize, Serialize};

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    /// Identity text is the stored key
    String,
    /// Identity text is the hex form of a binary ObjectId
    #[default]
    ObjectId,
}

impl IdType {
    /// Stored form of an identity
    ///
    /// # Errors
    ///
    /// `InvalidId` when the ObjectId strategy is given text that is not 24 hex
    /// characters.
    pub fn to_stored(&self, id: &str) -> Result<Bson> {
        match self {
            IdType::String => Ok(Bson::String(id.to_string())),
            IdType::ObjectId => ObjectId::parse_str(id)
                .map(Bson::ObjectId)
                .map_err(|_| {
                    DgError::from(DocGraphError::InvalidObjectId {
                        value: id.to_string(),
                    })
                }),
        }
    }

    /// `{ _id: <stored id> }`
    ///
    /// # Errors
    ///
    /// Same as [`IdType::to_stored`].
    pub fn filter(&self, id: &str) -> Result<Document> {
        Ok(doc! { ID_FIELD: self.to_stored(id)? })
    }

    /// Text identity of a stored key
    ///
    /// # Errors
    ///
    /// `Internal` for key types neither strategy produces.
    pub fn from_stored(&self, value: &Bson) -> Result<String> {
        match value {
            Bson::String(text) => Ok(text.clone()),
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            other => Err(DocGraphError::UnsupportedIdentity {
                found: format!("{:?}", other.element_type()),
            }
            .into()),
        }
    }

    /// Rewrite the `_id` of a freshly serialized entity into its stored form
    ///
    /// An empty identity becomes a new UUID under the string strategy and is
    /// removed (left to the driver) under the ObjectId strategy.
    ///
    /// # Errors
    ///
    /// Same as [`IdType::to_stored`].
    pub fn prepare_insert(&self, document: &mut Document) -> Result<()> {
        let id = match document.remove(ID_FIELD) {
            Some(Bson::String(text)) => text,
            Some(other) => {
                document.insert(ID_FIELD, other);
                return Ok(());
            }
            None => String::new(),
        };

        let stored = match (self, id.is_empty()) {
            (IdType::String, true) => Bson::String(uuid::Uuid::now_v7().to_string()),
            (IdType::ObjectId, true) => return Ok(()),
            (_, false) => self.to_stored(&id)?,
        };

        let mut prepared = doc! { ID_FIELD: stored };
        for (key, value) in std::mem::take(document) {
            prepared.insert(key, value);
        }
        *document = prepared;
        Ok(())
    }

    /// Turn a stored ObjectId key back into text so the entity can decode it
    pub fn normalize(&self, document: &mut Document) {
        if let Ok(oid) = document.get_object_id(ID_FIELD) {
            document.insert(ID_FIELD, oid.to_hex());
        }
    }
}
