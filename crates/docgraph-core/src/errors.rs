use docgraph_core_types::RequestId;
use thiserror::Error;

/// Result type alias using DgError
pub type Result<T> = std::result::Result<T, DgError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code. Callers branch on the kind, never on
/// message text; in particular `NotFound` is only ever produced for "zero
/// documents matched", never for transport or driver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DgErrorKind {
    // Caller input
    InvalidInput,
    InvalidConfig,
    InvalidId,

    // Lookup
    NotFound,
    DuplicateKey,

    // Integration
    Serialization,
    Persistence,
    Connection,
    Transaction,

    // Internal
    Internal,
}

impl DgErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            DgErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            DgErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            DgErrorKind::InvalidId => "ERR_INVALID_ID",
            DgErrorKind::NotFound => "ERR_NOT_FOUND",
            DgErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            DgErrorKind::Serialization => "ERR_SERIALIZATION",
            DgErrorKind::Persistence => "ERR_PERSISTENCE",
            DgErrorKind::Connection => "ERR_CONNECTION",
            DgErrorKind::Transaction => "ERR_TRANSACTION",
            DgErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling and optional
/// context (operation, collection, entity id, request id) for debugging.
#[derive(Debug, Clone)]
pub struct DgError {
    kind: DgErrorKind,
    op: Option<String>,
    collection: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl DgError {
    /// Create a new error with the specified kind
    pub fn new(kind: DgErrorKind) -> Self {
        Self {
            kind,
            op: None,
            collection: None,
            entity_id: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add collection context
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> DgErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for the distinguished "no document matched" condition
    pub fn is_not_found(&self) -> bool {
        self.kind == DgErrorKind::NotFound
    }
}

impl std::fmt::Display for DgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(collection) = &self.collection {
            write!(f, " (collection: {})", collection)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for DgError {}

/// Wrap a BSON encoding failure
pub fn serialization(op: &str, err: impl std::fmt::Display) -> DgError {
    DgError::new(DgErrorKind::Serialization)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

// ========== End Error Facility ==========

/// Domain conditions raised by the persistence layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocGraphError {
    /// No document matched the lookup
    #[error("no documents in result")]
    NoResults { collection: String, id: Option<String> },

    /// Identity text is not a valid hex ObjectId
    #[error("invalid object id: {value:?}")]
    InvalidObjectId { value: String },

    /// Neither a URI/database pair nor a driver handle was supplied
    #[error("uri/dbname is required")]
    MissingConnectionParams,

    /// A driver handle was supplied without a usable database
    #[error("invalid mongo driver")]
    InvalidDriver,

    /// Certificate bundle path does not point at a readable file
    #[error("certificate bundle not found: {path}")]
    CertificateNotFound { path: String },

    /// Aggregation pipeline text could not be turned into stages
    #[error("invalid pipeline: {reason}")]
    InvalidPipeline { reason: String },

    /// Stored identity has a type the active strategy cannot render as text
    #[error("unsupported identity value: {found}")]
    UnsupportedIdentity { found: String },
}

impl From<DocGraphError> for DgError {
    fn from(err: DocGraphError) -> Self {
        let message = err.to_string();
        match err {
            DocGraphError::NoResults { collection, id } => {
                let base = DgError::new(DgErrorKind::NotFound)
                    .with_collection(collection)
                    .with_message(message);
                match id {
                    Some(id) => base.with_entity_id(id),
                    None => base,
                }
            }
            DocGraphError::InvalidObjectId { value } => DgError::new(DgErrorKind::InvalidId)
                .with_entity_id(value)
                .with_message(message),
            DocGraphError::MissingConnectionParams | DocGraphError::InvalidDriver => {
                DgError::new(DgErrorKind::InvalidConfig)
                    .with_op("validate_config")
                    .with_message(message)
            }
            DocGraphError::CertificateNotFound { .. } => DgError::new(DgErrorKind::InvalidConfig)
                .with_op("validate_config")
                .with_message(message),
            DocGraphError::InvalidPipeline { .. } => DgError::new(DgErrorKind::InvalidInput)
                .with_op("aggregate")
                .with_message(message),
            DocGraphError::UnsupportedIdentity { .. } => {
                DgError::new(DgErrorKind::Internal).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_op_and_context() {
        let err = DgError::new(DgErrorKind::NotFound)
            .with_op("get_by_id")
            .with_collection("orders")
            .with_entity_id("o1")
            .with_message("no documents in result");

        let text = err.to_string();
        assert!(text.starts_with("[ERR_NOT_FOUND]"));
        assert!(text.contains("get_by_id"));
        assert!(text.contains("orders"));
        assert!(text.contains("o1"));
    }

    #[test]
    fn test_not_found_only_for_not_found_kind() {
        assert!(DgError::new(DgErrorKind::NotFound).is_not_found());
        assert!(!DgError::new(DgErrorKind::Connection).is_not_found());
        assert!(!DgError::new(DgErrorKind::Persistence).is_not_found());
    }
}
