use bson::{Bson, Document};

/// One equality condition of a lookup
///
/// A slice of filters is a conjunction; keys keep their order, and a repeated
/// key keeps the last value.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub key: String,
    pub value: Bson,
}

impl Filter {
    pub fn new(key: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build the query document for a conjunction of filters
    pub fn to_document(filters: &[Filter]) -> Document {
        let mut document = Document::new();
        for filter in filters {
            document.insert(filter.key.clone(), filter.value.clone());
        }
        document
    }
}
