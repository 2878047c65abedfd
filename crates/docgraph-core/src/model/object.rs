/// An entity with an identity key
///
/// Relation targets whose collection is named by the declaring field only need
/// this contract.
pub trait Object {
    /// Identity text; empty means "not assigned yet"
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
}

/// An entity that owns its storage collection
///
/// The identity is unique within `COLLECTION` and is stored as the document's
/// primary key (`_id`).
pub trait StorableObject: Object {
    const COLLECTION: &'static str;
}
