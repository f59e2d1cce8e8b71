//! The row shape shared by both persisted collections: a server-assigned
//! id, an RFC 3339 creation timestamp, and a JSON payload carrying
//! whatever nested fields the caller provided — no referential integrity,
//! no fixed columns.

/// One stored record from either the `markers` or `simulation_results`
/// collection.
#[derive(Clone, Debug)]
pub struct StoredRecord {
    pub id: String,
    pub created_at: String,
    pub payload: serde_json::Value,
}
