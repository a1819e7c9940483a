//! Identifier generation.

/// Generate a stable id for a region or result created without one.
///
/// Ids are UUIDv4 strings; results hydrated from the wire keep whatever id
/// they arrived with.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
