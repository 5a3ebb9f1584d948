//! ID generator port for unique identifiers.

/// Generates unique identifiers, used as branch-name uniqueness tokens.
///
/// Abstracting ID generation allows deterministic replay and testing.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
