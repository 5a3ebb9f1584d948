//! Live adapter for the `IdGenerator` port.

use uuid::Uuid;

use crate::ports::id_gen::IdGenerator;

/// Generates random v4 UUIDs. Branch names use the first segment only,
/// which is short enough to stay readable while avoiding collisions.
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        let id = Uuid::new_v4().to_string();
        id.split('-').next().unwrap_or(&id).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_short_unique_tokens() {
        let gen = LiveIdGenerator;
        let a = gen.generate_id();
        let b = gen.generate_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
