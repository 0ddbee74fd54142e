//! Connection-to-user mapping.
//!
//! A connection belongs to at most one user; a user may hold several
//! concurrent connections (multi-device). The registry only tracks the
//! mapping — presence transitions are decided by the engine, which must
//! check `connections_of` *after* an unbind and only mark a user Offline
//! when the last connection is gone.

use dashmap::DashMap;

/// Maps live connection ids to the user that owns them.
#[derive(Default)]
pub struct ConnectionRegistry {
    owners: DashMap<String, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a connection with a user. Idempotent; overwrites any prior
    /// mapping for the same connection.
    pub fn bind(&self, connection_id: &str, user_id: &str) {
        self.owners
            .insert(connection_id.to_string(), user_id.to_string());
    }

    /// Remove the mapping and return the previous owner, or None if the
    /// connection was unknown (already unbound — a no-op, not an error).
    pub fn unbind(&self, connection_id: &str) -> Option<String> {
        self.owners.remove(connection_id).map(|(_, user_id)| user_id)
    }

    /// The user owning a connection, if any.
    pub fn resolve(&self, connection_id: &str) -> Option<String> {
        self.owners.get(connection_id).map(|e| e.value().clone())
    }

    /// All live connection ids for a user.
    pub fn connections_of(&self, user_id: &str) -> Vec<String> {
        self.owners
            .iter()
            .filter(|e| e.value() == user_id)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Number of live bound connections.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_is_idempotent_and_overwrites() {
        let registry = ConnectionRegistry::new();
        registry.bind("c1", "u1");
        registry.bind("c1", "u1");
        assert_eq!(registry.len(), 1);

        registry.bind("c1", "u2");
        assert_eq!(registry.resolve("c1").as_deref(), Some("u2"));
    }

    #[test]
    fn unbind_returns_previous_owner_once() {
        let registry = ConnectionRegistry::new();
        registry.bind("c1", "u1");

        assert_eq!(registry.unbind("c1").as_deref(), Some("u1"));
        // Duplicate unbind is a no-op.
        assert_eq!(registry.unbind("c1"), None);
    }

    #[test]
    fn connections_of_tracks_multi_device() {
        let registry = ConnectionRegistry::new();
        registry.bind("c1", "u1");
        registry.bind("c2", "u1");
        registry.bind("c3", "u2");

        let mut conns = registry.connections_of("u1");
        conns.sort();
        assert_eq!(conns, vec!["c1", "c2"]);

        registry.unbind("c1");
        assert_eq!(registry.connections_of("u1"), vec!["c2"]);
    }
}
