//! User identity and presence state.
//!
//! The `IdentityStore` owns all user records. It has no side effects beyond
//! its own maps; presence broadcasts are the engine's responsibility.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::now_millis;

/// Coarse-grained availability state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserStatus {
    Online,
    Away,
    Busy,
    Offline,
}

/// A user record.
///
/// Users are created at startup (seed data) or via an explicit create call
/// and are never deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub status: UserStatus,
    /// Last presence change, milliseconds since epoch.
    pub last_seen: i64,
    /// Rooms this user is a member of.
    pub rooms: HashSet<String>,
    /// Arbitrary client preferences, last-writer-wins per key.
    pub preferences: HashMap<String, serde_json::Value>,
}

impl User {
    pub fn new(id: String, name: String, email: String, avatar: String) -> Self {
        Self {
            id,
            name,
            email,
            avatar,
            status: UserStatus::Online,
            last_seen: now_millis(),
            rooms: HashSet::new(),
            preferences: HashMap::new(),
        }
    }
}

/// Owns all user records, indexed by user id.
#[derive(Default)]
pub struct IdentityStore {
    users: DashMap<String, Arc<RwLock<User>>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pre-built user (seed data). Replaces any existing record.
    pub fn insert(&self, user: User) {
        self.users.insert(user.id.clone(), Arc::new(RwLock::new(user)));
    }

    /// Whether a user with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.users.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Snapshot of a user record, or None if unknown.
    pub async fn get(&self, id: &str) -> Option<User> {
        let user = self.users.get(id)?.clone();
        let user = user.read().await;
        Some(user.clone())
    }

    /// Snapshots of all users. Order is not significant.
    pub async fn list(&self) -> Vec<User> {
        let mut out = Vec::with_capacity(self.users.len());
        let handles: Vec<_> = self.users.iter().map(|e| e.value().clone()).collect();
        for user in handles {
            out.push(user.read().await.clone());
        }
        out
    }

    /// Snapshots of users whose status is Online.
    pub async fn list_online(&self) -> Vec<User> {
        let mut out = Vec::new();
        let handles: Vec<_> = self.users.iter().map(|e| e.value().clone()).collect();
        for user in handles {
            let user = user.read().await;
            if user.status == UserStatus::Online {
                out.push(user.clone());
            }
        }
        out
    }

    /// Create a user with a fresh id. An empty avatar gets a deterministic
    /// placeholder derived from the current user count.
    pub fn create(&self, name: &str, email: &str, avatar: &str) -> User {
        let avatar = if avatar.is_empty() {
            format!("https://i.pravatar.cc/150?img={}", self.users.len() + 1)
        } else {
            avatar.to_string()
        };
        let user = User::new(
            uuid::Uuid::new_v4().to_string(),
            name.to_string(),
            email.to_string(),
            avatar,
        );
        self.insert(user.clone());
        user
    }

    /// Set presence status and stamp last-seen. Returns false if unknown.
    pub async fn set_status(&self, id: &str, status: UserStatus) -> bool {
        let Some(user) = self.users.get(id).map(|e| e.value().clone()) else {
            return false;
        };
        let mut user = user.write().await;
        user.status = status;
        user.last_seen = now_millis();
        true
    }

    /// Update display name and, if non-empty, avatar. Returns false if unknown.
    pub async fn update_profile(&self, id: &str, name: &str, avatar: &str) -> bool {
        let Some(user) = self.users.get(id).map(|e| e.value().clone()) else {
            return false;
        };
        let mut user = user.write().await;
        user.name = name.to_string();
        if !avatar.is_empty() {
            user.avatar = avatar.to_string();
        }
        true
    }

    /// Merge preference keys, last-writer-wins per key. Returns false if unknown.
    pub async fn update_preferences(
        &self,
        id: &str,
        preferences: HashMap<String, serde_json::Value>,
    ) -> bool {
        let Some(user) = self.users.get(id).map(|e| e.value().clone()) else {
            return false;
        };
        let mut user = user.write().await;
        user.preferences.extend(preferences);
        true
    }

    /// Record room membership on the user side.
    pub async fn add_room(&self, id: &str, room_id: &str) {
        if let Some(user) = self.users.get(id).map(|e| e.value().clone()) {
            user.write().await.rooms.insert(room_id.to_string());
        }
    }

    /// Drop room membership on the user side.
    pub async fn remove_room(&self, id: &str, room_id: &str) {
        if let Some(user) = self.users.get(id).map(|e| e.value().clone()) {
            user.write().await.rooms.remove(room_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_placeholder_avatar() {
        let store = IdentityStore::new();
        let first = store.create("Ada", "ada@example.com", "");
        assert_eq!(first.avatar, "https://i.pravatar.cc/150?img=1");

        let second = store.create("Grace", "grace@example.com", "https://example.com/g.png");
        assert_eq!(second.avatar, "https://example.com/g.png");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn set_status_stamps_last_seen() {
        let store = IdentityStore::new();
        let user = store.create("Ada", "", "");
        let before = store.get(&user.id).await.unwrap().last_seen;

        assert!(store.set_status(&user.id, UserStatus::Away).await);
        let after = store.get(&user.id).await.unwrap();
        assert_eq!(after.status, UserStatus::Away);
        assert!(after.last_seen >= before);

        assert!(!store.set_status("missing", UserStatus::Away).await);
    }

    #[tokio::test]
    async fn update_profile_keeps_avatar_when_empty() {
        let store = IdentityStore::new();
        let user = store.create("Ada", "", "https://example.com/a.png");

        assert!(store.update_profile(&user.id, "Ada L.", "").await);
        let updated = store.get(&user.id).await.unwrap();
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.avatar, "https://example.com/a.png");
    }

    #[tokio::test]
    async fn preferences_merge_last_writer_wins() {
        let store = IdentityStore::new();
        let user = store.create("Ada", "", "");

        let mut first = HashMap::new();
        first.insert("theme".to_string(), serde_json::json!("dark"));
        first.insert("lang".to_string(), serde_json::json!("en"));
        assert!(store.update_preferences(&user.id, first).await);

        let mut second = HashMap::new();
        second.insert("theme".to_string(), serde_json::json!("light"));
        assert!(store.update_preferences(&user.id, second).await);

        let prefs = store.get(&user.id).await.unwrap().preferences;
        assert_eq!(prefs["theme"], serde_json::json!("light"));
        assert_eq!(prefs["lang"], serde_json::json!("en"));
    }

    #[tokio::test]
    async fn list_online_filters_by_status() {
        let store = IdentityStore::new();
        let a = store.create("Ada", "", "");
        let b = store.create("Bob", "", "");
        store.set_status(&b.id, UserStatus::Offline).await;

        let online = store.list_online().await;
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].id, a.id);
    }
}
