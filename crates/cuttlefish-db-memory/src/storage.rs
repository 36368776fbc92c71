use cuttlefish_storage::{DriveFile, User, UserProfile};
use papaya::HashMap as PapayaHashMap;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory user/profile storage backend using papaya lock-free HashMaps.
///
/// This storage implementation provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Ordered identifier scans with an `after` cursor
/// - Users loaded together with their avatar and banner drive files
/// - Profile lookup by owning user
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    pub(crate) users: Arc<PapayaHashMap<String, User>>,
    /// Ordered user ids backing keyset scans
    user_ids: Arc<RwLock<BTreeSet<String>>>,
    pub(crate) files: Arc<PapayaHashMap<String, DriveFile>>,
    pub(crate) profiles: Arc<PapayaHashMap<String, UserProfile>>,
    /// Number of successful `update_images` writes
    pub(crate) writes: Arc<AtomicU64>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user row.
    pub fn put_user(&self, user: User) {
        self.user_ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id.clone());
        let guard = self.users.pin();
        guard.insert(user.id.clone(), user);
    }

    /// Inserts or replaces a drive file.
    pub fn put_file(&self, file: DriveFile) {
        let guard = self.files.pin();
        guard.insert(file.id.clone(), file);
    }

    /// Inserts or replaces the profile of `profile.user_id`.
    pub fn put_profile(&self, profile: UserProfile) {
        let guard = self.profiles.pin();
        guard.insert(profile.user_id.clone(), profile);
    }

    /// Removes a user row, returning it if it existed.
    pub fn remove_user(&self, id: &str) -> Option<User> {
        let guard = self.users.pin();
        let removed = guard.remove(id).cloned();
        self.user_ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        removed
    }

    /// Removes a profile, returning it if it existed.
    pub fn remove_profile(&self, user_id: &str) -> Option<UserProfile> {
        let guard = self.profiles.pin();
        guard.remove(user_id).cloned()
    }

    /// Returns a snapshot of a user row.
    pub fn user(&self, id: &str) -> Option<User> {
        let guard = self.users.pin();
        guard.get(id).cloned()
    }

    /// Returns a snapshot of a drive file.
    pub fn file(&self, id: &str) -> Option<DriveFile> {
        let guard = self.files.pin();
        guard.get(id).cloned()
    }

    /// Returns the number of stored users.
    pub fn user_count(&self) -> usize {
        self.users.pin().len()
    }

    /// Returns how many image updates touched a row so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the user ids in ascending order that sort after `after`.
    pub(crate) fn sorted_ids_after(&self, after: Option<&str>, limit: usize) -> Vec<String> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        self.user_ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .range::<str, _>((lower, Bound::Unbounded))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_ids_after() {
        let storage = InMemoryStorage::new();
        for id in ["c", "a", "d", "b"] {
            storage.put_user(User::new(id, id));
        }

        assert_eq!(storage.sorted_ids_after(None, 10), vec!["a", "b", "c", "d"]);
        assert_eq!(storage.sorted_ids_after(None, 2), vec!["a", "b"]);
        assert_eq!(storage.sorted_ids_after(Some("b"), 10), vec!["c", "d"]);
        assert!(storage.sorted_ids_after(Some("d"), 10).is_empty());
        assert_eq!(storage.sorted_ids_after(Some("bb"), 10), vec!["c", "d"]);
    }

    #[test]
    fn test_index_follows_replace_and_remove() {
        let storage = InMemoryStorage::new();
        storage.put_user(User::new("a", "first"));
        storage.put_user(User::new("a", "renamed"));
        storage.put_user(User::new("b", "second"));
        assert_eq!(storage.sorted_ids_after(None, 10), vec!["a", "b"]);

        storage.remove_user("a");
        assert_eq!(storage.sorted_ids_after(None, 10), vec!["b"]);
        assert_eq!(storage.user("b").map(|u| u.username), Some("second".into()));
    }

    #[test]
    fn test_remove_user() {
        let storage = InMemoryStorage::new();
        storage.put_user(User::new("u1", "alice"));
        assert_eq!(storage.user_count(), 1);

        let removed = storage.remove_user("u1");
        assert_eq!(removed.map(|u| u.username), Some("alice".to_string()));
        assert_eq!(storage.user_count(), 0);
        assert!(storage.remove_user("u1").is_none());
    }
}
