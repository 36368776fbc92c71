//! Recreate URL cache (`POST /api/admin/recreate-url-cache`)
//!
//! Recomputes the public avatar and banner URLs and blur-hashes of every
//! user from the referenced drive files, persists them, and refreshes the
//! profile cache entry of each rewritten user.
//!
//! Users are visited in ascending identifier order, one page of
//! identifiers at a time. A zero-row update or a missing profile aborts the
//! whole run; users processed before the failure keep their new values.

use std::sync::Arc;

use cuttlefish_storage::{
    DerivedImage, DynProfileStore, DynUserStore, StorageError, UserImageUpdate, UserWithImages,
};

use crate::cache::{CacheError, ProfileCache};
use crate::drive::{PublicUrlResolver, UrlMode};

/// Fatal outcomes of a reconciliation run.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The update keyed by the user identifier touched no rows.
    #[error("update of user {user_id} affected no rows")]
    UpdateAffectedZero { user_id: String },

    /// The user has no profile record to refresh the cache from.
    #[error("profile of user {user_id} not found")]
    ProfileNotFound { user_id: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("profile cache refresh failed: {0}")]
    Cache(#[from] CacheError),
}

/// Counters reported when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub scanned: usize,
    pub updated: usize,
    pub missing: usize,
    pub without_images: usize,
}

/// Rewrites the derived image fields of every user.
#[derive(Clone)]
pub struct ImageUrlReconciler {
    users: DynUserStore,
    profiles: DynProfileStore,
    urls: Arc<dyn PublicUrlResolver>,
    cache: ProfileCache,
    batch_size: usize,
}

impl ImageUrlReconciler {
    pub fn new(
        users: DynUserStore,
        profiles: DynProfileStore,
        urls: Arc<dyn PublicUrlResolver>,
        cache: ProfileCache,
        batch_size: usize,
    ) -> Self {
        Self {
            users,
            profiles,
            urls,
            cache,
            batch_size: batch_size.max(1),
        }
    }

    /// Runs one full pass over all users.
    pub async fn run(&self) -> Result<(), ReconcileError> {
        tracing::info!(
            backend = self.users.backend_name(),
            batch_size = self.batch_size,
            "Starting URL cache recreation"
        );

        match self.run_pages().await {
            Ok(stats) => {
                tracing::info!(
                    scanned = stats.scanned,
                    updated = stats.updated,
                    missing = stats.missing,
                    without_images = stats.without_images,
                    "URL cache recreation completed"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "URL cache recreation aborted");
                Err(e)
            }
        }
    }

    async fn run_pages(&self) -> Result<ReconcileStats, ReconcileError> {
        let mut stats = ReconcileStats::default();
        let mut cursor: Option<String> = None;

        loop {
            let ids = self
                .users
                .find_ids(cursor.as_deref(), self.batch_size)
                .await?;
            let Some(last) = ids.last().cloned() else {
                break;
            };

            for id in &ids {
                stats.scanned += 1;
                self.reconcile_user(id, &mut stats).await?;
            }

            if ids.len() < self.batch_size {
                break;
            }
            cursor = Some(last);
        }

        Ok(stats)
    }

    async fn reconcile_user(
        &self,
        id: &str,
        stats: &mut ReconcileStats,
    ) -> Result<(), ReconcileError> {
        let Some(loaded) = self.users.find_with_images(id).await? else {
            tracing::debug!(user_id = %id, "user disappeared during scan, skipping");
            stats.missing += 1;
            return Ok(());
        };

        let update = self.derive_update(&loaded);
        if update.is_empty() {
            tracing::debug!(user_id = %id, "user has no images, skipping");
            stats.without_images += 1;
            return Ok(());
        }

        let result = self.users.update_images(id, &update).await?;
        if result.affected == 0 {
            return Err(ReconcileError::UpdateAffectedZero {
                user_id: id.to_string(),
            });
        }

        let profile = self
            .profiles
            .find_by_user_id_or_fail(id)
            .await
            .map_err(|e| match e {
                e if e.is_not_found() => ReconcileError::ProfileNotFound {
                    user_id: id.to_string(),
                },
                e => ReconcileError::Storage(e),
            })?;

        self.cache.set(id, &profile).await?;
        stats.updated += 1;
        Ok(())
    }

    /// Builds the update set for one user. Empty when neither image is loaded.
    fn derive_update(&self, loaded: &UserWithImages) -> UserImageUpdate {
        let avatar = loaded.avatar.as_ref().map(|file| DerivedImage {
            url: self.urls.public_url(file, Some(UrlMode::Avatar)),
            blurhash: file.blurhash.clone(),
        });

        let banner = loaded
            .banner
            .as_ref()
            .filter(|_| loaded.user.banner_id.is_some())
            .map(|file| DerivedImage {
                url: self.urls.public_url(file, None),
                blurhash: file.blurhash.clone(),
            });

        UserImageUpdate { avatar, banner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use cuttlefish_db_memory::InMemoryStorage;
    use cuttlefish_storage::{DriveFile, UpdateResult, User, UserProfile, UserStore};

    use crate::cache::CacheBackend;
    use crate::config::MediaConfig;
    use crate::drive::DriveFileUrls;

    fn resolver() -> DriveFileUrls {
        DriveFileUrls::new("https://example.com", &MediaConfig::default())
    }

    fn profile_cache() -> ProfileCache {
        ProfileCache::new(CacheBackend::new(), Duration::from_secs(600))
    }

    fn reconciler(
        users: DynUserStore,
        storage: &InMemoryStorage,
        cache: ProfileCache,
        batch_size: usize,
    ) -> ImageUrlReconciler {
        ImageUrlReconciler::new(
            users,
            Arc::new(storage.clone()),
            Arc::new(resolver()),
            cache,
            batch_size,
        )
    }

    /// Seeds a user with an avatar file carrying `blurhash` plus a profile.
    fn seed_with_avatar(storage: &InMemoryStorage, id: &str, blurhash: &str) {
        let file_id = format!("file-{id}");
        storage.put_file(
            DriveFile::new(&file_id, format!("https://example.com/files/{id}.png"))
                .with_blurhash(blurhash),
        );
        storage.put_user(User::new(id, id).with_avatar(&file_id));
        storage.put_profile(UserProfile::new(id).with_description(format!("about {id}")));
    }

    /// Delegates to an in-memory store and records visited users. One user
    /// can be made to vanish on reload, another to report zero affected rows.
    struct FaultyStore {
        inner: InMemoryStorage,
        vanish: Option<String>,
        zero_for: Option<String>,
        visited: Mutex<Vec<String>>,
    }

    impl FaultyStore {
        fn new(inner: &InMemoryStorage) -> Self {
            Self {
                inner: inner.clone(),
                vanish: None,
                zero_for: None,
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UserStore for FaultyStore {
        async fn find_ids(
            &self,
            after: Option<&str>,
            limit: usize,
        ) -> Result<Vec<String>, StorageError> {
            self.inner.find_ids(after, limit).await
        }

        async fn find_with_images(
            &self,
            id: &str,
        ) -> Result<Option<UserWithImages>, StorageError> {
            self.visited.lock().unwrap().push(id.to_string());
            if self.vanish.as_deref() == Some(id) {
                return Ok(None);
            }
            self.inner.find_with_images(id).await
        }

        async fn update_images(
            &self,
            id: &str,
            update: &UserImageUpdate,
        ) -> Result<UpdateResult, StorageError> {
            if self.zero_for.as_deref() == Some(id) {
                return Ok(UpdateResult::new(0));
            }
            self.inner.update_images(id, update).await
        }

        async fn find_by_token(&self, token: &str) -> Result<Option<User>, StorageError> {
            self.inner.find_by_token(token).await
        }

        fn backend_name(&self) -> &'static str {
            "faulty"
        }
    }

    #[tokio::test]
    async fn test_avatar_fields_derived_banner_untouched() {
        let storage = InMemoryStorage::new();
        seed_with_avatar(&storage, "u1", "abc");
        let mut user = storage.user("u1").unwrap();
        user.banner_url = Some("https://old.example/banner.png".into());
        user.banner_blurhash = Some("old".into());
        storage.put_user(user);

        let job = reconciler(Arc::new(storage.clone()), &storage, profile_cache(), 10);
        tokio_test::assert_ok!(job.run().await);

        let file = storage.file("file-u1").unwrap();
        let user = storage.user("u1").unwrap();
        assert_eq!(
            user.avatar_url,
            Some(resolver().public_url(&file, Some(UrlMode::Avatar)))
        );
        assert_eq!(user.avatar_blurhash.as_deref(), Some("abc"));
        assert_eq!(user.banner_url.as_deref(), Some("https://old.example/banner.png"));
        assert_eq!(user.banner_blurhash.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_banner_derived_without_mode() {
        let storage = InMemoryStorage::new();
        storage.put_file(
            DriveFile::new("b1", "https://example.com/files/banner.png")
                .with_webpublic_url("https://example.com/files/banner-web.webp"),
        );
        storage.put_user(User::new("u1", "alice").with_banner("b1"));
        storage.put_profile(UserProfile::new("u1"));

        let job = reconciler(Arc::new(storage.clone()), &storage, profile_cache(), 10);
        tokio_test::assert_ok!(job.run().await);

        let user = storage.user("u1").unwrap();
        assert_eq!(
            user.banner_url.as_deref(),
            Some("https://example.com/files/banner-web.webp")
        );
        assert!(user.banner_blurhash.is_none());
        assert!(user.avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_users_without_images_are_not_written() {
        let storage = InMemoryStorage::new();
        storage.put_user(User::new("u1", "plain"));
        storage.put_profile(UserProfile::new("u1"));
        // dangling attachment reference reads as no image
        storage.put_user(User::new("u2", "dangling").with_avatar("gone"));

        let cache = profile_cache();
        let job = reconciler(Arc::new(storage.clone()), &storage, cache.clone(), 10);
        tokio_test::assert_ok!(job.run().await);

        assert_eq!(storage.write_count(), 0);
        assert!(cache.get("u1").await.is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_zero_affected_aborts_remaining_users() {
        let storage = InMemoryStorage::new();
        for id in ["u1", "u2", "u3", "u4"] {
            seed_with_avatar(&storage, id, "hash");
        }

        let users = Arc::new(FaultyStore {
            zero_for: Some("u2".into()),
            ..FaultyStore::new(&storage)
        });
        let job = reconciler(users.clone(), &storage, profile_cache(), 2);

        let err = tokio_test::assert_err!(job.run().await);
        assert!(matches!(
            err,
            ReconcileError::UpdateAffectedZero { ref user_id } if user_id == "u2"
        ));

        assert_eq!(*users.visited.lock().unwrap(), vec!["u1", "u2"]);
        assert!(storage.user("u1").unwrap().avatar_url.is_some());
        assert!(storage.user("u3").unwrap().avatar_url.is_none());
        assert!(storage.user("u4").unwrap().avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_user_vanishing_on_reload_is_skipped() {
        let storage = InMemoryStorage::new();
        for id in ["a", "b", "c", "d"] {
            seed_with_avatar(&storage, id, id);
        }

        let users = Arc::new(FaultyStore {
            vanish: Some("b".into()),
            ..FaultyStore::new(&storage)
        });
        let cache = profile_cache();
        let job = reconciler(users.clone(), &storage, cache.clone(), 2);

        let stats = tokio_test::assert_ok!(job.run_pages().await);
        assert_eq!(
            stats,
            ReconcileStats {
                scanned: 4,
                updated: 3,
                missing: 1,
                without_images: 0,
            }
        );

        assert_eq!(*users.visited.lock().unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(storage.write_count(), 3);
        assert!(storage.user("b").unwrap().avatar_url.is_none());
        assert!(cache.get("b").await.is_none());
        for id in ["a", "c", "d"] {
            assert!(storage.user(id).unwrap().avatar_url.is_some());
            assert!(cache.get(id).await.is_some());
        }
        assert_eq!(cache.stats().entries, 3);
    }

    #[tokio::test]
    async fn test_cache_entry_replaced_with_reloaded_profile() {
        let storage = InMemoryStorage::new();
        seed_with_avatar(&storage, "u3", "hash");

        let cache = profile_cache();
        cache
            .set("u3", &UserProfile::new("u3").with_description("stale"))
            .await
            .unwrap();

        let job = reconciler(Arc::new(storage.clone()), &storage, cache.clone(), 10);
        tokio_test::assert_ok!(job.run().await);

        let cached = cache.get("u3").await.unwrap();
        assert_eq!(cached.description.as_deref(), Some("about u3"));
    }

    #[tokio::test]
    async fn test_missing_profile_is_fatal() {
        let storage = InMemoryStorage::new();
        seed_with_avatar(&storage, "u1", "hash");
        storage.remove_profile("u1");

        let job = reconciler(Arc::new(storage.clone()), &storage, profile_cache(), 10);
        let err = tokio_test::assert_err!(job.run().await);
        assert!(matches!(
            err,
            ReconcileError::ProfileNotFound { ref user_id } if user_id == "u1"
        ));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let storage = InMemoryStorage::new();
        for id in ["a", "b", "c", "d", "e"] {
            seed_with_avatar(&storage, id, id);
        }

        let job = reconciler(Arc::new(storage.clone()), &storage, profile_cache(), 2);
        tokio_test::assert_ok!(job.run().await);
        let first: Vec<User> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| storage.user(id).unwrap())
            .collect();

        tokio_test::assert_ok!(job.run().await);
        let second: Vec<User> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| storage.user(id).unwrap())
            .collect();

        assert_eq!(first, second);
        assert_eq!(storage.write_count(), 10);
    }

    #[tokio::test]
    async fn test_stats_count_every_page() {
        let storage = InMemoryStorage::new();
        for id in ["a", "b", "c"] {
            seed_with_avatar(&storage, id, "h");
        }
        storage.put_user(User::new("d", "plain"));

        let job = reconciler(Arc::new(storage.clone()), &storage, profile_cache(), 2);
        let stats = job.run_pages().await.unwrap();
        assert_eq!(
            stats,
            ReconcileStats {
                scanned: 4,
                updated: 3,
                missing: 0,
                without_images: 1,
            }
        );
    }
}
