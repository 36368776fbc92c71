//! Implementation of the storage traits for InMemoryStorage.

use async_trait::async_trait;

use cuttlefish_storage::{
    ProfileStore, StorageError, UpdateResult, User, UserImageUpdate, UserProfile, UserStore,
    UserWithImages,
};

use crate::storage::InMemoryStorage;

#[async_trait]
impl UserStore for InMemoryStorage {
    async fn find_ids(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        Ok(self.sorted_ids_after(after, limit))
    }

    async fn find_with_images(&self, id: &str) -> Result<Option<UserWithImages>, StorageError> {
        let Some(user) = self.user(id) else {
            return Ok(None);
        };

        let avatar = user.avatar_id.as_deref().and_then(|file_id| self.file(file_id));
        let banner = user.banner_id.as_deref().and_then(|file_id| self.file(file_id));

        Ok(Some(UserWithImages {
            user,
            avatar,
            banner,
        }))
    }

    async fn update_images(
        &self,
        id: &str,
        update: &UserImageUpdate,
    ) -> Result<UpdateResult, StorageError> {
        let guard = self.users.pin();
        let Some(current) = guard.get(id) else {
            return Ok(UpdateResult::new(0));
        };

        let mut updated = current.clone();
        update.apply_to(&mut updated);
        guard.insert(id.to_string(), updated);
        self.record_write();

        Ok(UpdateResult::new(1))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        let guard = self.users.pin();
        Ok(guard
            .values()
            .find(|user| user.token.as_deref() == Some(token))
            .cloned())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl ProfileStore for InMemoryStorage {
    async fn find_by_user_id_or_fail(&self, user_id: &str) -> Result<UserProfile, StorageError> {
        let guard = self.profiles.pin();
        guard
            .get(user_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("UserProfile", user_id))
    }
}
