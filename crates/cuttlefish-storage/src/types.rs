//! Storage types for the Cuttlefish storage abstraction layer.
//!
//! This module defines all data types used by the storage traits.

use serde::{Deserialize, Serialize};

/// A user account row.
///
/// The four `*_url` / `*_blurhash` fields are derived from the referenced
/// drive files and are expected to be set exactly when the matching
/// `avatar_id` / `banner_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier.
    pub id: String,
    /// Local part of the handle.
    pub username: String,
    /// Remote host, `None` for local users.
    pub host: Option<String>,
    /// Drive file used as avatar.
    pub avatar_id: Option<String>,
    /// Drive file used as banner.
    pub banner_id: Option<String>,
    /// Publicly servable avatar URL.
    pub avatar_url: Option<String>,
    /// Blur-hash placeholder of the avatar.
    pub avatar_blurhash: Option<String>,
    /// Publicly servable banner URL.
    pub banner_url: Option<String>,
    /// Blur-hash placeholder of the banner.
    pub banner_blurhash: Option<String>,
    /// Whether the user holds the administrator role.
    pub is_admin: bool,
    /// Native API credential, `None` for remote users.
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl User {
    /// Creates a local user with no images.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            host: None,
            avatar_id: None,
            banner_id: None,
            avatar_url: None,
            avatar_blurhash: None,
            banner_url: None,
            banner_blurhash: None,
            is_admin: false,
            token: None,
        }
    }

    /// Sets the avatar file reference.
    #[must_use]
    pub fn with_avatar(mut self, file_id: impl Into<String>) -> Self {
        self.avatar_id = Some(file_id.into());
        self
    }

    /// Sets the banner file reference.
    #[must_use]
    pub fn with_banner(mut self, file_id: impl Into<String>) -> Self {
        self.banner_id = Some(file_id.into());
        self
    }

    /// Sets the native API credential.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Marks the user as administrator.
    #[must_use]
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// A stored drive file (image attachment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Unique file identifier.
    pub id: String,
    /// Host of the owning user, `None` for local files.
    pub user_host: Option<String>,
    /// Direct URL of the stored original.
    pub url: String,
    /// URL of the web-friendly variant, if one was generated.
    pub webpublic_url: Option<String>,
    /// URL of the thumbnail, if one was generated.
    pub thumbnail_url: Option<String>,
    /// Origin URI for files fetched from remote instances.
    pub uri: Option<String>,
    /// Whether the file is only a link to a remote object (not stored locally).
    pub is_link: bool,
    /// Object storage key of the original.
    pub access_key: Option<String>,
    /// Object storage key of the web-friendly variant.
    pub webpublic_access_key: Option<String>,
    /// Precomputed blur-hash placeholder.
    pub blurhash: Option<String>,
}

impl DriveFile {
    /// Creates a local drive file served from `url`.
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_host: None,
            url: url.into(),
            webpublic_url: None,
            thumbnail_url: None,
            uri: None,
            is_link: false,
            access_key: None,
            webpublic_access_key: None,
            blurhash: None,
        }
    }

    /// Sets the blur-hash.
    #[must_use]
    pub fn with_blurhash(mut self, blurhash: impl Into<String>) -> Self {
        self.blurhash = Some(blurhash.into());
        self
    }

    /// Sets the web-friendly variant URL.
    #[must_use]
    pub fn with_webpublic_url(mut self, url: impl Into<String>) -> Self {
        self.webpublic_url = Some(url.into());
        self
    }
}

/// A user row loaded together with its avatar and banner files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithImages {
    /// The user row.
    pub user: User,
    /// Loaded avatar file, `None` when unset or dangling.
    pub avatar: Option<DriveFile>,
    /// Loaded banner file, `None` when unset or dangling.
    pub banner: Option<DriveFile>,
}

/// Per-user profile record (1:1 with [`User`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Owning user identifier.
    pub user_id: String,
    /// Free-form bio.
    pub description: Option<String>,
    /// Free-form location.
    pub location: Option<String>,
    /// Birthday as `YYYY-MM-DD`.
    pub birthday: Option<String>,
    /// Preferred language tag.
    pub lang: Option<String>,
    /// Contact e-mail address.
    pub email: Option<String>,
}

impl UserProfile {
    /// Creates an empty profile for `user_id`.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            description: None,
            location: None,
            birthday: None,
            lang: None,
            email: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Derived, publicly servable fields of one image slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedImage {
    /// Public URL of the image.
    pub url: String,
    /// Blur-hash copied from the drive file.
    pub blurhash: Option<String>,
}

/// Partial update of the derived image fields of a user.
///
/// A `None` slot leaves the stored columns untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserImageUpdate {
    /// New avatar URL and blur-hash.
    pub avatar: Option<DerivedImage>,
    /// New banner URL and blur-hash.
    pub banner: Option<DerivedImage>,
}

impl UserImageUpdate {
    /// Returns `true` if applying this update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.avatar.is_none() && self.banner.is_none()
    }

    /// Applies the update to an in-memory user row.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(avatar) = &self.avatar {
            user.avatar_url = Some(avatar.url.clone());
            user.avatar_blurhash = avatar.blurhash.clone();
        }
        if let Some(banner) = &self.banner {
            user.banner_url = Some(banner.url.clone());
            user.banner_blurhash = banner.blurhash.clone();
        }
    }
}

/// Outcome of a write keyed by identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Number of rows the write touched.
    pub affected: u64,
}

impl UpdateResult {
    /// Creates a result reporting `affected` rows.
    #[must_use]
    pub fn new(affected: u64) -> Self {
        Self { affected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update() {
        let update = UserImageUpdate::default();
        assert!(update.is_empty());

        let update = UserImageUpdate {
            avatar: None,
            banner: Some(DerivedImage {
                url: "https://example.test/b.webp".into(),
                blurhash: None,
            }),
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_apply_leaves_untouched_slot() {
        let mut user = User::new("u1", "alice").with_avatar("f1");
        user.banner_url = Some("https://old.test/banner".into());
        user.banner_blurhash = Some("old".into());

        let update = UserImageUpdate {
            avatar: Some(DerivedImage {
                url: "https://new.test/avatar".into(),
                blurhash: Some("abc".into()),
            }),
            banner: None,
        };
        update.apply_to(&mut user);

        assert_eq!(user.avatar_url.as_deref(), Some("https://new.test/avatar"));
        assert_eq!(user.avatar_blurhash.as_deref(), Some("abc"));
        assert_eq!(user.banner_url.as_deref(), Some("https://old.test/banner"));
        assert_eq!(user.banner_blurhash.as_deref(), Some("old"));
    }

    #[test]
    fn test_apply_clears_blurhash_when_file_has_none() {
        let mut user = User::new("u1", "alice");
        user.avatar_blurhash = Some("stale".into());

        let update = UserImageUpdate {
            avatar: Some(DerivedImage {
                url: "https://new.test/avatar".into(),
                blurhash: None,
            }),
            banner: None,
        };
        update.apply_to(&mut user);

        assert_eq!(user.avatar_blurhash, None);
    }

    #[test]
    fn test_token_is_not_serialized() {
        let user = User::new("u1", "alice").with_token("secret");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["avatarUrl"], serde_json::Value::Null);
    }
}
