//! PostgreSQL implementation of the UserStore and ProfileStore traits.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgRow};
use tracing::instrument;

use cuttlefish_storage::{
    DriveFile, ProfileStore, StorageError, UpdateResult, User, UserImageUpdate, UserProfile,
    UserStore, UserWithImages,
};

use crate::config::PostgresConfig;
use crate::error::from_sqlx;
use crate::migrations;
use crate::pool;

const SELECT_IDS: &str = r#"SELECT id FROM "user"
    WHERE ($1::varchar IS NULL OR id COLLATE "C" > $1)
    ORDER BY id COLLATE "C"
    LIMIT $2"#;

const SELECT_USER_COLUMNS: &str = r#"u.id, u.username, u.host, u.avatar_id, u.banner_id,
    u.avatar_url, u.avatar_blurhash, u.banner_url, u.banner_blurhash, u.is_admin, u.token"#;

const SELECT_WITH_IMAGES: &str = r#"
    a.id AS a_id, a.user_host AS a_user_host, a.url AS a_url,
    a.webpublic_url AS a_webpublic_url, a.thumbnail_url AS a_thumbnail_url, a.uri AS a_uri,
    a.is_link AS a_is_link, a.access_key AS a_access_key,
    a.webpublic_access_key AS a_webpublic_access_key, a.blurhash AS a_blurhash,
    b.id AS b_id, b.user_host AS b_user_host, b.url AS b_url,
    b.webpublic_url AS b_webpublic_url, b.thumbnail_url AS b_thumbnail_url, b.uri AS b_uri,
    b.is_link AS b_is_link, b.access_key AS b_access_key,
    b.webpublic_access_key AS b_webpublic_access_key, b.blurhash AS b_blurhash
    FROM "user" u
    LEFT JOIN drive_file a ON a.id = u.avatar_id
    LEFT JOIN drive_file b ON b.id = u.banner_id
    WHERE u.id = $1"#;

// Each slot is written only when its flag is set; the other slot keeps its columns.
const UPDATE_IMAGES: &str = r#"UPDATE "user" SET
    avatar_url      = CASE WHEN $2 THEN $3 ELSE avatar_url END,
    avatar_blurhash = CASE WHEN $2 THEN $4 ELSE avatar_blurhash END,
    banner_url      = CASE WHEN $5 THEN $6 ELSE banner_url END,
    banner_blurhash = CASE WHEN $5 THEN $7 ELSE banner_blurhash END
    WHERE id = $1"#;

const SELECT_PROFILE: &str = r#"SELECT user_id, description, location, birthday, lang, email
    FROM user_profile WHERE user_id = $1"#;

/// PostgreSQL storage backend for users, drive files and profiles.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates a new `PostgresStorage` with the given configuration.
    ///
    /// Creates the connection pool and runs migrations if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx_core::error::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        host: row.try_get("host")?,
        avatar_id: row.try_get("avatar_id")?,
        banner_id: row.try_get("banner_id")?,
        avatar_url: row.try_get("avatar_url")?,
        avatar_blurhash: row.try_get("avatar_blurhash")?,
        banner_url: row.try_get("banner_url")?,
        banner_blurhash: row.try_get("banner_blurhash")?,
        is_admin: row.try_get("is_admin")?,
        token: row.try_get("token")?,
    })
}

/// Decodes the joined drive file columns carrying `prefix`; `None` when the join missed.
fn file_from_row(row: &PgRow, prefix: &str) -> Result<Option<DriveFile>, sqlx_core::error::Error> {
    let col = |name: &str| format!("{prefix}_{name}");

    let Some(id) = row.try_get::<Option<String>, _>(col("id").as_str())? else {
        return Ok(None);
    };

    Ok(Some(DriveFile {
        id,
        user_host: row.try_get(col("user_host").as_str())?,
        url: row.try_get(col("url").as_str())?,
        webpublic_url: row.try_get(col("webpublic_url").as_str())?,
        thumbnail_url: row.try_get(col("thumbnail_url").as_str())?,
        uri: row.try_get(col("uri").as_str())?,
        is_link: row.try_get(col("is_link").as_str())?,
        access_key: row.try_get(col("access_key").as_str())?,
        webpublic_access_key: row.try_get(col("webpublic_access_key").as_str())?,
        blurhash: row.try_get(col("blurhash").as_str())?,
    }))
}

#[async_trait]
impl UserStore for PostgresStorage {
    #[instrument(skip(self))]
    async fn find_ids(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(String,)> = query_as(SELECT_IDS)
            .bind(after)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    #[instrument(skip(self))]
    async fn find_with_images(&self, id: &str) -> Result<Option<UserWithImages>, StorageError> {
        let sql = format!("SELECT {SELECT_USER_COLUMNS}, {SELECT_WITH_IMAGES}");
        let row = query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let decoded = user_from_row(&row).and_then(|user| {
            Ok(UserWithImages {
                user,
                avatar: file_from_row(&row, "a")?,
                banner: file_from_row(&row, "b")?,
            })
        });

        decoded.map(Some).map_err(from_sqlx)
    }

    #[instrument(skip(self, update))]
    async fn update_images(
        &self,
        id: &str,
        update: &UserImageUpdate,
    ) -> Result<UpdateResult, StorageError> {
        let avatar = update.avatar.as_ref();
        let banner = update.banner.as_ref();

        let result = query(UPDATE_IMAGES)
            .bind(id)
            .bind(avatar.is_some())
            .bind(avatar.map(|a| a.url.as_str()))
            .bind(avatar.and_then(|a| a.blurhash.as_deref()))
            .bind(banner.is_some())
            .bind(banner.map(|b| b.url.as_str()))
            .bind(banner.and_then(|b| b.blurhash.as_deref()))
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;

        Ok(UpdateResult::new(result.rows_affected()))
    }

    #[instrument(skip_all)]
    async fn find_by_token(&self, token: &str) -> Result<Option<User>, StorageError> {
        let sql = format!(r#"SELECT {SELECT_USER_COLUMNS} FROM "user" u WHERE u.token = $1"#);
        let row = query(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(from_sqlx)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl ProfileStore for PostgresStorage {
    #[instrument(skip(self))]
    async fn find_by_user_id_or_fail(&self, user_id: &str) -> Result<UserProfile, StorageError> {
        let row: Option<(
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        )> = query_as(SELECT_PROFILE)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;

        let (user_id_col, description, location, birthday, lang, email) =
            row.ok_or_else(|| StorageError::not_found("UserProfile", user_id))?;

        Ok(UserProfile {
            user_id: user_id_col,
            description,
            location,
            birthday,
            lang,
            email,
        })
    }
}
