//! Public URL derivation for drive files.

use std::fmt;

use cuttlefish_storage::DriveFile;

use crate::config::MediaConfig;

/// Rendering hint passed to the media proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlMode {
    Avatar,
}

impl UrlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlMode::Avatar => "avatar",
        }
    }
}

impl fmt::Display for UrlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes the publicly servable URL of a drive file.
///
/// Deterministic for a given file, mode and configuration.
pub trait PublicUrlResolver: Send + Sync {
    fn public_url(&self, file: &DriveFile, mode: Option<UrlMode>) -> String;
}

/// Resolver driven by the `[media]` configuration section.
#[derive(Debug, Clone)]
pub struct DriveFileUrls {
    base_url: String,
    media_proxy: String,
    external_media_proxy_enabled: bool,
    proxy_remote_files: bool,
}

impl DriveFileUrls {
    pub fn new(base_url: &str, media: &MediaConfig) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let media_proxy = media
            .media_proxy
            .as_deref()
            .map(|p| p.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{base_url}/proxy"));

        Self {
            base_url,
            media_proxy,
            external_media_proxy_enabled: media.external_media_proxy_enabled,
            proxy_remote_files: media.proxy_remote_files,
        }
    }

    /// `{media_proxy}/{mode}.webp?url=<encoded>`, plus `&{mode}=1` when a mode is given.
    pub fn proxied_url(&self, url: &str, mode: Option<UrlMode>) -> String {
        let name = mode.map(|m| m.as_str()).unwrap_or("image");
        let mut proxied = format!(
            "{}/{}.webp?url={}",
            self.media_proxy,
            name,
            urlencoding::encode(url)
        );
        if let Some(mode) = mode {
            proxied.push_str(&format!("&{mode}=1"));
        }
        proxied
    }
}

impl PublicUrlResolver for DriveFileUrls {
    fn public_url(&self, file: &DriveFile, mode: Option<UrlMode>) -> String {
        if let Some(uri) = file.uri.as_deref() {
            if file.user_host.is_some() && self.external_media_proxy_enabled {
                return self.proxied_url(uri, mode);
            }

            if file.is_link && self.proxy_remote_files {
                let key = match mode {
                    Some(UrlMode::Avatar) => file.webpublic_access_key.as_deref(),
                    None => file.access_key.as_deref(),
                };
                if let Some(key) = key.filter(|k| !k.contains('/')) {
                    return format!("{}/files/{}", self.base_url, key);
                }
            }
        }

        let url = file.webpublic_url.as_deref().unwrap_or(&file.url);
        match mode {
            Some(UrlMode::Avatar) => self.proxied_url(url, mode),
            None => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(media: MediaConfig) -> DriveFileUrls {
        DriveFileUrls::new("https://example.com/", &media)
    }

    fn remote_file() -> DriveFile {
        let mut file = DriveFile::new("f1", "https://remote.example/f1.png");
        file.uri = Some("https://remote.example/files/f1".into());
        file.user_host = Some("remote.example".into());
        file
    }

    #[test]
    fn test_local_file_without_mode_uses_webpublic_url() {
        let file = DriveFile::new("f1", "https://example.com/files/orig")
            .with_webpublic_url("https://example.com/files/web");
        assert_eq!(
            urls(MediaConfig::default()).public_url(&file, None),
            "https://example.com/files/web"
        );

        let plain = DriveFile::new("f2", "https://example.com/files/orig");
        assert_eq!(
            urls(MediaConfig::default()).public_url(&plain, None),
            "https://example.com/files/orig"
        );
    }

    #[test]
    fn test_avatar_mode_is_proxied() {
        let file = DriveFile::new("f1", "https://example.com/files/a b.png");
        assert_eq!(
            urls(MediaConfig::default()).public_url(&file, Some(UrlMode::Avatar)),
            "https://example.com/proxy/avatar.webp?url=https%3A%2F%2Fexample.com%2Ffiles%2Fa%20b.png&avatar=1"
        );
    }

    #[test]
    fn test_custom_media_proxy() {
        let media = MediaConfig {
            media_proxy: Some("https://media.example/".into()),
            ..Default::default()
        };
        let file = DriveFile::new("f1", "https://example.com/x.png");
        assert_eq!(
            urls(media).public_url(&file, Some(UrlMode::Avatar)),
            "https://media.example/avatar.webp?url=https%3A%2F%2Fexample.com%2Fx.png&avatar=1"
        );
    }

    #[test]
    fn test_remote_file_through_external_proxy() {
        let media = MediaConfig {
            external_media_proxy_enabled: true,
            ..Default::default()
        };
        assert_eq!(
            urls(media).public_url(&remote_file(), None),
            "https://example.com/proxy/image.webp?url=https%3A%2F%2Fremote.example%2Ffiles%2Ff1"
        );
    }

    #[test]
    fn test_linked_remote_file_served_by_access_key() {
        let media = MediaConfig {
            proxy_remote_files: true,
            ..Default::default()
        };
        let mut file = remote_file();
        file.is_link = true;
        file.access_key = Some("orig-key".into());
        file.webpublic_access_key = Some("web-key".into());

        let urls = urls(media);
        assert_eq!(
            urls.public_url(&file, None),
            "https://example.com/files/orig-key"
        );
        assert_eq!(
            urls.public_url(&file, Some(UrlMode::Avatar)),
            "https://example.com/files/web-key"
        );

        // keys containing a path separator fall through to the stored url
        file.access_key = Some("nested/key".into());
        assert_eq!(urls.public_url(&file, None), "https://remote.example/f1.png");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let file = remote_file().with_blurhash("abc");
        let urls = urls(MediaConfig::default());
        assert_eq!(
            urls.public_url(&file, Some(UrlMode::Avatar)),
            urls.public_url(&file, Some(UrlMode::Avatar))
        );
    }
}
