use crate::core::imagegen::{ImageError, ImageScope};
use image::ImageFormat;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Downloaded backgrounds, one directory per guild plus a `global` one.
pub struct ImageCache {
    root: PathBuf,
    client: Client,
}

fn io(err: std::io::Error) -> ImageError {
    ImageError::Io(err.to_string())
}

fn non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path).map_or(false, |meta| meta.is_file() && meta.len() != 0)
}

impl ImageCache {
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(ImageScope::Global.to_string()))?;
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { root, client })
    }

    fn scope_dir(&self, scope: ImageScope) -> Result<PathBuf, ImageError> {
        let dir = self.root.join(scope.to_string());
        std::fs::create_dir_all(&dir).map_err(io)?;
        Ok(dir)
    }

    /// File name a URL is cached under: its last path segment.
    fn file_name(url: &str) -> Result<&str, ImageError> {
        let name = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .rsplit('/')
            .next()
            .unwrap_or_default();
        match name {
            "" | "." | ".." => Err(ImageError::InvalidImage),
            name => Ok(name),
        }
    }

    /// Path of a cached image. A global copy takes precedence over the
    /// guild's own.
    pub fn check_image_exists(
        &self,
        name: &str,
        scope: ImageScope,
    ) -> Result<Option<PathBuf>, ImageError> {
        let global = self.scope_dir(ImageScope::Global)?.join(name);
        if non_empty_file(&global) {
            return Ok(Some(global));
        }
        if let ImageScope::Guild(_) = scope {
            let local = self.scope_dir(scope)?.join(name);
            if non_empty_file(&local) {
                return Ok(Some(local));
            }
        }
        Ok(None)
    }

    /// Bytes of the image at `url`, from the cache when possible.
    ///
    /// Fresh downloads must decode as an image; a PNG copy is stored in the
    /// scope's directory.
    pub async fn download_image(&self, url: &str, scope: ImageScope) -> Result<Vec<u8>, ImageError> {
        let name = Self::file_name(url)?;
        if let Some(path) = self.check_image_exists(name, scope)? {
            tracing::debug!(name, "Image exists, returning saved version");
            return std::fs::read(path).map_err(io);
        }

        tracing::debug!(name, "Image missing, downloading now");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ImageError::InvalidImage);
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ImageError::Http(e.to_string()))?
            .to_vec();

        let decoded = image::load_from_memory(&bytes).map_err(|_| ImageError::InvalidImage)?;
        let path = self.scope_dir(scope)?.join(name);
        decoded
            .to_rgba8()
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| ImageError::Io(e.to_string()))?;

        Ok(bytes)
    }

    /// Whether `url` points at something that decodes as an image. Network
    /// failures are still errors.
    pub async fn valid_image_url(&self, url: &str, scope: ImageScope) -> Result<bool, ImageError> {
        match self.download_image(url, scope).await {
            Ok(_) => Ok(true),
            Err(ImageError::InvalidImage) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_come_from_the_last_segment() {
        assert_eq!(
            ImageCache::file_name("https://cdn.example.com/bg/sky.png?size=512").unwrap(),
            "sky.png"
        );
        assert!(ImageCache::file_name("https://cdn.example.com/").is_err());
        assert!(ImageCache::file_name("https://cdn.example.com/..").is_err());
    }

    #[test]
    fn global_copy_wins_and_empty_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path()).unwrap();
        let guild = ImageScope::Guild(42);

        std::fs::create_dir_all(dir.path().join("42")).unwrap();
        std::fs::write(dir.path().join("42").join("a.png"), b"guild").unwrap();
        std::fs::write(dir.path().join("global").join("b.png"), b"").unwrap();

        assert_eq!(
            cache.check_image_exists("a.png", guild).unwrap(),
            Some(dir.path().join("42").join("a.png"))
        );
        assert_eq!(cache.check_image_exists("b.png", guild).unwrap(), None);
        assert_eq!(cache.check_image_exists("a.png", ImageScope::Global).unwrap(), None);

        std::fs::write(dir.path().join("global").join("a.png"), b"global").unwrap();
        assert_eq!(
            cache.check_image_exists("a.png", guild).unwrap(),
            Some(dir.path().join("global").join("a.png"))
        );
    }

    #[tokio::test]
    async fn urls_without_a_file_name_are_not_images() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path()).unwrap();

        let valid = cache
            .valid_image_url("https://cdn.example.com/", ImageScope::Global)
            .await
            .unwrap();

        assert!(!valid);
    }

    #[tokio::test]
    async fn cached_images_are_served_without_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("global").join("bg.png"), b"cached").unwrap();

        let bytes = cache
            .download_image("https://unreachable.invalid/bg.png", ImageScope::Guild(1))
            .await
            .unwrap();

        assert_eq!(bytes, b"cached");
    }
}
