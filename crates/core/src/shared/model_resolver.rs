use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// A model artifact identified by file name, with the URL it can be fetched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSource {
    pub name: &'static str,
    pub url: &'static str,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Locates model files on disk, downloading them into a cache when missing.
///
/// Resolution order:
/// 1. Cache directory (platform-specific unless overridden)
/// 2. Bundled directory (for development / pre-packaged installs)
/// 3. Download from the source URL into the cache
#[derive(Clone, Debug)]
pub struct ModelResolver {
    cache_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl ModelResolver {
    /// Resolver backed by the platform cache directory.
    pub fn new(bundled_dir: Option<PathBuf>) -> Result<Self, ModelResolveError> {
        Ok(Self::with_cache_dir(model_cache_dir()?, bundled_dir))
    }

    pub fn with_cache_dir(cache_dir: PathBuf, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            bundled_dir,
        }
    }

    /// Returns a local path for `source` without touching the network.
    pub fn find_local(&self, source: &ModelSource) -> Option<PathBuf> {
        let cached_path = self.cache_dir.join(source.name);
        if cached_path.exists() {
            return Some(cached_path);
        }
        self.bundled_dir
            .as_ref()
            .map(|dir| dir.join(source.name))
            .filter(|path| path.exists())
    }

    /// Returns a local path for `source`, downloading it if necessary.
    ///
    /// The download is blocking and may take several seconds on first use.
    pub fn resolve(
        &self,
        source: &ModelSource,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = self.find_local(source) {
            return Ok(path);
        }

        log::info!("Downloading model {} from {}", source.name, source.url);
        fs::create_dir_all(&self.cache_dir).map_err(ModelResolveError::CacheDir)?;
        let cached_path = self.cache_dir.join(source.name);
        download(source.url, &cached_path, progress)?;
        Ok(cached_path)
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/EmoSentry/models/`
/// - Linux: `$XDG_CACHE_HOME/EmoSentry/models/` or `~/.cache/EmoSentry/models/`
/// - Windows: `%LOCALAPPDATA%/EmoSentry/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("EmoSentry").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("EmoSentry").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    // Never leave a truncated .part file behind
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let mut file = fs::File::create(temp_path).map_err(write_error(temp_path))?;

    // Stream in chunks; emotion and detector models are tens of MB.
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_error(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_error(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_error(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_error(dest))?;

    Ok(())
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ModelResolveError {
    let path = path.to_path_buf();
    move |source| ModelResolveError::Write { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_MODEL: ModelSource = ModelSource {
        name: "test_model.onnx",
        url: "http://invalid.nonexistent.example.com/test_model.onnx",
    };

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join(TEST_MODEL.name), b"cached").unwrap();
        fs::write(bundled.join(TEST_MODEL.name), b"bundled").unwrap();

        let resolver = ModelResolver::with_cache_dir(cache.clone(), Some(bundled));
        let path = resolver.resolve(&TEST_MODEL, None).unwrap();

        assert_eq!(path, cache.join(TEST_MODEL.name));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join(TEST_MODEL.name), b"bundled model").unwrap();

        let resolver =
            ModelResolver::with_cache_dir(tmp.path().join("cache"), Some(bundled.clone()));
        let path = resolver.resolve(&TEST_MODEL, None).unwrap();

        assert_eq!(path, bundled.join(TEST_MODEL.name));
        assert_eq!(fs::read(&path).unwrap(), b"bundled model");
    }

    #[test]
    fn test_find_local_returns_none_when_missing() {
        let tmp = TempDir::new().unwrap();
        let resolver = ModelResolver::with_cache_dir(tmp.path().join("cache"), None);
        assert!(resolver.find_local(&TEST_MODEL).is_none());
    }

    #[test]
    fn test_resolve_missing_model_with_bad_url_fails() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let resolver = ModelResolver::with_cache_dir(cache.clone(), None);

        let result = resolver.resolve(&TEST_MODEL, None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!cache.join(TEST_MODEL.name).exists());
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let dir = model_cache_dir();
        assert!(dir.is_ok());
        let path = dir.unwrap();
        assert!(path.to_string_lossy().contains("EmoSentry"));
        assert!(path.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest, None);
        // Neither the dest nor the .part file should exist after failure
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
