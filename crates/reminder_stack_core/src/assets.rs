use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{DefinitionError, Result};

/// A file of the static site and the object key it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    /// `/`-separated path relative to the site root.
    pub key: String,
    pub path: PathBuf,
}

/// Files under `root` in walk order (sorted by name), directories skipped.
pub fn site_files(root: &Path) -> Result<Vec<SiteFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|error| {
            let path = error.path().unwrap_or(root).to_path_buf();
            let source = error
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            DefinitionError::Io { path, source }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        files.push(SiteFile {
            key: relative.to_string_lossy().replace('\\', "/"),
            path: entry.into_path(),
        });
    }
    Ok(files)
}

/// Like [`site_files`], but a site without a single file is an error: the
/// publisher would have nothing to copy.
pub fn require_site_files(root: &Path) -> Result<Vec<SiteFile>> {
    let files = site_files(root)?;
    if files.is_empty() {
        return Err(DefinitionError::EmptySite(root.to_path_buf()));
    }
    Ok(files)
}

/// Content hash of a static asset directory.
///
/// Relative paths take part in the hash, so renaming a file changes the
/// fingerprint even when its bytes do not.
pub fn fingerprint_directory(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for file in site_files(root)? {
        let bytes = std::fs::read(&file.path).map_err(|source| DefinitionError::Io {
            path: file.path.clone(),
            source,
        })?;

        hasher.update(file.key.as_bytes());
        hasher.update([0]);
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").expect("write index");
        std::fs::create_dir(dir.path().join("js")).expect("mkdir");
        std::fs::write(dir.path().join("js/app.js"), "fetch('data.json')").expect("write js");
        dir
    }

    #[test]
    fn fingerprint_tracks_content_and_names() {
        let dir = sample_site();

        let first = fingerprint_directory(dir.path()).expect("fingerprint");
        assert_eq!(first, fingerprint_directory(dir.path()).expect("fingerprint"));
        assert_eq!(first.len(), 64);

        std::fs::rename(dir.path().join("index.html"), dir.path().join("home.html"))
            .expect("rename");
        let renamed = fingerprint_directory(dir.path()).expect("fingerprint");
        assert_ne!(first, renamed);
    }

    #[test]
    fn site_files_are_keyed_relative_to_the_root() {
        let dir = sample_site();
        let files = require_site_files(dir.path()).expect("site files");

        let keys: Vec<&str> = files.iter().map(|file| file.key.as_str()).collect();
        assert_eq!(keys, vec!["index.html", "js/app.js"]);
        assert_eq!(files[1].path, dir.path().join("js").join("app.js"));
    }

    #[test]
    fn site_without_files_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("empty")).expect("mkdir");

        assert!(site_files(dir.path()).expect("walk").is_empty());
        assert!(matches!(
            require_site_files(dir.path()),
            Err(DefinitionError::EmptySite(path)) if path == dir.path()
        ));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = fingerprint_directory(&dir.path().join("absent"));
        assert!(matches!(result, Err(DefinitionError::Io { .. })));
    }
}
