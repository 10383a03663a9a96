//! Storage Path Resolver
//!
//! Maps a normalized URL to a file path under the output root. Resolution is
//! pure: it never touches the filesystem, so the same URL always maps to the
//! same path whether or not the file already exists.

use crate::config::{OutputConfig, StorageMode};
use crate::StoragePathError;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use url::{Position, Url};

/// Characters that are illegal or dangerous in a path component on some platform
static DANGEROUS_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\\/*?:"<>|\x00-\x1f]"#).unwrap_or_else(|e| panic!("invalid regex: {e}"))
});

/// Longest component we emit, in bytes; most filesystems cap names at 255
const MAX_COMPONENT_BYTES: usize = 200;

/// Hex digits of the disambiguating hash appended to hierarchical file names
const HASH_SUFFIX_LEN: usize = 8;

/// Appended to directory components that would look like a page file
const DIR_MARKER: &str = "_d";

/// Directory (under the output root) holding page snapshots
pub const SNAPSHOT_DIR: &str = "snapshots";

/// SHA-256 of the URL's serialized form, as lowercase hex
pub fn url_hash(url: &Url) -> String {
    hex::encode(Sha256::digest(url.as_str().as_bytes()))
}

/// Turns URLs into file paths under one output root
#[derive(Debug, Clone)]
pub struct StorageResolver {
    root: PathBuf,
    mode: StorageMode,
    extension: String,
}

impl StorageResolver {
    pub fn new(root: impl Into<PathBuf>, mode: StorageMode, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            root: root.into(),
            mode,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(
            output.directory.clone(),
            output.storage_mode,
            output.extension.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolves the path a page is persisted at
    ///
    /// Flat mode names the file after the URL hash. Hierarchical mode mirrors
    /// the URL path with every segment sanitized; a URL whose path has no
    /// usable segment (the site root, for instance) cannot be placed and
    /// yields [`StoragePathError::Empty`].
    pub fn resolve(&self, url: &Url) -> Result<PathBuf, StoragePathError> {
        match self.mode {
            StorageMode::Flat => Ok(self.flat(url)),
            StorageMode::Hierarchical => self.hierarchical(url),
        }
    }

    /// Where the full-page snapshot of a URL goes, in either storage mode
    pub fn snapshot_path(&self, url: &Url) -> PathBuf {
        self.root
            .join(SNAPSHOT_DIR)
            .join(format!("{}.png", url_hash(url)))
    }

    fn flat(&self, url: &Url) -> PathBuf {
        self.root
            .join(format!("{}.{}", url_hash(url), self.extension))
    }

    /// Mirrors the URL path under the root
    ///
    /// File leaves always end in `.<extension>` and directory components
    /// never do, so a page and a directory cannot claim the same name. A
    /// leaf carries a short hash of the path and query whenever its name was
    /// altered (extension added, query present, or truncated), which keeps
    /// `/guide` apart from `/guide.html` and `?page=1` apart from `?page=2`.
    fn hierarchical(&self, url: &Url) -> Result<PathBuf, StoragePathError> {
        let mut segments: Vec<String> = url
            .path_segments()
            .map(|parts| parts.filter_map(sanitize_segment).collect())
            .unwrap_or_default();

        let Some(last) = segments.pop() else {
            return Err(StoragePathError::Empty(url.to_string()));
        };

        let mut components: Vec<String> = segments
            .into_iter()
            .map(|segment| self.directory_component(segment))
            .collect();
        components.push(self.leaf_component(url, &last));

        let mut path = self.root.clone();
        for component in &components {
            let mut parts = Path::new(component).components();
            match (parts.next(), parts.next()) {
                (Some(Component::Normal(_)), None) => path.push(component),
                _ => return Err(StoragePathError::EscapesRoot(url.to_string())),
            }
        }

        if !path.starts_with(&self.root) {
            return Err(StoragePathError::EscapesRoot(url.to_string()));
        }

        Ok(path)
    }

    fn directory_component(&self, segment: String) -> String {
        let mut name = truncate_bytes(&segment, MAX_COMPONENT_BYTES - DIR_MARKER.len()).to_string();
        if self.looks_like_page(&name) {
            name.push_str(DIR_MARKER);
        }
        name
    }

    fn leaf_component(&self, url: &Url, last: &str) -> String {
        let suffix = format!(".{}", self.extension);
        let (stem, mut altered) = match last.strip_suffix(suffix.as_str()) {
            Some(stem) if !stem.is_empty() => (stem, false),
            _ => (last, true),
        };
        altered |= url.query().is_some_and(|q| !q.is_empty());

        let budget = MAX_COMPONENT_BYTES.saturating_sub(HASH_SUFFIX_LEN + 2 + self.extension.len());
        let truncated = truncate_bytes(stem, budget);
        altered |= truncated.len() < stem.len();

        if altered {
            let digest = hex::encode(Sha256::digest(url[Position::BeforePath..].as_bytes()));
            format!(
                "{}-{}.{}",
                truncated,
                &digest[..HASH_SUFFIX_LEN],
                self.extension
            )
        } else {
            format!("{}.{}", truncated, self.extension)
        }
    }

    /// Case-insensitive, since some filesystems fold case
    fn looks_like_page(&self, name: &str) -> bool {
        name.len() > self.extension.len() + 1
            && name.is_char_boundary(name.len() - self.extension.len() - 1)
            && name[name.len() - self.extension.len() - 1..]
                .eq_ignore_ascii_case(&format!(".{}", self.extension))
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Percent-decodes and cleans one URL path segment
///
/// Returns `None` for segments that carry no name (empty, `.`, `..`, or
/// nothing left after trimming).
fn sanitize_segment(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).unwrap_or_else(|_| raw.into());
    if decoded == "." || decoded == ".." {
        return None;
    }

    let sanitized = DANGEROUS_CHARS.replace_all(&decoded, "_");
    let trimmed = sanitized.trim_matches(|c: char| c == '.' || c.is_whitespace());

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
