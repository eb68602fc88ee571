//! Path canonicalization and relative-path matching utilities

use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a tree root so that prefixes strip consistently
///
/// Uses dunce so Windows roots do not gain a `\\?\` prefix.
pub fn canonicalize_root(path: &Path) -> Result<PathBuf, crate::error::StorageError> {
    dunce::canonicalize(path).map_err(|e| {
        crate::error::StorageError::InvalidPath(format!(
            "Failed to canonicalize {}: {}",
            path.display(),
            e
        ))
    })
}

/// Strip `root` from `absolute`, component-wise.
///
/// Returns None when `absolute` does not live under `root`.
pub fn relative_to(root: &Path, absolute: &Path) -> Option<PathBuf> {
    absolute.strip_prefix(root).ok().map(Path::to_path_buf)
}

/// Key under which two relative paths denote the same file position.
///
/// Components are joined with `/`, Unicode is normalized to NFC and the
/// result is lower-cased, so `Data/Foo.txt` and `data/foo.txt` match.
pub fn match_key(relative: &Path) -> String {
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    joined.nfc().collect::<String>().to_lowercase()
}

/// Convert any `\` separators to `/`
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Render a relative path with forward slashes for display and persistence
pub fn display_relative(relative: &Path) -> String {
    normalize_separators(&relative.to_string_lossy())
}
