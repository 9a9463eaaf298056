#![forbid(unsafe_code)]

use std::path::{Component, Path, PathBuf};

/// Default parity destination: the data path with `.pars` appended.
#[must_use]
pub fn default_parity_path(data_path: &Path) -> PathBuf {
    let mut parity = data_path.as_os_str().to_os_string();
    parity.push(".pars");
    PathBuf::from(parity)
}

/// The name stored in the header: the data path expressed relative to the
/// parity file's parent directory, with `/` separators.
///
/// Relative inputs get a true relative path, climbing shared ancestors
/// with `..` segments where needed. An absolute data path is stored
/// relative only when it sits under the parity directory (keeping a
/// side-by-side pair relocatable); otherwise it stays absolute and
/// resolves the same way from any parity location.
#[must_use]
pub fn stored_file_name(data_path: &Path, parity_path: &Path) -> String {
    let parity_dir = parity_path.parent().unwrap_or_else(|| Path::new(""));

    if data_path.is_absolute() {
        let stored = data_path.strip_prefix(parity_dir).unwrap_or(data_path);
        return normalize_separators(stored);
    }

    match relative_to(data_path, parity_dir) {
        Some(relative) => normalize_separators(&relative),
        None => normalize_separators(data_path),
    }
}

/// Express `path` relative to the directory `base`, climbing out of
/// non-shared ancestors with `..` segments.
///
/// Returns `None` when the two disagree on absoluteness or when `base`
/// itself climbs upward (its `..` segments cannot be inverted without
/// consulting the filesystem).
fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if path.is_absolute() != base.is_absolute() {
        return None;
    }

    let mut path_iter = path.components().filter(|c| *c != Component::CurDir);
    let mut base_iter = base.components().filter(|c| *c != Component::CurDir);
    let mut comps: Vec<Component<'_>> = Vec::new();
    loop {
        match (path_iter.next(), base_iter.next()) {
            (None, None) => break,
            (Some(component), None) => {
                comps.push(component);
                comps.extend(path_iter);
                break;
            }
            (None, Some(_)) => comps.push(Component::ParentDir),
            (Some(a), Some(b)) if comps.is_empty() && a == b => {}
            (Some(_), Some(Component::ParentDir)) => return None,
            (Some(component), Some(_)) => {
                comps.push(Component::ParentDir);
                comps.extend(base_iter.map(|_| Component::ParentDir));
                comps.push(component);
                comps.extend(path_iter);
                break;
            }
        }
    }
    Some(comps.iter().map(|c| c.as_os_str()).collect())
}

/// Resolve a stored name against the parity file's directory.
///
/// Names beginning with the platform directory separator are absolute and
/// used verbatim.
#[must_use]
pub fn resolve_stored_name(name: &str, parity_dir: &Path) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        parity_dir.join(path)
    }
}

fn normalize_separators(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::CurDir => {}
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}
