//! Filesystem helpers shared by the build pipeline, the map store and the
//! remote fallback
//!
//! - `atomic_rename`: replace a file in one step (Windows needs an explicit delete)
//! - `write_atomic`: write to a temp sibling, then rename over the target
//! - `write_file`: write, creating parent directories as needed
//! - `join_under`: join a request-supplied relative path onto a root without
//!   ever leaving that root
//! - `absolutize`: anchor a configured path and fold `.`/`..` lexically

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Cross-platform atomic rename that handles Windows file replacement.
///
/// On Unix, `fs::rename` atomically replaces the target if it exists.
/// On Windows, `fs::rename` fails if the target exists, so the target is
/// deleted first.
pub fn atomic_rename(src: &Path, dst: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }
    }
    std::fs::rename(src, dst)
}

/// Create the parent directory of `path` if it does not exist yet
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    ensure_parent(path)?;
    fs::write(path, contents)
}

/// Write `contents` to `path` so that concurrent readers either see the old
/// file or the complete new one, never a partial write.
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>) -> io::Result<()> {
    ensure_parent(path)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let tmp_name = format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp_path, contents) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Err(e) = atomic_rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

/// Join `relative` onto `root` lexically.
///
/// Leading `/` and `.` components are dropped and `..` only pops components
/// that `relative` itself added. Returns `None` when the path would climb
/// above `root`. Nothing is canonicalized: symlinks are not followed.
pub fn join_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    if parts.is_empty() {
        return None;
    }

    let mut joined = root.to_path_buf();
    joined.extend(parts);
    Some(joined)
}

/// Make `path` absolute against `base` and resolve `.` and `..` lexically.
///
/// Symlinks are not followed, so the result is comparable with walker paths
/// built under an already canonical root.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Render a relative path with `/` separators regardless of platform
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
