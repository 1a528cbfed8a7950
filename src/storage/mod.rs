//! Moves finished recordings from the working folder into final storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::RelocateError;

/// Compares two folder paths ignoring case and trailing separators.
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute
        .to_string_lossy()
        .trim_end_matches(['/', '\\'])
        .to_lowercase()
}

/// Removes `dir` if it has no entries left. Returns whether it was removed.
pub fn prune_if_empty(dir: &Path) -> bool {
    let empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => return false,
    };
    if !empty {
        return false;
    }
    match fs::remove_dir(dir) {
        Ok(()) => {
            debug!("Removed empty folder {:?}", dir);
            true
        }
        Err(e) => {
            warn!("Failed to remove empty folder {:?}: {}", dir, e);
            false
        }
    }
}

/// Creates a new folder `name` under `parent`, never reusing an existing one.
///
/// When `name` is taken the folder gets a `_2`, `_3`, ... suffix instead.
pub fn create_unique_dir(parent: &Path, name: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(parent)?;
    let mut n = 1u32;
    loop {
        let candidate = match n {
            1 => parent.join(name),
            _ => parent.join(format!("{}_{}", name, n)),
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// First path in `dest_folder` for `file_name` that is not taken yet.
fn free_target(dest_folder: &Path, file_name: &Path) -> PathBuf {
    let target = dest_folder.join(file_name);
    if !target.exists() {
        return target;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name.extension().map(|e| e.to_string_lossy().into_owned());
    (2u32..)
        .map(|n| match &ext {
            Some(ext) => dest_folder.join(format!("{}_{}.{}", stem, n, ext)),
            None => dest_folder.join(format!("{}_{}", stem, n)),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(target)
}

/// Moves `source` into `dest_folder` (unless it already lives there) and
/// prunes the folder it came from when that is now empty.
///
/// An existing file in `dest_folder` is never replaced; the moved file gets a
/// numbered name next to it.
pub fn relocate(source: &Path, dest_folder: &Path) -> Result<PathBuf, RelocateError> {
    let (Some(file_name), Some(origin)) = (source.file_name(), source.parent()) else {
        return Err(RelocateError::InvalidPath(source.to_path_buf()));
    };

    if paths_equal(origin, dest_folder) {
        return Ok(source.to_path_buf());
    }

    let target = free_target(dest_folder, Path::new(file_name));
    if target.file_name() != Some(file_name) {
        warn!("{:?} already exists in {:?}, saving as {:?}", file_name, dest_folder, target);
    }
    move_file(source, &target)?;
    info!("Moved {:?} to {:?}", source, target);

    prune_if_empty(origin);
    Ok(target)
}

fn move_file(from: &Path, to: &Path) -> Result<(), RelocateError> {
    let err = |source| RelocateError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            // rename cannot cross filesystems; fall back to copy + delete
            debug!("rename failed ({}), copying {:?} instead", rename_err, from);
            fs::copy(from, to).map_err(|_| err(rename_err))?;
            fs::remove_file(from).map_err(err)
        }
    }
}
