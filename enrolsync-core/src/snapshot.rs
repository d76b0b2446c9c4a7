//! YAML persistence for [`DirectorySnapshot`].
//!
//! Saves are atomic: serialize → `<name>.tmp` sibling → `chmod 0600` → `rename`.
//! The `.tmp` file always sits next to the target so the rename never
//! crosses filesystems.

use std::path::{Path, PathBuf};

use crate::directory::DirectorySnapshot;
use crate::error::SnapshotError;

/// Load a snapshot from `path`.
///
/// Returns `SnapshotError::NotFound` if absent,
/// `SnapshotError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<DirectorySnapshot, SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| SnapshotError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Atomically write `snapshot` to `path`, creating parent directories.
pub fn save_at(path: &Path, snapshot: &DirectorySnapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = tmp_path_for(path);

    let yaml = to_yaml(snapshot)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Serialized form used on disk (and by the CLI diff).
pub fn to_yaml(snapshot: &DirectorySnapshot) -> Result<String, SnapshotError> {
    Ok(serde_yaml::to_string(snapshot)?)
}

/// `<path>.tmp` next to the target.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "directory.yaml".to_string());
    path.with_file_name(format!("{name}.tmp"))
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SnapshotError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SnapshotError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Course, CourseId, GroupMode};
    use tempfile::TempDir;

    fn sample() -> DirectorySnapshot {
        DirectorySnapshot {
            courses: vec![Course {
                id: CourseId(2),
                shortname: "CS101".into(),
                idnumber: String::new(),
                fullname: String::new(),
                group_mode: GroupMode::Visible,
            }],
            ..DirectorySnapshot::default()
        }
    }

    #[test]
    fn save_then_load_gives_same_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("directory.yaml");
        save_at(&path, &sample()).expect("save");
        assert_eq!(load_at(&path).expect("load"), sample());
    }

    #[test]
    fn save_cleans_up_tmp() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("directory.yaml");
        save_at(&path, &sample()).expect("save");
        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists(), ".tmp must be gone after save");
    }

    #[test]
    #[cfg(unix)]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("directory.yaml");
        save_at(&path, &sample()).expect("save");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn load_missing_returns_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_at(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound { .. }));
    }

    #[test]
    fn empty_mapping_uses_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("directory.yaml");
        std::fs::write(&path, "{}\n").expect("write");
        let snapshot = load_at(&path).expect("load");
        assert_eq!(snapshot.site_course, CourseId(1));
        assert!(snapshot.courses.is_empty());
    }
}
