//! External cache oracle (spec §6): compares a content hash of the
//! source against a sidecar file next to where the artifact would
//! land, so a caller can skip work when nothing has changed. `--force`
//! bypasses this and is handled by the caller before reaching here.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

fn sidecar_path(source: &Path) -> PathBuf {
    source.with_extension("crucible-cache")
}

fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// True if `source`'s sidecar hash matches its current content — a
/// missing sidecar is "never-fatal" (spec §7): it just means recompile.
pub fn is_up_to_date(source: &Path) -> io::Result<bool> {
    let sidecar = sidecar_path(source);
    let Ok(recorded) = std::fs::read_to_string(&sidecar) else {
        return Ok(false);
    };
    let current = std::fs::read(source)?;
    let recorded_hash: Option<u64> = recorded.trim().parse().ok();
    Ok(recorded_hash == Some(content_hash(&current)))
}

pub fn write_sidecar(source: &Path) -> io::Result<()> {
    let current = std::fs::read(source)?;
    std::fs::write(sidecar_path(source), content_hash(&current).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn freshly_written_sidecar_reports_up_to_date() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prog.py");
        std::fs::write(&path, "def f():\n    pass\n").unwrap();
        assert!(!is_up_to_date(&path).unwrap());
        write_sidecar(&path).unwrap();
        assert!(is_up_to_date(&path).unwrap());
    }

    #[test]
    fn editing_the_source_invalidates_the_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prog.py");
        std::fs::write(&path, "def f():\n    pass\n").unwrap();
        write_sidecar(&path).unwrap();
        std::fs::write(&path, "def f():\n    return 1\n").unwrap();
        assert!(!is_up_to_date(&path).unwrap());
    }
}
