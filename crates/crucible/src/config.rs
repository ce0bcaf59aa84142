//! Optional project-level defaults read from a `crucible.toml` in the
//! current directory, the same convenience the teacher's `depyler`
//! binary affords through its own project manifest. Never required —
//! every field it can set also has a CLI flag.

use serde::Deserialize;
use std::io;

#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub force: bool,
}

pub fn load_project_config() -> io::Result<ProjectConfig> {
    match std::fs::read_to_string("crucible.toml") {
        Ok(text) => toml::from_str(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ProjectConfig::default()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_yields_defaults() {
        // No crucible.toml in the crate's own source tree.
        let cwd = std::env::current_dir().unwrap();
        if !cwd.join("crucible.toml").exists() {
            let cfg = load_project_config().unwrap();
            assert!(!cfg.force);
        }
    }
}
