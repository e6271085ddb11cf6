use std::path::{Path, PathBuf};

const MARKER: &str = "assets/blocks.toml";

/// Directory holding `assets/`.
///
/// Precedence: CLI flag, then `TRILE_ASSETS`, then the nearest ancestor of the
/// working directory, the executable or the crate root that has the assets,
/// then the working directory.
pub fn resolve_assets_root(cli: Option<PathBuf>) -> PathBuf {
    if let Some(p) = cli.filter(|p| p.exists()) {
        return p;
    }
    if let Some(p) = std::env::var_os("TRILE_ASSETS")
        .map(PathBuf::from)
        .filter(|p| p.exists())
    {
        return p;
    }
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd);
    }
    if let Some(dir) = std::env::current_exe().ok().and_then(|e| e.parent().map(Path::to_path_buf)) {
        candidates.push(dir);
    }
    candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")));

    for base in candidates {
        if let Some(found) = base.ancestors().take(6).find(|d| d.join(MARKER).exists()) {
            return found.to_path_buf();
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn blocks_path(root: &Path) -> PathBuf {
    root.join(MARKER)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join("assets/demo.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_root_is_found() {
        let root = resolve_assets_root(Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))));
        assert!(blocks_path(&root).exists());
        assert!(config_path(&root).exists());
    }
}
