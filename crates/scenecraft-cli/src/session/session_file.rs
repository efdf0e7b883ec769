use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use scenecraft::conversation::json_path;

pub fn ensure_session_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_dir = home_dir.join(".config").join("scenecraft").join("sessions");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Where renders for scene descriptions are written
pub fn ensure_render_dir() -> Result<PathBuf> {
    let cache_dir =
        dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?;
    let render_dir = cache_dir.join("scenecraft").join("renders");

    if !render_dir.exists() {
        fs::create_dir_all(&render_dir)?;
    }

    Ok(render_dir)
}

/// Log file of the session called `name` inside `session_dir`
pub fn session_path(session_dir: &Path, name: &str) -> PathBuf {
    json_path(&session_dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_path() {
        let dir = Path::new("/tmp/sessions");
        assert_eq!(session_path(dir, "castle"), PathBuf::from("/tmp/sessions/castle.json"));
        assert_eq!(
            session_path(dir, "castle.json"),
            PathBuf::from("/tmp/sessions/castle.json")
        );
    }
}
