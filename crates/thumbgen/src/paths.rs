use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const ENV_ROOT: &str = "SHADER_STUDY_ROOT";
pub const ENV_DIST_DIR: &str = "SHADER_STUDY_DIST_DIR";
pub const ENV_PUBLIC_DIR: &str = "SHADER_STUDY_PUBLIC_DIR";

const CONFIG_FILE: &str = "thumbgen.toml";

/// Directories the capture tool reads from and writes to.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
    dist_dir: PathBuf,
    public_dir: PathBuf,
}

impl ProjectPaths {
    pub fn discover() -> Result<Self> {
        let root = match env_override(ENV_ROOT) {
            Some(root) => root,
            None => env::current_dir().context("failed to determine working directory")?,
        };
        let dist_dir = env_override(ENV_DIST_DIR).unwrap_or_else(|| root.join("dist"));
        let public_dir = env_override(ENV_PUBLIC_DIR).unwrap_or_else(|| root.join("public"));
        Ok(Self {
            root,
            dist_dir,
            public_dir,
        })
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            dist_dir: root.join("dist"),
            public_dir: root.join("public"),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.public_dir.join("thumbnails")
    }

    pub fn index_document(&self) -> PathBuf {
        self.dist_dir.join("index.html")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Map a public URL path like `/thumbnails/x.png` onto the public dir.
    pub fn resolve_thumbnail(&self, thumbnail_path: &str) -> PathBuf {
        self.public_dir.join(thumbnail_path.trim_start_matches('/'))
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn root_override_derives_layout() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _root_guard = EnvGuard::set(ENV_ROOT, root.path());
        let _dist_guard = EnvGuard::clear(ENV_DIST_DIR);
        let _public_guard = EnvGuard::clear(ENV_PUBLIC_DIR);

        let paths = ProjectPaths::discover().unwrap();

        assert_eq!(paths.index_document(), root.path().join("dist/index.html"));
        assert_eq!(paths.thumbnails_dir(), root.path().join("public/thumbnails"));
        assert_eq!(paths.config_file(), root.path().join("thumbgen.toml"));
    }

    #[test]
    fn directory_overrides_take_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let dist = root.path().join("build");
        let public = root.path().join("static");
        let _root_guard = EnvGuard::set(ENV_ROOT, root.path());
        let _dist_guard = EnvGuard::set(ENV_DIST_DIR, &dist);
        let _public_guard = EnvGuard::set(ENV_PUBLIC_DIR, &public);

        let paths = ProjectPaths::discover().unwrap();

        assert_eq!(paths.dist_dir(), dist.as_path());
        assert_eq!(paths.public_dir(), public.as_path());
    }

    #[test]
    fn thumbnail_paths_are_public_relative() {
        let paths = ProjectPaths::from_root("/srv/gallery");
        assert_eq!(
            paths.resolve_thumbnail("/thumbnails/gradation.png"),
            PathBuf::from("/srv/gallery/public/thumbnails/gradation.png")
        );
        assert_eq!(
            paths.resolve_thumbnail("thumbnails/a.png"),
            PathBuf::from("/srv/gallery/public/thumbnails/a.png")
        );
    }
}
