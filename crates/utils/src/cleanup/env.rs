//! Guards for process-wide state: environment variables and the working
//! directory.
//!
//! Both kinds of state are shared by every thread, so each guard holds a
//! process-wide reentrant lock for as long as it lives. Guards may be
//! nested on one thread; other threads creating a guard wait for them.

use gizmos_core::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

static ENV_LOCK: Lazy<ReentrantMutex<()>> = Lazy::new(|| ReentrantMutex::new(()));
static DIR_LOCK: Lazy<ReentrantMutex<()>> = Lazy::new(|| ReentrantMutex::new(()));

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('=') || key.contains('\0') {
        return Err(Error::environment(
            key,
            "variable names must be non-empty and contain no '=' or NUL",
        ));
    }
    Ok(())
}

/// Sets environment variables and restores their previous values on drop
///
/// Variables that did not exist before are removed again.
pub struct EnvVarGuard {
    previous: Vec<(String, Option<OsString>)>,
    _lock: ReentrantMutexGuard<'static, ()>,
}

impl EnvVarGuard {
    pub fn set<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for (key, value) in &vars {
            validate_key(key)?;
            if value.contains('\0') {
                return Err(Error::environment(key.as_str(), "value contains NUL"));
            }
        }

        let lock = ENV_LOCK.lock();
        let mut previous = Vec::with_capacity(vars.len());
        for (key, value) in vars {
            previous.push((key.clone(), env::var_os(&key)));
            env::set_var(&key, value);
        }
        tracing::trace!(count = previous.len(), "environment variables overridden");

        Ok(Self {
            previous,
            _lock: lock,
        })
    }

    /// Names of the variables this guard will restore
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.previous.iter().map(|(key, _)| key.as_str())
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..).rev() {
            match value {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}

/// Changes the working directory and changes it back on drop
pub struct CurrentDirGuard {
    previous: PathBuf,
    _lock: ReentrantMutexGuard<'static, ()>,
}

impl CurrentDirGuard {
    pub fn change_to(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let lock = DIR_LOCK.lock();
        let previous = env::current_dir()
            .map_err(|e| Error::file_system(".", "read current directory", e))?;
        env::set_current_dir(path)
            .map_err(|e| Error::file_system(path, "change current directory", e))?;
        tracing::trace!(from = %previous.display(), to = %path.display(), "changed directory");

        Ok(Self {
            previous,
            _lock: lock,
        })
    }

    /// Directory restored on drop
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for CurrentDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            tracing::warn!(path = %self.previous.display(), error = %e, "failed to restore current directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(env)]
    fn test_env_guard_restores_and_removes() {
        env::set_var("GIZMOS_TEST_EXISTING", "before");
        env::remove_var("GIZMOS_TEST_NEW");

        {
            let guard = EnvVarGuard::set([
                ("GIZMOS_TEST_EXISTING", "during"),
                ("GIZMOS_TEST_NEW", "fresh"),
            ])
            .unwrap();
            assert_eq!(env::var("GIZMOS_TEST_EXISTING").unwrap(), "during");
            assert_eq!(env::var("GIZMOS_TEST_NEW").unwrap(), "fresh");
            assert_eq!(guard.keys().count(), 2);
        }

        assert_eq!(env::var("GIZMOS_TEST_EXISTING").unwrap(), "before");
        assert!(env::var_os("GIZMOS_TEST_NEW").is_none());
        env::remove_var("GIZMOS_TEST_EXISTING");
    }

    #[test]
    #[serial(env)]
    fn test_env_guards_nest_on_one_thread() {
        let outer = EnvVarGuard::set([("GIZMOS_TEST_NESTED", "outer")]).unwrap();
        {
            let _inner = EnvVarGuard::set([("GIZMOS_TEST_NESTED", "inner")]).unwrap();
            assert_eq!(env::var("GIZMOS_TEST_NESTED").unwrap(), "inner");
        }
        assert_eq!(env::var("GIZMOS_TEST_NESTED").unwrap(), "outer");
        drop(outer);
        assert!(env::var_os("GIZMOS_TEST_NESTED").is_none());
    }

    #[test]
    fn test_env_guard_rejects_bad_names() {
        let err = EnvVarGuard::set([("BAD=NAME", "x")]).err().unwrap();
        assert_eq!(err.kind(), gizmos_core::ErrorKind::Environment);
        assert!(EnvVarGuard::set([("", "x")]).is_err());
    }

    #[test]
    #[serial(cwd)]
    fn test_current_dir_guard_restores() {
        let original = env::current_dir().unwrap();
        let target = tempfile::tempdir().unwrap();

        {
            let guard = CurrentDirGuard::change_to(target.path()).unwrap();
            assert_eq!(guard.previous(), original);
            assert_eq!(
                env::current_dir().unwrap().canonicalize().unwrap(),
                target.path().canonicalize().unwrap()
            );
        }

        assert_eq!(env::current_dir().unwrap(), original);
        assert!(CurrentDirGuard::change_to(target.path().join("missing")).is_err());
    }
}
