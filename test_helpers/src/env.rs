//! Helpers for mutating environment variables in tests.
//!
//! Every mutation runs under a global re-entrant mutex and hands back an
//! [`EnvVarGuard`] that restores the previous value (or removes the variable)
//! when dropped. Hold an [`EnvVarLock`] from [`lock`] when a test needs the
//! environment to stay stable across several operations, for example while an
//! environment snapshot is captured.
//!
//! # Examples
//!
//! ```
//! use test_helpers::env;
//!
//! let _guard = env::set_var("STRATA_HELPER_DOC", "on");
//! assert_eq!(std::env::var("STRATA_HELPER_DOC").ok().as_deref(), Some("on"));
//! ```

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::LazyLock;

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// RAII guard restoring an environment variable to its prior value on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish()
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let _lock = ENV_MUTEX.lock();
        match self.original.take() {
            // SAFETY: `ENV_MUTEX` is held for the duration of the write.
            Some(value) => unsafe { env::set_var(&self.key, value) },
            // SAFETY: `ENV_MUTEX` is held for the duration of the write.
            None => unsafe { env::remove_var(&self.key) },
        }
    }
}

/// Guard serialising environment access for its lifetime.
#[must_use = "dropping releases the environment lock"]
pub struct EnvVarLock {
    _guard: ReentrantMutexGuard<'static, ()>,
}

impl EnvVarLock {
    /// Sets `key` while the lock is held.
    pub fn set_var<K, V>(&self, key: K, value: V) -> EnvVarGuard
    where
        K: Into<String>,
        V: AsRef<OsStr>,
    {
        set_var(key, value)
    }

    /// Removes `key` while the lock is held.
    pub fn remove_var<K: Into<String>>(&self, key: K) -> EnvVarGuard {
        remove_var(key)
    }
}

/// Sets an environment variable and returns a guard restoring its prior value.
pub fn set_var<K, V>(key: K, value: V) -> EnvVarGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    let name = key.into();
    let _lock = ENV_MUTEX.lock();
    let original = env::var_os(&name);
    // SAFETY: `ENV_MUTEX` is held for the duration of the write.
    unsafe { env::set_var(&name, value) };
    EnvVarGuard { key: name, original }
}

/// Removes an environment variable and returns a guard restoring its prior value.
pub fn remove_var<K: Into<String>>(key: K) -> EnvVarGuard {
    let name = key.into();
    let _lock = ENV_MUTEX.lock();
    let original = env::var_os(&name);
    // SAFETY: `ENV_MUTEX` is held for the duration of the write.
    unsafe { env::remove_var(&name) };
    EnvVarGuard { key: name, original }
}

/// Acquires the global environment lock until the returned guard is dropped.
///
/// The mutex is re-entrant, so [`set_var`] and [`remove_var`] remain usable
/// from the thread holding the lock.
pub fn lock() -> EnvVarLock {
    EnvVarLock {
        _guard: ENV_MUTEX.lock(),
    }
}
