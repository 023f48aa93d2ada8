use crate::RegistryConfig;
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

static GLOBAL: OnceLock<TempFileRegistry> = OnceLock::new();
static EXIT_HOOK: Once = Once::new();

/// Bookkeeping of every temporary file created through it.
///
/// Tracked files are removed by [`purge_all`](Self::purge_all). The
/// [global](Self::global) registry additionally purges itself when the
/// process exits normally; any other registry purges itself when dropped.
///
/// ```
/// # use tracked_tempfile::{RegistryConfig, TempFileRegistry, Error};
/// # let _ = tokio_test::block_on(async {
/// let registry = TempFileRegistry::new(RegistryConfig::default());
/// let file = registry.new_file().await?;
/// assert!(file.is_file());
///
/// registry.purge_all();
/// assert!(!file.is_file());
/// assert!(registry.is_empty());
/// # Ok::<(), Error>(())
/// # });
/// ```
pub struct TempFileRegistry {
    config: RegistryConfig,

    /// Paths created so far, in creation order.
    created: Mutex<Vec<PathBuf>>,

    /// Set for the global registry only: the first registration installs
    /// the process-exit purge.
    hook_process_exit: bool,
}

impl TempFileRegistry {
    /// Creates a scoped registry. Files tracked by it are purged when it is dropped.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            created: Mutex::new(Vec::new()),
            hook_process_exit: false,
        }
    }

    /// Returns the process-wide registry used by the associated functions of
    /// [`TempFile`](crate::TempFile).
    pub fn global() -> &'static TempFileRegistry {
        GLOBAL.get_or_init(|| Self {
            config: RegistryConfig::default(),
            created: Mutex::new(Vec::new()),
            hook_process_exit: true,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Starts tracking `path`. A path that is already tracked is not added twice.
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        {
            let mut created = self.created.lock();
            if created.contains(&path) {
                return;
            }
            tracing::debug!(path = %path.display(), "Tracking temporary file");
            created.push(path);
        }

        if self.hook_process_exit {
            EXIT_HOOK.call_once(install_exit_hook);
        }
    }

    /// Deletes every tracked file that still exists and clears the registry.
    ///
    /// Failures to delete individual files are logged and otherwise ignored;
    /// files that are already gone are skipped. Calling this again right
    /// away does nothing.
    ///
    /// ## Returns
    /// The number of files that were actually removed.
    pub fn purge_all(&self) -> usize {
        // Sweep a snapshot so registrations racing with the purge stay tracked.
        let created = std::mem::take(&mut *self.created.lock());
        if created.is_empty() {
            return 0;
        }

        let removed = created.iter().filter(|path| remove_quietly(path)).count();
        tracing::debug!(tracked = created.len(), removed, "Purged temporary files");
        removed
    }

    /// Returns a snapshot of the tracked paths.
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.created.lock().clone()
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.created.lock().iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.created.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.lock().is_empty()
    }
}

/// Removes a file, treating "not found" as success.
/// Returns `true` if a file was deleted.
fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unable to purge temporary file");
            false
        }
    }
}

fn install_exit_hook() {
    // SAFETY: `purge_global_at_exit` is a plain `extern "C" fn()` that never unwinds.
    let status = unsafe { libc::atexit(purge_global_at_exit) };
    if status != 0 {
        tracing::warn!(status, "Unable to register the temporary file purge at process exit");
    }
}

extern "C" fn purge_global_at_exit() {
    // Nothing may escape from here; process shutdown must not be blocked by cleanup.
    let _ = std::panic::catch_unwind(|| {
        if let Some(registry) = GLOBAL.get() {
            registry.purge_all();
        }
    });
}

impl Drop for TempFileRegistry {
    fn drop(&mut self) {
        self.purge_all();
    }
}

impl Debug for TempFileRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempFileRegistry")
            .field("dir", self.config.dir())
            .field("tracked", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ttmp_registry_{}_{}", name, std::process::id()));
        std::fs::write(&path, b"scratch").unwrap();
        path
    }

    #[test]
    fn register_deduplicates() {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let path = scratch_file("dedup");

        registry.register(&path);
        registry.register(&path);

        assert_eq!(registry.tracked(), vec![path.clone()]);
        assert_eq!(registry.purge_all(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn purge_tolerates_missing_files() {
        let registry = TempFileRegistry::new(RegistryConfig::default());
        let kept = scratch_file("kept");
        let gone = scratch_file("gone");
        registry.register(&kept);
        registry.register(&gone);

        std::fs::remove_file(&gone).unwrap();

        assert_eq!(registry.purge_all(), 1);
        assert!(!kept.exists());
        assert!(registry.is_empty());
        assert_eq!(registry.purge_all(), 0);
    }

    #[test]
    fn only_the_global_registry_hooks_process_exit() {
        let scoped = TempFileRegistry::new(RegistryConfig::default());
        assert!(!scoped.hook_process_exit);

        let first = scratch_file("exit_hook_first");
        let second = scratch_file("exit_hook_second");
        let global = TempFileRegistry::global();
        assert!(global.hook_process_exit);

        global.register(&first);
        assert!(EXIT_HOOK.is_completed());
        global.register(&second);
        assert!(EXIT_HOOK.is_completed());

        assert!(global.is_tracked(&first));
        assert!(global.is_tracked(&second));
    }

    #[test]
    fn dropping_a_scoped_registry_purges_it() {
        let path = scratch_file("drop");
        {
            let registry = TempFileRegistry::new(RegistryConfig::default());
            registry.register(&path);
            assert!(registry.is_tracked(&path));
        }
        assert!(!path.exists());
    }
}
