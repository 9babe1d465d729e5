//! Device-directory watcher for hot-plug support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Watches the device directory and raises the hot-plug flag
///
/// The notify callback runs on its own OS thread. It never touches device
/// or slot state: it only sets the flag that the input pump consumes on its
/// next tick.
pub struct DeviceWatcher {
    _watcher: RecommendedWatcher,
}

impl DeviceWatcher {
    /// Start watching `dir`
    ///
    /// # Arguments
    /// * `dir` - Device directory (e.g. `/dev/input`)
    /// * `flag` - Hot-plug flag shared with the input manager
    pub fn new(dir: &Path, flag: Arc<AtomicBool>) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if is_device_change(&event.kind) {
                        debug!("Device node change: {:?}", event.paths);
                        flag.store(true, Ordering::SeqCst);
                    }
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch device directory: {}", dir.display()))?;

        info!("👀 Device watcher started for: {}", dir.display());
        Ok(Self { _watcher: watcher })
    }
}

/// Nodes appearing or vanishing; attribute changes are ignored
fn is_device_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Remove(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn test_only_create_and_remove_count() {
        assert!(is_device_change(&EventKind::Create(CreateKind::File)));
        assert!(is_device_change(&EventKind::Remove(RemoveKind::Any)));
        assert!(!is_device_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_device_change(&EventKind::Access(notify::event::AccessKind::Any)));
    }

    #[test]
    fn test_new_node_raises_flag() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let flag = Arc::new(AtomicBool::new(false));
        let _watcher = DeviceWatcher::new(temp_dir.path(), Arc::clone(&flag))?;

        std::thread::sleep(Duration::from_millis(100));
        fs::write(temp_dir.path().join("event7"), b"")?;

        let deadline = Instant::now() + Duration::from_secs(2);
        while !flag.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(flag.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let flag = Arc::new(AtomicBool::new(false));
        assert!(DeviceWatcher::new(Path::new("/nonexistent/input/dir"), flag).is_err());
    }
}
