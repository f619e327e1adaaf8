use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::ConfigError;
use crate::models::AppConfig;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Exclusive lock on `<config>.lock`, released when dropped
struct ConfigLock {
    file: File,
}

impl ConfigLock {
    fn acquire(path: &Path, timeout: Duration) -> Result<Self, ConfigError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(_) if Instant::now() < deadline => std::thread::sleep(LOCK_RETRY),
                Err(_) => return Err(ConfigError::LockTimeout(path.display().to_string())),
            }
        }
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release config lock: {}", e);
        }
    }
}

/// The on-disk JSON configuration document.
///
/// Every access from the HTTP surface holds the lock file for the whole
/// read or read-modify-write sequence. Calls block; run them off the async
/// executor.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.clone().into_os_string();
        lock_name.push(".lock");
        Self {
            path,
            lock_path: PathBuf::from(lock_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Startup load: the file must exist, parse and validate.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let _lock = ConfigLock::acquire(&self.lock_path, LOCK_TIMEOUT)?;
        self.read_unlocked()
    }

    /// Runs `edit` on the current document and writes the result back, all
    /// under the lock. Nothing is written if `edit` fails or the edited
    /// document doesn't validate.
    pub fn update<T, F>(&self, edit: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut AppConfig) -> Result<T, ConfigError>,
    {
        let _lock = ConfigLock::acquire(&self.lock_path, LOCK_TIMEOUT)?;
        let mut config = self.read_unlocked()?;
        let out = edit(&mut config)?;
        config.validate()?;
        self.write_unlocked(&config)?;
        Ok(out)
    }

    fn read_unlocked(&self) -> Result<AppConfig, ConfigError> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound {
                path: self.path.display().to_string(),
            });
        }
        let raw = fs::read_to_string(&self.path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn write_unlocked(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let mut tmp_name = self.path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = File::create(&tmp)?;
        file.write_all(serde_json::to_string_pretty(config)?.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
