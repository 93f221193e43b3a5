//! Self-update from the image store
//!
//! The operator drops a replacement binary onto the store partition; on the
//! next CD-ROM transition (or an explicit console request) it is installed
//! over the running program and the process relaunches itself.
//!
//! The running binary is preserved as `<path>.backup` before anything is
//! written, and that rename is a distinct step: a failure after it leaves
//! the backup on disk for the operator. There is no automatic rollback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::error::{AppError, Result};
use crate::exec::CommandRunner;
use crate::store::MountManager;

/// Settling time between installing the payload and relaunching
const RELAUNCH_DELAY: Duration = Duration::from_millis(500);

/// Result of an update check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Updating from the store is disabled by configuration
    Disabled,
    /// No payload file at the store root
    NotAvailable,
    /// Payload installed; only reachable with a mocked relaunch
    Installed,
}

/// Installs update payloads from the image store
pub struct UpdateService {
    config: UpdateConfig,
    exe_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl UpdateService {
    pub fn new(config: UpdateConfig, exe_path: PathBuf, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            exe_path,
            runner,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Where the payload would live on the mounted store
    pub fn payload_path(&self, store_root: &Path) -> PathBuf {
        store_root.join(&self.config.payload_file)
    }

    /// Whether an installable payload is present right now.
    pub fn available(&self, store_root: &Path) -> bool {
        self.config.enabled && self.payload_path(store_root).is_file()
    }

    /// Check for a payload and install it.
    ///
    /// On a successful install this spawns the replacement process and never
    /// returns: the current process exits.
    pub async fn run(
        &self,
        store_root: &Path,
        mount: &mut MountManager,
    ) -> Result<UpdateOutcome> {
        if !self.config.enabled {
            debug!("updating from the image store is disabled");
            return Ok(UpdateOutcome::Disabled);
        }

        let payload = self.payload_path(store_root);
        if !payload.is_file() {
            debug!("no update payload at {}", payload.display());
            return Ok(UpdateOutcome::NotAvailable);
        }

        info!("found update payload on the image store, installing");
        self.stage(&payload, mount).await?;

        info!("installation successful, relaunching");
        self.relaunch()?;
        Ok(UpdateOutcome::Installed)
    }

    /// Install the payload over the running binary without relaunching.
    ///
    /// The store is reopened writable first; the catalog mount from CD-ROM
    /// setup is read-only.
    pub async fn stage(&self, payload: &Path, mount: &mut MountManager) -> Result<()> {
        mount.unmount().await?;
        mount.mount(true).await?;

        let backup = backup_path(&self.exe_path);
        tokio::fs::rename(&self.exe_path, &backup)
            .await
            .map_err(|e| {
                AppError::Internal(format!(
                    "backing up {} failed: {}",
                    self.exe_path.display(),
                    e
                ))
            })?;
        info!("running binary preserved at {}", backup.display());

        if let Err(e) = install(payload, &self.exe_path).await {
            warn!(
                "installing the payload failed, restore manually from {}",
                backup.display()
            );
            return Err(e);
        }

        // Make sure the new binary is fully on disk before we hand over.
        match self.runner.run("sync", &[]).await {
            Ok(true) => {}
            Ok(false) => warn!("sync after install exited non-zero"),
            Err(e) => warn!("cannot run sync after install: {}", e),
        }
        sleep(RELAUNCH_DELAY).await;

        Ok(())
    }

    /// Spawn the replacement process and exit this one.
    fn relaunch(&self) -> Result<()> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        std::process::Command::new(&self.exe_path)
            .args(&args)
            .spawn()
            .map_err(|e| {
                AppError::Internal(format!(
                    "relaunching {} failed: {}",
                    self.exe_path.display(),
                    e
                ))
            })?;

        info!("replacement process spawned, exiting");
        std::process::exit(0);
    }
}

/// `<program>.backup` next to the running binary
fn backup_path(exe_path: &Path) -> PathBuf {
    let mut path = exe_path.as_os_str().to_os_string();
    path.push(".backup");
    PathBuf::from(path)
}

/// Move the payload into place; copy plus remove, since the store partition
/// is a different filesystem than the binary's.
async fn install(payload: &Path, target: &Path) -> Result<()> {
    tokio::fs::copy(payload, target).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(target).await?.permissions();
        perms.set_mode(0o755);
        tokio::fs::set_permissions(target, perms).await?;
    }

    tokio::fs::remove_file(payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::MockCommandRunner;
    use tempfile::TempDir;

    struct Fixture {
        runner: Arc<MockCommandRunner>,
        service: UpdateService,
        mount: MountManager,
        store_root: PathBuf,
        exe_path: PathBuf,
        _dir: TempDir,
    }

    fn fixture(enabled: bool) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store_root = dir.path().join("imgstore");
        std::fs::create_dir(&store_root).unwrap();

        let bin_dir = dir.path().join("bin");
        std::fs::create_dir(&bin_dir).unwrap();
        let exe_path = bin_dir.join("emucd");
        std::fs::write(&exe_path, b"old binary").unwrap();

        let table = dir.path().join("mounts");
        std::fs::write(&table, "").unwrap();

        let runner = Arc::new(MockCommandRunner::new());
        let mount = MountManager::new(runner.clone(), "/dev/mmcblk0p3", &store_root)
            .with_mounts_table(&table);
        let service = UpdateService::new(
            UpdateConfig {
                enabled,
                payload_file: "update-emucd.bin".to_string(),
            },
            exe_path.clone(),
            runner.clone(),
        );

        Fixture {
            runner,
            service,
            mount,
            store_root,
            exe_path,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_disabled_never_touches_anything() {
        let mut fx = fixture(false);
        std::fs::write(fx.service.payload_path(&fx.store_root), b"new binary").unwrap();

        let outcome = fx.service.run(&fx.store_root, &mut fx.mount).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::Disabled);
        assert!(fx.runner.calls().is_empty());
        assert_eq!(std::fs::read(&fx.exe_path).unwrap(), b"old binary");
    }

    #[tokio::test]
    async fn test_no_payload_is_a_negative_result() {
        let mut fx = fixture(true);

        let outcome = fx.service.run(&fx.store_root, &mut fx.mount).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::NotAvailable);
        assert!(!fx.service.available(&fx.store_root));
    }

    #[tokio::test]
    async fn test_stage_installs_payload_and_keeps_backup() {
        let mut fx = fixture(true);
        let payload = fx.service.payload_path(&fx.store_root);
        std::fs::write(&payload, b"new binary").unwrap();
        assert!(fx.service.available(&fx.store_root));

        fx.service.stage(&payload, &mut fx.mount).await.unwrap();

        assert_eq!(std::fs::read(&fx.exe_path).unwrap(), b"new binary");
        let backup = fx.exe_path.with_extension("backup");
        assert_eq!(std::fs::read(&backup).unwrap(), b"old binary");
        // The payload moved, it was not copied.
        assert!(!payload.exists());
        // The store was reopened writable before anything was written.
        assert_eq!(fx.runner.count_for("mount"), 1);
        let calls = fx.runner.calls();
        let (_, mount_args) = calls.iter().find(|(p, _)| p == "mount").unwrap();
        assert!(!mount_args.contains(&"ro".to_string()));
    }

    #[tokio::test]
    async fn test_failure_after_rename_leaves_the_backup() {
        let mut fx = fixture(true);
        // A directory as payload makes the copy fail after the rename.
        let payload = fx.store_root.join("payload-dir");
        std::fs::create_dir(&payload).unwrap();

        let result = fx.service.stage(&payload, &mut fx.mount).await;

        assert!(result.is_err());
        let backup = fx.exe_path.with_extension("backup");
        assert_eq!(std::fs::read(&backup).unwrap(), b"old binary");
        assert!(!fx.exe_path.exists());
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/usr/local/bin/emucd")),
            PathBuf::from("/usr/local/bin/emucd.backup")
        );
    }
}
