//! Image store mount manager
//!
//! Tracks the local mount of the backing store partition. Both operations
//! are idempotent and reconcile the tracked state with the mount table
//! before acting, so mounts created or removed outside the program are
//! absorbed rather than fought.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::exec::CommandRunner;

/// Local mount state of the store partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountState {
    #[default]
    Unmounted,
    ReadOnly,
    ReadWrite,
}

/// Manages the local mount of the backing store partition
pub struct MountManager {
    runner: Arc<dyn CommandRunner>,
    device: String,
    mount_point: PathBuf,
    state: MountState,
    mounts_table: PathBuf,
}

impl MountManager {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        device: impl Into<String>,
        mount_point: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            device: device.into(),
            mount_point: mount_point.into(),
            state: MountState::Unmounted,
            mounts_table: PathBuf::from("/proc/mounts"),
        }
    }

    /// Read the mount table from somewhere other than /proc/mounts.
    #[cfg(test)]
    pub(crate) fn with_mounts_table(mut self, table: impl Into<PathBuf>) -> Self {
        self.mounts_table = table.into();
        self
    }

    /// Currently tracked mount state
    pub fn state(&self) -> MountState {
        self.state
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Whether the mount table lists something at our mount point.
    fn is_mounted_externally(&self) -> bool {
        let table = match std::fs::read_to_string(&self.mounts_table) {
            Ok(table) => table,
            Err(_) => return false,
        };
        let mount_point = self.mount_point.to_string_lossy();
        table
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(mount_point.as_ref()))
    }

    /// Mount the store partition, read-only unless `writable`.
    pub async fn mount(&mut self, writable: bool) -> Result<()> {
        let target = if writable {
            MountState::ReadWrite
        } else {
            MountState::ReadOnly
        };
        info!(
            "mounting image store{}",
            if writable { " as writeable" } else { "" }
        );

        if self.state != MountState::Unmounted || self.is_mounted_externally() {
            if self.state == MountState::Unmounted {
                self.state = target;
            }
            debug!("image store already mounted");
            return Ok(());
        }

        if !self.mount_point.is_dir() {
            tokio::fs::create_dir_all(&self.mount_point).await?;
        }

        let mut args: Vec<String> = Vec::new();
        if !writable {
            args.push("-o".to_string());
            args.push("ro".to_string());
        }
        args.push(self.device.clone());
        args.push(self.mount_point.display().to_string());

        match self.runner.run("mount", &args).await {
            Ok(true) => {
                self.state = target;
                debug!("image store mounted at {}", self.mount_point.display());
                Ok(())
            }
            Ok(false) => Err(AppError::Mount(format!(
                "mounting {} at {} failed",
                self.device,
                self.mount_point.display()
            ))),
            Err(e) => Err(AppError::Mount(format!("cannot run mount: {}", e))),
        }
    }

    /// Unmount the store partition, syncing pending writes first.
    pub async fn unmount(&mut self) -> Result<()> {
        info!("unmounting image store");

        if self.state == MountState::Unmounted || !self.is_mounted_externally() {
            self.state = MountState::Unmounted;
            debug!("image store already unmounted");
            return Ok(());
        }

        // Flush anything a read-write session may still have in flight.
        match self.runner.run("sync", &[]).await {
            Ok(true) => {}
            Ok(false) => warn!("sync before unmount exited non-zero"),
            Err(e) => warn!("cannot run sync before unmount: {}", e),
        }

        match self.runner.run("umount", &[self.device.clone()]).await {
            Ok(true) => {
                self.state = MountState::Unmounted;
                debug!("image store unmounted");
                Ok(())
            }
            Ok(false) => Err(AppError::Mount(format!(
                "unmounting {} failed",
                self.device
            ))),
            Err(e) => Err(AppError::Mount(format!("cannot run umount: {}", e))),
        }
    }
}
