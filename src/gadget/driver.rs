//! Gadget driver
//!
//! Loads and unloads the kernel mass-storage gadget module and tracks which
//! emulation is active. Enable and disable are idempotent; retry policy, if
//! any, belongs to the caller.

use std::sync::Arc;

use tracing::{debug, info};

use super::types::{EmulationMode, GadgetParams};
use crate::error::{AppError, Result};
use crate::exec::CommandRunner;

/// Kernel module implementing the mass-storage gadget
const GADGET_MODULE: &str = "g_mass_storage";

/// Driver for the kernel mass-storage gadget module
pub struct GadgetDriver {
    runner: Arc<dyn CommandRunner>,
    state: EmulationMode,
}

impl GadgetDriver {
    /// Create a new gadget driver.
    ///
    /// The initial state assumes a previous instance may have left CD-ROM
    /// emulation loaded, so the first `disable` genuinely attempts the
    /// unload instead of short-circuiting.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            state: EmulationMode::CdRom,
        }
    }

    /// Currently tracked emulation state
    pub fn state(&self) -> EmulationMode {
        self.state
    }

    /// Unload the gadget module.
    ///
    /// A non-zero exit from the unload means the module was not loaded in
    /// the first place; the driver records `Disabled` either way.
    pub async fn disable(&mut self) -> Result<()> {
        info!("disabling emulation");
        if self.state == EmulationMode::Disabled {
            debug!("emulation already disabled");
            return Ok(());
        }

        match self.runner.run("rmmod", &[GADGET_MODULE.to_string()]).await {
            Ok(true) => debug!("gadget module unloaded"),
            Ok(false) => debug!("gadget module was not loaded"),
            Err(e) => {
                return Err(AppError::Gadget(format!("cannot run rmmod: {}", e)));
            }
        }

        self.state = EmulationMode::Disabled;
        Ok(())
    }

    /// Load the gadget module presenting the configured image list.
    pub async fn enable_cdrom(&mut self, params: &GadgetParams) -> Result<()> {
        info!("enabling CD-ROM mode with {} image(s)", params.lun_count());
        if self.state != EmulationMode::Disabled {
            debug!("emulation already active, not reloading");
            return Ok(());
        }

        let mut args = vec![GADGET_MODULE.to_string()];
        args.extend(params.to_module_args());

        match self.runner.run("modprobe", &args).await {
            Ok(true) => {
                self.state = EmulationMode::CdRom;
                debug!("CD-ROM emulation active");
                Ok(())
            }
            Ok(false) => Err(AppError::Gadget(
                "loading gadget module for CD-ROM mode failed".to_string(),
            )),
            Err(e) => Err(AppError::Gadget(format!("cannot run modprobe: {}", e))),
        }
    }

    /// Load the gadget module presenting the whole store partition.
    pub async fn enable_store(&mut self, device: &str) -> Result<()> {
        info!("enabling image store mode on {}", device);
        if self.state != EmulationMode::Disabled {
            debug!("emulation already active, not reloading");
            return Ok(());
        }

        let args = vec![
            GADGET_MODULE.to_string(),
            format!("file={}", device),
            "removable=y".to_string(),
        ];

        match self.runner.run("modprobe", &args).await {
            Ok(true) => {
                self.state = EmulationMode::Store;
                debug!("image store emulation active");
                Ok(())
            }
            Ok(false) => Err(AppError::Gadget(
                "loading gadget module for store mode failed".to_string(),
            )),
            Err(e) => Err(AppError::Gadget(format!("cannot run modprobe: {}", e))),
        }
    }
}
