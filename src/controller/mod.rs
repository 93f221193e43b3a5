//! Mode controller
//!
//! Orchestrates the gadget driver, the mount manager, the self-update
//! service and the indicator LEDs. All transitions run on one task: commands
//! from the button and the console are consumed from a single channel, one
//! at a time, so mode, mount and module state can never be mutated
//! concurrently.

mod types;

pub use types::Command;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::exec::CommandRunner;
use crate::gadget::{EmulationMode, GadgetDriver};
use crate::indicator::Indicator;
use crate::store::{parse_descriptor, MountManager};
use crate::update::{UpdateOutcome, UpdateService};

/// Grace period at startup so a replaced instance can finish exiting before
/// we touch the gadget.
const STARTUP_DELAY: Duration = Duration::from_millis(500);

/// Owns the current emulation mode and sequences every transition
pub struct ModeController {
    store: StoreConfig,
    driver: GadgetDriver,
    mount: MountManager,
    update: UpdateService,
    indicator: Indicator,
    runner: Arc<dyn CommandRunner>,
    mode: EmulationMode,
    mode_tx: watch::Sender<EmulationMode>,
}

impl ModeController {
    pub fn new(
        store: StoreConfig,
        driver: GadgetDriver,
        mount: MountManager,
        update: UpdateService,
        indicator: Indicator,
        runner: Arc<dyn CommandRunner>,
    ) -> (Self, watch::Receiver<EmulationMode>) {
        let (mode_tx, mode_rx) = watch::channel(EmulationMode::Disabled);
        let controller = Self {
            store,
            driver,
            mount,
            update,
            indicator,
            runner,
            mode: EmulationMode::Disabled,
            mode_tx,
        };
        (controller, mode_rx)
    }

    /// Currently recorded emulation mode
    pub fn mode(&self) -> EmulationMode {
        self.mode
    }

    fn set_mode(&mut self, mode: EmulationMode) {
        self.mode = mode;
        self.mode_tx.send_replace(mode);
    }

    /// Consume commands until the program is asked to quit.
    ///
    /// Boots straight into CD-ROM mode, then serves the queue. Only a failed
    /// power-off escapes as an error.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<()> {
        self.indicator.transition_started();
        sleep(STARTUP_DELAY).await;
        self.enter_cdrom().await;

        while let Some(command) = commands.recv().await {
            debug!("handling {:?}", command);
            match command {
                Command::ToggleMode => {
                    self.toggle().await;
                }
                Command::SwitchCdRom => {
                    self.enter_cdrom().await;
                }
                Command::SwitchStore => {
                    self.enter_store().await;
                }
                Command::Disable => {
                    self.disable().await;
                }
                Command::CheckUpdate => {
                    self.check_update().await;
                }
                Command::RequestShutdown => {
                    self.shutdown().await?;
                    break;
                }
                Command::Exit => {
                    self.disable().await;
                    info!("goodbye");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Switch to CD-ROM mode: publish the image catalog to the host.
    ///
    /// Steps do not short-circuit on failure; each remaining one still runs
    /// and the aggregate outcome lands on the activity LED. The recorded
    /// mode becomes CdRom even when a step failed, so the next toggle always
    /// flips to store mode.
    pub async fn enter_cdrom(&mut self) -> bool {
        if self.mode == EmulationMode::CdRom && self.driver.state() == EmulationMode::CdRom {
            debug!("already in CD-ROM mode");
            self.indicator.mode_settled(EmulationMode::CdRom);
            self.indicator.transition_finished(true);
            return true;
        }

        info!("switching to CD-ROM mode");
        self.indicator.transition_started();

        let mut ok = step_ok(self.driver.disable().await);
        ok &= step_ok(self.mount.mount(false).await);

        // Opportunistic self-update; never gates the transition. On success
        // the process is replaced and does not return here.
        let store_root = self.store.mount_point_path();
        if self.update.available(&store_root) {
            self.indicator.update_running();
            if let Err(e) = self.update.run(&store_root, &mut self.mount).await {
                warn!("self-update failed: {}", e);
            }
        }

        match parse_descriptor(&store_root, &self.store.descriptor_file) {
            Ok(params) => {
                ok &= step_ok(self.driver.enable_cdrom(&params).await);
            }
            Err(e) => {
                warn!("{}", e);
                ok = false;
            }
        }

        self.set_mode(EmulationMode::CdRom);
        self.indicator.mode_settled(EmulationMode::CdRom);
        self.indicator.transition_finished(ok);
        if !ok {
            warn!("switching to CD-ROM mode failed");
        }
        ok
    }

    /// Switch to image store mode: hand the whole partition to the host.
    pub async fn enter_store(&mut self) -> bool {
        if self.mode == EmulationMode::Store && self.driver.state() == EmulationMode::Store {
            debug!("already in image store mode");
            self.indicator.mode_settled(EmulationMode::Store);
            self.indicator.transition_finished(true);
            return true;
        }

        info!("switching to image store mode");
        self.indicator.transition_started();

        let mut ok = step_ok(self.driver.disable().await);
        ok &= step_ok(self.mount.unmount().await);
        ok &= step_ok(self.driver.enable_store(&self.store.device).await);

        self.set_mode(EmulationMode::Store);
        self.indicator.mode_settled(EmulationMode::Store);
        self.indicator.transition_finished(ok);
        if !ok {
            warn!("switching to image store mode failed");
        }
        ok
    }

    /// Switch to the other mode; disabled counts as store for this purpose.
    pub async fn toggle(&mut self) -> bool {
        info!("current mode: {}, toggling", self.mode);
        match self.mode {
            EmulationMode::Disabled | EmulationMode::Store => self.enter_cdrom().await,
            EmulationMode::CdRom => self.enter_store().await,
        }
    }

    /// Unload the gadget module. The recorded mode is left alone so a later
    /// toggle still flips relative to the last active mode.
    pub async fn disable(&mut self) -> bool {
        step_ok(self.driver.disable().await)
    }

    /// Explicit update check from the console.
    pub async fn check_update(&mut self) -> bool {
        let store_root = self.store.mount_point_path();
        if self.update.available(&store_root) {
            self.indicator.update_running();
        }
        match self.update.run(&store_root, &mut self.mount).await {
            Ok(UpdateOutcome::Installed) => true,
            Ok(UpdateOutcome::Disabled) => {
                info!("updating from the image store is disabled");
                self.indicator.mode_settled(self.mode);
                false
            }
            Ok(UpdateOutcome::NotAvailable) => {
                info!("no update payload on the image store");
                self.indicator.mode_settled(self.mode);
                false
            }
            Err(e) => {
                warn!("self-update failed: {}", e);
                self.indicator.mode_settled(self.mode);
                false
            }
        }
    }

    /// Tear the gadget and mount down, then power the system off.
    ///
    /// Teardown failures are logged and ignored; a power-off that cannot be
    /// issued propagates, since nothing sensible runs after this point.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("shutdown in progress");
        self.indicator.transition_started();

        step_ok(self.driver.disable().await);
        step_ok(self.mount.unmount().await);

        match self.runner.run("shutdown", &["now".to_string()]).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::Internal(
                "shutdown command exited non-zero".to_string(),
            )),
            Err(e) => Err(AppError::Internal(format!("cannot run shutdown: {}", e))),
        }
    }
}

/// Fold a step result into a transition outcome, logging the failure.
fn step_ok(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("{}", e);
            false
        }
    }
}
