//! LED output backends
//!
//! The indicator drives LEDs through the `BlinkLed` trait so the mapping
//! logic does not care whether a real GPIO line is attached.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{AppError, Result};

/// A single LED that can hold a level or blink on its own.
pub trait BlinkLed: Send + Sync {
    fn on(&self);
    fn off(&self);
    /// Blink forever with the given on/off times, until the next call.
    fn blink(&self, on: Duration, off: Duration);
}

/// LED on a GPIO line, blinked by a background task.
pub struct GpioLed {
    line: Arc<LineHandle>,
    blink_task: Mutex<Option<CancellationToken>>,
}

impl GpioLed {
    /// Request the GPIO line as an output, initially off.
    pub fn open(chip_path: &str, pin: u32, consumer: &'static str) -> Result<Self> {
        let mut chip = Chip::new(chip_path)
            .map_err(|e| AppError::Internal(format!("LED GPIO chip failed: {}", e)))?;

        let line = chip
            .get_line(pin)
            .map_err(|e| AppError::Internal(format!("LED GPIO line {} failed: {}", pin, e)))?;

        let handle = line
            .request(LineRequestFlags::OUTPUT, 0, consumer)
            .map_err(|e| AppError::Internal(format!("LED GPIO request failed: {}", e)))?;

        Ok(Self {
            line: Arc::new(handle),
            blink_task: Mutex::new(None),
        })
    }

    fn stop_blinking(&self) {
        if let Some(token) = self.blink_task.lock().unwrap().take() {
            token.cancel();
        }
    }

    fn set(&self, value: u8) {
        if let Err(e) = self.line.set_value(value) {
            warn!("LED write failed: {}", e);
        }
    }
}

impl BlinkLed for GpioLed {
    fn on(&self) {
        self.stop_blinking();
        self.set(1);
    }

    fn off(&self) {
        self.stop_blinking();
        self.set(0);
    }

    fn blink(&self, on: Duration, off: Duration) {
        self.stop_blinking();

        let token = CancellationToken::new();
        *self.blink_task.lock().unwrap() = Some(token.clone());

        let line = self.line.clone();
        tokio::spawn(async move {
            loop {
                if line.set_value(1).is_err() {
                    break;
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(on) => {}
                }
                if line.set_value(0).is_err() {
                    break;
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(off) => {}
                }
            }
            let _ = line.set_value(0);
        });
    }
}

impl Drop for GpioLed {
    fn drop(&mut self) {
        self.stop_blinking();
    }
}

/// LED that goes nowhere, used when the hardware is absent.
pub struct NullLed;

impl BlinkLed for NullLed {
    fn on(&self) {}
    fn off(&self) {}
    fn blink(&self, _on: Duration, _off: Duration) {}
}
