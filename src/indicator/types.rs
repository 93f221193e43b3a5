//! Indicator patterns

use std::time::Duration;

/// Signal pattern for one LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPattern {
    SolidOn,
    SolidOff,
    /// Error signal
    BlinkFast,
    /// Transition in progress
    BlinkSlow,
    /// Short heartbeat after a successful transition
    BlinkIdle,
    /// Store mode active
    BlinkStore,
    /// Self-update running
    BlinkUpdate,
}

impl IndicatorPattern {
    /// On/off times for blinking patterns, `None` for the solid ones.
    pub fn timing(&self) -> Option<(Duration, Duration)> {
        let millis = |on, off| Some((Duration::from_millis(on), Duration::from_millis(off)));
        match self {
            Self::SolidOn | Self::SolidOff => None,
            Self::BlinkFast => millis(100, 100),
            Self::BlinkSlow => millis(500, 500),
            Self::BlinkIdle => millis(100, 1900),
            Self::BlinkStore => millis(900, 100),
            Self::BlinkUpdate => millis(200, 200),
        }
    }
}
