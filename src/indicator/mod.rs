//! Indicator state machine
//!
//! Maps controller state onto the two front-panel LEDs. The mode LED shows
//! which emulation is active, the activity LED shows transition progress and
//! outcome. This is a pure mapping; all timing lives in the blink backend.

pub(crate) mod led;
mod types;

pub use led::{BlinkLed, GpioLed, NullLed};
pub use types::IndicatorPattern;

use std::sync::Arc;

use crate::gadget::EmulationMode;

/// Drives the mode and activity LEDs
pub struct Indicator {
    mode: Arc<dyn BlinkLed>,
    activity: Arc<dyn BlinkLed>,
}

impl Indicator {
    pub fn new(mode: Arc<dyn BlinkLed>, activity: Arc<dyn BlinkLed>) -> Self {
        Self { mode, activity }
    }

    /// A mode transition has begun.
    pub fn transition_started(&self) {
        apply(&self.mode, IndicatorPattern::BlinkSlow);
        apply(&self.activity, IndicatorPattern::BlinkSlow);
    }

    /// The self-update protocol is installing a payload.
    pub fn update_running(&self) {
        apply(&self.mode, IndicatorPattern::BlinkUpdate);
    }

    /// The controller has settled on a mode.
    pub fn mode_settled(&self, mode: EmulationMode) {
        let pattern = match mode {
            EmulationMode::CdRom => IndicatorPattern::SolidOn,
            EmulationMode::Store => IndicatorPattern::BlinkStore,
            EmulationMode::Disabled => IndicatorPattern::SolidOff,
        };
        apply(&self.mode, pattern);
    }

    /// A transition finished; both modes share the same outcome patterns.
    pub fn transition_finished(&self, ok: bool) {
        let pattern = if ok {
            IndicatorPattern::BlinkIdle
        } else {
            IndicatorPattern::BlinkFast
        };
        apply(&self.activity, pattern);
    }
}

fn apply(led: &Arc<dyn BlinkLed>, pattern: IndicatorPattern) {
    match pattern.timing() {
        Some((on, off)) => led.blink(on, off),
        None => {
            if pattern == IndicatorPattern::SolidOn {
                led.on()
            } else {
                led.off()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::led::testing::{LedCall, RecordingLed};
    use super::*;

    fn blink_of(pattern: IndicatorPattern) -> LedCall {
        let (on, off) = pattern.timing().unwrap();
        LedCall::Blink(on, off)
    }

    struct Fixture {
        mode: Arc<RecordingLed>,
        activity: Arc<RecordingLed>,
        indicator: Indicator,
    }

    fn fixture() -> Fixture {
        let mode = Arc::new(RecordingLed::new());
        let activity = Arc::new(RecordingLed::new());
        let indicator = Indicator::new(mode.clone(), activity.clone());
        Fixture {
            mode,
            activity,
            indicator,
        }
    }

    #[test]
    fn test_transition_start_blinks_both_slow() {
        let fx = fixture();
        fx.indicator.transition_started();

        assert_eq!(fx.mode.last(), Some(blink_of(IndicatorPattern::BlinkSlow)));
        assert_eq!(
            fx.activity.last(),
            Some(blink_of(IndicatorPattern::BlinkSlow))
        );
    }

    #[test]
    fn test_mode_patterns() {
        let fx = fixture();

        fx.indicator.mode_settled(EmulationMode::CdRom);
        assert_eq!(fx.mode.last(), Some(LedCall::On));

        fx.indicator.mode_settled(EmulationMode::Store);
        assert_eq!(fx.mode.last(), Some(blink_of(IndicatorPattern::BlinkStore)));

        fx.indicator.mode_settled(EmulationMode::Disabled);
        assert_eq!(fx.mode.last(), Some(LedCall::Off));
    }

    #[test]
    fn test_outcome_patterns() {
        let fx = fixture();

        fx.indicator.transition_finished(true);
        assert_eq!(
            fx.activity.last(),
            Some(blink_of(IndicatorPattern::BlinkIdle))
        );

        fx.indicator.transition_finished(false);
        assert_eq!(
            fx.activity.last(),
            Some(blink_of(IndicatorPattern::BlinkFast))
        );
    }

    #[test]
    fn test_update_pattern_on_mode_led_only() {
        let fx = fixture();
        fx.indicator.update_running();

        assert_eq!(
            fx.mode.last(),
            Some(blink_of(IndicatorPattern::BlinkUpdate))
        );
        assert!(fx.activity.calls().is_empty());
    }
}
