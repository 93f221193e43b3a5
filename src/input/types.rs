//! Button input types

/// Debounced edge from the push button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Button went down
    Pressed,
    /// Button came back up
    Released,
    /// Button has been held down past the hold threshold (fires once)
    Held,
}
