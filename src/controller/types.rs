//! Controller commands

/// A request for the mode controller, queued from the button or the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch to the mode we are not currently in
    ToggleMode,
    /// Switch to CD-ROM mode explicitly
    SwitchCdRom,
    /// Switch to image store mode explicitly
    SwitchStore,
    /// Unload the gadget module without changing the recorded mode
    Disable,
    /// Check for an update payload on the image store
    CheckUpdate,
    /// Power the system off
    RequestShutdown,
    /// Disable the gadget and quit the program
    Exit,
}
