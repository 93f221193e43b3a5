//! USB mass-storage gadget
//!
//! Kernel module driver plus the parameter types it consumes.

mod driver;
mod types;

pub use driver::GadgetDriver;
pub use types::{EmulationMode, GadgetParams, ImageEntry};
