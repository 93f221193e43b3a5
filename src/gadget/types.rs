//! Gadget data types
//!
//! The kernel mass-storage module takes one comma-joined value list per LUN
//! attribute, aligned by position. `GadgetParams` is that exact shape;
//! `ImageEntry` is one validated line of the operator's image list.

use std::fmt;
use std::path::PathBuf;

/// Emulation mode of the USB gadget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmulationMode {
    /// No gadget module loaded
    #[default]
    Disabled,
    /// Presenting the image catalog as CD-ROM / removable drives
    CdRom,
    /// Presenting the whole store partition for editing
    Store,
}

impl fmt::Display for EmulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::CdRom => write!(f, "cdrom"),
            Self::Store => write!(f, "store"),
        }
    }
}

/// One image to publish, with its per-LUN mount attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Resolved path of the image file on the mounted store
    pub path: PathBuf,
    /// Report the medium as removable
    pub removable: bool,
    /// Emulate a CD-ROM drive instead of a disk
    pub cdrom: bool,
    /// Refuse writes from the host
    pub read_only: bool,
    /// Skip write flushes on SCSI unit attention ("nofua")
    pub nofua: bool,
}

/// Module parameters for the mass-storage gadget.
///
/// Five parallel comma-joined lists; position determines the LUN index, so
/// entry order is preserved exactly as parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetParams {
    pub file: String,
    pub removable: String,
    pub cdrom: String,
    pub ro: String,
    pub nofua: String,
}

impl GadgetParams {
    /// Build the joined parameter lists from parsed entries.
    pub fn from_entries(entries: &[ImageEntry]) -> Self {
        Self {
            file: entries
                .iter()
                .map(|e| e.path.display().to_string())
                .collect::<Vec<_>>()
                .join(","),
            removable: join_flags(entries, |e| e.removable),
            cdrom: join_flags(entries, |e| e.cdrom),
            ro: join_flags(entries, |e| e.read_only),
            nofua: join_flags(entries, |e| e.nofua),
        }
    }

    /// Render as `key=value` arguments for the module load command.
    pub fn to_module_args(&self) -> Vec<String> {
        vec![
            format!("file={}", self.file),
            format!("removable={}", self.removable),
            format!("cdrom={}", self.cdrom),
            format!("ro={}", self.ro),
            format!("nofua={}", self.nofua),
        ]
    }

    /// Number of LUNs described by the parameter lists
    pub fn lun_count(&self) -> usize {
        self.file.split(',').count()
    }
}

fn join_flags(entries: &[ImageEntry], flag: impl Fn(&ImageEntry) -> bool) -> String {
    entries
        .iter()
        .map(|e| if flag(e) { "y" } else { "n" })
        .collect::<Vec<_>>()
        .join(",")
}
