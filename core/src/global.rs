//! Process-wide `MedPal` handle.
//!
//! The handle (and with it the query cache) is installed once at application
//! start. Components reach it through `get` and only ever read, fetch or
//! invalidate through its methods.

use std::sync::OnceLock;

use crate::resources::MedPal;

static MEDPAL: OnceLock<MedPal> = OnceLock::new();

/// Install the process-wide handle. Once a handle is installed, later calls
/// drop theirs and get the installed one back in `Err`.
pub fn init(medpal: MedPal) -> Result<&'static MedPal, &'static MedPal> {
    let mut installed = false;
    let handle = MEDPAL.get_or_init(|| {
        installed = true;
        medpal
    });
    if installed {
        Ok(handle)
    } else {
        Err(handle)
    }
}

pub fn get() -> Option<&'static MedPal> {
    MEDPAL.get()
}
