//! Binding to the native tuning library.
//!
//! The library exports `void set_cpu_multiplier(int core, int multiplier)`.
//! It reports nothing back, so a call that returns is treated as applied.

use crate::actuation::TuningLibrary;
use crate::error::{Result, TelemetryError};
use libloading::{Library, Symbol};
use std::os::raw::c_int;
use std::path::Path;
use tracing::info;

/// Exported symbol name, NUL-terminated for the loader.
const SET_MULTIPLIER_SYMBOL: &[u8] = b"set_cpu_multiplier\0";

type SetMultiplierFn = unsafe extern "C" fn(c_int, c_int);

/// A loaded tuning library.
pub struct NativeTuningLibrary {
    set_multiplier: SetMultiplierFn,
    // Keeps `set_multiplier` valid; must outlive it
    _library: Library,
}

impl NativeTuningLibrary {
    /// Load the library at `path` and resolve its entry point.
    pub fn load(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initializers. The path is
        // supplied by the operator, who vouches for the library.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            TelemetryError::library_error(format!("Failed to load {}: {}", path.display(), e))
        })?;

        // SAFETY: the symbol is declared with the signature above in the
        // library's C source.
        let set_multiplier = unsafe {
            let symbol: Symbol<SetMultiplierFn> = library.get(SET_MULTIPLIER_SYMBOL).map_err(|e| {
                TelemetryError::library_error(format!(
                    "{} has no set_cpu_multiplier: {}",
                    path.display(),
                    e
                ))
            })?;
            *symbol
        };

        info!("Loaded tuning library from {}", path.display());
        Ok(Self {
            set_multiplier,
            _library: library,
        })
    }
}

impl TuningLibrary for NativeTuningLibrary {
    fn set_cpu_multiplier(&self, core: usize, multiplier: i32) -> Result<()> {
        let core = c_int::try_from(core)
            .map_err(|_| TelemetryError::library_error(format!("core {} exceeds C int", core)))?;
        // SAFETY: the function pointer stays valid while `_library` is alive,
        // and it takes two plain ints.
        unsafe { (self.set_multiplier)(core, multiplier as c_int) };
        Ok(())
    }
}
