//! Actuation gateway: validates per-core control requests and forwards
//! multipliers to the native tuning library.
//!
//! Library presence is probed once at construction. An absent library is
//! remembered as [`TuningCapability::Absent`] for the rest of the process and
//! every multiplier request fails the same way without touching the loader.
//! Voltage is display state only and never leaves the gateway.

pub mod native;

pub use native::NativeTuningLibrary;

use crate::error::Result;
use crate::metrics::data::{
    ActuationError, ActuationResult, ControlValue, CoreControlState,
};
use std::any::Any;
use std::ops::RangeInclusive;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, warn};

/// Something that can apply a CPU multiplier.
pub trait TuningLibrary: Send {
    fn set_cpu_multiplier(&self, core: usize, multiplier: i32) -> Result<()>;
}

/// Outcome of the construction-time library probe.
pub enum TuningCapability {
    Bound(Box<dyn TuningLibrary>),
    Absent { reason: String },
}

impl TuningCapability {
    /// Try to load the native library at `path`.
    pub fn probe(path: &Path) -> Self {
        match NativeTuningLibrary::load(path) {
            Ok(library) => Self::Bound(Box::new(library)),
            Err(err) => {
                warn!("Overclock library not found: {}", err);
                Self::Absent {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn absent(reason: impl Into<String>) -> Self {
        Self::Absent {
            reason: reason.into(),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }
}

impl std::fmt::Debug for TuningCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bound(_) => f.write_str("Bound"),
            Self::Absent { reason } => f.debug_struct("Absent").field("reason", reason).finish(),
        }
    }
}

/// Validates and forwards control requests, and tracks the last requested
/// values per physical core.
pub struct ActuationGateway {
    capability: TuningCapability,
    cores: Vec<CoreControlState>,
    multiplier_range: RangeInclusive<i32>,
}

impl ActuationGateway {
    /// One control state per physical core, created up front.
    pub fn new(
        capability: TuningCapability,
        physical_cores: usize,
        multiplier_range: RangeInclusive<i32>,
    ) -> Self {
        Self {
            capability,
            cores: (0..physical_cores).map(CoreControlState::new).collect(),
            multiplier_range,
        }
    }

    pub fn capability(&self) -> &TuningCapability {
        &self.capability
    }

    pub fn core_states(&self) -> &[CoreControlState] {
        &self.cores
    }

    pub fn core_state(&self, core: usize) -> Option<&CoreControlState> {
        self.cores.get(core)
    }

    /// Forward a multiplier for `core` to the tuning library.
    ///
    /// Nothing is deduplicated: repeating a request repeats the call.
    pub fn set_multiplier(&mut self, core: i32, value: i32) -> ActuationResult {
        let requested = ControlValue::Multiplier(value);
        let result = match self.forward_multiplier(core, value) {
            Ok(index) => {
                self.cores[index].multiplier = value;
                ActuationResult::applied(core, requested)
            }
            Err(err) => ActuationResult::failed(core, requested, err),
        };
        debug!(core, value, applied = result.applied, "Multiplier request");
        result
    }

    /// Record a voltage for `core`. Display only; no external call is made.
    pub fn set_voltage(&mut self, core: i32, value: f64) -> ActuationResult {
        let requested = ControlValue::Voltage(value);
        match self.core_index(core) {
            Ok(index) => {
                self.cores[index].voltage = value;
                ActuationResult::applied(core, requested)
            }
            Err(err) => ActuationResult::failed(core, requested, err),
        }
    }

    fn forward_multiplier(&self, core: i32, value: i32) -> std::result::Result<usize, ActuationError> {
        let index = self.core_index(core)?;
        if !self.multiplier_range.contains(&value) {
            return Err(ActuationError::MultiplierOutOfRange {
                value,
                min: *self.multiplier_range.start(),
                max: *self.multiplier_range.end(),
            });
        }

        let library = match &self.capability {
            TuningCapability::Bound(library) => library,
            TuningCapability::Absent { reason } => {
                return Err(ActuationError::LibraryUnavailable {
                    reason: reason.clone(),
                })
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| library.set_cpu_multiplier(index, value))) {
            Ok(Ok(())) => Ok(index),
            Ok(Err(err)) => Err(ActuationError::CallFailed {
                message: err.to_string(),
            }),
            Err(payload) => Err(ActuationError::CallFailed {
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn core_index(&self, core: i32) -> std::result::Result<usize, ActuationError> {
        usize::try_from(core)
            .ok()
            .filter(|index| *index < self.cores.len())
            .ok_or(ActuationError::CoreOutOfRange {
                core,
                cores: self.cores.len(),
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tuning library panicked".to_string()
    }
}
