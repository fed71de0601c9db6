//! Arm control module
//!
//! Drives the cargo arm toward one of the named heights using the arm motor controller's onboard
//! position loop. Motion is interlocked with a ratchet, which holds the arm against travel in one
//! direction while engaged, and gated by the top and bottom limit switches.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ArmCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ArmCtrlError {
    #[error("The height table must be strictly increasing, but {0} is not above {1}")]
    HeightTableNotIncreasing(String, String),

    #[error("The gear ratio and units per radian must be non-zero")]
    ZeroGain,

    #[error("The position tolerance must be positive, got {0}")]
    InvalidTolerance(f64),

    #[error("The pressure release time must not be negative, got {0}")]
    InvalidPressureReleaseTime(f64),

    #[error("The pressure release output must be between 0 and 1, got {0}")]
    InvalidPressureReleaseOutput(f64),

    #[error("The cycle period must be positive, got {0}")]
    InvalidCyclePeriod(f64),
}
