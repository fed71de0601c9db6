//! # Vision interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Vision feedback on the tracked target (the alignment tape above an objective).
pub trait Vision {
    /// True if the target is currently in sight.
    fn target_visible(&self) -> bool;

    /// The latest offset to the target, or `None` if it has never been seen.
    fn get_target_offset(&self) -> Option<TargetOffset>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position of the target relative to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetOffset {
    /// Distance to the target along the robot's forwards axis.
    ///
    /// Units: meters
    pub forward_m: f64,

    /// Distance to the target along the robot's leftwards axis.
    ///
    /// Units: meters
    pub lateral_m: f64,

    /// Heading of the target relative to the robot heading.
    ///
    /// Units: radians
    pub heading_delta_rad: f64,
}

/// A sample of the vision feedback taken at the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VisionSample {
    /// True if the target was in sight when sampled.
    pub visible: bool,

    /// Offset to the target, only meaningful if `visible` is true.
    pub offset: TargetOffset,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionSample {
    /// Take a sample from a vision source.
    pub fn acquire<V: Vision + ?Sized>(vision: &V) -> Self {
        match (vision.target_visible(), vision.get_target_offset()) {
            (true, Some(offset)) => Self {
                visible: true,
                offset,
            },
            _ => Self::default(),
        }
    }

    /// A sample with the target in sight at the given offset.
    pub fn seen(forward_m: f64, lateral_m: f64) -> Self {
        Self {
            visible: true,
            offset: TargetOffset {
                forward_m,
                lateral_m,
                heading_delta_rad: 0.0,
            },
        }
    }

    /// A sample with the target out of sight.
    pub fn lost() -> Self {
        Self::default()
    }
}
