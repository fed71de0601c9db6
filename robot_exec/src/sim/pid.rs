//! # PID controller
//!
//! Used by the simulated motor controllers to close their onboard position loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use comms_if::eqpt::mech::PositionLoopGains;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone, Default)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(gains: PositionLoopGains) -> Self {
        Self {
            k_p: gains.k_p,
            k_i: gains.k_i,
            k_d: gains.k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Forget the accumulated integral and previous error.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }

    /// Get the value of the controller for the given error, `dt_s` after the previous call.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // Without a time step neither the integral nor the derivative can be updated
        if dt_s <= 0.0 {
            return self.k_p * error;
        }

        self.integral += error * dt_s;

        // No derivative on the first call, rather than a spike from an assumed zero error
        let deriv = match self.prev_error {
            Some(e) => (error - e) / dt_s,
            None => 0f64,
        };

        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        self.prev_error = Some(error);

        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(PositionLoopGains {
            k_p: 2.0,
            k_i: 1.0,
            k_d: 0.5,
        });

        // Proportional and integral only on the first call
        assert!((pid.get(1.0, 0.1) - 2.1).abs() < 1e-9);

        // Error halved: p = 1.0, i = 1.0 * 0.15, d = 0.5 * -5.0
        assert!((pid.get(0.5, 0.1) - (1.0 + 0.15 - 2.5)).abs() < 1e-9);

        pid.reset();
        assert!((pid.get(1.0, 0.1) - 2.1).abs() < 1e-9);
    }
}
