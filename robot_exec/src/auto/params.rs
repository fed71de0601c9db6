//! # Automation Parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{aligner, cargo_mgr};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for all automations, loaded from `auto.toml`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Parameters shared by every aligner.
    pub aligner: aligner::Params,

    /// Parameters of the hatch deposit completion.
    pub hatch_deposit: aligner::HatchDepositParams,

    /// Parameters for the cargo manager.
    pub cargo_mgr: cargo_mgr::Params,
}
