//! Kernel error types.
//!
//! Only the two fatal setup failures named in spec §7 are modeled as
//! recoverable `Result`s; everything else in that table (invariant
//! violations, active-signals overflow) is a programming bug and panics,
//! matching the C source's `assert`/`fatal` split.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    /// `rt_exec`: no elaborated artifact exists in the work library for the
    /// requested top-level unit.
    #[error("{0}: not elaborated")]
    NotElaborated(String),

    /// `rt_exec`: the named unit exists but is not an elaborated top level.
    #[error("{0}: not a suitable top level")]
    WrongUnitKind(String),
}
