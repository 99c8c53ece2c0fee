//! A discrete-event simulation kernel for a VHDL'93-style hardware
//! description language: a delta-cycle scheduler, a time-ordered event
//! queue, and a per-driver waveform store.
//!
//! Parsing, elaboration, and code generation are out of scope here; this
//! crate only defines the seams generated code and a real front end would
//! meet the kernel at ([`design::DesignTree`], [`design::Loader`],
//! [`design::DesignLibrary`]) and drives the cycle loop described in
//! [`kernel`].

mod design;
mod error;
mod eventq;
mod kernel;
mod signal;
mod sink;
mod time;

pub use design::{DesignLibrary, DesignTree, Loader, NowFn, ProcessDecl, ProcessFn, SignalDecl};
pub use error::KernelError;
pub use eventq::EventKind;
pub use kernel::{rt_exec, Kernel, ProcessId, Shims};
pub use signal::{Signal, SignalFlags, SignalHandle, Value};
pub use sink::{CapturingSink, DiagnosticSink, Severity, StderrSink};
pub use time::{format_time, write_time, Time};
