//! Traits for the external collaborators spec §1 and §6 describe: the
//! elaborated design tree, and the JIT/loader that turns declaration names
//! into callable processes and signal storage.
//!
//! These are the seams a real front end (parser, elaborator, code
//! generator) would implement. This crate ships only the in-memory
//! fixtures under `tests/` and `rt-sim`'s demo, standing in for a real
//! front end the same way `melpomene`'s `sim_drivers` stand in for real
//! hardware.

use crate::error::KernelError;
use crate::signal::SignalHandle;
use crate::Shims;

/// A callable process entry point: `(reset_flag) -> void`, taking a handle
/// back into the kernel so it can call the runtime shims (spec §9: "runtime
/// shims take a context handle rather than reading true globals").
pub type ProcessFn = Box<dyn FnMut(bool, &mut Shims<'_>)>;

/// The `STD.STANDARD.NOW` intrinsic bound into the loaded image.
pub type NowFn = std::rc::Rc<dyn Fn() -> u64>;

/// One process statement, in the order it appears under the top-level unit.
pub struct ProcessDecl {
    pub name: String,
}

impl ProcessDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One declared signal, and how many drivers it has.
pub struct SignalDecl {
    pub name: String,
    pub n_drivers: usize,
}

impl SignalDecl {
    pub fn new(name: impl Into<String>, n_drivers: usize) -> Self {
        Self {
            name: name.into(),
            n_drivers,
        }
    }
}

/// Read-only view of an elaborated top-level design unit.
pub trait DesignTree {
    /// Process statements, in declaration order.
    fn processes(&self) -> &[ProcessDecl];
    /// Declared signals.
    fn signals(&self) -> &[SignalDecl];
}

/// The JIT/loader oracle: resolves names from the design tree into callable
/// entry points and signal storage, and accepts kernel-provided intrinsics.
pub trait Loader {
    /// Installs a kernel helper (e.g. `STD.STANDARD.NOW`) into the loaded
    /// image under `name`.
    fn bind_fn(&mut self, name: &str, now: NowFn);
    /// Resolves a process's callable entry point by name.
    fn fun_ptr(&mut self, name: &str) -> Option<ProcessFn>;
    /// Resolves a signal's runtime storage by name.
    fn var_ptr(&mut self, name: &str) -> Option<SignalHandle>;
}

/// The work library: given a top-level unit identifier, produces its
/// elaborated design tree, or one of the two fatal lookup failures spec §6
/// and §7 name.
pub trait DesignLibrary {
    fn lookup_elaborated(&self, top_unit_ident: &str) -> Result<&dyn DesignTree, KernelError>;
}
