//! A built-in demo design: a single process toggling a single signal at a
//! fixed half-period, standing in for whatever a real front end would
//! produce from an elaborated clock divider entity. Exercises the same
//! `DesignTree`/`Loader`/`DesignLibrary` seams a generated-code backend
//! would implement.

use std::cell::{Cell, RefCell};

use rt_kernel::{
    DesignLibrary, DesignTree, KernelError, Loader, NowFn, ProcessDecl, ProcessFn, Shims, Signal,
    SignalDecl, SignalHandle, Value,
};

pub const UNIT_NAME: &str = "clock_divider";

struct ClockTree {
    processes: Vec<ProcessDecl>,
    signals: Vec<SignalDecl>,
}

impl DesignTree for ClockTree {
    fn processes(&self) -> &[ProcessDecl] {
        &self.processes
    }

    fn signals(&self) -> &[SignalDecl] {
        &self.signals
    }
}

/// The work library: holds exactly the one elaborated unit the demo needs.
pub struct ClockLibrary {
    tree: ClockTree,
}

impl ClockLibrary {
    pub fn new() -> Self {
        Self {
            tree: ClockTree {
                processes: vec![ProcessDecl::new("clk")],
                signals: vec![SignalDecl::new("clk", 1)],
            },
        }
    }
}

impl DesignLibrary for ClockLibrary {
    fn lookup_elaborated(&self, top_unit_ident: &str) -> Result<&dyn DesignTree, KernelError> {
        if top_unit_ident == UNIT_NAME {
            Ok(&self.tree)
        } else {
            Err(KernelError::NotElaborated(top_unit_ident.to_string()))
        }
    }
}

/// Resolves `clk`'s entry point and signal storage. A real loader would
/// hand back JIT-compiled code and pointers into the elaborated instance's
/// variable region; this one closes over the toggle count and period
/// directly, the way the generated code itself would encode them as
/// constants.
pub struct ClockLoader {
    half_period_fs: u64,
    toggles: u32,
    signal: RefCell<Option<SignalHandle>>,
}

impl ClockLoader {
    pub fn new(half_period_fs: u64, toggles: u32) -> Self {
        Self {
            half_period_fs,
            toggles,
            signal: RefCell::new(None),
        }
    }

    fn signal_handle(&self) -> SignalHandle {
        let mut slot = self.signal.borrow_mut();
        if slot.is_none() {
            *slot = Some(SignalHandle::new(Signal::new("clk", 1)));
        }
        slot.as_ref().unwrap().clone()
    }
}

impl Loader for ClockLoader {
    fn bind_fn(&mut self, _name: &str, _now: NowFn) {}

    fn fun_ptr(&mut self, name: &str) -> Option<ProcessFn> {
        if name != "clk" {
            return None;
        }
        let sig = self.signal_handle();
        let half_period = self.half_period_fs;
        let toggles = self.toggles;
        let state = Cell::new(false);
        let fired = Cell::new(0u32);

        Some(Box::new(move |reset: bool, shims: &mut Shims<'_>| {
            if reset {
                shims.schedule_waveform(&sig, 0, Value(0), 0);
                shims.schedule_process(half_period);
                return;
            }
            if fired.get() >= toggles {
                return;
            }
            fired.set(fired.get() + 1);
            let next = !state.get();
            state.set(next);
            shims.schedule_waveform(&sig, 0, Value(next as u64), 0);
            shims.schedule_process(half_period);
        }))
    }

    fn var_ptr(&mut self, name: &str) -> Option<SignalHandle> {
        if name == "clk" {
            Some(self.signal_handle())
        } else {
            None
        }
    }
}
