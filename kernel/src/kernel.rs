//! The kernel itself: global cycle state plus the setup/initialize/cycle
//! routines from spec §4.4, mirroring `rt_setup`/`rt_initial`/`rt_cycle`/
//! `rt_update_driver`/`rt_exec` in `rtkern.c`.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::design::{DesignLibrary, DesignTree, Loader, ProcessFn};
use crate::error::KernelError;
use crate::eventq::{EventKind, EventQueue};
use crate::signal::{SignalHandle, Value};
use crate::sink::{trace_prefix, DiagnosticSink, Severity};
use crate::time::{format_time, Time};

/// Bound above which the active-signals set is considered corrupt (spec §7:
/// "Active-signals overflow (>128) | driver update | Fatal").
const MAX_ACTIVE_SIGNALS: usize = 128;

/// Identifies a process by its index into the kernel's process table,
/// assigned in declaration order at setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessId(pub(crate) usize);

struct ProcessEntry {
    name: String,
    // `Option` so `run_process` can temporarily remove the closure from the
    // table while calling it, letting the closure's `Shims` borrow the rest
    // of `Kernel` mutably without fighting the borrow checker.
    body: Option<ProcessFn>,
}

/// Owns the global simulation state: `now`, `iteration`, the event queue,
/// the active process, and the set of signals changed this cycle.
pub struct Kernel {
    now: Rc<Cell<u64>>,
    iteration: i64,
    eventq: EventQueue,
    active_proc: Option<ProcessId>,
    active_signals: Vec<SignalHandle>,
    processes: Vec<ProcessEntry>,
    signals: Vec<(String, SignalHandle)>,
    trace_enabled: bool,
    sink: Box<dyn DiagnosticSink>,
}

impl Kernel {
    /// §4.4.1 setup: binds `STD.STANDARD.NOW`, resolves every declared
    /// signal's storage and every process's entry point.
    pub fn setup(tree: &dyn DesignTree, loader: &mut dyn Loader, sink: Box<dyn DiagnosticSink>) -> Self {
        let now = Rc::new(Cell::new(0u64));
        let now_reader = now.clone();
        loader.bind_fn("STD.STANDARD.NOW", Rc::new(move || now_reader.get()));

        let mut signals = Vec::with_capacity(tree.signals().len());
        for decl in tree.signals() {
            let handle = loader
                .var_ptr(&decl.name)
                .unwrap_or_else(|| panic!("loader has no storage for signal {}", decl.name));
            assert_eq!(
                handle.borrow().n_drivers(),
                decl.n_drivers,
                "design tree and loader disagree on driver count for {}",
                decl.name
            );
            signals.push((decl.name.clone(), handle));
        }

        let mut processes = Vec::with_capacity(tree.processes().len());
        for decl in tree.processes() {
            let body = loader
                .fun_ptr(&decl.name)
                .unwrap_or_else(|| panic!("loader has no entry point for process {}", decl.name));
            processes.push(ProcessEntry {
                name: decl.name.clone(),
                body: Some(body),
            });
        }

        Kernel {
            now,
            iteration: -1,
            eventq: EventQueue::new(),
            active_proc: None,
            active_signals: Vec::with_capacity(MAX_ACTIVE_SIGNALS),
            processes,
            signals,
            trace_enabled: false,
            sink,
        }
    }

    pub fn trace_enable(&mut self, enabled: bool) {
        self.trace_enabled = enabled;
    }

    pub fn now(&self) -> Time {
        Time::from_fs(self.now.get())
    }

    pub fn iteration(&self) -> i64 {
        self.iteration
    }

    pub fn is_idle(&self) -> bool {
        self.eventq.is_empty()
    }

    pub fn signal(&self, name: &str) -> Option<&SignalHandle> {
        self.signals.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// §4.4.2 initialization: runs every process once with `reset = true`
    /// in declaration order. No events are drained here.
    pub fn initialize(&mut self) {
        self.now.set(0);
        self.iteration = -1;
        for id in 0..self.processes.len() {
            self.run_process(ProcessId(id), true);
        }
    }

    /// §4.4.3: one full cycle loop, repeatedly calling [`Kernel::cycle`]
    /// until the event queue empties.
    pub fn run(&mut self) {
        while !self.eventq.is_empty() {
            self.cycle();
        }
    }

    /// §4.4.3 cycle: advances `now`/`iteration` if needed, drains every
    /// event due at the resulting `(now, iteration)`, then clears transient
    /// signal flags.
    pub fn cycle(&mut self) {
        let head_delta = self
            .eventq
            .peek_delta()
            .expect("cycle() called on an empty event queue");

        if head_delta > 0 {
            self.now.set(self.now.get() + head_delta);
            let consumed = self.eventq.take_head_delta();
            debug_assert_eq!(consumed, head_delta);
            debug_assert_eq!(self.eventq.peek_iteration(), Some(0));
            self.iteration = 0;
        } else {
            self.iteration = self
                .eventq
                .peek_iteration()
                .expect("non-empty queue has an iteration")
                .into();
        }

        self.trace(format_args!("begin cycle"));
        if self.trace_enabled {
            for (t, it) in self.eventq.dump() {
                self.trace(format_args!("{}\tdelta-iteration {it}", format_time(Time::from_fs(t))));
            }
        }

        loop {
            let (_iter, kind) = self
                .eventq
                .pop()
                .expect("event queue emptied mid-drain, violating the cycle invariant");
            match kind {
                EventKind::WakeProcess(pid) => self.run_process(pid, false),
                EventKind::UpdateDriver(sig) => self.update_driver(&sig),
            }

            let drain_more = matches!(
                (self.eventq.peek_delta(), self.eventq.peek_iteration()),
                (Some(0), Some(it)) if i64::from(it) == self.iteration
            );
            if !drain_more {
                break;
            }
        }

        for sig in self.active_signals.drain(..) {
            sig.borrow_mut().clear_transient_flags();
        }
    }

    fn run_process(&mut self, id: ProcessId, reset: bool) {
        self.trace(format_args!(
            "{} process {}",
            if reset { "reset" } else { "run" },
            self.processes[id.0].name
        ));

        self.active_proc = Some(id);
        let mut body = self.processes[id.0]
            .body
            .take()
            .expect("process re-entered while already running");
        {
            let mut shims = Shims { kernel: self };
            body(reset, &mut shims);
        }
        self.processes[id.0].body = Some(body);
    }

    /// §4.4.4 driver update: for each driver of `sig`, promotes its next
    /// transaction into `resolved` if it is due, recording activity unless
    /// this is the very first cycle (initial values never count as events).
    fn update_driver(&mut self, sig: &SignalHandle) {
        let now = self.now.get();
        let first_cycle = self.iteration == 0 && now == 0;
        let n_drivers = sig.borrow().n_drivers();

        for i in 0..n_drivers {
            let promoted = sig.borrow_mut().promote_driver(i, now, first_cycle);
            let Some(_flags) = promoted else { continue };

            let (name, resolved) = {
                let s = sig.borrow();
                (s.name().to_string(), s.resolved())
            };
            self.trace(format_args!("update signal {name} value {:#x}", resolved.0));

            if !first_cycle {
                assert!(
                    self.active_signals.len() < MAX_ACTIVE_SIGNALS,
                    "active-signals overflow (> {MAX_ACTIVE_SIGNALS})"
                );
                self.active_signals.push(sig.clone());
            }
        }
    }

    pub(crate) fn trace(&mut self, args: fmt::Arguments<'_>) {
        tracing::trace!("{}", args);
        if self.trace_enabled {
            let prefix = trace_prefix(self.now(), self.iteration);
            self.sink.report(format_args!("{prefix}{args}"));
        }
    }
}

/// A context handle passed into process callables, exposing the runtime
/// shims generated code targets (spec §4.5). Taking `&mut Shims<'_>` rather
/// than reading true globals is the rewrite this crate makes for spec §9's
/// "global kernel state" note.
pub struct Shims<'k> {
    kernel: &'k mut Kernel,
}

impl<'k> Shims<'k> {
    pub fn current_time(&self) -> Time {
        self.kernel.now()
    }

    /// `_sched_process`: enqueues a wake for the currently running process.
    pub fn schedule_process(&mut self, delay_fs: u64) {
        let active = self
            .kernel
            .active_proc
            .expect("schedule_process called outside of a running process");
        self.kernel
            .trace(format_args!("_sched_process delay={}", format_time(Time::from_fs(delay_fs))));
        self.kernel
            .eventq
            .insert(delay_fs, self.kernel.iteration, EventKind::WakeProcess(active));
    }

    /// `_sched_waveform`: projects a new transaction onto a driver's
    /// waveform queue and schedules the corresponding driver-update event.
    pub fn schedule_waveform(&mut self, sig: &SignalHandle, driver_ix: usize, value: Value, after_fs: u64) {
        assert!(
            self.kernel.active_proc.is_some(),
            "schedule_waveform called outside of a running process"
        );
        let now = self.kernel.now.get();
        self.kernel.trace(format_args!(
            "_sched_waveform {} source={driver_ix} value={:#x} after={}",
            sig.borrow().name(),
            value.0,
            format_time(Time::from_fs(after_fs)),
        ));
        sig.borrow_mut().project(driver_ix, value, now, after_fs);
        self.kernel
            .eventq
            .insert(after_fs, self.kernel.iteration, EventKind::UpdateDriver(sig.clone()));
    }

    /// `_assert_fail`: LRM 93 §8.2 assertion/report reporting.
    pub fn assert_fail(&mut self, is_report: bool, text: &str, severity: Severity) {
        let line = format!(
            "{}+{}: {} {}: {text}",
            format_time(self.kernel.now()),
            self.kernel.iteration,
            if is_report { "Report" } else { "Assertion" },
            severity.label(),
        );
        match severity {
            Severity::Note => tracing::info!("{line}"),
            Severity::Warning => tracing::warn!("{line}"),
            Severity::Error | Severity::Failure => tracing::error!("{line}"),
        }
        self.kernel.sink.report(format_args!("{line}"));
        if severity.is_fatal() {
            std::process::exit(1);
        }
    }
}

/// `rt_exec(top_unit_ident)`: looks up the elaborated design, runs setup and
/// initialization, then drains the event queue until it is empty.
pub fn rt_exec(
    library: &dyn DesignLibrary,
    top_unit_ident: &str,
    loader: &mut dyn Loader,
    sink: Box<dyn DiagnosticSink>,
    trace_enabled: bool,
) -> Result<(), KernelError> {
    let tree = library.lookup_elaborated(top_unit_ident)?;
    let mut kernel = Kernel::setup(tree, loader, sink);
    kernel.trace_enable(trace_enabled);
    kernel.initialize();
    kernel.run();
    Ok(())
}
