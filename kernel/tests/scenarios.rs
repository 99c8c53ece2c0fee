//! Integration tests exercising the public API the way an embedder (a real
//! front end, or `rt-sim`) would: through [`DesignTree`]/[`Loader`]
//! fixtures and [`rt_exec`], rather than the kernel's own private test
//! helpers.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use rt_kernel::{
    rt_exec, CapturingSink, DesignLibrary, DesignTree, DiagnosticSink, KernelError, Loader, NowFn,
    ProcessDecl, ProcessFn, Severity, Shims, Signal, SignalDecl, SignalHandle, Value,
};

/// A sink that hands its captured lines back to the test through a shared
/// handle, since `rt_exec` takes ownership of the `Box<dyn DiagnosticSink>`
/// it is given.
#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<Vec<String>>>);

impl DiagnosticSink for SharedSink {
    fn report(&mut self, line: std::fmt::Arguments<'_>) {
        self.0.borrow_mut().push(line.to_string());
    }
}

/// An owned snapshot of process/signal declarations, standing in for the
/// elaborated design tree a real front end would hand the kernel.
struct Tree {
    processes: Vec<ProcessDecl>,
    signals: Vec<SignalDecl>,
}

impl DesignTree for Tree {
    fn processes(&self) -> &[ProcessDecl] {
        &self.processes
    }
    fn signals(&self) -> &[SignalDecl] {
        &self.signals
    }
}

/// The JIT/loader half: resolves process bodies and signal storage by name.
#[derive(Default)]
struct Loaded {
    bodies: RefCell<HashMap<String, ProcessFn>>,
    storage: RefCell<HashMap<String, SignalHandle>>,
}

impl Loader for Loaded {
    fn bind_fn(&mut self, _name: &str, _now: NowFn) {}

    fn fun_ptr(&mut self, name: &str) -> Option<ProcessFn> {
        self.bodies.borrow_mut().remove(name)
    }

    fn var_ptr(&mut self, name: &str) -> Option<SignalHandle> {
        self.storage.borrow().get(name).cloned()
    }
}

/// A work library holding exactly one elaborated unit, named "top".
struct Library(Tree);

impl DesignLibrary for Library {
    fn lookup_elaborated(&self, top_unit_ident: &str) -> Result<&dyn DesignTree, KernelError> {
        if top_unit_ident == "top" {
            Ok(&self.0)
        } else {
            Err(KernelError::NotElaborated(top_unit_ident.to_string()))
        }
    }
}

fn trace_init() {
    use tracing_subscriber::{filter::LevelFilter, EnvFilter};
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(env);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .without_time()
        .try_init();
}

/// Scenario 3: a delta-cycle chain between two processes. `driver` assigns
/// signal `x` at delta 0 on reset; `watcher`, standing in for code
/// generated from a sensitivity list on `x`, schedules its own resumption
/// one delta cycle later and then reads back the value `driver` projected.
#[test]
fn delta_cycle_chain_between_two_processes() {
    trace_init();
    let x = SignalHandle::new(Signal::new("x", 1));
    let seen = Rc::new(Cell::new(Value(0)));

    let mut bodies: HashMap<String, ProcessFn> = HashMap::new();

    let x_for_driver = x.clone();
    bodies.insert(
        "driver".into(),
        Box::new(move |reset: bool, shims: &mut Shims<'_>| {
            if reset {
                shims.schedule_waveform(&x_for_driver, 0, Value(1), 0);
            }
        }) as ProcessFn,
    );

    let x_for_watcher = x.clone();
    let seen_for_watcher = seen.clone();
    bodies.insert(
        "watcher".into(),
        Box::new(move |reset: bool, shims: &mut Shims<'_>| {
            if reset {
                shims.schedule_process(0);
            } else {
                seen_for_watcher.set(x_for_watcher.borrow().resolved());
            }
        }) as ProcessFn,
    );

    let mut storage = HashMap::new();
    storage.insert("x".to_string(), x.clone());

    let library = Library(Tree {
        processes: vec![ProcessDecl::new("driver"), ProcessDecl::new("watcher")],
        signals: vec![SignalDecl::new("x", 1)],
    });
    let mut loaded = Loaded {
        bodies: RefCell::new(bodies),
        storage: RefCell::new(storage),
    };

    rt_exec(&library, "top", &mut loaded, Box::new(CapturingSink::default()), false)
        .expect("top is elaborated");

    assert_eq!(x.borrow().resolved(), Value(1));
    assert_eq!(seen.get(), Value(1));
}

/// Scenario 4 (report half): a non-fatal report reaches the diagnostic
/// sink with its time, iteration, and severity, and the process that
/// issued it keeps running afterward. The failure half (`Severity::Failure`
/// aborting the run) is exercised by reading `Severity::is_fatal` directly,
/// since the real effect is `std::process::exit`, which a test process
/// cannot observe and survive.
#[test]
fn report_reaches_sink_without_aborting() {
    trace_init();
    let ran_after_report = Rc::new(Cell::new(false));
    let after = ran_after_report.clone();

    let mut bodies: HashMap<String, ProcessFn> = HashMap::new();
    bodies.insert(
        "p".into(),
        Box::new(move |reset: bool, shims: &mut Shims<'_>| {
            if reset {
                shims.assert_fail(true, "startup complete", Severity::Note);
                after.set(true);
            }
        }) as ProcessFn,
    );

    let library = Library(Tree {
        processes: vec![ProcessDecl::new("p")],
        signals: vec![],
    });
    let mut loaded = Loaded {
        bodies: RefCell::new(bodies),
        storage: RefCell::new(HashMap::new()),
    };

    let sink = SharedSink::default();
    let lines = sink.0.clone();

    rt_exec(&library, "top", &mut loaded, Box::new(sink), false).expect("top is elaborated");

    assert!(ran_after_report.get());
    assert_eq!(lines.borrow().len(), 1);
    let line = &lines.borrow()[0];
    assert!(line.contains("Report"));
    assert!(line.contains("Note"));
    assert!(line.contains("startup complete"));

    assert!(!Severity::Note.is_fatal());
    assert!(Severity::Failure.is_fatal());
    assert!(Severity::Error.is_fatal());
}
