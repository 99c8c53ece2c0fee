//! Signals and their per-driver waveform queues (`rtkern.c`'s `struct signal`
//! / `struct waveform`).
//!
//! Signal storage is conceptually owned by the JIT/loader (see
//! [`crate::design::Loader`]); the kernel only ever sees a cheap, clonable
//! [`SignalHandle`]. Since this crate has no real external allocator to hand
//! out raw storage, `SignalHandle` is a reference-counted cell — the handle
//! the loader "issues" per the rewrite note in spec §9.

use bitflags::bitflags;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

bitflags! {
    /// Transient per-cycle flags observed by `'ACTIVE`/`'EVENT` attributes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SignalFlags: u8 {
        const ACTIVE = 0b01;
        const EVENT  = 0b10;
    }
}

/// A signal's value: a flat 64-bit word. The kernel only ever compares
/// values for equality (to detect `'EVENT`); it never interprets the bits.
/// Pointer-valued signals are expected to bitcast their pointer into this
/// word (spec §9 explicitly leaves wider payloads unspecified).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Value(pub u64);

struct WaveformNode {
    value: Value,
    when: u64,
    next: Option<Box<WaveformNode>>,
}

/// Runtime record for one declared signal.
pub struct Signal {
    name: String,
    resolved: Value,
    flags: SignalFlags,
    drivers: Vec<Option<Box<WaveformNode>>>,
}

impl Signal {
    pub fn new(name: impl Into<String>, n_drivers: usize) -> Self {
        Self {
            name: name.into(),
            resolved: Value(0),
            flags: SignalFlags::empty(),
            drivers: (0..n_drivers).map(|_| None).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolved(&self) -> Value {
        self.resolved
    }

    pub fn flags(&self) -> SignalFlags {
        self.flags
    }

    pub fn n_drivers(&self) -> usize {
        self.drivers.len()
    }

    /// Projects a new transaction onto driver `driver_ix`'s waveform queue
    /// at absolute time `when = now + after`, in non-decreasing `when`
    /// order. On the very first assignment to an empty driver queue, a
    /// dummy predecessor transaction is materialized at `when = 0` so the
    /// genuine initial value is promoted (and traced) by the first driver
    /// update rather than treated as already-applied.
    ///
    /// Mirrors `_sched_waveform` (`rtkern.c` lines 131-171).
    pub(crate) fn project(&mut self, driver_ix: usize, value: Value, now: u64, after: u64) {
        let when = now + after;
        let slot = &mut self.drivers[driver_ix];

        if slot.is_none() {
            assert_eq!(now, 0, "initial driver transaction must occur at now == 0");
            assert_eq!(after, 0, "initial driver transaction must have after == 0");
            let real = Box::new(WaveformNode {
                value,
                when,
                next: None,
            });
            let dummy = Box::new(WaveformNode {
                value,
                when: 0,
                next: Some(real),
            });
            *slot = Some(dummy);
            return;
        }

        let mut cursor = slot;
        while matches!(cursor, Some(node) if node.when <= when) {
            cursor = &mut cursor.as_mut().unwrap().next;
        }
        let rest = cursor.take();
        *cursor = Some(Box::new(WaveformNode { value, when, next: rest }));
    }

    /// Promotes the next transaction of driver `i` into `resolved` if it is
    /// due at `now`. Returns the flags that should be OR'd into
    /// `self.flags` and recorded in the kernel's active-signals set, or
    /// `None` if this driver had nothing ready.
    ///
    /// Mirrors `rt_update_driver` (`rtkern.c` lines 341-374).
    pub(crate) fn promote_driver(&mut self, i: usize, now: u64, first_cycle: bool) -> Option<SignalFlags> {
        let head = self.drivers[i].as_ref().expect("driver queue head missing");
        let ready = matches!(&head.next, Some(next) if next.when == now);
        if !ready {
            assert!(self.drivers[i].is_some(), "driver queue head missing");
            return None;
        }

        let head = self.drivers[i].take().unwrap();
        let next = head.next.expect("ready implies a successor transaction");

        let new_flags = if first_cycle {
            SignalFlags::empty()
        } else {
            let mut flags = SignalFlags::ACTIVE;
            if next.value != self.resolved {
                flags |= SignalFlags::EVENT;
            }
            flags
        };

        self.resolved = next.value;
        self.flags |= new_flags;
        self.drivers[i] = Some(next);
        // `head` (the old applied transaction) is dropped here, matching the
        // C source's `free(w_now)`.

        Some(new_flags)
    }

    pub(crate) fn clear_transient_flags(&mut self) {
        self.flags = SignalFlags::empty();
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("resolved", &self.resolved)
            .field("flags", &self.flags)
            .field("n_drivers", &self.drivers.len())
            .finish()
    }
}

/// A cheap, clonable, non-owning-in-spirit reference to a signal's runtime
/// record. See the module docs for why this is `Rc<RefCell<_>>` rather than
/// a raw pointer.
#[derive(Clone)]
pub struct SignalHandle(Rc<RefCell<Signal>>);

impl SignalHandle {
    pub fn new(signal: Signal) -> Self {
        Self(Rc::new(RefCell::new(signal)))
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, Signal> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, Signal> {
        self.0.borrow_mut()
    }

    /// Identity comparison: two handles refer to the same signal iff they
    /// share the same backing allocation.
    pub fn same_signal(&self, other: &SignalHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SignalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.borrow(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_assignment_materializes_dummy_head() {
        let mut sig = Signal::new("s", 1);
        sig.project(0, Value(0xAB), 0, 0);
        // resolved is untouched until the driver update cycle runs
        assert_eq!(sig.resolved(), Value(0));
        let flags = sig.promote_driver(0, 0, true);
        assert_eq!(flags, Some(SignalFlags::empty()));
        assert_eq!(sig.resolved(), Value(0xAB));
        assert!(sig.flags().is_empty());
    }

    #[test]
    fn later_assignment_raises_active_and_event() {
        let mut sig = Signal::new("s", 1);
        sig.project(0, Value(0xAB), 0, 0);
        sig.promote_driver(0, 0, true);
        sig.clear_transient_flags();

        sig.project(0, Value(0xCD), 5_000_000, 0);
        let flags = sig.promote_driver(0, 5_000_000, false).unwrap();
        assert_eq!(flags, SignalFlags::ACTIVE | SignalFlags::EVENT);
        assert_eq!(sig.resolved(), Value(0xCD));
    }

    #[test]
    fn waveform_when_is_non_decreasing() {
        let mut sig = Signal::new("s", 1);
        sig.project(0, Value(1), 0, 0);
        sig.project(0, Value(2), 0, 10);
        sig.project(0, Value(3), 0, 5);
        // Walk the list and check non-decreasing `when`.
        let head = sig.drivers[0].as_ref().unwrap();
        let mut whens = vec![head.when];
        let mut it = head.next.as_deref();
        while let Some(n) = it {
            whens.push(n.when);
            it = n.next.as_deref();
        }
        let mut sorted = whens.clone();
        sorted.sort();
        assert_eq!(whens, sorted);
    }

    #[test]
    fn repeat_promotion_at_same_time_is_idempotent() {
        let mut sig = Signal::new("s", 1);
        sig.project(0, Value(1), 0, 0);
        assert!(sig.promote_driver(0, 0, true).is_some());
        assert!(sig.promote_driver(0, 0, true).is_none());
    }
}
