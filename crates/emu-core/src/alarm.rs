//! Per-CPU alarm queue.
//!
//! Peripherals register an alarm once and then schedule it at absolute clock
//! values. The CPU loop asks for the earliest pending clock and dispatches
//! every alarm that has come due before (and after) interrupt handling.

use crate::clock::{CLOCK_MAX, Clock};

/// Handle to a registered alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmId(usize);

impl AlarmId {
    /// Registration index, for hosts that keep handlers in a table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Alarm {
    name: &'static str,
    clk: Clock,
}

/// Min-time queue of alarms for one CPU clock domain.
///
/// An unscheduled alarm holds [`CLOCK_MAX`]. The earliest alarm is cached so
/// `next_pending_clock` is a field read.
#[derive(Debug, Clone)]
pub struct AlarmContext {
    name: &'static str,
    alarms: Vec<Alarm>,
    next: Option<usize>,
    next_clk: Clock,
}

impl AlarmContext {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            alarms: Vec::new(),
            next: None,
            next_clk: CLOCK_MAX,
        }
    }

    /// Name of the owning clock domain.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a new, unscheduled alarm.
    pub fn register(&mut self, name: &'static str) -> AlarmId {
        self.alarms.push(Alarm {
            name,
            clk: CLOCK_MAX,
        });
        AlarmId(self.alarms.len() - 1)
    }

    /// Name given at registration.
    #[must_use]
    pub fn alarm_name(&self, alarm: AlarmId) -> &'static str {
        self.alarms[alarm.0].name
    }

    /// Schedule `alarm` at absolute clock `clk`, replacing any earlier
    /// schedule.
    pub fn set(&mut self, alarm: AlarmId, clk: Clock) {
        self.alarms[alarm.0].clk = clk;
        if clk < self.next_clk {
            self.next = Some(alarm.0);
            self.next_clk = clk;
        } else if self.next == Some(alarm.0) {
            self.find_next();
        }
    }

    /// Remove `alarm` from the queue.
    pub fn unset(&mut self, alarm: AlarmId) {
        self.alarms[alarm.0].clk = CLOCK_MAX;
        if self.next == Some(alarm.0) {
            self.find_next();
        }
    }

    /// Unschedule every alarm.
    pub fn unset_all(&mut self) {
        for alarm in &mut self.alarms {
            alarm.clk = CLOCK_MAX;
        }
        self.next = None;
        self.next_clk = CLOCK_MAX;
    }

    /// Clock at which `alarm` is scheduled, if it is.
    #[must_use]
    pub fn pending(&self, alarm: AlarmId) -> Option<Clock> {
        let clk = self.alarms[alarm.0].clk;
        (clk != CLOCK_MAX).then_some(clk)
    }

    /// Earliest scheduled clock, or [`CLOCK_MAX`] if nothing is pending.
    #[must_use]
    pub fn next_pending_clock(&self) -> Clock {
        self.next_clk
    }

    /// Unschedule the earliest alarm if it is due at `clk`.
    ///
    /// Returns the alarm and how many cycles late it is being served.
    /// Alarms are one-shot: the handler re-arms them if it needs to run
    /// again.
    pub fn dispatch(&mut self, clk: Clock) -> Option<(AlarmId, Clock)> {
        if clk < self.next_clk {
            return None;
        }
        let index = self.next?;
        let offset = clk - self.next_clk;
        self.alarms[index].clk = CLOCK_MAX;
        self.find_next();
        Some((AlarmId(index), offset))
    }

    /// Subtract `sub` from every scheduled alarm.
    ///
    /// Called together with the owning clock's rebase so each alarm's
    /// distance from the current clock is unchanged.
    pub fn rebase(&mut self, sub: Clock) {
        for alarm in &mut self.alarms {
            if alarm.clk != CLOCK_MAX {
                alarm.clk = alarm.clk.saturating_sub(sub);
            }
        }
        self.find_next();
    }

    fn find_next(&mut self) {
        self.next = None;
        self.next_clk = CLOCK_MAX;
        for (index, alarm) in self.alarms.iter().enumerate() {
            if alarm.clk < self.next_clk {
                self.next = Some(index);
                self.next_clk = alarm.clk;
            }
        }
    }
}
