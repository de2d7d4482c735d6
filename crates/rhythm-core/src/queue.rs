//! Listener that records events instead of acting on them.
//!
//! Front-ends whose callbacks may call back into the player (a page reading
//! phases from inside its tick handler, say) collect events here while the
//! engine is borrowed and deliver them once it has been released.

use crate::clock::ScheduleWindow;
use crate::coordinator::TrackListener;
use crate::scheduler::ScheduleListener;

#[derive(Clone, Debug, PartialEq)]
pub enum ListenerEvent {
    /// A loop onset was accepted: `(step, at)`.
    LoopTrigger { step: usize, at: f64 },
    /// A track onset was accepted: `(track, step, at)`.
    TrackTrigger { track: usize, step: usize, at: f64 },
    Phase(f64),
    Window(ScheduleWindow),
    /// A coordinator tick, with the phases it left behind.
    Tick {
        window: ScheduleWindow,
        phases: Vec<f64>,
    },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<ListenerEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Everything recorded so far, in the order it happened.
    pub fn take(&mut self) -> Vec<ListenerEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ScheduleListener for EventQueue {
    fn on_trigger(&mut self, step_index: usize, at: f64) {
        self.events.push(ListenerEvent::LoopTrigger {
            step: step_index,
            at,
        });
    }

    fn on_phase(&mut self, fraction: f64) {
        self.events.push(ListenerEvent::Phase(fraction));
    }

    fn on_window(&mut self, window: &ScheduleWindow) {
        self.events.push(ListenerEvent::Window(*window));
    }
}

impl TrackListener for EventQueue {
    fn on_trigger(&mut self, track: usize, step_index: usize, at: f64) {
        self.events.push(ListenerEvent::TrackTrigger {
            track,
            step: step_index,
            at,
        });
    }

    fn on_tick(&mut self, window: &ScheduleWindow, phases: &[f64]) {
        self.events.push(ListenerEvent::Tick {
            window: *window,
            phases: phases.to_vec(),
        });
    }
}
