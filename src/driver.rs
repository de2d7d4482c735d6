//! Glue between the core schedulers and the browser: each driver owns a
//! scheduler together with the tone generator, timer and page callbacks it
//! is driven with, and lives in an `Rc<RefCell<_>>` that its timeouts point
//! back to.

use std::cell::RefCell;
use std::rc::Rc;

use rhythm_core::{
    AudioClock, CoordinatorParams, EventQueue, ListenerEvent, LookAheadScheduler, LoopSource,
    PhaseCoordinator, SchedulerParams, TrackSource, Wake,
};
use wasm_bindgen::JsValue;
use web_sys as web;

use crate::audio::WebTones;
use crate::session::AudioSession;
use crate::timer::{BrowserTimer, WakeTarget};

/// Page callbacks. Triggers are reported when an onset is planned, together
/// with the audio time it will sound at.
///
/// Fields:
/// - `step`: `(step, at)` for loops, `(track, step, at)` for tracks
/// - `phase`: `(fraction)` of the current window
/// - `window`: `(index, start)` for every planned window or tick
/// - `phases`: `Float64Array` of track phases after every tick
#[derive(Clone, Default)]
pub struct JsCallbacks {
    pub step: Option<js_sys::Function>,
    pub phase: Option<js_sys::Function>,
    pub window: Option<js_sys::Function>,
    pub phases: Option<js_sys::Function>,
}

fn report(result: Result<JsValue, JsValue>) {
    if let Err(e) = result {
        log::warn!("[callback] {:?}", e);
    }
}

impl JsCallbacks {
    fn call(f: &Option<js_sys::Function>, args: &[JsValue]) {
        if let Some(f) = f {
            let args: js_sys::Array = args.iter().collect();
            report(f.apply(&JsValue::NULL, &args));
        }
    }

    fn deliver(&self, events: Vec<ListenerEvent>) {
        for event in events {
            match event {
                ListenerEvent::LoopTrigger { step, at } => {
                    Self::call(&self.step, &[(step as f64).into(), at.into()])
                }
                ListenerEvent::TrackTrigger { track, step, at } => Self::call(
                    &self.step,
                    &[(track as f64).into(), (step as f64).into(), at.into()],
                ),
                ListenerEvent::Phase(fraction) => Self::call(&self.phase, &[fraction.into()]),
                ListenerEvent::Window(window) => Self::call(
                    &self.window,
                    &[(window.index as f64).into(), window.start.into()],
                ),
                ListenerEvent::Tick { window, phases } => {
                    Self::call(
                        &self.window,
                        &[(window.index as f64).into(), window.start.into()],
                    );
                    let array = js_sys::Float64Array::from(phases.as_slice());
                    Self::call(&self.phases, &[array.into()]);
                }
            }
        }
    }
}

/// Listener events recorded while a driver was borrowed.
///
/// Page callbacks may call straight back into the player, so they are only
/// invoked through [`Deferred::deliver`] once the driver borrow has ended.
#[must_use]
pub struct Deferred {
    callbacks: JsCallbacks,
    events: Vec<ListenerEvent>,
}

impl Deferred {
    fn new(callbacks: &JsCallbacks, queue: &mut EventQueue) -> Self {
        Self {
            callbacks: callbacks.clone(),
            events: queue.take(),
        }
    }

    pub fn deliver(self) {
        self.callbacks.deliver(self.events);
    }
}

fn browser_window() -> anyhow::Result<web::Window> {
    web::window().ok_or_else(|| anyhow::anyhow!("no window"))
}

/// A look-ahead scheduler over one loop source.
pub struct LoopDriver<L: LoopSource<Sound = String> + 'static> {
    scheduler: LookAheadScheduler<L, i32>,
    tones: WebTones,
    timer: BrowserTimer<Self>,
    events: EventQueue,
    pub callbacks: JsCallbacks,
}

impl<L: LoopSource<Sound = String> + 'static> LoopDriver<L> {
    pub fn new(source: L, session: Rc<AudioSession>) -> anyhow::Result<Rc<RefCell<Self>>> {
        let window = browser_window()?;
        Ok(Rc::new_cyclic(|weak| {
            RefCell::new(Self {
                scheduler: LookAheadScheduler::new(source, SchedulerParams::default()),
                tones: WebTones::new(session),
                timer: BrowserTimer::new(window, weak.clone()),
                events: EventQueue::new(),
                callbacks: JsCallbacks::default(),
            })
        }))
    }

    pub fn start(&mut self) -> Deferred {
        let Self {
            scheduler,
            tones,
            timer,
            events,
            callbacks,
        } = self;
        scheduler.start(tones, timer, events);
        Deferred::new(callbacks, events)
    }

    pub fn stop(&mut self) {
        let now = self.tones.now();
        self.scheduler.stop(now, &mut self.timer);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }
}

impl<L: LoopSource<Sound = String> + 'static> WakeTarget for LoopDriver<L> {
    fn wake(&mut self, wake: Wake) -> Deferred {
        let Self {
            scheduler,
            tones,
            timer,
            events,
            callbacks,
        } = self;
        scheduler.on_wake(wake, tones, timer, events);
        Deferred::new(callbacks, events)
    }
}

/// The phase coordinator over a live track list.
pub struct TrackDriver<S: TrackSource<Sound = String> + 'static> {
    coordinator: PhaseCoordinator<S, i32>,
    tones: WebTones,
    timer: BrowserTimer<Self>,
    events: EventQueue,
    pub callbacks: JsCallbacks,
}

impl<S: TrackSource<Sound = String> + 'static> TrackDriver<S> {
    pub fn new(source: S, session: Rc<AudioSession>) -> anyhow::Result<Rc<RefCell<Self>>> {
        let window = browser_window()?;
        Ok(Rc::new_cyclic(|weak| {
            RefCell::new(Self {
                coordinator: PhaseCoordinator::new(source, CoordinatorParams::default()),
                tones: WebTones::new(session),
                timer: BrowserTimer::new(window, weak.clone()),
                events: EventQueue::new(),
                callbacks: JsCallbacks::default(),
            })
        }))
    }

    pub fn coordinator(&self) -> &PhaseCoordinator<S, i32> {
        &self.coordinator
    }

    /// Forget the phase of a track just removed from the live list.
    pub fn remove_track(&mut self, index: usize) {
        self.coordinator.remove_track(index);
    }

    pub fn start(&mut self) -> Deferred {
        let Self {
            coordinator,
            tones,
            timer,
            events,
            callbacks,
        } = self;
        coordinator.start(tones, timer, events);
        Deferred::new(callbacks, events)
    }

    pub fn restart(&mut self) -> Deferred {
        let Self {
            coordinator,
            tones,
            timer,
            events,
            callbacks,
        } = self;
        coordinator.restart(tones, timer, events);
        Deferred::new(callbacks, events)
    }

    pub fn stop(&mut self) {
        let now = self.tones.now();
        self.coordinator.stop(now, &mut self.timer);
    }

    pub fn is_running(&self) -> bool {
        self.coordinator.is_running()
    }
}

impl<S: TrackSource<Sound = String> + 'static> WakeTarget for TrackDriver<S> {
    fn wake(&mut self, wake: Wake) -> Deferred {
        let Self {
            coordinator,
            tones,
            timer,
            events,
            callbacks,
        } = self;
        coordinator.on_wake(wake, tones, timer, events);
        Deferred::new(callbacks, events)
    }
}
