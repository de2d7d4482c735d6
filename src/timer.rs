use std::cell::RefCell;
use std::rc::Weak;
use std::time::Duration;

use rhythm_core::{CoarseTimer, Wake};

use crate::driver::Deferred;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys as web;

/// Owner of a scheduler that wants its fired timers handed back.
pub trait WakeTarget: 'static {
    /// Route one fired timer; the returned callbacks run after the borrow.
    fn wake(&mut self, wake: Wake) -> Deferred;
}

/// Coarse timer on `setTimeout` / `clearTimeout`.
///
/// Each callback holds only a weak handle to its driver, so a page that was
/// torn down simply lets its pending timeouts fall through.
pub struct BrowserTimer<D> {
    window: web::Window,
    target: Weak<RefCell<D>>,
}

impl<D: WakeTarget> BrowserTimer<D> {
    pub fn new(window: web::Window, target: Weak<RefCell<D>>) -> Self {
        Self { window, target }
    }
}

impl<D: WakeTarget> CoarseTimer for BrowserTimer<D> {
    type Token = i32;

    fn after(&mut self, delay: Duration, wake: Wake) -> i32 {
        let target = self.target.clone();
        let callback = Closure::once_into_js(move || {
            let Some(target) = target.upgrade() else {
                return;
            };
            let deferred = match target.try_borrow_mut() {
                Ok(mut driver) => driver.wake(wake),
                Err(_) => {
                    log::warn!("[timer] driver busy; dropped {:?}", wake);
                    return;
                }
            };
            deferred.deliver();
        });
        let ms = delay.as_millis().min(i32::MAX as u128) as i32;
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), ms)
        {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("[timer] setTimeout failed: {:?}", e);
                -1
            }
        }
    }

    fn cancel(&mut self, token: i32) {
        if token >= 0 {
            self.window.clear_timeout_with_handle(token);
        }
    }
}
