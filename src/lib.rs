#![cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

mod audio;
mod constants;
mod driver;
mod harmony;
mod rhythm;
mod session;
mod timer;

pub use harmony::IntervalBank;
pub use rhythm::{EuclidPlayer, GroovePlayer, PolyPlayer};

// Errors crossing into JS become plain strings
pub(crate) fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("rhythm-lab starting");
    Ok(())
}
