use std::cell::RefCell;

use fnv::FnvHashMap;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

use crate::constants::{sound_url, PERCUSSION};

/// A decoded sample and the gain it is always played at.
#[derive(Clone)]
pub struct LoadedSound {
    pub buffer: web::AudioBuffer,
    pub gain: f32,
}

/// The `AudioContext` of one page plus the samples decoded into it.
///
/// Every page owns exactly one session; dropping it closes the context, which
/// also silences anything still scheduled on it.
pub struct AudioSession {
    ctx: web::AudioContext,
    sounds: RefCell<FnvHashMap<String, LoadedSound>>,
}

pub(crate) fn js_err(e: JsValue) -> anyhow::Error {
    anyhow::anyhow!("{:?}", e)
}

impl AudioSession {
    pub fn new() -> anyhow::Result<Self> {
        let ctx = web::AudioContext::new().map_err(js_err)?;
        log::info!("[session] audio context at {} Hz", ctx.sample_rate());
        Ok(Self {
            ctx,
            sounds: RefCell::new(FnvHashMap::default()),
        })
    }

    #[inline]
    pub fn context(&self) -> &web::AudioContext {
        &self.ctx
    }

    /// Audio clock in seconds.
    #[inline]
    pub fn now(&self) -> f64 {
        self.ctx.current_time()
    }

    /// Browsers start contexts suspended until a user gesture.
    pub fn resume(&self) {
        if let Err(e) = self.ctx.resume() {
            log::warn!("[session] resume failed: {:?}", e);
        }
    }

    pub fn register(&self, name: &str, buffer: web::AudioBuffer, gain: f32) {
        self.sounds
            .borrow_mut()
            .insert(name.to_string(), LoadedSound { buffer, gain });
    }

    pub fn sound(&self, name: &str) -> Option<LoadedSound> {
        self.sounds.borrow().get(name).cloned()
    }

    pub fn has_sound(&self, name: &str) -> bool {
        self.sounds.borrow().contains_key(name)
    }

    /// Fetch, decode and register one sample.
    pub async fn load(&self, name: &str, gain: f32) -> anyhow::Result<()> {
        let buffer = fetch_buffer(&self.ctx, &sound_url(name)).await?;
        log::info!(
            "[session] loaded {} ({:.2}s, gain {})",
            name,
            buffer.duration(),
            gain
        );
        self.register(name, buffer, gain);
        Ok(())
    }

    /// Load the kick/snare/hat/clap kit the rhythm pages play.
    pub async fn load_percussion(&self) -> anyhow::Result<()> {
        for (name, gain) in PERCUSSION {
            self.load(name, gain).await?;
        }
        Ok(())
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        log::info!("[session] closing audio context");
        if let Err(e) = self.ctx.close() {
            log::warn!("[session] close failed: {:?}", e);
        }
    }
}

async fn fetch_buffer(ctx: &web::AudioContext, url: &str) -> anyhow::Result<web::AudioBuffer> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let response: web::Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_err)?
        .dyn_into()
        .map_err(js_err)?;
    if !response.ok() {
        anyhow::bail!("{} returned {}", url, response.status());
    }
    let bytes: js_sys::ArrayBuffer = JsFuture::from(response.array_buffer().map_err(js_err)?)
        .await
        .map_err(js_err)?
        .dyn_into()
        .map_err(js_err)?;
    JsFuture::from(ctx.decode_audio_data(&bytes).map_err(js_err)?)
        .await
        .map_err(js_err)?
        .dyn_into::<web::AudioBuffer>()
        .map_err(js_err)
}
