// src/platform.rs

//! The platform context: one display connection, at most one window, at most
//! one audio output, the event queue and the clock.
//!
//! Every operation goes through a `Platform` value; there is no process-wide
//! current window or device.

use crate::audio::{self, AudioDevice, AudioOutput, AudioSpec, RefillMode, Wav};
use crate::clock::Clock;
use crate::config::PlatformConfig;
use crate::display::{DisplayDriver, NativeDisplayDriver, Window};
use crate::error::PlatformError;
use crate::event::{EventQueue, PlatformEvent};
use log::{info, warn};
use std::path::Path;

pub struct Platform {
    config: PlatformConfig,
    clock: Clock,
    events: EventQueue,
    driver: Option<Box<dyn DisplayDriver>>,
    window: Option<Window>,
    audio: Option<AudioOutput>,
    last_error: String,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("window", &self.window)
            .field("audio", &self.audio)
            .field("pending_events", &self.events.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Platform {
    /// Connect to the native display and start the clock.
    pub fn init(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let driver = NativeDisplayDriver::connect(&config.display)?;
        info!("Platform: Display connected");
        Ok(Self::with_driver(Box::new(driver), config))
    }

    /// Use an already connected driver, e.g. a headless one.
    pub fn with_driver(driver: Box<dyn DisplayDriver>, config: &PlatformConfig) -> Self {
        Self {
            config: config.clone(),
            clock: Clock::new(),
            events: EventQueue::new(),
            driver: Some(driver),
            window: None,
            audio: None,
            last_error: String::new(),
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Message of the most recent failed operation, empty if none failed.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    fn record<V>(&mut self, result: Result<V, PlatformError>) -> Result<V, PlatformError> {
        if let Err(e) = &result {
            warn!("Platform: {}", e);
            self.last_error = e.to_string();
        }
        result
    }

    /// Create the window. Only one window exists at a time; after
    /// [`Platform::destroy_window`] another can be created on the same
    /// connection.
    pub fn create_window(&mut self, title: &str, width: u32, height: u32, fullscreen: bool) -> Result<&mut Window, PlatformError> {
        let result = self.open_window(title, width, height, fullscreen);
        let mut window = self.record(result)?;
        if !self.config.window.show_cursor {
            window.show_cursor(false);
        }
        Ok(self.window.insert(window))
    }

    fn open_window(&mut self, title: &str, width: u32, height: u32, fullscreen: bool) -> Result<Window, PlatformError> {
        if self.window.is_some() {
            return Err(PlatformError::WindowExists);
        }
        Window::check_size(width, height)?;
        let mut driver = self.driver.take().ok_or(PlatformError::DisplayClosed)?;
        if let Err(e) = driver.create_window(&Window::descriptor(title, width, height)) {
            self.driver = Some(driver);
            return Err(e);
        }
        Ok(Window::attach(driver, title, width, height, fullscreen))
    }

    /// Create the window described by the `window` config section.
    pub fn create_configured_window(&mut self) -> Result<&mut Window, PlatformError> {
        let w = self.config.window.clone();
        self.create_window(&w.title, w.width, w.height, w.fullscreen)
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn window_mut(&mut self) -> Option<&mut Window> {
        self.window.as_mut()
    }

    /// Destroy the window. The display connection stays open.
    pub fn destroy_window(&mut self) {
        if let Some(window) = self.window.take() {
            self.driver = Some(window.into_driver());
            info!("Platform: Window destroyed");
        }
    }

    /// Pop the next event, pumping the native queue first.
    pub fn poll_event(&mut self) -> Option<PlatformEvent> {
        if let Some(window) = self.window.as_mut() {
            window.pump_events(&mut self.events);
        }
        self.events.pop()
    }

    /// Events dropped because the queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    pub fn delay(&self, ms: u32) {
        self.clock.delay(ms);
    }

    /// Open audio on the default device.
    pub fn open_audio<T: Send + 'static>(&mut self, spec: AudioSpec<T>) -> Result<(), PlatformError> {
        let result = audio::default_device().and_then(|device| self.open_audio_inner(device.as_ref(), spec, RefillMode::default()));
        self.record(result)
    }

    /// Open audio on a caller-supplied device.
    pub fn open_audio_with<T: Send + 'static>(
        &mut self,
        device: &dyn AudioDevice,
        spec: AudioSpec<T>,
        mode: RefillMode,
    ) -> Result<(), PlatformError> {
        let result = self.open_audio_inner(device, spec, mode);
        self.record(result)
    }

    fn open_audio_inner<T: Send + 'static>(
        &mut self,
        device: &dyn AudioDevice,
        spec: AudioSpec<T>,
        mode: RefillMode,
    ) -> Result<(), PlatformError> {
        if self.audio.is_some() {
            return Err(PlatformError::AudioAlreadyOpen);
        }
        self.audio = Some(AudioOutput::open_with(device, spec, mode)?);
        Ok(())
    }

    pub fn audio(&self) -> Option<&AudioOutput> {
        self.audio.as_ref()
    }

    /// Pause or resume audio. A no-op when audio is not open.
    pub fn pause_audio(&mut self, paused: bool) -> Result<(), PlatformError> {
        let result = match self.audio.as_mut() {
            Some(audio) => audio.pause(paused),
            None => Ok(()),
        };
        self.record(result)
    }

    pub fn close_audio(&mut self) {
        if let Some(mut audio) = self.audio.take() {
            audio.close();
        }
    }

    pub fn load_wav(&mut self, path: impl AsRef<Path>) -> Result<Wav, PlatformError> {
        let result = audio::load_wav(path);
        self.record(result)
    }

    /// Close audio, then the window, then the display connection.
    pub fn shutdown(&mut self) {
        self.close_audio();
        self.destroy_window();
        if self.driver.take().is_some() {
            info!("Platform: Display closed");
        }
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.shutdown();
    }
}
