// src/audio/mod.rs

//! Pull-based audio output.
//!
//! The device asks for bytes; two alternating buffers are refilled by the
//! caller's callback (or with silence) whenever the device finishes one.
//! Refill runs on its own thread natively and inline in the host's audio
//! callback in the browser.

pub mod device;
pub mod pump;
pub mod wav;

pub use device::{default_device, AudioDevice, DeviceStream, HeadlessAudioDevice, StreamParams};
#[cfg(feature = "audio_cpal")]
pub use device::CpalAudioDevice;
pub use pump::{DevicePort, Filler, RefillMessage, BUFFER_COUNT, SILENCE};
pub use wav::{load_wav, read_wav, Wav, WavSpec};

use crate::config::AudioConfig;
use crate::error::PlatformError;
use log::info;
use pump::RefillThread;

/// Sample format of the pipeline. Only unsigned 8-bit is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    U8,
}

/// The fill callback: mutable userdata and the buffer to fill.
pub type AudioCallback<T> = fn(&mut T, &mut [u8]);

/// Parameters for [`AudioOutput::open`].
///
/// `userdata` moves into the refill context and comes back by reference on
/// every callback invocation.
#[derive(Debug, Clone)]
pub struct AudioSpec<T> {
    pub freq: u32,
    pub format: AudioFormat,
    pub channels: u8,
    pub frames_per_buffer: u16,
    pub callback: Option<AudioCallback<T>>,
    pub userdata: T,
}

impl<T> AudioSpec<T> {
    pub fn from_config(config: &AudioConfig, callback: Option<AudioCallback<T>>, userdata: T) -> Self {
        Self {
            freq: config.frequency,
            format: AudioFormat::U8,
            channels: config.channels,
            frames_per_buffer: config.frames_per_buffer,
            callback,
            userdata,
        }
    }

    /// Bytes in one buffer.
    pub fn buffer_len(&self) -> usize {
        usize::from(self.frames_per_buffer) * usize::from(self.channels)
    }
}

impl AudioSpec<()> {
    /// A spec that plays silence.
    pub fn silent(config: &AudioConfig) -> Self {
        Self::from_config(config, None, ())
    }
}

/// Where the fill callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillMode {
    /// A dedicated refill thread.
    Thread,
    /// Inline in the device callback, for hosts that schedule audio themselves.
    Host,
}

impl Default for RefillMode {
    fn default() -> Self {
        if cfg!(target_arch = "wasm32") {
            RefillMode::Host
        } else {
            RefillMode::Thread
        }
    }
}

/// An open audio pipeline. Dropping it closes it.
pub struct AudioOutput {
    params: StreamParams,
    stream: Option<Box<dyn DeviceStream>>,
    refill: Option<RefillThread>,
    paused: bool,
}

impl std::fmt::Debug for AudioOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioOutput")
            .field("params", &self.params)
            .field("open", &self.stream.is_some())
            .field("paused", &self.paused)
            .finish()
    }
}

impl AudioOutput {
    /// Open the default output device.
    pub fn open<T: Send + 'static>(spec: AudioSpec<T>) -> Result<Self, PlatformError> {
        let device = default_device()?;
        Self::open_with(device.as_ref(), spec, RefillMode::default())
    }

    /// Open on a specific device.
    pub fn open_with<T: Send + 'static>(
        device: &dyn AudioDevice,
        spec: AudioSpec<T>,
        mode: RefillMode,
    ) -> Result<Self, PlatformError> {
        if spec.freq == 0 {
            return Err(PlatformError::InvalidAudioSpec("frequency must be non-zero".to_string()));
        }
        if spec.channels == 0 {
            return Err(PlatformError::InvalidAudioSpec("channel count must be non-zero".to_string()));
        }
        if spec.frames_per_buffer == 0 {
            return Err(PlatformError::InvalidAudioSpec("frames per buffer must be non-zero".to_string()));
        }

        let params = StreamParams {
            freq: spec.freq,
            channels: spec.channels,
            frames_per_buffer: spec.frames_per_buffer,
        };
        let buffer_len = spec.buffer_len();
        let filler = Filler::from_callback(spec.callback, spec.userdata);

        let (refill, port) = match mode {
            RefillMode::Thread => {
                let (refill, port) = pump::threaded(buffer_len, filler)?;
                (Some(refill), port)
            }
            RefillMode::Host => (None, pump::inline(buffer_len, filler)),
        };

        // A failed start drops `refill`, which stops and joins the thread.
        let stream = device.start(&params, port)?;
        info!(
            "Audio: Opened {} Hz, {} channel(s), {} x {}-byte buffers, {:?} refill",
            params.freq, params.channels, BUFFER_COUNT, buffer_len, mode
        );

        Ok(Self {
            params,
            stream: Some(stream),
            refill,
            paused: false,
        })
    }

    pub fn params(&self) -> StreamParams {
        self.params
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspend or resume consumption. Buffers and callback are kept.
    pub fn pause(&mut self, paused: bool) -> Result<(), PlatformError> {
        if let Some(stream) = self.stream.as_mut() {
            stream.set_paused(paused)?;
        }
        self.paused = paused;
        Ok(())
    }

    /// Stop the refill context, then the device, then free the buffers.
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        if let Some(mut refill) = self.refill.take() {
            refill.stop();
        }
        stream.stop();
        drop(stream);
        info!("Audio: Closed");
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.close();
    }
}
