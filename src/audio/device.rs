// src/audio/device.rs

//! Output devices that drain a [`DevicePort`].
//!
//! The pipeline speaks unsigned 8-bit PCM. A device converts at its own
//! boundary to whatever sample format, rate and channel count the hardware
//! accepted.

use crate::audio::pump::DevicePort;
use crate::error::PlatformError;
use log::info;
use std::sync::{Arc, Mutex, MutexGuard};

/// What the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub freq: u32,
    pub channels: u8,
    pub frames_per_buffer: u16,
}

impl StreamParams {
    pub fn buffer_len(&self) -> usize {
        usize::from(self.frames_per_buffer) * usize::from(self.channels)
    }
}

/// A running output stream. Dropping it stops the device.
pub trait DeviceStream {
    fn set_paused(&mut self, paused: bool) -> Result<(), PlatformError>;

    /// Stop consumption and release the port. Idempotent.
    fn stop(&mut self);
}

/// Something that can play PCM pulled from a [`DevicePort`].
pub trait AudioDevice {
    fn start(&self, params: &StreamParams, port: DevicePort) -> Result<Box<dyn DeviceStream>, PlatformError>;
}

/// The default output device for this build.
pub fn default_device() -> Result<Box<dyn AudioDevice>, PlatformError> {
    #[cfg(feature = "audio_cpal")]
    {
        Ok(Box::new(cpal_device::CpalAudioDevice::default_output()?))
    }
    #[cfg(not(feature = "audio_cpal"))]
    {
        Err(PlatformError::AudioUnavailable(
            "built without an audio backend (enable the audio_cpal feature)".to_string(),
        ))
    }
}

#[cfg(feature = "audio_cpal")]
pub use cpal_device::CpalAudioDevice;

#[cfg(feature = "audio_cpal")]
mod cpal_device {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, Sample, SampleFormat, SizedSample};
    use log::{error, warn};

    /// Adapts the 8-bit pipeline to the device's rate and channel count.
    ///
    /// Rate conversion is nearest-sample: each output frame takes the most
    /// recent source frame. Channels are duplicated or dropped.
    struct Converter {
        port: DevicePort,
        src_channels: usize,
        dst_channels: usize,
        step: f64,
        phase: f64,
        frame: Vec<u8>,
        chunk: Vec<u8>,
        chunk_pos: usize,
    }

    impl Converter {
        fn new(port: DevicePort, params: &StreamParams, device_rate: u32, device_channels: u16) -> Self {
            let src_channels = usize::from(params.channels);
            Self {
                port,
                src_channels,
                dst_channels: usize::from(device_channels),
                step: f64::from(params.freq) / f64::from(device_rate),
                // forces a source frame on the first output frame
                phase: 1.0,
                frame: vec![crate::audio::SILENCE; src_channels],
                chunk: vec![0; params.buffer_len().max(src_channels)],
                chunk_pos: usize::MAX,
            }
        }

        fn next_source_frame(&mut self) {
            if self.chunk_pos >= self.chunk.len() {
                self.port.pull(&mut self.chunk);
                self.chunk_pos = 0;
            }
            let end = self.chunk_pos + self.src_channels;
            self.frame.copy_from_slice(&self.chunk[self.chunk_pos..end]);
            self.chunk_pos = end;
        }

        fn render<S: SizedSample + FromSample<u8>>(&mut self, data: &mut [S]) {
            for out in data.chunks_mut(self.dst_channels) {
                while self.phase >= 1.0 {
                    self.next_source_frame();
                    self.phase -= 1.0;
                }
                for (ch, sample) in out.iter_mut().enumerate() {
                    let byte = self.frame[ch.min(self.src_channels - 1)];
                    *sample = S::from_sample(byte);
                }
                self.phase += self.step;
            }
        }
    }

    /// The host's default output device.
    pub struct CpalAudioDevice {
        device: cpal::Device,
    }

    impl CpalAudioDevice {
        pub fn default_output() -> Result<Self, PlatformError> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| PlatformError::AudioUnavailable("no default output device".to_string()))?;
            info!(
                "Audio: Using output device '{}' on {:?}",
                device.name().unwrap_or_else(|_| "<unnamed>".to_string()),
                host.id()
            );
            Ok(Self { device })
        }

        fn build<S: SizedSample + FromSample<u8>>(
            &self,
            config: &cpal::StreamConfig,
            mut converter: Converter,
        ) -> Result<cpal::Stream, cpal::BuildStreamError> {
            self.device.build_output_stream(
                config,
                move |data: &mut [S], _: &cpal::OutputCallbackInfo| converter.render(data),
                |err| error!("Audio stream error: {}", err),
                None,
            )
        }
    }

    impl AudioDevice for CpalAudioDevice {
        fn start(&self, params: &StreamParams, port: DevicePort) -> Result<Box<dyn DeviceStream>, PlatformError> {
            let supported = self
                .device
                .default_output_config()
                .map_err(|e| PlatformError::AudioUnavailable(e.to_string()))?;
            let format = supported.sample_format();
            let config: cpal::StreamConfig = supported.into();
            if config.sample_rate.0 != params.freq || config.channels != u16::from(params.channels) {
                warn!(
                    "Audio: Device runs {} Hz x{}, converting from {} Hz x{}",
                    config.sample_rate.0, config.channels, params.freq, params.channels
                );
            }

            let converter = Converter::new(port, params, config.sample_rate.0, config.channels);
            let stream = match format {
                SampleFormat::F32 => self.build::<f32>(&config, converter),
                SampleFormat::I16 => self.build::<i16>(&config, converter),
                SampleFormat::U16 => self.build::<u16>(&config, converter),
                SampleFormat::U8 => self.build::<u8>(&config, converter),
                other => {
                    return Err(PlatformError::AudioUnavailable(format!(
                        "unsupported device sample format {:?}",
                        other
                    )))
                }
            }
            .map_err(|e| PlatformError::AudioStream(e.to_string()))?;

            stream.play().map_err(|e| PlatformError::AudioStream(e.to_string()))?;
            info!("Audio: Stream started ({:?})", format);
            Ok(Box::new(CpalStream { stream: Some(stream) }))
        }
    }

    struct CpalStream {
        stream: Option<cpal::Stream>,
    }

    impl DeviceStream for CpalStream {
        fn set_paused(&mut self, paused: bool) -> Result<(), PlatformError> {
            let Some(stream) = &self.stream else {
                return Ok(());
            };
            let result = if paused { stream.pause() } else { stream.play() };
            result.map_err(|e| PlatformError::AudioStream(e.to_string()))
        }

        fn stop(&mut self) {
            if let Some(stream) = self.stream.take() {
                let _ = stream.pause();
                drop(stream);
                info!("Audio: Stream stopped");
            }
        }
    }

    impl Drop for CpalStream {
        fn drop(&mut self) {
            self.stop();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::audio::pump::{self, Filler};
        use crate::audio::SILENCE;
        use test_log::test;

        fn ramp(next: &mut u8, buf: &mut [u8]) {
            for b in buf.iter_mut() {
                *next = next.wrapping_add(1);
                *b = *next;
            }
        }

        // The two primed buffers of silence play before any callback data.
        fn converter(freq: u32, channels: u8, device_rate: u32, device_channels: u16) -> Converter {
            let params = StreamParams {
                freq,
                channels,
                frames_per_buffer: 4,
            };
            let filler = Filler::from_callback(Some(ramp as fn(&mut u8, &mut [u8])), 0u8);
            Converter::new(pump::inline(params.buffer_len(), filler), &params, device_rate, device_channels)
        }

        #[test]
        fn it_should_duplicate_samples_when_the_device_runs_faster() {
            let mut conv = converter(8000, 1, 16000, 1);
            let mut out = [0u8; 24];
            conv.render(&mut out);
            assert_eq!(&out[..16], &[SILENCE; 16]);
            assert_eq!(&out[16..], &[1, 1, 2, 2, 3, 3, 4, 4]);
        }

        #[test]
        fn it_should_pass_samples_through_at_equal_rates() {
            let mut conv = converter(8000, 1, 8000, 1);
            let mut out = [0u8; 12];
            conv.render(&mut out);
            assert_eq!(&out[8..], &[1, 2, 3, 4]);
        }

        #[test]
        fn it_should_skip_samples_when_the_device_runs_slower() {
            let mut conv = converter(16000, 1, 8000, 1);
            let mut out = [0u8; 8];
            conv.render(&mut out);
            assert_eq!(&out[..4], &[SILENCE; 4]);
            assert_eq!(&out[4..], &[1, 3, 5, 7]);
        }

        #[test]
        fn it_should_duplicate_mono_into_both_device_channels() {
            let mut conv = converter(8000, 1, 8000, 2);
            let mut out = [0u8; 24];
            conv.render(&mut out);
            assert_eq!(&out[..16], &[SILENCE; 16]);
            assert_eq!(&out[16..], &[1, 1, 2, 2, 3, 3, 4, 4]);
        }

        #[test]
        fn it_should_keep_the_first_channel_on_a_mono_device() {
            let mut conv = converter(8000, 2, 8000, 1);
            let mut out = [0u8; 12];
            conv.render(&mut out);
            assert_eq!(&out[..8], &[SILENCE; 8]);
            assert_eq!(&out[8..], &[1, 3, 5, 7]);
        }

        #[test]
        fn it_should_map_silence_to_the_device_format_midpoint() {
            let mut floats = [1.0f32; 6];
            converter(8000, 1, 8000, 2).render(&mut floats);
            assert!(floats.iter().all(|&s| s == 0.0));

            let mut signed = [1i16; 6];
            converter(8000, 1, 8000, 2).render(&mut signed);
            assert!(signed.iter().all(|&s| s == 0));

            let mut unsigned = [0u16; 6];
            converter(8000, 1, 8000, 2).render(&mut unsigned);
            assert!(unsigned.iter().all(|&s| s == 32768));
        }
    }
}

#[derive(Debug, Default)]
struct HeadlessShared {
    port: Option<DevicePort>,
    params: Option<StreamParams>,
    paused: bool,
    starts: u32,
}

/// A device with no hardware behind it; the caller decides when it consumes.
///
/// Clones share the same device, so a test can keep one while the pipeline
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct HeadlessAudioDevice {
    shared: Arc<Mutex<HeadlessShared>>,
}

impl HeadlessAudioDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessShared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Consume `out.len()` bytes as the hardware would. Returns false and
    /// leaves `out` untouched while paused or stopped.
    pub fn pull(&self, out: &mut [u8]) -> bool {
        let mut shared = self.lock();
        if shared.paused {
            return false;
        }
        match shared.port.as_mut() {
            Some(port) => {
                port.pull(out);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().port.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn params(&self) -> Option<StreamParams> {
        self.lock().params
    }

    /// How many streams have been started on this device.
    pub fn starts(&self) -> u32 {
        self.lock().starts
    }
}

impl AudioDevice for HeadlessAudioDevice {
    fn start(&self, params: &StreamParams, port: DevicePort) -> Result<Box<dyn DeviceStream>, PlatformError> {
        let mut shared = self.lock();
        if shared.port.is_some() {
            return Err(PlatformError::AudioStream("headless device already streaming".to_string()));
        }
        shared.port = Some(port);
        shared.params = Some(*params);
        shared.paused = false;
        shared.starts += 1;
        info!("Audio: Headless stream started {:?}", params);
        Ok(Box::new(HeadlessStream {
            device: self.clone(),
            stopped: false,
        }))
    }
}

struct HeadlessStream {
    device: HeadlessAudioDevice,
    stopped: bool,
}

impl DeviceStream for HeadlessStream {
    fn set_paused(&mut self, paused: bool) -> Result<(), PlatformError> {
        self.device.lock().paused = paused;
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let mut shared = self.device.lock();
        shared.port = None;
        shared.paused = false;
        info!("Audio: Headless stream stopped");
    }
}

impl Drop for HeadlessStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pump::{self, Filler, SILENCE};
    use test_log::test;

    fn params() -> StreamParams {
        StreamParams {
            freq: 8000,
            channels: 1,
            frames_per_buffer: 4,
        }
    }

    #[test]
    fn it_should_size_buffers_by_frames_and_channels() {
        let p = StreamParams {
            freq: 22050,
            channels: 2,
            frames_per_buffer: 1024,
        };
        assert_eq!(p.buffer_len(), 2048);
    }

    #[test]
    fn it_should_only_consume_while_running_and_unpaused() {
        let device = HeadlessAudioDevice::new();
        let mut out = [0u8; 4];
        assert!(!device.pull(&mut out));

        let mut stream = device.start(&params(), pump::inline(4, Filler::silence())).unwrap();
        assert!(device.is_running());
        assert!(device.pull(&mut out));
        assert_eq!(out, [SILENCE; 4]);

        stream.set_paused(true).unwrap();
        assert!(device.is_paused());
        let mut untouched = [9u8; 4];
        assert!(!device.pull(&mut untouched));
        assert_eq!(untouched, [9; 4]);

        stream.set_paused(false).unwrap();
        assert!(device.pull(&mut out));

        stream.stop();
        assert!(!device.is_running());
        assert!(!device.pull(&mut out));
    }

    #[test]
    fn it_should_refuse_a_second_concurrent_stream() {
        let device = HeadlessAudioDevice::new();
        let _stream = device.start(&params(), pump::inline(4, Filler::silence())).unwrap();
        assert!(device.start(&params(), pump::inline(4, Filler::silence())).is_err());
        assert_eq!(device.starts(), 1);
    }

    #[test]
    fn it_should_stop_when_the_stream_is_dropped() {
        let device = HeadlessAudioDevice::new();
        let stream = device.start(&params(), pump::inline(4, Filler::silence())).unwrap();
        drop(stream);
        assert!(!device.is_running());
        assert_eq!(device.params(), Some(params()));
    }
}
