// src/audio/pump.rs

//! Buffer circulation between the output device and the refill context.
//!
//! Buffers are owned values that move through channels: the device holds the
//! one it is playing, hands it back with [`RefillMessage::Consumed`] once
//! drained, and the refill side fills it and resubmits it. A buffer is never
//! reachable from both sides at once.

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::error::PlatformError;

/// Unsigned 8-bit PCM midpoint.
pub const SILENCE: u8 = 128;

/// Number of buffers alternating between device and refill context.
pub const BUFFER_COUNT: usize = 2;

/// Messages into the refill loop.
#[derive(Debug)]
pub enum RefillMessage {
    /// The device finished playing this buffer.
    Consumed(Vec<u8>),
    Stop,
}

/// Fills a freed buffer: the user callback, or silence without one.
pub struct Filler {
    fill: Option<Box<dyn FnMut(&mut [u8]) + Send>>,
}

impl std::fmt::Debug for Filler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filler")
            .field("has_callback", &self.fill.is_some())
            .finish()
    }
}

impl Filler {
    pub fn silence() -> Self {
        Self { fill: None }
    }

    /// Bind a plain callback to the state it is handed on every call.
    pub fn from_callback<T: Send + 'static>(callback: Option<fn(&mut T, &mut [u8])>, mut userdata: T) -> Self {
        match callback {
            Some(callback) => Self {
                fill: Some(Box::new(move |buf: &mut [u8]| callback(&mut userdata, buf))),
            },
            None => Self::silence(),
        }
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        match &mut self.fill {
            Some(fill) => fill(buf),
            None => buf.fill(SILENCE),
        }
    }
}

/// How a refilled buffer reaches the device.
pub enum Pump {
    /// A dedicated thread refills; buffers arrive on `submitted`.
    Threaded {
        submitted: Receiver<Vec<u8>>,
        consumed: Sender<RefillMessage>,
    },
    /// The device's own callback refills inline (host-scheduled audio).
    Inline {
        filler: Filler,
        ready: VecDeque<Vec<u8>>,
    },
}

/// The device-facing end of the pipeline.
///
/// Each output callback calls [`DevicePort::pull`] for exactly the bytes it
/// needs. Buffer boundaries are invisible to the device.
pub struct DevicePort {
    pump: Pump,
    playing: Option<Vec<u8>>,
    offset: usize,
    underruns: u64,
}

impl std::fmt::Debug for DevicePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicePort")
            .field("offset", &self.offset)
            .field("underruns", &self.underruns)
            .finish()
    }
}

impl DevicePort {
    fn new(pump: Pump) -> Self {
        Self {
            pump,
            playing: None,
            offset: 0,
            underruns: 0,
        }
    }

    /// Copy the next `out.len()` bytes of PCM into `out`.
    ///
    /// If no refilled buffer is ready the rest of `out` is silence.
    pub fn pull(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            let exhausted = self
                .playing
                .as_ref()
                .map_or(true, |buf| self.offset >= buf.len());
            if exhausted && !self.advance() {
                out[written..].fill(SILENCE);
                return;
            }
            let Some(buf) = self.playing.as_ref() else {
                out[written..].fill(SILENCE);
                return;
            };
            let n = (buf.len() - self.offset).min(out.len() - written);
            out[written..written + n].copy_from_slice(&buf[self.offset..self.offset + n]);
            self.offset += n;
            written += n;
        }
    }

    /// Return the drained buffer and take the next one. False on underrun.
    fn advance(&mut self) -> bool {
        let drained = self.playing.take();
        self.offset = 0;
        match &mut self.pump {
            Pump::Threaded { submitted, consumed } => {
                if let Some(buf) = drained {
                    // The refill side may already be gone during close.
                    let _ = consumed.send(RefillMessage::Consumed(buf));
                }
                match submitted.try_recv() {
                    Ok(next) => {
                        self.playing = Some(next);
                        true
                    }
                    Err(TryRecvError::Empty) => {
                        self.underruns += 1;
                        if self.underruns == 1 {
                            warn!("Audio underrun: refill did not keep up, playing silence");
                        } else {
                            debug!("Audio underrun #{}", self.underruns);
                        }
                        false
                    }
                    Err(TryRecvError::Disconnected) => false,
                }
            }
            Pump::Inline { filler, ready } => {
                if let Some(mut buf) = drained {
                    filler.fill(&mut buf);
                    ready.push_back(buf);
                }
                self.playing = ready.pop_front();
                self.playing.is_some()
            }
        }
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}

/// Owner of a running refill thread.
#[derive(Debug)]
pub struct RefillThread {
    control: Sender<RefillMessage>,
    handle: Option<JoinHandle<()>>,
}

impl RefillThread {
    /// Ask the loop to finish and wait until it has.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.control.send(RefillMessage::Stop);
        if handle.join().is_err() {
            warn!("Audio refill thread panicked");
        }
        info!("Audio refill thread joined");
    }
}

impl Drop for RefillThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn primed_buffers(buffer_len: usize) -> impl Iterator<Item = Vec<u8>> {
    (0..BUFFER_COUNT).map(move |_| vec![SILENCE; buffer_len])
}

/// Start a refill thread and return it with the matching device port.
///
/// Both buffers are primed with silence and already submitted, so the device
/// plays silence until the first refill lands.
pub fn threaded(buffer_len: usize, mut filler: Filler) -> Result<(RefillThread, DevicePort), PlatformError> {
    let (submit_tx, submit_rx) = mpsc::channel::<Vec<u8>>();
    let (consumed_tx, consumed_rx) = mpsc::channel::<RefillMessage>();

    for buf in primed_buffers(buffer_len) {
        let _ = submit_tx.send(buf);
    }

    let handle = thread::Builder::new()
        .name("audio-refill".to_string())
        .spawn(move || {
            for message in consumed_rx {
                match message {
                    RefillMessage::Consumed(mut buf) => {
                        filler.fill(&mut buf);
                        if submit_tx.send(buf).is_err() {
                            break;
                        }
                    }
                    RefillMessage::Stop => break,
                }
            }
            debug!("Audio refill loop exiting");
        })
        .map_err(|e| PlatformError::AudioStream(format!("failed to spawn refill thread: {}", e)))?;

    let port = DevicePort::new(Pump::Threaded {
        submitted: submit_rx,
        consumed: consumed_tx.clone(),
    });
    Ok((
        RefillThread {
            control: consumed_tx,
            handle: Some(handle),
        },
        port,
    ))
}

/// A device port that refills inline from the device callback.
pub fn inline(buffer_len: usize, filler: Filler) -> DevicePort {
    DevicePort::new(Pump::Inline {
        filler,
        ready: primed_buffers(buffer_len).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use test_log::test;

    fn counter(n: &mut u8, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *n = n.wrapping_add(1);
            *b = *n;
        }
    }

    /// Pull until `want` bytes of non-silence arrive or a second passes.
    fn pull_until_filled(port: &mut DevicePort, chunk: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut out = vec![0u8; chunk];
        loop {
            port.pull(&mut out);
            if out.iter().any(|&b| b != SILENCE) || Instant::now() > deadline {
                return out;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn it_should_fill_silence_without_a_callback() {
        let mut filler = Filler::from_callback::<()>(None, ());
        let mut buf = [0u8; 16];
        filler.fill(&mut buf);
        assert!(buf.iter().all(|&b| b == SILENCE));
    }

    #[test]
    fn it_should_pass_the_same_userdata_to_every_call() {
        let mut filler = Filler::from_callback(Some(counter as fn(&mut u8, &mut [u8])), 0u8);
        let mut a = [0u8; 3];
        let mut b = [0u8; 3];
        filler.fill(&mut a);
        filler.fill(&mut b);
        assert_eq!(a, [1, 2, 3]);
        assert_eq!(b, [4, 5, 6]);
    }

    #[test]
    fn it_should_play_primed_silence_first() {
        let mut port = inline(4, Filler::from_callback(Some(counter as fn(&mut u8, &mut [u8])), 0u8));
        let mut out = [0u8; 8];
        port.pull(&mut out);
        assert_eq!(out, [SILENCE; 8]);

        // first buffer was refilled when drained
        port.pull(&mut out[..4]);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn it_should_alternate_two_buffers_inline() {
        let mut port = inline(2, Filler::from_callback(Some(counter as fn(&mut u8, &mut [u8])), 0u8));
        let mut out = [0u8; 10];
        port.pull(&mut out);
        assert_eq!(out, [SILENCE, SILENCE, SILENCE, SILENCE, 1, 2, 3, 4, 5, 6]);
        assert_eq!(port.underruns(), 0);
    }

    #[test]
    fn it_should_refill_on_the_refill_thread() {
        let (mut refill, mut port) =
            threaded(4, Filler::from_callback(Some(counter as fn(&mut u8, &mut [u8])), 0u8)).unwrap();

        let mut primed = [0u8; 8];
        port.pull(&mut primed);
        assert_eq!(primed, [SILENCE; 8]);

        let out = pull_until_filled(&mut port, 4);
        assert_eq!(out, [1, 2, 3, 4]);
        refill.stop();
    }

    fn slow(_: &mut (), buf: &mut [u8]) {
        std::thread::sleep(Duration::from_millis(200));
        buf.fill(7);
    }

    #[test]
    fn it_should_play_silence_on_underrun() {
        let (mut refill, mut port) = threaded(2, Filler::from_callback(Some(slow as fn(&mut (), &mut [u8])), ())).unwrap();

        let mut out = [0u8; 4];
        port.pull(&mut out);
        assert_eq!(out, [SILENCE; 4]);

        // both buffers are with the refill thread now
        let mut out = [0u8; 4];
        port.pull(&mut out);
        assert_eq!(out, [SILENCE; 4]);
        assert_eq!(port.underruns(), 1);
        refill.stop();
    }

    #[test]
    fn it_should_play_silence_after_the_refill_side_is_gone() {
        let (mut refill, mut port) = threaded(2, Filler::silence()).unwrap();
        refill.stop();

        let mut out = [0u8; 16];
        port.pull(&mut out);
        assert!(out.iter().all(|&b| b == SILENCE));
    }

    #[test]
    fn it_should_stop_and_join_idempotently() {
        let (mut refill, _port) = threaded(8, Filler::silence()).unwrap();
        refill.stop();
        refill.stop();
    }
}
