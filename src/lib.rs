// src/lib.rs

//! Pixel surfaces, window presentation, input normalization, a monotonic
//! clock and pull-based 8-bit audio behind one contract for X11, Win32, the
//! browser and a headless backend.

pub mod audio;
pub mod blit;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod keys;
pub mod logging;
pub mod platform;
pub mod surface;

pub use audio::{AudioFormat, AudioOutput, AudioSpec, RefillMode, Wav};
pub use blit::{blit, fill_rect};
pub use clock::Clock;
pub use config::{PlatformConfig, CONFIG};
pub use display::Window;
pub use error::PlatformError;
pub use event::{EventQueue, PlatformEvent, EVENT_QUEUE_CAPACITY};
pub use keys::{KeyCode, Modifiers};
pub use platform::Platform;
pub use surface::{Rect, Surface};
