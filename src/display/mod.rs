// src/display/mod.rs
//! Window presentation with one driver per backend.
//!
//! - DisplayDriver: Platform-specific primitives (X11, Win32, browser, headless)
//! - Window: Back buffer ownership and fullscreen bookkeeping
//! - Letterbox: Shared aspect-preserving presentation geometry

pub mod driver;
pub mod drivers;
pub mod letterbox;
pub mod window;

pub use driver::{DisplayDriver, WindowDescriptor};
pub use drivers::NativeDisplayDriver;
pub use letterbox::Letterbox;
pub use window::Window;
