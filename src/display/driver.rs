// src/display/driver.rs
//! DisplayDriver trait - minimal interface for platform-specific display primitives.
//!
//! This trait defines the small set of native operations a backend must
//! provide. Everything shared (back buffer ownership, letterbox geometry,
//! fullscreen bookkeeping, event queueing) lives in [`Window`](super::Window)
//! and [`letterbox`](super::letterbox).
//!
//! ## Threading Model
//! - Drivers live on the main timeline and are never touched by audio.
//! - Nothing here blocks; `pump_events` drains what is pending and returns.
//!
//! ## Lifecycle
//! 1. `connect()` - Open the display connection / locate the host canvas.
//! 2. `create_window()` - Create and show the native window.
//! 3. `pump_events()` / `present()` per frame.
//! 4. `destroy_window()` - Tear the window down; the connection stays open
//!    and steps 2-4 may repeat.
//! 5. `Drop` - Destroy any remaining window, then close the connection.

use crate::config::DisplayConfig;
use crate::error::PlatformError;
use crate::event::EventQueue;
use crate::surface::Surface;

/// Parameters for the native window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub title: String,
    /// Logical width of the back buffer, also the initial client width.
    pub width: u32,
    pub height: u32,
}

/// Minimal platform-specific display driver interface.
pub trait DisplayDriver {
    /// Connect to the display. No window exists yet.
    ///
    /// On X11: `XOpenDisplay`. On Win32: register the window class.
    /// In the browser: find the canvas element.
    fn connect(config: &DisplayConfig) -> Result<Self, PlatformError>
    where
        Self: Sized;

    /// Create and show the one window this driver manages.
    ///
    /// On failure nothing is left half-built and the connection stays usable.
    fn create_window(&mut self, desc: &WindowDescriptor) -> Result<(), PlatformError>;

    /// Destroy the window if there is one. The connection stays open.
    fn destroy_window(&mut self);

    /// Translate every pending native event and push it into `queue`.
    ///
    /// Events that do not fit are dropped by the queue.
    fn pump_events(&mut self, queue: &mut EventQueue);

    /// Current client area in physical pixels.
    fn client_size(&self) -> (u32, u32);

    /// Show `surface` letterboxed into the client area.
    fn present(&mut self, surface: &Surface<'_>) -> Result<(), PlatformError>;

    /// Ask the host to enter or leave fullscreen. Best effort.
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlatformError>;

    fn show_cursor(&mut self, visible: bool);

    fn set_title(&mut self, title: &str);

    // Drop closes the connection - no explicit shutdown method needed
}
