// src/display/drivers/mod.rs
//! Platform-specific display driver implementations.
//!
//! `build.rs` picks exactly one native driver; the headless driver is always
//! available for tests and display-less hosts.

pub mod headless;

#[cfg(use_x11_display)]
pub mod x11;

#[cfg(use_win32_display)]
pub mod win32;

#[cfg(use_web_display)]
pub mod web;

pub use headless::{HeadlessDisplayDriver, HeadlessHandle, HeadlessInput, HeadlessKey, PresentedFrame};

#[cfg(use_x11_display)]
pub type NativeDisplayDriver = x11::X11DisplayDriver;

#[cfg(use_win32_display)]
pub type NativeDisplayDriver = win32::Win32DisplayDriver;

#[cfg(use_web_display)]
pub type NativeDisplayDriver = web::WebDisplayDriver;

#[cfg(use_headless_display)]
pub type NativeDisplayDriver = headless::HeadlessDisplayDriver;
