// src/display/window.rs
//! Window - owns the back buffer and the driver that presents it.

use crate::display::driver::{DisplayDriver, WindowDescriptor};
use crate::error::PlatformError;
use crate::event::EventQueue;
use crate::surface::Surface;
use log::{debug, info, trace};

/// The single application window.
///
/// Drawing goes into [`Window::surface_mut`]; [`Window::update`] presents it.
/// The window borrows the display driver for its lifetime;
/// [`Window::into_driver`] tears the native window down and hands the still
/// open connection back.
pub struct Window {
    driver: Box<dyn DisplayDriver>,
    surface: Surface<'static>,
    fullscreen: bool,
    title: String,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("title", &self.title)
            .field("width", &self.surface.width())
            .field("height", &self.surface.height())
            .field("fullscreen", &self.fullscreen)
            .finish()
    }
}

impl Window {
    /// Create the native window on `driver` with a zero-filled back buffer.
    ///
    /// A failed fullscreen request at creation is tolerated like any other
    /// toggle; the window is still returned. On error the driver is dropped;
    /// [`Platform`](crate::Platform) keeps its connection across failures.
    pub fn new(
        mut driver: Box<dyn DisplayDriver>,
        title: &str,
        width: u32,
        height: u32,
        fullscreen: bool,
    ) -> Result<Self, PlatformError> {
        Self::check_size(width, height)?;
        driver.create_window(&Self::descriptor(title, width, height))?;
        Ok(Self::attach(driver, title, width, height, fullscreen))
    }

    pub(crate) fn descriptor(title: &str, width: u32, height: u32) -> WindowDescriptor {
        WindowDescriptor {
            title: title.to_string(),
            width,
            height,
        }
    }

    /// Wrap a driver whose native window already exists.
    pub(crate) fn attach(driver: Box<dyn DisplayDriver>, title: &str, width: u32, height: u32, fullscreen: bool) -> Self {
        info!("Window: Created '{}' {}x{}", title, width, height);

        let mut window = Self {
            driver,
            surface: Surface::new(width, height),
            fullscreen: false,
            title: title.to_string(),
        };
        if fullscreen {
            window.toggle_fullscreen();
        }
        window
    }

    /// Destroy the native window and return the driver, still connected.
    pub fn into_driver(mut self) -> Box<dyn DisplayDriver> {
        info!("Window: Destroying '{}'", self.title);
        self.driver.destroy_window();
        self.driver
    }

    pub(crate) fn check_size(width: u32, height: u32) -> Result<(), PlatformError> {
        if width == 0 || height == 0 {
            return Err(PlatformError::WindowCreation(format!(
                "window size {}x{} has no area",
                width, height
            )));
        }
        Ok(())
    }

    pub fn surface(&self) -> &Surface<'static> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface<'static> {
        &mut self.surface
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn client_size(&self) -> (u32, u32) {
        self.driver.client_size()
    }

    /// Present the back buffer.
    pub fn update(&mut self) -> Result<(), PlatformError> {
        trace!("Window: Presenting frame");
        self.driver.present(&self.surface)
    }

    /// Flip between windowed and fullscreen.
    ///
    /// The flag always flips. If the host refuses, the refusal is logged and
    /// otherwise ignored.
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        if let Err(e) = self.driver.set_fullscreen(self.fullscreen) {
            debug!("Window: Fullscreen request ignored: {}", e);
        }
    }

    pub fn show_cursor(&mut self, visible: bool) {
        self.driver.show_cursor(visible);
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.driver.set_title(title);
    }

    /// Drain native events into `queue`.
    pub fn pump_events(&mut self, queue: &mut EventQueue) {
        self.driver.pump_events(queue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blit::fill_rect;
    use crate::config::DisplayConfig;
    use crate::display::drivers::headless::HeadlessDisplayDriver;
    use test_log::test;

    fn window_with(width: u32, height: u32) -> (Window, crate::display::drivers::headless::HeadlessHandle) {
        let driver = HeadlessDisplayDriver::connect(&DisplayConfig::default()).unwrap();
        let handle = driver.handle();
        let window = Window::new(Box::new(driver), "test", width, height, false).unwrap();
        (window, handle)
    }

    #[test]
    fn it_should_create_a_zero_filled_back_buffer() {
        let (window, handle) = window_with(64, 48);
        assert_eq!(window.surface().width(), 64);
        assert_eq!(window.surface().height(), 48);
        assert!(window.surface().owns_buffer());
        assert!(window.surface().pixels().iter().all(|&b| b == 0));
        assert_eq!(handle.title().as_deref(), Some("test"));
    }

    #[test]
    fn it_should_reject_a_window_without_area() {
        let driver = HeadlessDisplayDriver::connect(&DisplayConfig::default()).unwrap();
        let err = Window::new(Box::new(driver), "t", 0, 10, false).unwrap_err();
        assert!(matches!(err, PlatformError::WindowCreation(_)));
    }

    #[test]
    fn it_should_present_the_back_buffer() {
        let (mut window, handle) = window_with(4, 4);
        fill_rect(window.surface_mut(), None, 1, 2, 3, 4);
        window.update().unwrap();

        let frame = handle.last_frame().unwrap();
        assert_eq!((frame.width, frame.height), (4, 4));
        assert!(frame.pixels.chunks_exact(4).all(|p| p == [3, 2, 1, 4]));
    }

    #[test]
    fn it_should_flip_fullscreen_even_when_the_host_refuses() {
        let (mut window, handle) = window_with(4, 4);
        handle.refuse_fullscreen(true);
        window.toggle_fullscreen();
        assert!(window.is_fullscreen());
        window.toggle_fullscreen();
        assert!(!window.is_fullscreen());
        assert_eq!(handle.fullscreen_requests(), vec![true, false]);
    }

    #[test]
    fn it_should_enter_fullscreen_at_creation_when_asked() {
        let driver = HeadlessDisplayDriver::connect(&DisplayConfig::default()).unwrap();
        let handle = driver.handle();
        let window = Window::new(Box::new(driver), "t", 8, 8, true).unwrap();
        assert!(window.is_fullscreen());
        assert_eq!(handle.fullscreen_requests(), vec![true]);
    }

    #[test]
    fn it_should_hand_back_a_connected_driver() {
        let (window, handle) = window_with(4, 4);
        let mut driver = window.into_driver();
        assert!(!handle.window_created());
        assert!(!handle.is_disconnected());

        driver.create_window(&Window::descriptor("next", 2, 2)).unwrap();
        assert!(handle.window_created());
    }

    #[test]
    fn it_should_forward_title_and_cursor_changes() {
        let (mut window, handle) = window_with(4, 4);
        window.set_title("renamed");
        window.show_cursor(false);
        assert_eq!(window.title(), "renamed");
        assert_eq!(handle.title().as_deref(), Some("renamed"));
        assert!(!handle.cursor_visible());
    }
}
