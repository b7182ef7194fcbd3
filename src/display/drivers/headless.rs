//! Headless display driver implementation.
//!
//! No native window exists. The driver keeps a client size, turns injected
//! input into events the same way the native drivers do, and records what it
//! would have put on screen. A [`HeadlessHandle`] shares that state with the
//! caller so tests can drive and inspect a window they no longer own.

use crate::config::DisplayConfig;
use crate::display::driver::{DisplayDriver, WindowDescriptor};
use crate::display::letterbox::Letterbox;
use crate::error::PlatformError;
use crate::event::{EventQueue, PlatformEvent};
use crate::keys::{KeyCode, ModifierKey, ModifierTracker};
use crate::surface::{Rect, Surface};
use log::{info, trace};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A key as seen by the headless "keyboard".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessKey {
    Key(KeyCode),
    Modifier(ModifierKey),
}

/// Native-level input that can be injected into the headless driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessInput {
    CloseRequested,
    Exposed,
    KeyPress(HeadlessKey),
    KeyRelease(HeadlessKey),
    Resized { width: u32, height: u32 },
}

/// One presented client-area frame, tightly packed BGRA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedFrame {
    pub width: u32,
    pub height: u32,
    /// Where the back buffer landed inside the frame.
    pub dest: Rect,
    pub pixels: Vec<u8>,
}

impl PresentedFrame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[at..at + 4];
        Some([p[0], p[1], p[2], p[3]])
    }
}

#[derive(Debug)]
struct HeadlessState {
    configured_client: (u32, u32),
    client_width: u32,
    client_height: u32,
    window_created: bool,
    refuse_window: bool,
    title: Option<String>,
    cursor_visible: bool,
    refuse_fullscreen: bool,
    fullscreen_requests: Vec<bool>,
    pending: VecDeque<HeadlessInput>,
    frames_presented: u64,
    last_frame: Option<PresentedFrame>,
}

/// Shared view of a headless driver's state.
#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessHandle {
    pub fn inject(&self, input: HeadlessInput) {
        self.state.borrow_mut().pending.push_back(input);
    }

    pub fn press(&self, key: KeyCode) {
        self.inject(HeadlessInput::KeyPress(HeadlessKey::Key(key)));
    }

    pub fn release(&self, key: KeyCode) {
        self.inject(HeadlessInput::KeyRelease(HeadlessKey::Key(key)));
    }

    pub fn press_modifier(&self, key: ModifierKey) {
        self.inject(HeadlessInput::KeyPress(HeadlessKey::Modifier(key)));
    }

    pub fn release_modifier(&self, key: ModifierKey) {
        self.inject(HeadlessInput::KeyRelease(HeadlessKey::Modifier(key)));
    }

    /// Change the client area immediately, as a user resize would.
    pub fn set_client_size(&self, width: u32, height: u32) {
        self.inject(HeadlessInput::Resized { width, height });
        let mut state = self.state.borrow_mut();
        state.client_width = width;
        state.client_height = height;
    }

    /// Make the next window creations fail, as a native host might.
    pub fn refuse_window(&self, refuse: bool) {
        self.state.borrow_mut().refuse_window = refuse;
    }

    pub fn refuse_fullscreen(&self, refuse: bool) {
        self.state.borrow_mut().refuse_fullscreen = refuse;
    }

    pub fn fullscreen_requests(&self) -> Vec<bool> {
        self.state.borrow().fullscreen_requests.clone()
    }

    pub fn last_frame(&self) -> Option<PresentedFrame> {
        self.state.borrow().last_frame.clone()
    }

    pub fn frames_presented(&self) -> u64 {
        self.state.borrow().frames_presented
    }

    pub fn title(&self) -> Option<String> {
        self.state.borrow().title.clone()
    }

    pub fn cursor_visible(&self) -> bool {
        self.state.borrow().cursor_visible
    }

    pub fn window_created(&self) -> bool {
        self.state.borrow().window_created
    }

    /// True once the driver itself has been dropped.
    pub fn is_disconnected(&self) -> bool {
        Rc::strong_count(&self.state) == 1
    }
}

pub struct HeadlessDisplayDriver {
    state: Rc<RefCell<HeadlessState>>,
    modifiers: ModifierTracker,
    frame: Vec<u8>,
}

impl HeadlessDisplayDriver {
    /// A driver whose client area is fixed at `width x height` instead of
    /// following the window size.
    pub fn with_client_size(width: u32, height: u32) -> Self {
        info!("HeadlessDisplayDriver: Client area {}x{}", width, height);
        Self {
            state: Rc::new(RefCell::new(HeadlessState {
                configured_client: (width, height),
                client_width: width,
                client_height: height,
                window_created: false,
                refuse_window: false,
                title: None,
                cursor_visible: true,
                refuse_fullscreen: false,
                fullscreen_requests: Vec::new(),
                pending: VecDeque::new(),
                frames_presented: 0,
                last_frame: None,
            })),
            modifiers: ModifierTracker::new(),
            frame: Vec::new(),
        }
    }

    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            state: Rc::clone(&self.state),
        }
    }

    fn translate(&mut self, input: HeadlessInput) -> Option<PlatformEvent> {
        match input {
            HeadlessInput::CloseRequested => Some(PlatformEvent::Quit),
            HeadlessInput::Exposed => Some(PlatformEvent::WindowRefresh),
            HeadlessInput::Resized { .. } => None,
            HeadlessInput::KeyPress(HeadlessKey::Modifier(m)) => {
                self.modifiers.press(m);
                None
            }
            HeadlessInput::KeyRelease(HeadlessKey::Modifier(m)) => {
                self.modifiers.release(m);
                None
            }
            HeadlessInput::KeyPress(HeadlessKey::Key(key)) => Some(PlatformEvent::KeyDown {
                key,
                modifiers: self.modifiers.current(None),
            }),
            HeadlessInput::KeyRelease(HeadlessKey::Key(key)) => Some(PlatformEvent::KeyUp {
                key,
                modifiers: self.modifiers.current(None),
            }),
        }
    }
}

impl DisplayDriver for HeadlessDisplayDriver {
    fn connect(config: &DisplayConfig) -> Result<Self, PlatformError> {
        info!("HeadlessDisplayDriver::connect()");
        Ok(Self::with_client_size(
            config.headless_client_width,
            config.headless_client_height,
        ))
    }

    fn create_window(&mut self, desc: &WindowDescriptor) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if state.window_created {
            return Err(PlatformError::WindowCreation("headless window already exists".to_string()));
        }
        if state.refuse_window {
            return Err(PlatformError::WindowCreation("headless host refused".to_string()));
        }
        if state.client_width == 0 || state.client_height == 0 {
            state.client_width = desc.width;
            state.client_height = desc.height;
        }
        state.window_created = true;
        state.title = Some(desc.title.clone());
        info!(
            "HeadlessDisplayDriver: Window '{}' {}x{}, client {}x{}",
            desc.title, desc.width, desc.height, state.client_width, state.client_height
        );
        Ok(())
    }

    fn destroy_window(&mut self) {
        let mut state = self.state.borrow_mut();
        if !state.window_created {
            return;
        }
        info!("HeadlessDisplayDriver: Destroying window {:?}", state.title);
        state.window_created = false;
        state.title = None;
        state.pending.clear();
        let (width, height) = state.configured_client;
        state.client_width = width;
        state.client_height = height;
        self.modifiers.reset();
    }

    fn pump_events(&mut self, queue: &mut EventQueue) {
        loop {
            let Some(input) = self.state.borrow_mut().pending.pop_front() else {
                break;
            };
            if let HeadlessInput::Resized { width, height } = input {
                let mut state = self.state.borrow_mut();
                state.client_width = width;
                state.client_height = height;
            }
            if let Some(event) = self.translate(input) {
                queue.push(event);
            }
        }
    }

    fn client_size(&self) -> (u32, u32) {
        let state = self.state.borrow();
        (state.client_width, state.client_height)
    }

    fn present(&mut self, surface: &Surface<'_>) -> Result<(), PlatformError> {
        let (cw, ch) = self.client_size();
        let Some(letterbox) = Letterbox::fit(surface.width(), surface.height(), cw, ch) else {
            trace!("HeadlessDisplayDriver: Nothing to present into {}x{}", cw, ch);
            return Ok(());
        };
        letterbox.compose(surface, &mut self.frame);

        let mut state = self.state.borrow_mut();
        state.frames_presented += 1;
        state.last_frame = Some(PresentedFrame {
            width: cw,
            height: ch,
            dest: letterbox.dest,
            pixels: self.frame.clone(),
        });
        trace!("HeadlessDisplayDriver: Presented frame {}", state.frames_presented);
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        state.fullscreen_requests.push(fullscreen);
        if state.refuse_fullscreen {
            return Err(PlatformError::Fullscreen("headless host refused".to_string()));
        }
        Ok(())
    }

    fn show_cursor(&mut self, visible: bool) {
        self.state.borrow_mut().cursor_visible = visible;
    }

    fn set_title(&mut self, title: &str) {
        info!("HeadlessDisplayDriver: SetTitle '{}'", title);
        self.state.borrow_mut().title = Some(title.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Modifiers;
    use test_log::test;

    fn created(client: (u32, u32)) -> (HeadlessDisplayDriver, HeadlessHandle) {
        let mut driver = HeadlessDisplayDriver::with_client_size(client.0, client.1);
        driver
            .create_window(&WindowDescriptor {
                title: "t".to_string(),
                width: 16,
                height: 8,
            })
            .unwrap();
        let handle = driver.handle();
        (driver, handle)
    }

    #[test]
    fn it_should_default_the_client_area_to_the_window_size() {
        let (driver, _) = created((0, 0));
        assert_eq!(driver.client_size(), (16, 8));
        let (driver, _) = created((40, 10));
        assert_eq!(driver.client_size(), (40, 10));
    }

    #[test]
    fn it_should_normalize_injected_input() {
        let (mut driver, handle) = created((0, 0));
        handle.inject(HeadlessInput::Exposed);
        handle.press_modifier(ModifierKey::LeftAlt);
        handle.press(KeyCode::Return);
        handle.release_modifier(ModifierKey::LeftAlt);
        handle.release(KeyCode::Return);
        handle.inject(HeadlessInput::CloseRequested);

        let mut queue = EventQueue::new();
        driver.pump_events(&mut queue);
        let events: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(
            events,
            vec![
                PlatformEvent::WindowRefresh,
                PlatformEvent::KeyDown {
                    key: KeyCode::Return,
                    modifiers: Modifiers::LALT
                },
                PlatformEvent::KeyUp {
                    key: KeyCode::Return,
                    modifiers: Modifiers::empty()
                },
                PlatformEvent::Quit,
            ]
        );
    }

    #[test]
    fn it_should_track_resizes_through_the_event_stream() {
        let (mut driver, handle) = created((0, 0));
        handle.inject(HeadlessInput::Resized { width: 3, height: 2 });
        assert_eq!(driver.client_size(), (16, 8));
        driver.pump_events(&mut EventQueue::new());
        assert_eq!(driver.client_size(), (3, 2));
    }

    #[test]
    fn it_should_record_a_letterboxed_frame() {
        let (mut driver, handle) = created((32, 8));
        let surface = Surface::new(16, 8);
        driver.present(&surface).unwrap();

        let frame = handle.last_frame().unwrap();
        assert_eq!(frame.dest, Rect::new(8, 0, 16, 8));
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(frame.pixel(8, 0), Some([0, 0, 0, 0]));
        assert_eq!(handle.frames_presented(), 1);
    }

    #[test]
    fn it_should_skip_presentation_into_an_empty_client() {
        let (mut driver, handle) = created((0, 0));
        handle.set_client_size(0, 0);
        driver.present(&Surface::new(16, 8)).unwrap();
        assert_eq!(handle.frames_presented(), 0);
    }

    #[test]
    fn it_should_take_the_client_area_from_the_display_config() {
        let config = DisplayConfig {
            headless_client_width: 100,
            headless_client_height: 50,
            ..DisplayConfig::default()
        };
        let mut driver = HeadlessDisplayDriver::connect(&config).unwrap();
        driver
            .create_window(&WindowDescriptor {
                title: "t".to_string(),
                width: 10,
                height: 10,
            })
            .unwrap();
        assert_eq!(driver.client_size(), (100, 50));
    }

    #[test]
    fn it_should_create_a_new_window_after_destroying_the_old_one() {
        let (mut driver, handle) = created((0, 0));
        handle.press_modifier(ModifierKey::LeftShift);
        handle.press(KeyCode::Space);
        driver.destroy_window();
        assert!(!handle.window_created());
        assert!(!handle.is_disconnected());

        driver
            .create_window(&WindowDescriptor {
                title: "again".to_string(),
                width: 4,
                height: 2,
            })
            .unwrap();
        assert_eq!(driver.client_size(), (4, 2));
        assert_eq!(handle.title().as_deref(), Some("again"));

        // input aimed at the old window is gone
        let mut queue = EventQueue::new();
        driver.pump_events(&mut queue);
        assert!(queue.is_empty());
    }

    #[test]
    fn it_should_refuse_a_second_window_and_honour_refusal() {
        let (mut driver, handle) = created((0, 0));
        let desc = WindowDescriptor {
            title: "t".to_string(),
            width: 4,
            height: 4,
        };
        assert!(driver.create_window(&desc).is_err());

        driver.destroy_window();
        handle.refuse_window(true);
        assert!(matches!(driver.create_window(&desc), Err(PlatformError::WindowCreation(_))));
        assert!(!handle.window_created());
    }

    #[test]
    fn it_should_report_disconnection_after_drop() {
        let (driver, handle) = created((0, 0));
        assert!(!handle.is_disconnected());
        drop(driver);
        assert!(handle.is_disconnected());
    }
}
