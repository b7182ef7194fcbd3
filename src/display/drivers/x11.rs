//! X11 DisplayDriver implementation using Xlib.
//!
//! - One top-level window created with `XCreateSimpleWindow`
//! - `WM_DELETE_WINDOW` becomes `Quit`, the last `Expose` of a batch becomes
//!   `WindowRefresh`, key presses/releases are normalized through `keys`
//! - Frames are uploaded with `XPutImage`, letterboxed when the client
//!   area differs from the back buffer
//! - Fullscreen goes through the EWMH `_NET_WM_STATE` protocol

use crate::config::DisplayConfig;
use crate::display::driver::{DisplayDriver, WindowDescriptor};
use crate::display::letterbox::Letterbox;
use crate::error::PlatformError;
use crate::event::{EventQueue, PlatformEvent};
use crate::keys::{KeyCode, ModifierKey, ModifierTracker};
use crate::surface::Surface;
use log::{debug, info, trace, warn};
use std::ffi::CString;
use std::mem;
use std::os::raw::{c_char, c_int, c_long};
use std::ptr;
use x11::xlib::*;

// EWMH _NET_WM_STATE actions
const NET_WM_STATE_REMOVE: c_long = 0;
const NET_WM_STATE_ADD: c_long = 1;

pub struct X11DisplayDriver {
    display: *mut Display,
    screen: c_int,
    window: Window,
    gc: GC,
    visual: *mut Visual,
    depth: c_int,
    wm_delete_window: Atom,
    width_px: u32,
    height_px: u32,
    modifiers: ModifierTracker,
    frame: Vec<u8>,
}

impl X11DisplayDriver {
    fn intern_atom(&self, name: &[u8]) -> Atom {
        // SAFETY: `name` is a NUL-terminated literal and display is open.
        unsafe { XInternAtom(self.display, name.as_ptr() as *const c_char, False) }
    }

    fn require_window(&self) -> Result<(), PlatformError> {
        if self.window == 0 {
            return Err(PlatformError::NoWindow);
        }
        Ok(())
    }

    fn convert_event(&mut self, event: &mut XEvent) -> Option<PlatformEvent> {
        // SAFETY: each union field is read only after matching its type tag.
        unsafe {
            match event.get_type() {
                ClientMessage => {
                    let message = event.client_message;
                    if message.data.get_long(0) as Atom == self.wm_delete_window {
                        Some(PlatformEvent::Quit)
                    } else {
                        None
                    }
                }
                Expose => {
                    // Only the last of a run of exposes asks for a repaint.
                    if event.expose.count == 0 {
                        Some(PlatformEvent::WindowRefresh)
                    } else {
                        None
                    }
                }
                ConfigureNotify => {
                    let configure = event.configure;
                    self.width_px = configure.width.max(0) as u32;
                    self.height_px = configure.height.max(0) as u32;
                    trace!("X11DisplayDriver: Client area now {}x{}", self.width_px, self.height_px);
                    None
                }
                FocusOut => {
                    self.modifiers.reset();
                    None
                }
                KeyPress | KeyRelease => {
                    let pressed = event.get_type() == KeyPress;
                    let state = event.key.state;
                    let keysym = XLookupKeysym(&mut event.key, 0) as u64;

                    if let Some(modifier) = ModifierKey::from_keysym(keysym) {
                        if pressed {
                            self.modifiers.press(modifier);
                        } else {
                            self.modifiers.release(modifier);
                        }
                        return None;
                    }

                    let key = KeyCode::from_keysym(keysym);
                    let modifiers = self.modifiers.current(Some(state & Mod1Mask != 0));
                    Some(if pressed {
                        PlatformEvent::KeyDown { key, modifiers }
                    } else {
                        PlatformEvent::KeyUp { key, modifiers }
                    })
                }
                _ => None,
            }
        }
    }

    fn put_image(&self, data: *const u8, width: u32, height: u32, pitch: usize, dest_x: i32, dest_y: i32) -> Result<(), PlatformError> {
        // SAFETY: `data` covers `height` rows of `pitch` bytes and outlives
        // the XImage, whose data pointer is cleared before it is destroyed.
        unsafe {
            let image = XCreateImage(
                self.display,
                self.visual,
                self.depth as u32,
                ZPixmap,
                0,
                data as *mut c_char,
                width,
                height,
                32,
                pitch as c_int,
            );
            if image.is_null() {
                return Err(PlatformError::Presentation("Failed to create XImage".to_string()));
            }

            XPutImage(self.display, self.window, self.gc, image, 0, 0, dest_x, dest_y, width, height);

            (*image).data = ptr::null_mut();
            XDestroyImage(image);
        }
        Ok(())
    }
}

impl DisplayDriver for X11DisplayDriver {
    fn connect(_config: &DisplayConfig) -> Result<Self, PlatformError> {
        info!("X11DisplayDriver::connect() - Opening X11 display");

        // SAFETY: plain Xlib queries on a freshly opened connection.
        unsafe {
            let display = XOpenDisplay(ptr::null());
            if display.is_null() {
                return Err(PlatformError::DisplayUnavailable(
                    "Failed to open X11 display. Is DISPLAY set?".to_string(),
                ));
            }

            let screen = XDefaultScreen(display);
            Ok(Self {
                display,
                screen,
                window: 0,
                gc: ptr::null_mut(),
                visual: XDefaultVisual(display, screen),
                depth: XDefaultDepth(display, screen),
                wm_delete_window: 0,
                width_px: 0,
                height_px: 0,
                modifiers: ModifierTracker::new(),
                frame: Vec::new(),
            })
        }
    }

    fn create_window(&mut self, desc: &WindowDescriptor) -> Result<(), PlatformError> {
        if self.window != 0 {
            return Err(PlatformError::WindowCreation("X11 window already exists".to_string()));
        }
        let title = CString::new(desc.title.as_str())
            .map_err(|e| PlatformError::WindowCreation(format!("invalid title: {}", e)))?;

        // SAFETY: display is open; every handle created here is owned by
        // self and released in destroy_window.
        unsafe {
            let root = XRootWindow(self.display, self.screen);
            let window = XCreateSimpleWindow(
                self.display,
                root,
                0,
                0,
                desc.width,
                desc.height,
                0,
                XBlackPixel(self.display, self.screen),
                XBlackPixel(self.display, self.screen),
            );
            if window == 0 {
                return Err(PlatformError::WindowCreation("XCreateSimpleWindow failed".to_string()));
            }
            self.window = window;

            XStoreName(self.display, window, title.as_ptr());
            XSelectInput(
                self.display,
                window,
                ExposureMask | KeyPressMask | KeyReleaseMask | StructureNotifyMask | FocusChangeMask,
            );

            self.wm_delete_window = self.intern_atom(b"WM_DELETE_WINDOW\0");
            let mut protocols = [self.wm_delete_window];
            XSetWMProtocols(self.display, window, protocols.as_mut_ptr(), 1);

            self.gc = XCreateGC(self.display, window, 0, ptr::null_mut());
            if self.gc.is_null() {
                self.destroy_window();
                return Err(PlatformError::WindowCreation("XCreateGC failed".to_string()));
            }

            XMapWindow(self.display, window);
            XFlush(self.display);
        }

        self.width_px = desc.width;
        self.height_px = desc.height;
        info!("X11DisplayDriver: Created window {}x{}", desc.width, desc.height);
        Ok(())
    }

    fn destroy_window(&mut self) {
        if self.window == 0 {
            return;
        }
        info!("X11DisplayDriver: Destroying window");
        // SAFETY: gc and window were created on this display and are
        // released exactly once before being reset.
        unsafe {
            if !self.gc.is_null() {
                XFreeGC(self.display, self.gc);
            }
            XDestroyWindow(self.display, self.window);
            // discard events still queued for the old window
            XSync(self.display, True);
        }
        self.gc = ptr::null_mut();
        self.window = 0;
        self.width_px = 0;
        self.height_px = 0;
        self.modifiers.reset();
    }

    fn pump_events(&mut self, queue: &mut EventQueue) {
        if self.window == 0 {
            return;
        }
        // SAFETY: XNextEvent fully initializes the zeroed event.
        unsafe {
            while XPending(self.display) > 0 {
                let mut event: XEvent = mem::zeroed();
                XNextEvent(self.display, &mut event);
                if let Some(platform_event) = self.convert_event(&mut event) {
                    queue.push(platform_event);
                }
            }
        }
    }

    fn client_size(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    fn present(&mut self, surface: &Surface<'_>) -> Result<(), PlatformError> {
        self.require_window()?;
        let Some(letterbox) = Letterbox::fit(surface.width(), surface.height(), self.width_px, self.height_px) else {
            return Ok(());
        };

        if letterbox.is_identity(surface.width(), surface.height()) {
            self.put_image(surface.pixels().as_ptr(), surface.width(), surface.height(), surface.pitch(), 0, 0)?;
        } else {
            let mut frame = mem::take(&mut self.frame);
            letterbox.compose(surface, &mut frame);
            let result = self.put_image(frame.as_ptr(), self.width_px, self.height_px, self.width_px as usize * 4, 0, 0);
            self.frame = frame;
            result?;
        }

        // SAFETY: display is open.
        unsafe {
            XFlush(self.display);
        }
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlatformError> {
        self.require_window()?;
        let wm_state = self.intern_atom(b"_NET_WM_STATE\0");
        let wm_fullscreen = self.intern_atom(b"_NET_WM_STATE_FULLSCREEN\0");
        if wm_state == 0 || wm_fullscreen == 0 {
            return Err(PlatformError::Fullscreen("window manager lacks _NET_WM_STATE".to_string()));
        }

        // SAFETY: the message is fully built in a zeroed XEvent before sending.
        let status = unsafe {
            let mut message: XClientMessageEvent = mem::zeroed();
            message.type_ = ClientMessage;
            message.window = self.window;
            message.message_type = wm_state;
            message.format = 32;
            message.data.set_long(0, if fullscreen { NET_WM_STATE_ADD } else { NET_WM_STATE_REMOVE });
            message.data.set_long(1, wm_fullscreen as c_long);
            message.data.set_long(2, 0);
            message.data.set_long(3, 1);

            let mut event: XEvent = mem::zeroed();
            event.client_message = message;
            let status = XSendEvent(
                self.display,
                XRootWindow(self.display, self.screen),
                False,
                SubstructureRedirectMask | SubstructureNotifyMask,
                &mut event,
            );
            XFlush(self.display);
            status
        };

        if status == 0 {
            return Err(PlatformError::Fullscreen("XSendEvent failed".to_string()));
        }
        debug!("X11DisplayDriver: Requested fullscreen={}", fullscreen);
        Ok(())
    }

    fn show_cursor(&mut self, visible: bool) {
        if self.window == 0 {
            return;
        }
        // SAFETY: Xlib calls on our own window; created resources are freed
        // once the server holds its copy.
        unsafe {
            if visible {
                XUndefineCursor(self.display, self.window);
            } else {
                let mut color: XColor = mem::zeroed();
                let pixmap = XCreatePixmap(self.display, self.window, 1, 1, 1);
                if pixmap == 0 {
                    warn!("Failed to create 1x1 pixmap for invisible cursor.");
                    return;
                }
                let cursor = XCreatePixmapCursor(self.display, pixmap, pixmap, &mut color, &mut color, 0, 0);
                if cursor != 0 {
                    XDefineCursor(self.display, self.window, cursor);
                    XFreeCursor(self.display, cursor);
                } else {
                    warn!("Failed to create invisible pixmap cursor.");
                }
                XFreePixmap(self.display, pixmap);
            }
            XFlush(self.display);
        }
    }

    fn set_title(&mut self, title: &str) {
        if self.window == 0 {
            return;
        }
        let Ok(c_title) = CString::new(title) else {
            warn!("X11DisplayDriver: Title contains NUL, ignoring");
            return;
        };
        // SAFETY: window is live and c_title is NUL-terminated.
        unsafe {
            XStoreName(self.display, self.window, c_title.as_ptr());
            XFlush(self.display);
        }
    }
}

impl Drop for X11DisplayDriver {
    fn drop(&mut self) {
        info!("X11DisplayDriver::drop() - Cleaning up");
        self.destroy_window();
        if !self.display.is_null() {
            // SAFETY: the window is gone; nothing else uses the connection.
            unsafe {
                XCloseDisplay(self.display);
            }
        }
    }
}
