//! Browser DisplayDriver implementation on a 2D canvas.
//!
//! - The canvas is looked up by the configured element id
//! - `keydown`/`keyup` listeners on the window translate into a staging
//!   queue that `pump_events` drains
//! - Frames are swizzled from BGRA to RGBA, letterboxed into the canvas
//!   backing store, and uploaded with `putImageData`
//! - Fullscreen uses the Fullscreen API; the browser may refuse it outside a
//!   user gesture

use crate::config::DisplayConfig;
use crate::display::driver::{DisplayDriver, WindowDescriptor};
use crate::display::letterbox::Letterbox;
use crate::error::PlatformError;
use crate::event::{EventQueue, PlatformEvent};
use crate::keys::{KeyCode, ModifierKey, ModifierTracker};
use crate::surface::Surface;
use log::{info, trace, warn};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, ImageData, KeyboardEvent};

type KeyListener = Closure<dyn FnMut(KeyboardEvent)>;

#[derive(Default)]
struct WebInput {
    staging: EventQueue,
    modifiers: ModifierTracker,
}

impl WebInput {
    fn on_key(&mut self, event: &KeyboardEvent, pressed: bool) {
        if let Some(modifier) = ModifierKey::from_dom_code(&event.code()) {
            if pressed {
                self.modifiers.press(modifier);
            } else {
                self.modifiers.release(modifier);
            }
            return;
        }

        let key = KeyCode::from_dom_key(&event.key());
        if key != KeyCode::Unknown {
            // Keep Space from scrolling and Return from submitting.
            event.prevent_default();
        }
        let modifiers = self.modifiers.current(Some(event.alt_key()));
        self.staging.push(if pressed {
            PlatformEvent::KeyDown { key, modifiers }
        } else {
            PlatformEvent::KeyUp { key, modifiers }
        });
    }
}

pub struct WebDisplayDriver {
    document: Document,
    canvas: HtmlCanvasElement,
    context: Option<CanvasRenderingContext2d>,
    input: Rc<RefCell<WebInput>>,
    listeners: Vec<(&'static str, KeyListener)>,
    rgba: Vec<u8>,
}

fn js_error(context: &str, value: wasm_bindgen::JsValue) -> String {
    format!("{}: {:?}", context, value)
}

impl WebDisplayDriver {
    fn listen(&mut self, kind: &'static str, pressed: bool) -> Result<(), PlatformError> {
        let input = Rc::clone(&self.input);
        let listener: KeyListener = Closure::new(move |event: KeyboardEvent| {
            input.borrow_mut().on_key(&event, pressed);
        });
        let window = web_sys::window()
            .ok_or_else(|| PlatformError::WindowCreation("no global window".to_string()))?;
        window
            .add_event_listener_with_callback(kind, listener.as_ref().unchecked_ref())
            .map_err(|e| PlatformError::WindowCreation(js_error("addEventListener", e)))?;
        self.listeners.push((kind, listener));
        Ok(())
    }

    fn context(&self) -> Result<&CanvasRenderingContext2d, PlatformError> {
        self.context.as_ref().ok_or(PlatformError::NoWindow)
    }

    fn attach(&mut self, desc: &WindowDescriptor) -> Result<(), PlatformError> {
        self.canvas.set_width(desc.width);
        self.canvas.set_height(desc.height);
        self.document.set_title(&desc.title);

        let context = self
            .canvas
            .get_context("2d")
            .map_err(|e| PlatformError::WindowCreation(js_error("getContext", e)))?
            .ok_or_else(|| PlatformError::WindowCreation("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| PlatformError::WindowCreation("not a 2d context".to_string()))?;
        self.context = Some(context);

        self.listen("keydown", true)?;
        self.listen("keyup", false)
    }

    fn remove_listeners(&mut self) {
        let Some(window) = web_sys::window() else {
            self.listeners.clear();
            return;
        };
        for (kind, listener) in self.listeners.drain(..) {
            let _ = window.remove_event_listener_with_callback(kind, listener.as_ref().unchecked_ref());
        }
    }
}

impl DisplayDriver for WebDisplayDriver {
    fn connect(config: &DisplayConfig) -> Result<Self, PlatformError> {
        let canvas_id = &config.canvas_id;
        info!("WebDisplayDriver::connect() - Looking up canvas #{}", canvas_id);

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| PlatformError::DisplayUnavailable("no document".to_string()))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| PlatformError::DisplayUnavailable(format!("no element #{}", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| PlatformError::DisplayUnavailable(format!("#{} is not a canvas", canvas_id)))?;

        Ok(Self {
            document,
            canvas,
            context: None,
            input: Rc::new(RefCell::new(WebInput::default())),
            listeners: Vec::new(),
            rgba: Vec::new(),
        })
    }

    fn create_window(&mut self, desc: &WindowDescriptor) -> Result<(), PlatformError> {
        if self.context.is_some() {
            return Err(PlatformError::WindowCreation("canvas already in use".to_string()));
        }
        if let Err(e) = self.attach(desc) {
            self.destroy_window();
            return Err(e);
        }
        info!("WebDisplayDriver: Canvas ready {}x{}", desc.width, desc.height);
        Ok(())
    }

    fn destroy_window(&mut self) {
        self.remove_listeners();
        if self.context.take().is_some() {
            info!("WebDisplayDriver: Canvas released");
        }
        *self.input.borrow_mut() = WebInput::default();
    }

    fn pump_events(&mut self, queue: &mut EventQueue) {
        queue.append_from(&mut self.input.borrow_mut().staging);
    }

    /// Displayed size of the canvas, falling back to its backing store
    /// before layout.
    fn client_size(&self) -> (u32, u32) {
        let (w, h) = (self.canvas.client_width(), self.canvas.client_height());
        if w > 0 && h > 0 {
            (w as u32, h as u32)
        } else {
            (self.canvas.width(), self.canvas.height())
        }
    }

    fn present(&mut self, surface: &Surface<'_>) -> Result<(), PlatformError> {
        let (cw, ch) = self.client_size();
        let Some(letterbox) = Letterbox::fit(surface.width(), surface.height(), cw, ch) else {
            return Ok(());
        };
        if self.canvas.width() != cw || self.canvas.height() != ch {
            self.canvas.set_width(cw);
            self.canvas.set_height(ch);
        }

        letterbox.compose(surface, &mut self.rgba);
        // BGRA -> RGBA. Canvas alpha would blend with the page, so force opaque.
        for px in self.rgba.chunks_exact_mut(4) {
            px.swap(0, 2);
            px[3] = 255;
        }

        let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(self.rgba.as_slice()), cw, ch)
            .map_err(|e| PlatformError::Presentation(js_error("ImageData", e)))?;
        self.context()?
            .put_image_data(&image, 0.0, 0.0)
            .map_err(|e| PlatformError::Presentation(js_error("putImageData", e)))?;
        trace!("WebDisplayDriver: Presented {}x{}", cw, ch);
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlatformError> {
        let result = if fullscreen {
            self.canvas.request_fullscreen()
        } else if self.document.fullscreen_element().is_some() {
            self.document.exit_fullscreen();
            Ok(())
        } else {
            Ok(())
        };
        result.map_err(|e| PlatformError::Fullscreen(js_error("requestFullscreen", e)))
    }

    fn show_cursor(&mut self, visible: bool) {
        let value = if visible { "default" } else { "none" };
        if let Err(e) = self.canvas.style().set_property("cursor", value) {
            warn!("WebDisplayDriver: Failed to set cursor: {:?}", e);
        }
    }

    fn set_title(&mut self, title: &str) {
        self.document.set_title(title);
    }
}

impl Drop for WebDisplayDriver {
    fn drop(&mut self) {
        info!("WebDisplayDriver::drop() - Removing listeners");
        self.destroy_window();
    }
}
