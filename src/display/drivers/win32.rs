//! Win32 DisplayDriver implementation using windows-sys.
//!
//! - The window procedure turns messages into events in a staging queue that
//!   lives behind `GWLP_USERDATA`; `pump_events` drains it after the
//!   `PeekMessageW` loop
//! - Alt combinations arrive as `WM_SYSKEYDOWN` and are normalized like any
//!   other key
//! - Frames go out with `StretchDIBits`, margins painted with the black brush
//! - Fullscreen swaps to a borderless popup covering the monitor and restores
//!   the saved placement and style on the way back

use crate::config::DisplayConfig;
use crate::display::driver::{DisplayDriver, WindowDescriptor};
use crate::display::letterbox::Letterbox;
use crate::error::PlatformError;
use crate::event::{EventQueue, PlatformEvent};
use crate::keys::{KeyCode, Modifiers};
use crate::surface::Surface;
use log::{debug, info, trace, warn};
use std::ffi::c_void;
use std::mem;
use std::ptr;
use windows_sys::Win32::Foundation::{
    GetLastError, ERROR_CLASS_ALREADY_EXISTS, HWND, LPARAM, LRESULT, RECT, WPARAM,
};
use windows_sys::Win32::Graphics::Gdi::{
    FillRect, GetDC, GetMonitorInfoW, GetStockObject, MonitorFromWindow, ReleaseDC,
    StretchDIBits, ValidateRect, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, BLACK_BRUSH,
    DIB_RGB_COLORS, MONITORINFO, MONITOR_DEFAULTTONEAREST, SRCCOPY,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyState, VK_LCONTROL, VK_LMENU, VK_LSHIFT, VK_RCONTROL, VK_RMENU, VK_RSHIFT,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRect, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    GetClientRect, GetWindowLongW, GetWindowPlacement, LoadCursorW, PeekMessageW,
    RegisterClassW, SetWindowLongW, SetWindowPlacement, SetWindowPos, SetWindowTextW,
    ShowCursor, ShowWindow, TranslateMessage, CREATESTRUCTW, CS_HREDRAW, CS_VREDRAW,
    CW_USEDEFAULT, GWLP_USERDATA, GWL_STYLE, HWND_TOP, IDC_ARROW, MSG, PM_REMOVE, SWP_FRAMECHANGED,
    SWP_NOMOVE, SWP_NOOWNERZORDER, SWP_NOSIZE, SWP_NOZORDER, SW_SHOW, WINDOWPLACEMENT,
    WM_CLOSE, WM_KEYDOWN, WM_KEYUP, WM_NCCREATE, WM_PAINT, WM_SIZE, WM_SYSCHAR, WM_SYSKEYDOWN,
    WM_SYSKEYUP, WNDCLASSW, WS_OVERLAPPEDWINDOW, WS_POPUP, WS_VISIBLE,
};

#[cfg(target_pointer_width = "64")]
use windows_sys::Win32::UI::WindowsAndMessaging::{GetWindowLongPtrW, SetWindowLongPtrW};
#[cfg(target_pointer_width = "32")]
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetWindowLongW as GetWindowLongPtrW, SetWindowLongW as SetWindowLongPtrW,
};

const CLASS_NAME: &str = "CastawayPlatformWindow";

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// State the window procedure writes into.
///
/// Only ever reached through the raw pointer stored in `GWLP_USERDATA` and
/// held by the driver, never through a long-lived reference.
struct WndState {
    staging: EventQueue,
    client_width: u32,
    client_height: u32,
}

fn key_down(vk: u16) -> bool {
    // SAFETY: GetKeyState has no preconditions.
    unsafe { GetKeyState(i32::from(vk)) < 0 }
}

fn current_modifiers() -> Modifiers {
    let mut mods = Modifiers::empty();
    for (vk, flag) in [
        (VK_LMENU, Modifiers::LALT),
        (VK_RMENU, Modifiers::RALT),
        (VK_LSHIFT, Modifiers::LSHIFT),
        (VK_RSHIFT, Modifiers::RSHIFT),
        (VK_LCONTROL, Modifiers::LCTRL),
        (VK_RCONTROL, Modifiers::RCTRL),
    ] {
        if key_down(vk) {
            mods.insert(flag);
        }
    }
    mods
}

unsafe extern "system" fn wnd_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if msg == WM_NCCREATE {
        let create = &*(lparam as *const CREATESTRUCTW);
        // LONG_PTR is pointer-sized on both 32- and 64-bit targets.
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, create.lpCreateParams as usize as _);
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    }

    let state = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut WndState;
    if state.is_null() {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    }
    let state = &mut *state;

    match msg {
        WM_CLOSE => {
            state.staging.push(PlatformEvent::Quit);
            0
        }
        WM_PAINT => {
            ValidateRect(hwnd, ptr::null());
            state.staging.push(PlatformEvent::WindowRefresh);
            0
        }
        WM_SIZE => {
            state.client_width = (lparam as usize & 0xffff) as u32;
            state.client_height = ((lparam as usize >> 16) & 0xffff) as u32;
            0
        }
        WM_KEYDOWN | WM_SYSKEYDOWN | WM_KEYUP | WM_SYSKEYUP => {
            let key = KeyCode::from_virtual_key(wparam as u16);
            let is_sys = msg == WM_SYSKEYDOWN || msg == WM_SYSKEYUP;
            if key == KeyCode::Unknown && is_sys {
                // Alt+F4 and the system menu stay with the default handler.
                return DefWindowProcW(hwnd, msg, wparam, lparam);
            }
            let modifiers = current_modifiers();
            let event = if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
                PlatformEvent::KeyDown { key, modifiers }
            } else {
                PlatformEvent::KeyUp { key, modifiers }
            };
            state.staging.push(event);
            0
        }
        // Swallow the menu beep for Alt+Return.
        WM_SYSCHAR => 0,
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

pub struct Win32DisplayDriver {
    hwnd: HWND,
    /// From `Box::into_raw`, freed in Drop after the window is gone.
    state: *mut WndState,
    saved_placement: Option<(WINDOWPLACEMENT, i32)>,
    cursor_hidden: bool,
}

impl Win32DisplayDriver {
    fn require_window(&self) -> Result<(), PlatformError> {
        if self.hwnd.is_null() {
            return Err(PlatformError::NoWindow);
        }
        Ok(())
    }

    fn enter_fullscreen(&mut self) -> Result<(), PlatformError> {
        // SAFETY: hwnd is live; all out-structs are sized before the calls.
        unsafe {
            let mut placement: WINDOWPLACEMENT = mem::zeroed();
            placement.length = mem::size_of::<WINDOWPLACEMENT>() as u32;
            if GetWindowPlacement(self.hwnd, &mut placement) == 0 {
                return Err(PlatformError::Fullscreen("GetWindowPlacement failed".to_string()));
            }
            let style = GetWindowLongW(self.hwnd, GWL_STYLE);

            let monitor = MonitorFromWindow(self.hwnd, MONITOR_DEFAULTTONEAREST);
            let mut info: MONITORINFO = mem::zeroed();
            info.cbSize = mem::size_of::<MONITORINFO>() as u32;
            if GetMonitorInfoW(monitor, &mut info) == 0 {
                return Err(PlatformError::Fullscreen("GetMonitorInfoW failed".to_string()));
            }

            self.saved_placement = Some((placement, style));
            SetWindowLongW(self.hwnd, GWL_STYLE, (WS_POPUP | WS_VISIBLE) as i32);
            let rc = info.rcMonitor;
            SetWindowPos(
                self.hwnd,
                HWND_TOP,
                rc.left,
                rc.top,
                rc.right - rc.left,
                rc.bottom - rc.top,
                SWP_NOOWNERZORDER | SWP_FRAMECHANGED,
            );
        }
        Ok(())
    }

    fn leave_fullscreen(&mut self) -> Result<(), PlatformError> {
        let Some((placement, style)) = self.saved_placement.take() else {
            return Err(PlatformError::Fullscreen("not in fullscreen".to_string()));
        };
        // SAFETY: hwnd is live; placement was captured from this window.
        unsafe {
            SetWindowLongW(self.hwnd, GWL_STYLE, style);
            SetWindowPlacement(self.hwnd, &placement);
            SetWindowPos(
                self.hwnd,
                ptr::null_mut(),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOOWNERZORDER | SWP_FRAMECHANGED,
            );
        }
        Ok(())
    }
}

impl DisplayDriver for Win32DisplayDriver {
    fn connect(_config: &DisplayConfig) -> Result<Self, PlatformError> {
        info!("Win32DisplayDriver::connect() - Registering window class");
        let class_name = wide(CLASS_NAME);

        // SAFETY: the class struct and name outlive the call.
        unsafe {
            let instance = GetModuleHandleW(ptr::null());
            let class = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(wnd_proc),
                cbClsExtra: 0,
                cbWndExtra: 0,
                hInstance: instance,
                hIcon: ptr::null_mut(),
                hCursor: LoadCursorW(ptr::null_mut(), IDC_ARROW),
                hbrBackground: GetStockObject(BLACK_BRUSH),
                lpszMenuName: ptr::null(),
                lpszClassName: class_name.as_ptr(),
            };
            if RegisterClassW(&class) == 0 && GetLastError() != ERROR_CLASS_ALREADY_EXISTS {
                return Err(PlatformError::DisplayUnavailable(format!(
                    "RegisterClassW failed: {}",
                    GetLastError()
                )));
            }
        }

        Ok(Self {
            hwnd: ptr::null_mut(),
            state: Box::into_raw(Box::new(WndState {
                staging: EventQueue::new(),
                client_width: 0,
                client_height: 0,
            })),
            saved_placement: None,
            cursor_hidden: false,
        })
    }

    fn create_window(&mut self, desc: &WindowDescriptor) -> Result<(), PlatformError> {
        if !self.hwnd.is_null() {
            return Err(PlatformError::WindowCreation("Win32 window already exists".to_string()));
        }
        let class_name = wide(CLASS_NAME);
        let title = wide(&desc.title);

        // SAFETY: the state allocation outlives the window and is handed to
        // the window procedure through lpCreateParams.
        let hwnd = unsafe {
            let mut rect = RECT {
                left: 0,
                top: 0,
                right: desc.width as i32,
                bottom: desc.height as i32,
            };
            AdjustWindowRect(&mut rect, WS_OVERLAPPEDWINDOW, 0);

            CreateWindowExW(
                0,
                class_name.as_ptr(),
                title.as_ptr(),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                rect.right - rect.left,
                rect.bottom - rect.top,
                ptr::null_mut(),
                ptr::null_mut(),
                GetModuleHandleW(ptr::null()),
                self.state as *const c_void,
            )
        };
        if hwnd.is_null() {
            // SAFETY: GetLastError has no preconditions.
            let code = unsafe { GetLastError() };
            return Err(PlatformError::WindowCreation(format!("CreateWindowExW failed: {}", code)));
        }
        self.hwnd = hwnd;

        // SAFETY: hwnd was just created; no message is being dispatched, so
        // the state is not aliased by the window procedure.
        unsafe {
            ShowWindow(hwnd, SW_SHOW);
            let mut client: RECT = mem::zeroed();
            if GetClientRect(hwnd, &mut client) != 0 {
                (*self.state).client_width = (client.right - client.left).max(0) as u32;
                (*self.state).client_height = (client.bottom - client.top).max(0) as u32;
            }
        }
        info!("Win32DisplayDriver: Created window {}x{}", desc.width, desc.height);
        Ok(())
    }

    fn destroy_window(&mut self) {
        if self.hwnd.is_null() {
            return;
        }
        info!("Win32DisplayDriver: Destroying window");
        if self.cursor_hidden {
            self.show_cursor(true);
        }
        // SAFETY: detach the state pointer before the window goes away so no
        // late message reaches it; DestroyWindow has returned before the
        // state is touched again.
        unsafe {
            SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
            DestroyWindow(self.hwnd);
            *self.state = WndState {
                staging: EventQueue::new(),
                client_width: 0,
                client_height: 0,
            };
        }
        self.hwnd = ptr::null_mut();
        self.saved_placement = None;
    }

    fn pump_events(&mut self, queue: &mut EventQueue) {
        if self.hwnd.is_null() {
            return;
        }
        // SAFETY: standard non-blocking message loop for our thread. The
        // staging queue is borrowed only after dispatch has returned.
        unsafe {
            let mut msg: MSG = mem::zeroed();
            while PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
            queue.append_from(&mut (*self.state).staging);
        }
    }

    fn client_size(&self) -> (u32, u32) {
        // SAFETY: plain reads outside message dispatch.
        unsafe { ((*self.state).client_width, (*self.state).client_height) }
    }

    fn present(&mut self, surface: &Surface<'_>) -> Result<(), PlatformError> {
        self.require_window()?;
        let (cw, ch) = self.client_size();
        let Some(letterbox) = Letterbox::fit(surface.width(), surface.height(), cw, ch) else {
            return Ok(());
        };

        // SAFETY: the DC is released before returning; the bitmap header
        // describes exactly the surface memory handed to StretchDIBits.
        unsafe {
            let hdc = GetDC(self.hwnd);
            if hdc.is_null() {
                return Err(PlatformError::Presentation("GetDC failed".to_string()));
            }

            let black = GetStockObject(BLACK_BRUSH);
            for margin in letterbox.margins() {
                let rect = RECT {
                    left: margin.x,
                    top: margin.y,
                    right: margin.right() as i32,
                    bottom: margin.bottom() as i32,
                };
                FillRect(hdc, &rect, black);
            }

            let mut info: BITMAPINFO = mem::zeroed();
            info.bmiHeader = BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: (surface.pitch() / surface.bytes_per_pixel()) as i32,
                // negative height: rows are top-down
                biHeight: -(surface.height() as i32),
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB,
                biSizeImage: 0,
                biXPelsPerMeter: 0,
                biYPelsPerMeter: 0,
                biClrUsed: 0,
                biClrImportant: 0,
            };

            let dest = letterbox.dest;
            let lines = StretchDIBits(
                hdc,
                dest.x,
                dest.y,
                dest.w as i32,
                dest.h as i32,
                0,
                0,
                surface.width() as i32,
                surface.height() as i32,
                surface.pixels().as_ptr() as *const c_void,
                &info,
                DIB_RGB_COLORS,
                SRCCOPY,
            );
            ReleaseDC(self.hwnd, hdc);

            if lines == 0 {
                return Err(PlatformError::Presentation("StretchDIBits failed".to_string()));
            }
        }
        trace!("Win32DisplayDriver: Presented into {}x{}", cw, ch);
        Ok(())
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlatformError> {
        self.require_window()?;
        let result = if fullscreen {
            self.enter_fullscreen()
        } else {
            self.leave_fullscreen()
        };
        debug!("Win32DisplayDriver: fullscreen={} -> {:?}", fullscreen, result.is_ok());
        result
    }

    fn show_cursor(&mut self, visible: bool) {
        if self.cursor_hidden != visible {
            return;
        }
        // SAFETY: ShowCursor only adjusts this thread's display counter.
        unsafe {
            if visible {
                while ShowCursor(1) < 0 {}
            } else {
                while ShowCursor(0) >= 0 {}
            }
        }
        self.cursor_hidden = !visible;
    }

    fn set_title(&mut self, title: &str) {
        if self.hwnd.is_null() {
            return;
        }
        let title = wide(title);
        // SAFETY: hwnd is live and title is NUL-terminated.
        if unsafe { SetWindowTextW(self.hwnd, title.as_ptr()) } == 0 {
            warn!("Win32DisplayDriver: SetWindowTextW failed");
        }
    }
}

impl Drop for Win32DisplayDriver {
    fn drop(&mut self) {
        info!("Win32DisplayDriver::drop() - Cleaning up");
        self.destroy_window();
        // SAFETY: allocated by Box::into_raw in connect; no window refers to
        // it any more.
        unsafe {
            drop(Box::from_raw(self.state));
        }
    }
}
