// src/keys.rs

//! The closed key vocabulary and the native-code mappings every backend
//! feeds through.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Modifier state carried with every key event.
    ///
    /// Left and right variants are distinct. Only `LALT` changes behaviour
    /// downstream (Alt+Return toggles fullscreen); the rest are carried along.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u16 {
        const LALT = 1 << 0;
        const RALT = 1 << 1;
        const LSHIFT = 1 << 2;
        const RSHIFT = 1 << 3;
        const LCTRL = 1 << 4;
        const RCTRL = 1 << 5;
    }
}

/// Keys the platform layer reports. Everything else is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeyCode {
    #[default]
    Unknown,
    Space,
    Return,
    Escape,
    M,
}

// X11 keysym values (X11/keysymdef.h)
const XK_SPACE: u64 = 0x0020;
const XK_UPPER_M: u64 = 0x004d;
const XK_LOWER_M: u64 = 0x006d;
const XK_RETURN: u64 = 0xff0d;
const XK_KP_ENTER: u64 = 0xff8d;
const XK_ESCAPE: u64 = 0xff1b;
const XK_SHIFT_L: u64 = 0xffe1;
const XK_SHIFT_R: u64 = 0xffe2;
const XK_CONTROL_L: u64 = 0xffe3;
const XK_CONTROL_R: u64 = 0xffe4;
const XK_META_L: u64 = 0xffe7;
const XK_META_R: u64 = 0xffe8;
const XK_ALT_L: u64 = 0xffe9;
const XK_ALT_R: u64 = 0xffea;
const XK_ISO_LEVEL3_SHIFT: u64 = 0xfe03;

// Win32 virtual-key codes (WinUser.h)
const VK_RETURN: u16 = 0x0d;
const VK_ESCAPE: u16 = 0x1b;
const VK_SPACE: u16 = 0x20;
const VK_M: u16 = 0x4d;

impl KeyCode {
    /// Map an unshifted X11 keysym.
    pub fn from_keysym(keysym: u64) -> Self {
        match keysym {
            XK_SPACE => KeyCode::Space,
            XK_RETURN | XK_KP_ENTER => KeyCode::Return,
            XK_ESCAPE => KeyCode::Escape,
            XK_LOWER_M | XK_UPPER_M => KeyCode::M,
            _ => KeyCode::Unknown,
        }
    }

    /// Map a Win32 virtual-key code (the `wParam` of `WM_KEYDOWN`).
    pub fn from_virtual_key(vk: u16) -> Self {
        match vk {
            VK_SPACE => KeyCode::Space,
            VK_RETURN => KeyCode::Return,
            VK_ESCAPE => KeyCode::Escape,
            VK_M => KeyCode::M,
            _ => KeyCode::Unknown,
        }
    }

    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            " " | "Space" | "Spacebar" => KeyCode::Space,
            "Enter" => KeyCode::Return,
            "Escape" | "Esc" => KeyCode::Escape,
            "m" | "M" => KeyCode::M,
            _ => KeyCode::Unknown,
        }
    }
}

/// A physical modifier key, with its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    LeftAlt,
    RightAlt,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
}

impl ModifierKey {
    pub fn flag(self) -> Modifiers {
        match self {
            ModifierKey::LeftAlt => Modifiers::LALT,
            ModifierKey::RightAlt => Modifiers::RALT,
            ModifierKey::LeftShift => Modifiers::LSHIFT,
            ModifierKey::RightShift => Modifiers::RSHIFT,
            ModifierKey::LeftCtrl => Modifiers::LCTRL,
            ModifierKey::RightCtrl => Modifiers::RCTRL,
        }
    }

    pub fn from_keysym(keysym: u64) -> Option<Self> {
        match keysym {
            XK_ALT_L | XK_META_L => Some(ModifierKey::LeftAlt),
            XK_ALT_R | XK_META_R | XK_ISO_LEVEL3_SHIFT => Some(ModifierKey::RightAlt),
            XK_SHIFT_L => Some(ModifierKey::LeftShift),
            XK_SHIFT_R => Some(ModifierKey::RightShift),
            XK_CONTROL_L => Some(ModifierKey::LeftCtrl),
            XK_CONTROL_R => Some(ModifierKey::RightCtrl),
            _ => None,
        }
    }

    /// Map a DOM `KeyboardEvent.code` value.
    pub fn from_dom_code(code: &str) -> Option<Self> {
        match code {
            "AltLeft" => Some(ModifierKey::LeftAlt),
            "AltRight" => Some(ModifierKey::RightAlt),
            "ShiftLeft" => Some(ModifierKey::LeftShift),
            "ShiftRight" => Some(ModifierKey::RightShift),
            "ControlLeft" => Some(ModifierKey::LeftCtrl),
            "ControlRight" => Some(ModifierKey::RightCtrl),
            _ => None,
        }
    }
}

/// Tracks which sided modifiers are physically held.
///
/// Used by backends whose native modifier state does not say which side is
/// down (X11 `Mod1Mask`, DOM `altKey`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifierTracker {
    held: Modifiers,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: ModifierKey) {
        self.held.insert(key.flag());
    }

    pub fn release(&mut self, key: ModifierKey) {
        self.held.remove(key.flag());
    }

    /// Forget everything, e.g. after focus loss when releases go unseen.
    pub fn reset(&mut self) {
        self.held = Modifiers::empty();
    }

    /// Current state, reconciled with a native "some alt is down" hint.
    ///
    /// When the native state says no alt is held, stale alt bits are dropped.
    /// When it says alt is held but neither side was seen going down (the key
    /// was pressed before the window had focus), left Alt is assumed.
    pub fn current(&self, native_alt_down: Option<bool>) -> Modifiers {
        let mut mods = self.held;
        match native_alt_down {
            Some(false) => mods.remove(Modifiers::LALT | Modifiers::RALT),
            Some(true) if !mods.intersects(Modifiers::LALT | Modifiers::RALT) => {
                mods.insert(Modifiers::LALT)
            }
            _ => {}
        }
        mods
    }
}
