//! Keyboard input types and shortcut parsing.
//!
//! Shortcuts are written as `"Mod-Shift-m"`: modifiers joined with `-`,
//! key last. `Mod` is the platform's primary modifier (Cmd on Mac, Ctrl
//! elsewhere), so shortcuts resolve against a [`Platform`].

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::SchemaError;

/// Host platform, deciding what `Mod` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Mac,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else {
            Self::Other
        }
    }

    pub fn is_mac(self) -> bool {
        self == Self::Mac
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Keys that shortcuts can bind. Hosts convert native key events to this.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key, as produced (`"M"` with shift held).
    Character(SmolStr),
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,
    Space,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        let s: SmolStr = s.into();
        if s == " " {
            return Self::Space;
        }
        Self::Character(s)
    }

    /// The lowercase key for a shifted ASCII letter.
    pub fn unshifted(&self) -> Option<Self> {
        match self {
            Self::Character(c) if c.len() == 1 && c.chars().all(|c| c.is_ascii_uppercase()) => {
                Some(Self::Character(c.to_ascii_lowercase().into()))
            }
            _ => None,
        }
    }

    /// Parse a key name. Named keys are case-insensitive; anything else
    /// must be a single character and is taken literally.
    pub fn parse(name: &str) -> Option<Self> {
        let named = match name.to_ascii_lowercase().as_str() {
            "backspace" => Self::Backspace,
            "delete" | "del" => Self::Delete,
            "enter" | "return" => Self::Enter,
            "tab" => Self::Tab,
            "escape" | "esc" => Self::Escape,
            "space" => Self::Space,
            _ if name.chars().count() == 1 => Self::character(name),
            _ => return None,
        };
        Some(named)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character(c) => f.write_str(c),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(platform: Platform) -> Self {
        if platform.is_mac() {
            Self::META
        } else {
            Self::CTRL
        }
    }

    /// Get the primary modifier + Shift for the platform.
    pub fn primary_shift(platform: Platform) -> Self {
        Self {
            shift: true,
            ..Self::primary(platform)
        }
    }
}

/// A key combination for triggering a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::SHIFT,
        }
    }

    pub fn primary(key: Key, platform: Platform) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary(platform),
        }
    }

    pub fn primary_shift(key: Key, platform: Platform) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary_shift(platform),
        }
    }

    /// Parse a shortcut like `"Mod-Shift-m"`, `"Shift-Tab"` or `"Mod--"`.
    pub fn parse(spec: &str, platform: Platform) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidShortcut(spec.into());
        let (mods, key) = if spec == "-" {
            ("", "-")
        } else if let Some(mods) = spec.strip_suffix("--") {
            (mods, "-")
        } else {
            match spec.rsplit_once('-') {
                Some((mods, key)) => (mods, key),
                None => ("", spec),
            }
        };
        if key.is_empty() {
            return Err(invalid());
        }
        let key = Key::parse(key).ok_or_else(invalid)?;

        let mut modifiers = Modifiers::NONE;
        for name in mods.split('-').filter(|name| !name.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "mod" => {
                    let primary = Modifiers::primary(platform);
                    modifiers.ctrl |= primary.ctrl;
                    modifiers.meta |= primary.meta;
                }
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "command" => modifiers.meta = true,
                _ => return Err(invalid()),
            }
        }
        Ok(Self { key, modifiers })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Modifiers {
            ctrl,
            alt,
            shift,
            meta,
        } = self.modifiers;
        for (held, name) in [(ctrl, "Ctrl"), (alt, "Alt"), (shift, "Shift"), (meta, "Meta")] {
            if held {
                write!(f, "{name}-")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// A bound command ran; prevent default.
    Handled,
    /// No shortcut is bound to the combination.
    NotHandled,
    /// A shortcut matched but its command did not apply; let the host
    /// handle the key.
    PassThrough,
}
