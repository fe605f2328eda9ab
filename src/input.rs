use glam::Vec2;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
    Function(u8),
}

impl KeyCode {
    /// Parses a friendly key name such as `Space`, `R`, `5` or `F2`.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            if ch.is_ascii_alphabetic() {
                return Some(Self::Character(ch.to_ascii_uppercase()));
            }
            if ch.is_ascii_digit() {
                return Some(Self::Digit(ch as u8 - b'0'));
            }
        }
        if let Some(function) = name.strip_prefix('F').or_else(|| name.strip_prefix('f')) {
            if let Ok(index) = function.parse::<u8>() {
                if (1..=25).contains(&index) {
                    return Some(Self::Function(index));
                }
            }
        }
        None
    }

    /// Maps a DOM `KeyboardEvent.code` value (`Space`, `KeyR`, `Digit3`, `ArrowUp`).
    pub fn from_dom_code(code: &str) -> Option<Self> {
        if let Some(letter) = code.strip_prefix("Key") {
            return Self::from_name(letter);
        }
        if let Some(digit) = code.strip_prefix("Digit") {
            return Self::from_name(digit);
        }
        match code {
            "ArrowLeft" => Some(Self::Named(NamedKey::Left)),
            "ArrowRight" => Some(Self::Named(NamedKey::Right)),
            "ArrowUp" => Some(Self::Named(NamedKey::Up)),
            "ArrowDown" => Some(Self::Named(NamedKey::Down)),
            "ShiftLeft" => Some(Self::Named(NamedKey::LeftShift)),
            "ShiftRight" => Some(Self::Named(NamedKey::RightShift)),
            "ControlLeft" => Some(Self::Named(NamedKey::LeftCtrl)),
            "ControlRight" => Some(Self::Named(NamedKey::RightCtrl)),
            "AltLeft" => Some(Self::Named(NamedKey::LeftAlt)),
            "AltRight" => Some(Self::Named(NamedKey::RightAlt)),
            other => Self::from_name(other),
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "Backspace" => Backspace,
        "Home" => Home,
        "End" => End,
        "PageUp" => PageUp,
        "PageDown" => PageDown,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        "LeftAlt" | "LAlt" => LeftAlt,
        "RightAlt" | "RAlt" => RightAlt,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Friendly names for the non-character keys the viewer can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Backspace,
    Home,
    End,
    PageUp,
    PageDown,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const MIDDLE: Self = Self(1);
    pub const RIGHT: Self = Self(2);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Platform independent input fed to [`crate::Viewer::handle_input`].
///
/// Positions and deltas are in viewport pixels with the origin at the top left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Scroll wheel movement; positive values scroll away from the scene.
    Wheel { delta_y: f32 },
    /// A completed press/release without significant pointer travel.
    Click { position: Vec2 },
    /// Pointer movement while a button is held.
    PointerDrag { button: MouseButton, delta: Vec2 },
    TouchStart { id: u64, position: Vec2 },
    TouchMove { id: u64, position: Vec2 },
    TouchEnd { id: u64 },
    KeyDown(KeyCode),
    Resize { width: u32, height: u32 },
}
