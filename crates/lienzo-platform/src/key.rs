//! Keyboard and mouse identifiers.

/// Maximum number of simultaneously tracked touch points.
pub const MAX_TOUCH_POINTS: usize = 16;

/// Physical keyboard keys.
///
/// The set matches a conventional full-size layout. Discriminants are dense
/// so the key doubles as an index into per-key state tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
#[allow(missing_docs)]
pub enum Key {
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Grave,
    Apostrophe,
    Minus,
    Equal,
    LBracket,
    RBracket,
    Comma,
    Period,
    Semicolon,
    Slash,
    Backslash,
    Space,
    Escape,
    Backspace,
    Tab,
    Enter,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Up,
    Down,
    Left,
    Right,
    LShift,
    RShift,
    LCtrl,
    RCtrl,
    LAlt,
    RAlt,
    LSuper,
    RSuper,
    Menu,
    PgUp,
    PgDn,
    Home,
    End,
    Insert,
    Delete,
    PrintScreen,
    Pause,
    CapsLock,
    ScrollLock,
    NumLock,
    Kp0,
    Kp1,
    Kp2,
    Kp3,
    Kp4,
    Kp5,
    Kp6,
    Kp7,
    Kp8,
    Kp9,
    KpMul,
    KpAdd,
    KpSub,
    KpPoint,
    KpDiv,
    KpEnter,
}

impl Key {
    /// Number of distinct keys.
    pub const COUNT: usize = Key::KpEnter as usize + 1;

    /// Every key, in discriminant order. Focus-loss purge walks this.
    pub fn all() -> impl Iterator<Item = Key> {
        (0..Self::COUNT).map(|i| KEY_TABLE[i])
    }

    /// Dense index for state tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

// Discriminant-order lookup used by `Key::all`. Kept next to the enum so
// additions stay in sync.
const KEY_TABLE: [Key; Key::COUNT] = [
    Key::Num0,
    Key::Num1,
    Key::Num2,
    Key::Num3,
    Key::Num4,
    Key::Num5,
    Key::Num6,
    Key::Num7,
    Key::Num8,
    Key::Num9,
    Key::A,
    Key::B,
    Key::C,
    Key::D,
    Key::E,
    Key::F,
    Key::G,
    Key::H,
    Key::I,
    Key::J,
    Key::K,
    Key::L,
    Key::M,
    Key::N,
    Key::O,
    Key::P,
    Key::Q,
    Key::R,
    Key::S,
    Key::T,
    Key::U,
    Key::V,
    Key::W,
    Key::X,
    Key::Y,
    Key::Z,
    Key::Grave,
    Key::Apostrophe,
    Key::Minus,
    Key::Equal,
    Key::LBracket,
    Key::RBracket,
    Key::Comma,
    Key::Period,
    Key::Semicolon,
    Key::Slash,
    Key::Backslash,
    Key::Space,
    Key::Escape,
    Key::Backspace,
    Key::Tab,
    Key::Enter,
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
    Key::Up,
    Key::Down,
    Key::Left,
    Key::Right,
    Key::LShift,
    Key::RShift,
    Key::LCtrl,
    Key::RCtrl,
    Key::LAlt,
    Key::RAlt,
    Key::LSuper,
    Key::RSuper,
    Key::Menu,
    Key::PgUp,
    Key::PgDn,
    Key::Home,
    Key::End,
    Key::Insert,
    Key::Delete,
    Key::PrintScreen,
    Key::Pause,
    Key::CapsLock,
    Key::ScrollLock,
    Key::NumLock,
    Key::Kp0,
    Key::Kp1,
    Key::Kp2,
    Key::Kp3,
    Key::Kp4,
    Key::Kp5,
    Key::Kp6,
    Key::Kp7,
    Key::Kp8,
    Key::Kp9,
    Key::KpMul,
    Key::KpAdd,
    Key::KpSub,
    Key::KpPoint,
    Key::KpDiv,
    Key::KpEnter,
];

/// Per-key state as seen by the application.
///
/// `Released` is a one-frame state: the frame after the release event it
/// decays back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyState {
    /// Not pressed.
    #[default]
    Idle,
    /// Held down.
    Pressed,
    /// Released during the last frame.
    Released,
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MouseButton {
    /// Left button.
    Left = 0,
    /// Right button.
    Right = 1,
    /// Middle (wheel) button.
    Middle = 2,
}

impl MouseButton {
    /// Number of distinct buttons.
    pub const COUNT: usize = 3;

    /// Every button, in index order.
    pub fn all() -> impl Iterator<Item = MouseButton> {
        [MouseButton::Left, MouseButton::Right, MouseButton::Middle].into_iter()
    }

    /// This button's bit in the state bitmask.
    pub fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table_matches_discriminants() {
        for (i, key) in Key::all().enumerate() {
            assert_eq!(key.index(), i);
        }
    }

    #[test]
    fn test_button_masks_are_distinct() {
        let masks: Vec<u8> = MouseButton::all().map(MouseButton::mask).collect();
        assert_eq!(masks, vec![1, 2, 4]);
    }
}
