//! Synthetic input channel
//!
//! The sequencer talks to the host input subsystem only through
//! [`InputChannel`]. [`EnigoInput`] is the real backend; tests supply a
//! recording implementation.
//!
//! Input always lands in whatever window has focus. The operator is
//! responsible for focusing the first form field before a run starts.

use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use std::thread;
use std::time::Duration;

use crate::abort::AbortWatch;
use crate::error::{ActionError, InputError};

/// Keys the form filler needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKey {
    Tab,
    Enter,
    Control,
    Meta,
    Char(char),
}

impl FormKey {
    /// Platform modifier for shortcuts (Cmd on macOS, Ctrl elsewhere)
    pub fn modifier() -> Self {
        #[cfg(target_os = "macos")]
        {
            FormKey::Meta
        }
        #[cfg(not(target_os = "macos"))]
        {
            FormKey::Control
        }
    }

    /// Select-all shortcut, used to clear a field before typing
    pub fn select_all() -> [FormKey; 2] {
        [Self::modifier(), FormKey::Char('a')]
    }

    fn to_enigo(self) -> Key {
        match self {
            FormKey::Tab => Key::Tab,
            FormKey::Enter => Key::Return,
            FormKey::Control => Key::Control,
            FormKey::Meta => Key::Meta,
            FormKey::Char(c) => Key::Unicode(c),
        }
    }
}

/// Screen dimensions and pointer location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenInfo {
    pub screen_width: i32,
    pub screen_height: i32,
    pub mouse_x: i32,
    pub mouse_y: i32,
}

/// Boundary to the host input subsystem
pub trait InputChannel {
    /// Type `text` one character at a time, waiting `interval` after each.
    ///
    /// `abort` is polled before every keystroke so a long value can be stopped
    /// part way through.
    fn type_text(
        &mut self,
        text: &str,
        interval: Duration,
        abort: &AbortWatch,
    ) -> Result<(), ActionError>;

    fn press_key(&mut self, key: FormKey) -> Result<(), InputError>;

    /// Hold all keys but the last, tap the last, release in reverse order
    fn press_key_combo(&mut self, keys: &[FormKey]) -> Result<(), InputError>;

    /// Left click at `at`, or at the current pointer position
    fn pointer_click(&mut self, at: Option<(i32, i32)>) -> Result<(), InputError>;

    fn screen_size(&self) -> Result<(i32, i32), InputError>;

    fn pointer_position(&self) -> Result<(i32, i32), InputError>;

    fn screen_info(&self) -> Result<ScreenInfo, InputError> {
        let (screen_width, screen_height) = self.screen_size()?;
        let (mouse_x, mouse_y) = self.pointer_position()?;
        Ok(ScreenInfo {
            screen_width,
            screen_height,
            mouse_x,
            mouse_y,
        })
    }
}

/// Input backend using enigo
pub struct EnigoInput {
    enigo: Enigo,
    /// Slept after every dispatched primitive
    pause: Duration,
}

impl EnigoInput {
    pub fn new(pause: Duration) -> Result<Self, InputError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| InputError(format!("Failed to initialize Enigo: {}", e)))?;
        Ok(Self { enigo, pause })
    }

    fn settle(&self) {
        if !self.pause.is_zero() {
            thread::sleep(self.pause);
        }
    }
}

impl InputChannel for EnigoInput {
    fn type_text(
        &mut self,
        text: &str,
        interval: Duration,
        abort: &AbortWatch,
    ) -> Result<(), ActionError> {
        let mut buf = [0u8; 4];
        for c in text.chars() {
            abort.check(&*self)?;
            self.enigo
                .text(c.encode_utf8(&mut buf))
                .map_err(|e| InputError(format!("Failed to type text: {}", e)))?;
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        self.settle();
        Ok(())
    }

    fn press_key(&mut self, key: FormKey) -> Result<(), InputError> {
        self.enigo
            .key(key.to_enigo(), Direction::Click)
            .map_err(|e| InputError(format!("Failed to send key: {}", e)))?;
        self.settle();
        Ok(())
    }

    fn press_key_combo(&mut self, keys: &[FormKey]) -> Result<(), InputError> {
        let Some((last, modifiers)) = keys.split_last() else {
            return Ok(());
        };

        for modifier in modifiers {
            self.enigo
                .key(modifier.to_enigo(), Direction::Press)
                .map_err(|e| InputError(format!("Failed to press modifier: {}", e)))?;
        }

        // Small delay for modifier to register
        thread::sleep(Duration::from_millis(10));

        self.enigo
            .key(last.to_enigo(), Direction::Click)
            .map_err(|e| InputError(format!("Failed to click key: {}", e)))?;

        thread::sleep(Duration::from_millis(50));

        for modifier in modifiers.iter().rev() {
            self.enigo
                .key(modifier.to_enigo(), Direction::Release)
                .map_err(|e| InputError(format!("Failed to release modifier: {}", e)))?;
        }

        self.settle();
        Ok(())
    }

    fn pointer_click(&mut self, at: Option<(i32, i32)>) -> Result<(), InputError> {
        if let Some((x, y)) = at {
            self.enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| InputError(format!("Failed to move pointer: {}", e)))?;
        }
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| InputError(format!("Failed to click: {}", e)))?;
        self.settle();
        Ok(())
    }

    fn screen_size(&self) -> Result<(i32, i32), InputError> {
        self.enigo
            .main_display()
            .map_err(|e| InputError(format!("Failed to query display: {}", e)))
    }

    fn pointer_position(&self) -> Result<(i32, i32), InputError> {
        self.enigo
            .location()
            .map_err(|e| InputError(format!("Failed to query pointer: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_uses_platform_modifier() {
        let [modifier, key] = FormKey::select_all();
        assert_eq!(key, FormKey::Char('a'));
        #[cfg(target_os = "macos")]
        assert_eq!(modifier, FormKey::Meta);
        #[cfg(not(target_os = "macos"))]
        assert_eq!(modifier, FormKey::Control);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(FormKey::Enter.to_enigo(), Key::Return);
        assert_eq!(FormKey::Tab.to_enigo(), Key::Tab);
        assert_eq!(FormKey::Char('v').to_enigo(), Key::Unicode('v'));
    }
}
