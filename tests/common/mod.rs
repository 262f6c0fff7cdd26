//! Recording doubles for the input channel and delays

#![allow(dead_code)]

use std::time::Duration;

use formfill::sequencer::Delay;
use formfill::{AbortWatch, ActionError, FormKey, InputChannel, InputError, Record};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Type(String),
    Key(FormKey),
    Combo(Vec<FormKey>),
    Click(Option<(i32, i32)>),
}

/// Input channel that records every primitive instead of sending it
#[derive(Default)]
pub struct MockInput {
    pub actions: Vec<Action>,
    enters: usize,
    typed: usize,
    /// Characters dispatched so far, across all values
    pub chars: usize,
    /// Park the pointer in the failsafe corner once this many Enters were pressed
    corner_after_enters: Option<usize>,
    /// Park the pointer in the failsafe corner once this many characters were typed
    corner_after_chars: Option<usize>,
    /// Raise Ctrl+C on this watch once this many values were typed
    interrupt_after_types: Option<(usize, AbortWatch)>,
    /// Raise Ctrl+C on this watch once this many characters were typed
    interrupt_after_chars: Option<(usize, AbortWatch)>,
    /// Raise Ctrl+C on this watch when a key combo is pressed
    interrupt_on_combo: Option<AbortWatch>,
    /// Fail `type_text` for this exact value
    fail_on: Option<String>,
}

impl MockInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corner_after_enters(mut self, n: usize) -> Self {
        self.corner_after_enters = Some(n);
        self
    }

    pub fn corner_after_chars(mut self, n: usize) -> Self {
        self.corner_after_chars = Some(n);
        self
    }

    pub fn interrupt_after_types(mut self, n: usize, watch: AbortWatch) -> Self {
        self.interrupt_after_types = Some((n, watch));
        self
    }

    pub fn interrupt_after_chars(mut self, n: usize, watch: AbortWatch) -> Self {
        self.interrupt_after_chars = Some((n, watch));
        self
    }

    pub fn interrupt_on_combo(mut self, watch: AbortWatch) -> Self {
        self.interrupt_on_combo = Some(watch);
        self
    }

    pub fn fail_on(mut self, value: &str) -> Self {
        self.fail_on = Some(value.to_string());
        self
    }

    pub fn typed(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Type(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count_key(&self, key: FormKey) -> usize {
        self.actions
            .iter()
            .filter(|a| **a == Action::Key(key))
            .count()
    }

    pub fn count_combos(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Combo(_)))
            .count()
    }
}

impl InputChannel for MockInput {
    fn type_text(
        &mut self,
        text: &str,
        _interval: Duration,
        abort: &AbortWatch,
    ) -> Result<(), ActionError> {
        if self.fail_on.as_deref() == Some(text) {
            return Err(InputError(format!("cannot type {text:?}")).into());
        }

        let mut sent = String::new();
        for c in text.chars() {
            if let Err(e) = abort.check(&*self) {
                if !sent.is_empty() {
                    self.actions.push(Action::Type(sent));
                }
                return Err(e);
            }
            sent.push(c);
            self.chars += 1;
            if let Some((n, watch)) = &self.interrupt_after_chars {
                if self.chars >= *n {
                    watch.interrupt();
                }
            }
        }

        self.actions.push(Action::Type(sent));
        self.typed += 1;
        if let Some((n, watch)) = &self.interrupt_after_types {
            if self.typed >= *n {
                watch.interrupt();
            }
        }
        Ok(())
    }

    fn press_key(&mut self, key: FormKey) -> Result<(), InputError> {
        if key == FormKey::Enter {
            self.enters += 1;
        }
        self.actions.push(Action::Key(key));
        Ok(())
    }

    fn press_key_combo(&mut self, keys: &[FormKey]) -> Result<(), InputError> {
        self.actions.push(Action::Combo(keys.to_vec()));
        if let Some(watch) = &self.interrupt_on_combo {
            watch.interrupt();
        }
        Ok(())
    }

    fn pointer_click(&mut self, at: Option<(i32, i32)>) -> Result<(), InputError> {
        self.actions.push(Action::Click(at));
        Ok(())
    }

    fn screen_size(&self) -> Result<(i32, i32), InputError> {
        Ok((1920, 1080))
    }

    fn pointer_position(&self) -> Result<(i32, i32), InputError> {
        let by_enters = self.corner_after_enters.is_some_and(|n| self.enters >= n);
        let by_chars = self.corner_after_chars.is_some_and(|n| self.chars >= n);
        if by_enters || by_chars {
            Ok((0, 0))
        } else {
            Ok((640, 480))
        }
    }
}

/// Delay that remembers what it was asked to wait
#[derive(Default)]
pub struct RecordingDelay {
    pub waits: Vec<Duration>,
}

impl Delay for RecordingDelay {
    fn sleep(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}

pub fn people(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new()
                .with("name", format!("Person {i}").as_str())
                .with("email", format!("p{i}@x.com").as_str())
        })
        .collect()
}

pub fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
