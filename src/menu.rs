//! On-device edit menu
//!
//! The second, local mutation path: one slot at a time is edited
//! through increment/decrement/confirm inputs, into a scratch record
//! that is committed to the store (and persisted) only on confirmation.
//! Every transition re-renders the two display lines.

use crate::dictionary;
use crate::display::DisplaySink;
use crate::store::{
    ActionKind, ButtonConfig, ConfigStore, NvStorage, StoreError, PRESETS_PER_BANK, SLOT_NAME_LEN,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Program and bank numbers wrap at this bound in the on-device editor.
const PROGRAM_WRAP: u8 = 100;

/// Where the edit flow currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Off,
    SelectSlot,
    EditName,
    EditType,
    EditValue1,
    EditValue2,
}

/// The three input classes the physical buttons map to while the menu
/// is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuInput {
    Decrement,
    Increment,
    Confirm,
}

/// Menu state machine. Edits go into `scratch` and reach the store
/// only through [`MenuFsm::exit`] with `save = true`.
pub struct MenuFsm {
    state: MenuState,
    bank: usize,
    preset: usize,
    cursor: usize,
    scratch: ButtonConfig,
}

impl MenuFsm {
    pub fn new() -> Self {
        Self {
            state: MenuState::Off,
            bank: 0,
            preset: 0,
            cursor: 0,
            scratch: ButtonConfig::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != MenuState::Off
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    /// Open the menu on the first preset of `bank`, copying its record
    /// into the scratch buffer.
    pub fn enter<S: NvStorage, D: DisplaySink>(
        &mut self,
        store: &ConfigStore<S>,
        display: &mut D,
        bank: usize,
    ) {
        self.state = MenuState::SelectSlot;
        self.bank = bank;
        self.preset = 0;
        self.cursor = 0;
        self.reload_scratch(store);
        debug!(bank, "menu entered");
        self.render(display);
    }

    /// Close the menu. With `save`, the scratch record is written back
    /// to its (bank, preset) coordinates and persisted.
    ///
    /// Returns whether the store was mutated.
    pub fn exit<S: NvStorage, D: DisplaySink>(
        &mut self,
        store: &mut ConfigStore<S>,
        display: &mut D,
        save: bool,
    ) -> bool {
        self.state = MenuState::Off;

        if !save {
            display.show_message("EDIT MODE", "CANCELLED", Duration::from_millis(1000));
            return false;
        }

        match store.write_slot(self.bank, self.preset, self.scratch.clone()) {
            Ok(()) => {
                display.show_message("CONFIGURATION", "SAVED!", Duration::from_millis(1500));
                true
            }
            Err(e) => {
                warn!("menu commit failed: {e}");
                display.show_message("CONFIGURATION", "SAVE ERR", Duration::from_millis(1500));
                // A storage failure happens after the in-memory write,
                // so the working copy did change; a range failure
                // rejects before any mutation.
                matches!(e, StoreError::Storage(_))
            }
        }
    }

    /// Advance the state machine by one input. Returns whether the
    /// store was mutated (a commit happened).
    pub fn handle<S: NvStorage, D: DisplaySink>(
        &mut self,
        store: &mut ConfigStore<S>,
        display: &mut D,
        input: MenuInput,
    ) -> bool {
        let mut changed = false;

        match self.state {
            MenuState::Off => return false,

            MenuState::SelectSlot => match input {
                MenuInput::Increment => {
                    self.preset = (self.preset + 1) % PRESETS_PER_BANK;
                    self.reload_scratch(store);
                }
                MenuInput::Decrement => {
                    self.preset = (self.preset + PRESETS_PER_BANK - 1) % PRESETS_PER_BANK;
                    self.reload_scratch(store);
                }
                MenuInput::Confirm => {
                    self.cursor = 0;
                    self.pad_scratch_name();
                    self.state = MenuState::EditName;
                }
            },

            MenuState::EditName => match input {
                MenuInput::Increment => self.cycle_name_char(1),
                MenuInput::Decrement => self.cycle_name_char(-1),
                MenuInput::Confirm => {
                    self.cursor += 1;
                    if self.cursor >= SLOT_NAME_LEN {
                        self.trim_scratch_name();
                        self.state = MenuState::EditType;
                    }
                }
            },

            MenuState::EditType => match input {
                MenuInput::Increment | MenuInput::Decrement => {
                    // The on-device flow only offers the two primary
                    // kinds; the host editor covers the rest.
                    let kind = match self.scratch.action.kind {
                        ActionKind::Preset => ActionKind::DictionaryEffect,
                        _ => ActionKind::Preset,
                    };
                    self.scratch.action.kind = kind;
                    self.scratch.action.value1 = 0;
                    if kind == ActionKind::Preset {
                        self.scratch.action.value2 = 0;
                    }
                }
                MenuInput::Confirm => self.state = MenuState::EditValue1,
            },

            MenuState::EditValue1 => match input {
                MenuInput::Increment => {
                    self.scratch.action.value1 =
                        cycle(self.scratch.action.value1, 1, self.value1_wrap());
                }
                MenuInput::Decrement => {
                    self.scratch.action.value1 =
                        cycle(self.scratch.action.value1, -1, self.value1_wrap());
                }
                MenuInput::Confirm => {
                    if self.scratch.action.kind == ActionKind::Preset {
                        self.state = MenuState::EditValue2;
                    } else {
                        // Dictionary slots carry no bank number.
                        changed = self.exit(store, display, true);
                    }
                }
            },

            MenuState::EditValue2 => match input {
                MenuInput::Increment => {
                    self.scratch.action.value2 = cycle(self.scratch.action.value2, 1, PROGRAM_WRAP);
                }
                MenuInput::Decrement => {
                    self.scratch.action.value2 = cycle(self.scratch.action.value2, -1, PROGRAM_WRAP);
                }
                MenuInput::Confirm => changed = self.exit(store, display, true),
            },
        }

        if self.is_active() {
            self.render(display);
        }
        changed
    }

    fn value1_wrap(&self) -> u8 {
        match self.scratch.action.kind {
            ActionKind::DictionaryEffect => dictionary::size(),
            _ => PROGRAM_WRAP,
        }
    }

    fn reload_scratch<S: NvStorage>(&mut self, store: &ConfigStore<S>) {
        if let Some(original) = store.slot(self.bank, self.preset) {
            self.scratch = original.clone();
        }
    }

    /// Name editing works on a fixed window of [`SLOT_NAME_LEN`]
    /// characters; shorter names are padded with spaces so the cursor
    /// always has a character to cycle.
    fn pad_scratch_name(&mut self) {
        let mut name = self.scratch.name().to_string();
        while name.len() < SLOT_NAME_LEN {
            name.push(' ');
        }
        self.scratch.set_name(&name);
    }

    fn trim_scratch_name(&mut self) {
        let trimmed = self.scratch.name().trim_end().to_string();
        self.scratch.set_name(&trimmed);
    }

    /// Cycle the character under the cursor through the printable
    /// range, space included: forward runs space → ... → Z → space,
    /// with the punctuation gap after space jumping straight to A.
    fn cycle_name_char(&mut self, step: i8) {
        let mut bytes: Vec<u8> = self.scratch.name().bytes().collect();
        let Some(ch) = bytes.get_mut(self.cursor) else {
            return;
        };

        if step > 0 {
            *ch = ch.wrapping_add(1);
            if *ch > b'Z' {
                *ch = b' ';
            }
            if *ch == b'!' {
                *ch = b'A';
            }
        } else {
            *ch = ch.wrapping_sub(1);
            if *ch < b' ' {
                *ch = b'Z';
            }
        }

        let name = String::from_utf8_lossy(&bytes).into_owned();
        self.scratch.set_name(&name);
    }

    fn render<D: DisplaySink>(&self, display: &mut D) {
        match self.state {
            MenuState::Off => {}
            MenuState::SelectSlot => {
                display.show(
                    &format!("EDIT BUTTON {}", self.preset + 1),
                    &format!("NOW: {}", self.scratch.name()),
                );
            }
            MenuState::EditName => {
                let mut caret = " ".repeat(self.cursor);
                caret.push('^');
                display.show(&format!("NAME: {}", self.scratch.name()), &caret);
            }
            MenuState::EditType => {
                let label = match self.scratch.action.kind {
                    ActionKind::Preset => "PRESET",
                    _ => "EFFECT",
                };
                display.show(&format!("TYPE: {label}"), "CHANGE [UP/DN]");
            }
            MenuState::EditValue1 => {
                let line1 = match self.scratch.action.kind {
                    ActionKind::DictionaryEffect => {
                        format!("FX: {}", dictionary::label_for_index(self.scratch.action.value1))
                    }
                    _ => format!("PROG NUM: {}", self.scratch.action.value1),
                };
                display.show(&line1, "[TOGGLE]=OK");
            }
            MenuState::EditValue2 => {
                display.show(
                    &format!("BANK NUM: {}", self.scratch.action.value2),
                    "LONG PRS=SAVE",
                );
            }
        }
    }
}

impl Default for MenuFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Step a value by one inside `0..wrap`, tolerating stored values past
/// the wrap bound (a remote edit may have written any byte).
fn cycle(value: u8, step: i8, wrap: u8) -> u8 {
    let wrap = wrap as i16;
    let next = (value as i16 + step as i16).rem_euclid(wrap);
    next as u8
}
