//! Configuration record types
//!
//! Defines the editable records the store owns: tagged actions, button
//! slots, banks, and the full persisted image.

/// Fixed bank capacity. Storage is pre-allocated for this many banks;
/// `active_banks` says how many are live.
pub const MAX_BANKS: usize = 4;

/// Slots per bank.
pub const PRESETS_PER_BANK: usize = 3;

/// Bank-independent button slots.
pub const GLOBAL_BUTTONS: usize = 2;

/// Visible characters in a slot name.
pub const SLOT_NAME_LEN: usize = 4;

/// Visible characters in a bank name.
pub const BANK_NAME_LEN: usize = 8;

/// What a button press maps to.
///
/// The wire and storage representation is the single-character tag
/// returned by [`ActionKind::as_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    /// Program change: `value1` = program number, `value2` = bank number
    Preset,
    /// Control change looked up in the effect dictionary: `value1` = index
    DictionaryEffect,
    /// Raw control change: `value1` = CC number, `value2` = value (0 = toggle)
    CustomCc,
    /// Slot does nothing
    #[default]
    None,
}

impl ActionKind {
    /// Single-character tag used on the wire and in the persisted image
    pub fn as_tag(&self) -> char {
        match self {
            ActionKind::Preset => 'P',
            ActionKind::DictionaryEffect => 'D',
            ActionKind::CustomCc => 'C',
            ActionKind::None => 'N',
        }
    }

    /// Parse a tag character; unknown tags yield `None`
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'P' => Some(ActionKind::Preset),
            'D' => Some(ActionKind::DictionaryEffect),
            'C' => Some(ActionKind::CustomCc),
            'N' => Some(ActionKind::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// A tagged action. The meaning of `value1`/`value2` depends on `kind`
/// (see [`ActionKind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub value1: u8,
    pub value2: u8,
}

impl ActionSpec {
    pub fn new(kind: ActionKind, value1: u8, value2: u8) -> Self {
        Self {
            kind,
            value1,
            value2,
        }
    }

    /// The inert action
    pub fn none() -> Self {
        Self::default()
    }
}

/// One editable slot: display name plus a primary action and a
/// long-press action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ButtonConfig {
    name: String,
    pub action: ActionSpec,
    pub long_press: ActionSpec,
}

impl ButtonConfig {
    pub fn new(name: &str, action: ActionSpec, long_press: ActionSpec) -> Self {
        Self {
            name: clamp_name(name, SLOT_NAME_LEN),
            action,
            long_press,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the display name, truncating to the slot capacity
    pub fn set_name(&mut self, name: &str) {
        self.name = clamp_name(name, SLOT_NAME_LEN);
    }
}

/// A named group of [`PRESETS_PER_BANK`] slots, selectable as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bank {
    name: String,
    pub slots: [ButtonConfig; PRESETS_PER_BANK],
}

impl Bank {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the bank name, truncating to the bank-name capacity
    pub fn set_name(&mut self, name: &str) {
        self.name = clamp_name(name, BANK_NAME_LEN);
    }

    /// Built-in defaults for the bank at `index`: name `BANK <i>`,
    /// slots `P<i>-<p>` mapped to consecutive program numbers.
    pub fn factory(index: usize) -> Self {
        let mut bank = Bank::default();
        bank.set_name(&format!("BANK {index}"));
        for (p, slot) in bank.slots.iter_mut().enumerate() {
            slot.set_name(&format!("P{index}-{p}"));
            slot.action = ActionSpec::new(
                ActionKind::Preset,
                (index * PRESETS_PER_BANK + p) as u8,
                0,
            );
            slot.long_press = ActionSpec::none();
        }
        bank
    }
}

/// The full persisted value: active bank count, the pre-allocated bank
/// array, and the two global buttons. This is what the codec writes and
/// what `save()` followed by `load()` must reproduce bit-identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigImage {
    /// Live banks, `1..=MAX_BANKS`; banks at or above this index are
    /// retained in storage but not shown.
    pub active_banks: usize,
    pub banks: [Bank; MAX_BANKS],
    pub globals: [ButtonConfig; GLOBAL_BUTTONS],
}

impl ConfigImage {
    /// Built-in defaults: one active bank, every bank slot initialized
    /// to its factory mapping, globals `LAT` and `CEN`.
    pub fn factory_defaults() -> Self {
        let banks = std::array::from_fn(Bank::factory);

        let global = |name: &str| {
            ButtonConfig::new(
                name,
                ActionSpec::new(ActionKind::Preset, 0, 0),
                ActionSpec::none(),
            )
        };

        Self {
            active_banks: 1,
            banks,
            globals: [global("LAT"), global("CEN")],
        }
    }
}

impl Default for ConfigImage {
    fn default() -> Self {
        Self::factory_defaults()
    }
}

/// Truncate a display name to `cap` characters. The display is a plain
/// character LCD and the storage layout is one byte per character, so
/// anything outside the printable ASCII range is dropped.
pub(crate) fn clamp_name(name: &str, cap: usize) -> String {
    name.chars()
        .filter(|c| (' '..='~').contains(c))
        .take(cap)
        .collect()
}
