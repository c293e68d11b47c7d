//! Single-threaded control loop
//!
//! One cooperative tick: scan the physical buttons, feed any received
//! protocol bytes, and advance the menu. Exactly one mutation path
//! (menu or protocol) acts on the store per tick, preserving the
//! single-writer model without any locking.
//!
//! Button roles follow the pedalboard layout: three preset buttons for
//! the active bank plus the two bank-independent globals. While the
//! menu is open the preset buttons turn into decrement / increment /
//! confirm, and the second global (the one that opened the menu with a
//! long press) cancels with another long press.

use crate::display::DisplaySink;
use crate::input::{Debouncer, Edge};
use crate::menu::{MenuFsm, MenuInput};
use crate::midi::{self, MidiSink};
use crate::remote::{RemoteHandler, ResponseSink};
use crate::store::{ButtonConfig, ConfigStore, NvStorage, GLOBAL_BUTTONS, PRESETS_PER_BANK};
use std::time::{Duration, Instant};
use tracing::debug;

/// Global button that opens/cancels the menu on a long press.
const MENU_BUTTON: usize = 1;

/// Raw (electrical, pull-up inverted) levels for one scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonLevels {
    pub presets: [bool; PRESETS_PER_BANK],
    pub globals: [bool; GLOBAL_BUTTONS],
}

/// The assembled device core.
pub struct Device<S: NvStorage> {
    store: ConfigStore<S>,
    remote: RemoteHandler,
    menu: MenuFsm,
    presets: [Debouncer; PRESETS_PER_BANK],
    globals: [Debouncer; GLOBAL_BUTTONS],
    active_bank: usize,
}

impl<S: NvStorage> Device<S> {
    /// Build the core around an already-begun store.
    pub fn new(
        store: ConfigStore<S>,
        remote: RemoteHandler,
        debounce: Duration,
        long_press: Duration,
        now: Instant,
    ) -> Self {
        Self {
            store,
            remote,
            menu: MenuFsm::new(),
            presets: std::array::from_fn(|_| Debouncer::new(debounce, long_press, now)),
            globals: std::array::from_fn(|_| Debouncer::new(debounce, long_press, now)),
            active_bank: 0,
        }
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    pub fn active_bank(&self) -> usize {
        self.active_bank
    }

    /// Select the bank the preset buttons act on, clamped to the live
    /// range.
    pub fn select_bank(&mut self, bank: usize) {
        self.active_bank = bank.min(self.store.active_banks() - 1);
    }

    /// One scan cycle. Returns whether the configuration changed (so
    /// the caller refreshes any idle view).
    pub fn tick<M, D, R>(
        &mut self,
        levels: ButtonLevels,
        rx: &[u8],
        now: Instant,
        midi_out: &mut M,
        display: &mut D,
        remote_out: &mut R,
    ) -> bool
    where
        M: MidiSink,
        D: DisplaySink,
        R: ResponseSink,
    {
        let mut changed = self.remote.update(&mut self.store, rx, remote_out);

        // A removed bank can leave the selection past the live range.
        if self.active_bank >= self.store.active_banks() {
            self.active_bank = self.store.active_banks() - 1;
        }

        for (id, button) in self.globals.iter_mut().enumerate() {
            let edge = button.poll(levels.globals[id], now);
            match edge {
                Edge::None | Edge::Released => continue,
                Edge::LongPressed if id == MENU_BUTTON => {
                    if self.menu.is_active() {
                        self.menu.exit(&mut self.store, display, false);
                    } else {
                        self.menu.enter(&self.store, display, self.active_bank);
                    }
                }
                _ if self.menu.is_active() => {
                    // Globals other than the menu gesture are inert
                    // while editing.
                }
                edge => {
                    if let Some(config) = self.store.global(id) {
                        dispatch(config, edge, midi_out);
                    }
                }
            }
        }

        for (preset, button) in self.presets.iter_mut().enumerate() {
            let edge = button.poll(levels.presets[preset], now);
            if edge == Edge::None || edge == Edge::Released {
                continue;
            }

            if self.menu.is_active() {
                if edge == Edge::Pressed {
                    let input = match preset {
                        0 => MenuInput::Decrement,
                        1 => MenuInput::Increment,
                        _ => MenuInput::Confirm,
                    };
                    if self.menu.handle(&mut self.store, display, input) {
                        changed = true;
                    }
                }
                continue;
            }

            if let Some(config) = self.store.slot(self.active_bank, preset) {
                dispatch(config, edge, midi_out);
            }
        }

        changed
    }
}

/// Fire the action a debounced edge selects: the primary action on a
/// short click, the long-press action on a long press.
fn dispatch<M: MidiSink>(config: &ButtonConfig, edge: Edge, midi_out: &mut M) {
    let spec = match edge {
        Edge::Pressed => &config.action,
        Edge::LongPressed => &config.long_press,
        _ => return,
    };

    match midi::resolve(spec) {
        Some(event) => midi_out.send(event),
        None => debug!(slot = config.name(), "edge resolved to no action"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiEvent;
    use crate::remote::LineCollector;
    use crate::store::MemStorage;

    const DEBOUNCE: Duration = Duration::from_millis(50);
    const LONG_PRESS: Duration = Duration::from_millis(1000);

    #[derive(Default)]
    struct RecordingMidi {
        events: Vec<MidiEvent>,
    }

    impl MidiSink for RecordingMidi {
        fn send(&mut self, event: MidiEvent) {
            self.events.push(event);
        }
    }

    #[derive(Default)]
    struct NullDisplay;

    impl DisplaySink for NullDisplay {
        fn show(&mut self, _line1: &str, _line2: &str) {}
        fn show_message(&mut self, _line1: &str, _line2: &str, _hold: Duration) {}
    }

    struct Harness {
        device: Device<MemStorage>,
        midi: RecordingMidi,
        display: NullDisplay,
        remote: LineCollector,
        start: Instant,
        clock_ms: u64,
    }

    impl Harness {
        fn new() -> Self {
            let mut store = ConfigStore::new(MemStorage::new());
            store.begin().unwrap();
            let start = Instant::now();
            Self {
                device: Device::new(
                    store,
                    RemoteHandler::new("FOOTCTL_V3"),
                    DEBOUNCE,
                    LONG_PRESS,
                    start,
                ),
                midi: RecordingMidi::default(),
                display: NullDisplay,
                remote: LineCollector::default(),
                start,
                clock_ms: 0,
            }
        }

        /// Hold the given levels for `ms` scan cycles at 1 ms.
        fn scan(&mut self, levels: ButtonLevels, ms: u64) {
            for _ in 0..ms {
                self.clock_ms += 1;
                let now = self.start + Duration::from_millis(self.clock_ms);
                self.device.tick(
                    levels,
                    &[],
                    now,
                    &mut self.midi,
                    &mut self.display,
                    &mut self.remote,
                );
            }
        }

        fn press_preset(&mut self, preset: usize, hold_ms: u64) {
            let mut levels = ButtonLevels::default();
            levels.presets[preset] = true;
            self.scan(levels, hold_ms);
            self.scan(ButtonLevels::default(), 100);
        }

        fn press_global(&mut self, id: usize, hold_ms: u64) {
            let mut levels = ButtonLevels::default();
            levels.globals[id] = true;
            self.scan(levels, hold_ms);
            self.scan(ButtonLevels::default(), 100);
        }
    }

    #[test]
    fn test_preset_click_dispatches_primary_action() {
        let mut h = Harness::new();
        h.press_preset(1, 200);
        assert_eq!(
            h.midi.events,
            vec![MidiEvent::ProgramChange { program: 1, bank: 0 }]
        );
    }

    #[test]
    fn test_preset_long_press_dispatches_secondary_action() {
        let mut h = Harness::new();
        // Give preset 0 a long-press action first.
        h.device.tick(
            ButtonLevels::default(),
            b"SAVE:0:0:P0-0:P:0:0:C:60:127\n",
            h.start,
            &mut h.midi,
            &mut h.display,
            &mut h.remote,
        );

        h.press_preset(0, 1500);
        assert_eq!(
            h.midi.events,
            vec![MidiEvent::ControlChange {
                controller: 60,
                value: 127
            }]
        );
    }

    #[test]
    fn test_long_press_on_menu_global_enters_menu() {
        let mut h = Harness::new();
        assert!(!h.device.menu.is_active());
        h.press_global(MENU_BUTTON, 1500);
        assert!(h.device.menu.is_active());

        // While editing, preset clicks drive the menu, not MIDI.
        h.press_preset(1, 200);
        assert!(h.midi.events.is_empty());

        // Another long press cancels.
        h.press_global(MENU_BUTTON, 1500);
        assert!(!h.device.menu.is_active());
    }

    #[test]
    fn test_menu_commit_through_buttons_mutates_store() {
        let mut h = Harness::new();
        h.press_global(MENU_BUTTON, 1500); // enter menu on slot (0, 0)
        h.press_preset(2, 200); // confirm -> edit name
        for _ in 0..4 {
            h.press_preset(2, 200); // accept each name character
        }
        h.press_preset(2, 200); // keep Preset kind
        h.press_preset(1, 200); // program 0 -> 1
        h.press_preset(2, 200); // -> bank number
        h.press_preset(2, 200); // commit

        assert!(!h.device.menu.is_active());
        let slot = h.device.store().slot(0, 0).unwrap();
        assert_eq!(slot.action.value1, 1);
    }

    #[test]
    fn test_remote_bytes_flow_through_tick() {
        let mut h = Harness::new();
        let changed = h.device.tick(
            ButtonLevels::default(),
            b"ADDBANK\n",
            h.start,
            &mut h.midi,
            &mut h.display,
            &mut h.remote,
        );
        assert!(changed);
        assert_eq!(h.remote.lines, vec!["OK:BANK_ADDED"]);
        assert_eq!(h.device.store().active_banks(), 2);
    }

    #[test]
    fn test_bank_selection_clamps_after_removal() {
        let mut h = Harness::new();
        h.device.tick(
            ButtonLevels::default(),
            b"ADDBANK\n",
            h.start,
            &mut h.midi,
            &mut h.display,
            &mut h.remote,
        );
        h.device.select_bank(1);
        assert_eq!(h.device.active_bank(), 1);

        h.device.tick(
            ButtonLevels::default(),
            b"DELBANK\n",
            h.start,
            &mut h.midi,
            &mut h.display,
            &mut h.remote,
        );
        assert_eq!(h.device.active_bank(), 0);
    }
}
