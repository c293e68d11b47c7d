//! MIDI output seam and action resolution
//!
//! The transport itself (USB serial, Bluetooth) is an external
//! collaborator; this module only resolves a configured action into the
//! program-change/control-change triple a transport would emit, behind
//! a sink trait so the control loop stays hardware-free.

use crate::dictionary;
use crate::store::{ActionKind, ActionSpec};
use tracing::info;

/// A message ready for the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    ProgramChange { program: u8, bank: u8 },
    ControlChange { controller: u8, value: u8 },
}

/// Anything that can carry a resolved event to the instrument.
pub trait MidiSink {
    fn send(&mut self, event: MidiEvent);
}

/// Log-backed sink for running without hardware.
pub struct LogMidiSink;

impl MidiSink for LogMidiSink {
    fn send(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::ProgramChange { program, bank } => {
                info!(program, bank, "midi program change")
            }
            MidiEvent::ControlChange { controller, value } => {
                info!(controller, value, "midi control change")
            }
        }
    }
}

/// Resolve an action into the event it stands for.
///
/// Dictionary actions look their CC number up in the built-in table
/// and fire with full value; an index past the table resolves to
/// nothing rather than a bogus controller. Custom CC passes the
/// configured value through (the historical convention is that 0 asks
/// the dispatcher to toggle). Inert actions resolve to nothing.
pub fn resolve(spec: &ActionSpec) -> Option<MidiEvent> {
    match spec.kind {
        ActionKind::Preset => Some(MidiEvent::ProgramChange {
            program: spec.value1,
            bank: spec.value2,
        }),
        ActionKind::DictionaryEffect => {
            dictionary::cc_for_index(spec.value1).map(|controller| MidiEvent::ControlChange {
                controller,
                value: 127,
            })
        }
        ActionKind::CustomCc => Some(MidiEvent::ControlChange {
            controller: spec.value1,
            value: spec.value2,
        }),
        ActionKind::None => None,
    }
}
