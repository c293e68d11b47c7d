//! footctl - control core of a foot-operated MIDI switcher
//!
//! Tracks physical button state, stores a user-editable mapping from
//! buttons to MIDI actions in non-volatile storage, and exposes that
//! mapping to both an on-device menu and a host-side editor over a
//! line-oriented byte protocol. The character display and the MIDI
//! transport are external collaborators behind sink traits.

pub mod device;
pub mod dictionary;
pub mod display;
pub mod input;
pub mod menu;
pub mod midi;
pub mod remote;
pub mod settings;
pub mod store;
