//! Versioned binary layout for the persisted configuration image
//!
//! The image is a fixed sequence of little-endian fields:
//! version tag, active bank count, every bank's button records, the two
//! global records, then the bank name strings. The version tag is the
//! sole migration gate: a mismatch invalidates the whole image and the
//! caller rebuilds from defaults. The layout is substrate-agnostic; any
//! [`super::storage::NvStorage`] backend carries the same bytes.

use super::types::{
    ActionKind, ActionSpec, Bank, ButtonConfig, ConfigImage, BANK_NAME_LEN, GLOBAL_BUTTONS,
    MAX_BANKS, PRESETS_PER_BANK, SLOT_NAME_LEN,
};
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tracing::warn;

/// Schema tag written ahead of the image. Bump whenever the layout
/// changes; every prior image is then discarded on load.
pub const SCHEMA_VERSION: u32 = 0x4643_0006;

/// One button record: name bytes (incl. terminator), kind tag, two
/// values, then the long-press triple.
const BUTTON_RECORD_LEN: usize = SLOT_NAME_LEN + 1 + 6;

/// Total image size in bytes.
pub const IMAGE_LEN: usize = 8
    + (MAX_BANKS * PRESETS_PER_BANK + GLOBAL_BUTTONS) * BUTTON_RECORD_LEN
    + MAX_BANKS * (BANK_NAME_LEN + 1);

/// Why a stored image could not be decoded. Callers treat any variant
/// as "no prior configuration".
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("schema version mismatch (found {found:#010x}, expected {SCHEMA_VERSION:#010x})")]
    VersionMismatch { found: u32 },
    #[error("image truncated ({len} bytes, expected {IMAGE_LEN})")]
    Truncated { len: usize },
}

/// Serialize the image into its fixed layout.
pub fn encode(image: &ConfigImage) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(IMAGE_LEN);

    buf.put_u32_le(SCHEMA_VERSION);
    buf.put_u32_le(image.active_banks as u32);

    for bank in &image.banks {
        for slot in &bank.slots {
            put_button(&mut buf, slot);
        }
    }
    for global in &image.globals {
        put_button(&mut buf, global);
    }
    for bank in &image.banks {
        put_name(&mut buf, bank.name(), BANK_NAME_LEN);
    }

    debug_assert_eq!(buf.len(), IMAGE_LEN);
    buf.to_vec()
}

/// Deserialize an image, gating on the version tag. The active bank
/// count is clamped into its valid range and unknown action tags are
/// normalized to [`ActionKind::None`].
pub fn decode(raw: &[u8]) -> Result<ConfigImage, DecodeError> {
    if raw.len() < IMAGE_LEN {
        return Err(DecodeError::Truncated { len: raw.len() });
    }

    let mut buf = raw;
    let found = buf.get_u32_le();
    if found != SCHEMA_VERSION {
        return Err(DecodeError::VersionMismatch { found });
    }

    let active_banks = (buf.get_u32_le() as usize).clamp(1, MAX_BANKS);

    let mut image = ConfigImage {
        active_banks,
        banks: std::array::from_fn(|_| Bank::default()),
        globals: std::array::from_fn(|_| ButtonConfig::default()),
    };

    for bank in image.banks.iter_mut() {
        for slot in bank.slots.iter_mut() {
            *slot = get_button(&mut buf);
        }
    }
    for global in image.globals.iter_mut() {
        *global = get_button(&mut buf);
    }
    for bank in image.banks.iter_mut() {
        let name = get_name(&mut buf, BANK_NAME_LEN);
        bank.set_name(&name);
    }

    Ok(image)
}

fn put_button(buf: &mut BytesMut, slot: &ButtonConfig) {
    put_name(buf, slot.name(), SLOT_NAME_LEN);
    put_action(buf, &slot.action);
    put_action(buf, &slot.long_press);
}

fn put_action(buf: &mut BytesMut, action: &ActionSpec) {
    buf.put_u8(action.kind.as_tag() as u8);
    buf.put_u8(action.value1);
    buf.put_u8(action.value2);
}

fn get_button(buf: &mut &[u8]) -> ButtonConfig {
    let name = get_name(buf, SLOT_NAME_LEN);
    let action = get_action(buf);
    let long_press = get_action(buf);
    ButtonConfig::new(&name, action, long_press)
}

fn get_action(buf: &mut &[u8]) -> ActionSpec {
    let tag = buf.get_u8() as char;
    let value1 = buf.get_u8();
    let value2 = buf.get_u8();
    let kind = ActionKind::from_tag(tag).unwrap_or_else(|| {
        warn!("unrecognized action tag {tag:?} in stored image, treating as none");
        ActionKind::None
    });
    ActionSpec::new(kind, value1, value2)
}

/// Write a name as `cap` bytes plus a NUL terminator, zero-padded.
fn put_name(buf: &mut BytesMut, name: &str, cap: usize) {
    let bytes = name.as_bytes();
    let take = bytes.len().min(cap);
    buf.put_slice(&bytes[..take]);
    buf.put_bytes(0, cap + 1 - take);
}

/// Read a `cap + 1` byte name field, stopping at the terminator.
fn get_name(buf: &mut &[u8], cap: usize) -> String {
    let mut field = vec![0u8; cap + 1];
    buf.copy_to_slice(&mut field);
    let end = field.iter().position(|&b| b == 0).unwrap_or(cap);
    String::from_utf8_lossy(&field[..end]).into_owned()
}
