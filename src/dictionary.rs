//! Built-in effect dictionary
//!
//! Fixed, read-only table mapping a symbolic effect name to the MIDI
//! control-change number the target unit listens on. Dictionary-kind
//! actions reference entries by index; the menu and the host editor
//! both present the labels.

/// One dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDef {
    pub label: &'static str,
    pub cc: u8,
}

/// Common functions of the supported multi-effects unit.
pub const EFFECTS: [EffectDef; 14] = [
    EffectDef { label: "DIST", cc: 49 },
    EffectDef { label: "AMP", cc: 50 },
    EffectDef { label: "MOD", cc: 54 },
    EffectDef { label: "DLY", cc: 55 },
    EffectDef { label: "REV", cc: 56 },
    EffectDef { label: "WAH", cc: 57 },
    EffectDef { label: "TUNER", cc: 58 },
    EffectDef { label: "LOOP", cc: 59 },
    EffectDef { label: "L.REC", cc: 60 },
    EffectDef { label: "L.PLY", cc: 62 },
    EffectDef { label: "CTRL1", cc: 69 },
    EffectDef { label: "CTRL2", cc: 70 },
    EffectDef { label: "CTRL3", cc: 71 },
    EffectDef { label: "TAP", cc: 75 },
];

/// Number of dictionary entries, as stored in `value1` fields.
pub fn size() -> u8 {
    EFFECTS.len() as u8
}

/// Control-change number for a dictionary index.
pub fn cc_for_index(index: u8) -> Option<u8> {
    EFFECTS.get(index as usize).map(|e| e.cc)
}

/// Display label for a dictionary index; out-of-range indices render
/// as a placeholder so the display never shows garbage.
pub fn label_for_index(index: u8) -> &'static str {
    EFFECTS.get(index as usize).map_or("???", |e| e.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(cc_for_index(0), Some(49));
        assert_eq!(label_for_index(0), "DIST");
        assert_eq!(cc_for_index(13), Some(75));
        assert_eq!(label_for_index(13), "TAP");
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(cc_for_index(size()), None);
        assert_eq!(label_for_index(200), "???");
    }
}
