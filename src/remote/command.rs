//! Command grammar for the remote protocol
//!
//! One command per line, fields colon-delimited. Parsing is a pure
//! function from a line to a [`Parsed`] value; it touches no I/O and no
//! store state, so the grammar is testable in isolation.

use crate::store::{ActionKind, ActionSpec, ButtonConfig};

/// Recognized command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Hello,
    GetAll,
    AddBank,
    DelBank,
    Save,
    SaveGlo,
    SaveBank,
    Reset,
}

impl Verb {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "HELLO" => Some(Verb::Hello),
            "GETALL" => Some(Verb::GetAll),
            "ADDBANK" => Some(Verb::AddBank),
            "DELBANK" => Some(Verb::DelBank),
            "SAVE" => Some(Verb::Save),
            "SAVEGLO" => Some(Verb::SaveGlo),
            "SAVEBANK" => Some(Verb::SaveBank),
            "RESET" => Some(Verb::Reset),
            _ => None,
        }
    }
}

/// A fully parsed command with validated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Hello,
    GetAll,
    AddBank,
    /// `index` absent means "remove the last bank".
    DelBank { index: Option<usize> },
    SaveSlot {
        bank: usize,
        preset: usize,
        config: ButtonConfig,
    },
    SaveGlobal {
        id: usize,
        config: ButtonConfig,
    },
    RenameBank { bank: usize, name: String },
    Reset,
}

/// Parse outcome. A known verb with unusable arguments is reported as
/// [`Parsed::Malformed`] so the dispatcher can answer with that verb's
/// failure line; an unknown verb stays silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Command(Command),
    Malformed(Verb),
    Unknown,
}

/// Parse one line. Fields past the ones a verb consumes are ignored.
pub fn parse(line: &str) -> Parsed {
    let mut fields = line.split(':');
    let verb = match fields.next().and_then(Verb::from_token) {
        Some(verb) => verb,
        None => return Parsed::Unknown,
    };

    match verb {
        Verb::Hello => Parsed::Command(Command::Hello),
        Verb::GetAll => Parsed::Command(Command::GetAll),
        Verb::AddBank => Parsed::Command(Command::AddBank),
        Verb::Reset => Parsed::Command(Command::Reset),

        Verb::DelBank => match fields.next() {
            None => Parsed::Command(Command::DelBank { index: None }),
            Some(token) => match token.parse::<usize>() {
                Ok(index) => Parsed::Command(Command::DelBank { index: Some(index) }),
                Err(_) => Parsed::Malformed(verb),
            },
        },

        Verb::Save => parse_save(&mut fields).map_or(Parsed::Malformed(verb), Parsed::Command),
        Verb::SaveGlo => {
            parse_save_global(&mut fields).map_or(Parsed::Malformed(verb), Parsed::Command)
        }
        Verb::SaveBank => {
            parse_rename(&mut fields).map_or(Parsed::Malformed(verb), Parsed::Command)
        }
    }
}

/// `SAVE:bank:preset:name:kind:v1:v2[:lpKind:lpv1:lpv2]`
///
/// The three long-press fields are optional as a unit; the legacy
/// 6-field form leaves the long-press action inert.
fn parse_save<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Option<Command> {
    let bank = fields.next()?.parse::<usize>().ok()?;
    let preset = fields.next()?.parse::<usize>().ok()?;
    let name = non_empty(fields.next()?)?;
    let action = parse_action_triple(fields)?;

    let long_press = match fields.next() {
        Some(tag) => {
            let kind = parse_kind(tag)?;
            match (fields.next(), fields.next()) {
                (Some(v1), Some(v2)) => ActionSpec::new(
                    kind,
                    v1.parse::<u8>().ok()?,
                    v2.parse::<u8>().ok()?,
                ),
                // A dangling partial long-press triple falls back to
                // inert, as the device always accepted.
                _ => ActionSpec::none(),
            }
        }
        None => ActionSpec::none(),
    };

    Some(Command::SaveSlot {
        bank,
        preset,
        config: ButtonConfig::new(name, action, long_press),
    })
}

/// `SAVEGLO:id:name:kind:v1:v2`
fn parse_save_global<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Option<Command> {
    let id = fields.next()?.parse::<usize>().ok()?;
    let name = non_empty(fields.next()?)?;
    let action = parse_action_triple(fields)?;

    Some(Command::SaveGlobal {
        id,
        config: ButtonConfig::new(name, action, ActionSpec::none()),
    })
}

/// `SAVEBANK:bank:name`
fn parse_rename<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Option<Command> {
    let bank = fields.next()?.parse::<usize>().ok()?;
    let name = non_empty(fields.next()?)?;
    Some(Command::RenameBank {
        bank,
        name: name.to_string(),
    })
}

fn parse_action_triple<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Option<ActionSpec> {
    let kind = parse_kind(fields.next()?)?;
    let value1 = fields.next()?.parse::<u8>().ok()?;
    let value2 = fields.next()?.parse::<u8>().ok()?;
    Some(ActionSpec::new(kind, value1, value2))
}

fn parse_kind(token: &str) -> Option<ActionKind> {
    let mut chars = token.chars();
    let tag = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    ActionKind::from_tag(tag)
}

fn non_empty(token: &str) -> Option<&str> {
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_verbs() {
        assert_eq!(parse("HELLO"), Parsed::Command(Command::Hello));
        assert_eq!(parse("GETALL"), Parsed::Command(Command::GetAll));
        assert_eq!(parse("ADDBANK"), Parsed::Command(Command::AddBank));
        assert_eq!(parse("RESET"), Parsed::Command(Command::Reset));
    }

    #[test]
    fn test_parse_delbank_variants() {
        assert_eq!(
            parse("DELBANK"),
            Parsed::Command(Command::DelBank { index: None })
        );
        assert_eq!(
            parse("DELBANK:2"),
            Parsed::Command(Command::DelBank { index: Some(2) })
        );
        assert_eq!(parse("DELBANK:two"), Parsed::Malformed(Verb::DelBank));
    }

    #[test]
    fn test_parse_save_full_form() {
        let parsed = parse("SAVE:0:1:SOLO:P:5:2:C:60:0");
        let expected = Command::SaveSlot {
            bank: 0,
            preset: 1,
            config: ButtonConfig::new(
                "SOLO",
                ActionSpec::new(ActionKind::Preset, 5, 2),
                ActionSpec::new(ActionKind::CustomCc, 60, 0),
            ),
        };
        assert_eq!(parsed, Parsed::Command(expected));
    }

    #[test]
    fn test_parse_save_legacy_form_defaults_long_press() {
        let parsed = parse("SAVE:0:1:SOLO:P:5:2");
        match parsed {
            Parsed::Command(Command::SaveSlot { config, .. }) => {
                assert_eq!(config.long_press, ActionSpec::none());
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_save_rejects_bad_fields() {
        assert_eq!(parse("SAVE:0:1:SOLO:P:5"), Parsed::Malformed(Verb::Save));
        assert_eq!(parse("SAVE:0:1:SOLO:X:5:2"), Parsed::Malformed(Verb::Save));
        assert_eq!(
            parse("SAVE:0:1:SOLO:P:300:2"),
            Parsed::Malformed(Verb::Save)
        );
        assert_eq!(parse("SAVE:a:1:SOLO:P:5:2"), Parsed::Malformed(Verb::Save));
        assert_eq!(parse("SAVE:0:1::P:5:2"), Parsed::Malformed(Verb::Save));
    }

    #[test]
    fn test_parse_save_truncates_name() {
        match parse("SAVE:0:0:OVERLONG:P:1:0") {
            Parsed::Command(Command::SaveSlot { config, .. }) => {
                assert_eq!(config.name(), "OVER");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_saveglo() {
        let parsed = parse("SAVEGLO:1:TUNE:D:6:0");
        let expected = Command::SaveGlobal {
            id: 1,
            config: ButtonConfig::new(
                "TUNE",
                ActionSpec::new(ActionKind::DictionaryEffect, 6, 0),
                ActionSpec::none(),
            ),
        };
        assert_eq!(parsed, Parsed::Command(expected));
        assert_eq!(parse("SAVEGLO:1:TUNE:D:6"), Parsed::Malformed(Verb::SaveGlo));
    }

    #[test]
    fn test_parse_savebank() {
        assert_eq!(
            parse("SAVEBANK:2:STAGE"),
            Parsed::Command(Command::RenameBank {
                bank: 2,
                name: "STAGE".to_string()
            })
        );
        assert_eq!(parse("SAVEBANK:2"), Parsed::Malformed(Verb::SaveBank));
        assert_eq!(parse("SAVEBANK:x:STAGE"), Parsed::Malformed(Verb::SaveBank));
    }

    #[test]
    fn test_unknown_verbs() {
        assert_eq!(parse("PING"), Parsed::Unknown);
        assert_eq!(parse("hello"), Parsed::Unknown); // verbs are upper-case
        assert_eq!(parse(""), Parsed::Unknown);
    }
}
