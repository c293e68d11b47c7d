//! Remote control protocol handler
//!
//! Line-buffered command interpreter over an abstract byte stream: the
//! host editor sends one ASCII command per line and gets single-line
//! textual responses back, plus a multi-line dump for `GETALL`. The
//! handler never blocks waiting for input; an unterminated line simply
//! sits in the buffer until a terminator arrives or the buffer fills.

pub mod command;
pub mod line_buffer;

pub use command::{parse, Command, Parsed, Verb};
pub use line_buffer::{Feed, LineBuffer, LINE_CAPACITY};

use crate::store::{ConfigStore, NvStorage, MAX_BANKS, PRESETS_PER_BANK};
use std::time::Duration;
use tracing::{debug, warn};

/// Pause between bank/global records during a bulk dump, giving the
/// host editor time to ingest each line.
pub const BANK_RECORD_PACE: Duration = Duration::from_millis(5);

/// Pause between slot data records during a bulk dump.
pub const DATA_RECORD_PACE: Duration = Duration::from_millis(10);

/// Where response lines go. `pace` is called between bulk-dump records;
/// transports that need it sleep, everything else ignores it.
pub trait ResponseSink {
    fn send_line(&mut self, line: &str);

    fn pace(&mut self, delay: Duration) {
        let _ = delay;
    }
}

/// Collects responses in memory; the default sink for tests and for
/// transports that write in one batch.
#[derive(Default)]
pub struct LineCollector {
    pub lines: Vec<String>,
}

impl ResponseSink for LineCollector {
    fn send_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// The remote protocol handler: one bounded input buffer plus the
/// device identity announced on `HELLO`.
pub struct RemoteHandler {
    device_id: String,
    line: LineBuffer,
}

impl RemoteHandler {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            line: LineBuffer::new(LINE_CAPACITY),
        }
    }

    /// Feed received bytes, dispatching every completed line. Returns
    /// whether any command mutated the store, so the caller knows to
    /// refresh an on-device view.
    pub fn update<S: NvStorage, R: ResponseSink>(
        &mut self,
        store: &mut ConfigStore<S>,
        bytes: &[u8],
        out: &mut R,
    ) -> bool {
        let mut changed = false;
        for &byte in bytes {
            match self.line.push(byte) {
                Feed::None => {}
                Feed::Overflow => {
                    warn!("remote line overflow, input discarded");
                    out.send_line("ERR:BUFF_OVF");
                }
                Feed::Complete(line) => {
                    if self.dispatch(store, &line, out) {
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Dispatch one complete line. Returns whether the store was
    /// mutated.
    fn dispatch<S: NvStorage, R: ResponseSink>(
        &self,
        store: &mut ConfigStore<S>,
        line: &str,
        out: &mut R,
    ) -> bool {
        debug!(line, "remote command");

        let command = match parse(line) {
            Parsed::Unknown => return false,
            Parsed::Malformed(verb) => {
                match verb {
                    Verb::Save => out.send_line("ERR:SAVE_FAIL"),
                    Verb::SaveGlo => out.send_line("ERR:SAVE_GLO_FAIL"),
                    Verb::DelBank => out.send_line("ERR:MIN_BANKS"),
                    // A malformed rename is ignored, as it always was.
                    _ => {}
                }
                return false;
            }
            Parsed::Command(command) => command,
        };

        match command {
            Command::Hello => {
                out.send_line(&format!("READY:{}", self.device_id));
                false
            }

            Command::GetAll => {
                self.dump(store, out);
                false
            }

            Command::AddBank => match store.add_bank() {
                Ok(()) => {
                    out.send_line("OK:BANK_ADDED");
                    true
                }
                Err(e) => {
                    debug!("addbank rejected: {e}");
                    out.send_line("ERR:MAX_BANKS");
                    false
                }
            },

            Command::DelBank { index } => match store.remove_bank(index) {
                Ok(()) => {
                    out.send_line("OK:BANK_REMOVED");
                    true
                }
                Err(e) => {
                    debug!("delbank rejected: {e}");
                    out.send_line("ERR:MIN_BANKS");
                    false
                }
            },

            Command::SaveSlot {
                bank,
                preset,
                config,
            } => match store.write_slot(bank, preset, config) {
                Ok(()) => {
                    out.send_line("OK:SAVED");
                    true
                }
                Err(e) => {
                    warn!("slot write rejected: {e}");
                    out.send_line("ERR:SAVE_FAIL");
                    false
                }
            },

            Command::SaveGlobal { id, config } => match store.write_global(id, config) {
                Ok(()) => {
                    out.send_line("OK:SAVED_GLO");
                    true
                }
                Err(e) => {
                    warn!("global write rejected: {e}");
                    out.send_line("ERR:SAVE_GLO_FAIL");
                    false
                }
            },

            Command::RenameBank { bank, name } => match store.rename_bank(bank, &name) {
                Ok(()) => {
                    out.send_line("OK:BANK_RENAMED");
                    true
                }
                Err(e) => {
                    warn!("bank rename failed: {e}");
                    false
                }
            },

            Command::Reset => {
                store.reset_to_defaults();
                if let Err(e) = store.save() {
                    warn!("persisting reset failed: {e}");
                }
                out.send_line("OK:RESET_DONE");
                true
            }
        }
    }

    /// Serialize the entire store as the `GETALL` dump: header, bank
    /// count, every bank name (including inactive ones, so the editor
    /// can show the full capacity), the two globals, then one data line
    /// per active slot.
    fn dump<S: NvStorage, R: ResponseSink>(&self, store: &ConfigStore<S>, out: &mut R) {
        out.send_line("BEGIN:CONFIG");
        out.send_line(&format!("BANK_COUNT:{}", store.active_banks()));

        for bank in 0..MAX_BANKS {
            let name = store.bank_name(bank).unwrap_or_default();
            out.send_line(&format!("BANK:{bank}:{name}"));
            out.pace(BANK_RECORD_PACE);
        }

        for id in 0..crate::store::GLOBAL_BUTTONS {
            if let Some(button) = store.global(id) {
                let a = &button.action;
                out.send_line(&format!(
                    "DATAGLO:{id}:{}:{}:{}:{}",
                    button.name(),
                    a.kind,
                    a.value1,
                    a.value2
                ));
                out.pace(BANK_RECORD_PACE);
            }
        }

        for bank in 0..store.active_banks() {
            for preset in 0..PRESETS_PER_BANK {
                if let Some(button) = store.slot(bank, preset) {
                    let a = &button.action;
                    let lp = &button.long_press;
                    out.send_line(&format!(
                        "DATA:{bank}:{preset}:{}:{}:{}:{}:{}:{}:{}",
                        button.name(),
                        a.kind,
                        a.value1,
                        a.value2,
                        lp.kind,
                        lp.value1,
                        lp.value2
                    ));
                    out.pace(DATA_RECORD_PACE);
                }
            }
        }

        out.send_line("END:CONFIG");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStorage;

    fn fresh() -> (ConfigStore<MemStorage>, RemoteHandler) {
        let mut store = ConfigStore::new(MemStorage::new());
        store.begin().unwrap();
        (store, RemoteHandler::new("FOOTCTL_V3"))
    }

    fn send(
        handler: &mut RemoteHandler,
        store: &mut ConfigStore<MemStorage>,
        line: &str,
    ) -> (bool, Vec<String>) {
        let mut out = LineCollector::default();
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        let changed = handler.update(store, &bytes, &mut out);
        (changed, out.lines)
    }

    #[test]
    fn test_hello() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "HELLO");
        assert!(!changed);
        assert_eq!(lines, vec!["READY:FOOTCTL_V3"]);
    }

    #[test]
    fn test_getall_fresh_device() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "GETALL");
        assert!(!changed);

        assert_eq!(lines[0], "BEGIN:CONFIG");
        assert_eq!(lines[1], "BANK_COUNT:1");
        assert_eq!(lines[2], "BANK:0:BANK 0");
        // All four capacity slots are reported.
        assert_eq!(lines[5], "BANK:3:BANK 3");
        assert_eq!(lines[6], "DATAGLO:0:LAT:P:0:0");
        assert_eq!(lines[7], "DATAGLO:1:CEN:P:0:0");
        assert_eq!(lines[8], "DATA:0:0:P0-0:P:0:0:N:0:0");
        assert_eq!(lines[9], "DATA:0:1:P0-1:P:1:0:N:0:0");
        assert_eq!(lines[10], "DATA:0:2:P0-2:P:2:0:N:0:0");
        assert_eq!(lines[11], "END:CONFIG");
        assert_eq!(lines.len(), 12);
    }

    #[test]
    fn test_save_then_getall_reflects_write() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "SAVE:0:1:SOLO:P:5:2");
        assert!(changed);
        assert_eq!(lines, vec!["OK:SAVED"]);

        let (_, dump) = send(&mut handler, &mut store, "GETALL");
        assert!(dump.contains(&"DATA:0:1:SOLO:P:5:2:N:0:0".to_string()));
    }

    #[test]
    fn test_save_with_long_press_fields() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "SAVE:0:0:LOOP:D:7:0:C:60:127");
        assert!(changed);
        assert_eq!(lines, vec!["OK:SAVED"]);

        let (_, dump) = send(&mut handler, &mut store, "GETALL");
        assert!(dump.contains(&"DATA:0:0:LOOP:D:7:0:C:60:127".to_string()));
    }

    #[test]
    fn test_save_out_of_range_fails_cleanly() {
        let (mut store, mut handler) = fresh();
        let before = store.image().clone();
        let (changed, lines) = send(&mut handler, &mut store, "SAVE:9:0:SOLO:P:5:2");
        assert!(!changed);
        assert_eq!(lines, vec!["ERR:SAVE_FAIL"]);
        assert_eq!(*store.image(), before);
    }

    #[test]
    fn test_save_malformed_fails_cleanly() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "SAVE:0:0:SOLO:P:5");
        assert!(!changed);
        assert_eq!(lines, vec!["ERR:SAVE_FAIL"]);
    }

    #[test]
    fn test_saveglo() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "SAVEGLO:0:TUNE:D:6:0");
        assert!(changed);
        assert_eq!(lines, vec!["OK:SAVED_GLO"]);
        assert_eq!(store.global(0).unwrap().name(), "TUNE");

        let (changed, lines) = send(&mut handler, &mut store, "SAVEGLO:5:TUNE:D:6:0");
        assert!(!changed);
        assert_eq!(lines, vec!["ERR:SAVE_GLO_FAIL"]);
    }

    #[test]
    fn test_addbank_to_saturation() {
        let (mut store, mut handler) = fresh();
        for _ in 1..MAX_BANKS {
            let (changed, lines) = send(&mut handler, &mut store, "ADDBANK");
            assert!(changed);
            assert_eq!(lines, vec!["OK:BANK_ADDED"]);
        }

        let (changed, lines) = send(&mut handler, &mut store, "ADDBANK");
        assert!(!changed);
        assert_eq!(lines, vec!["ERR:MAX_BANKS"]);

        let (_, dump) = send(&mut handler, &mut store, "GETALL");
        assert_eq!(dump[1], format!("BANK_COUNT:{MAX_BANKS}"));
    }

    #[test]
    fn test_delbank_variants() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "DELBANK");
        assert!(!changed);
        assert_eq!(lines, vec!["ERR:MIN_BANKS"]);

        send(&mut handler, &mut store, "ADDBANK");
        send(&mut handler, &mut store, "ADDBANK");

        let (changed, lines) = send(&mut handler, &mut store, "DELBANK:0");
        assert!(changed);
        assert_eq!(lines, vec!["OK:BANK_REMOVED"]);
        assert_eq!(store.active_banks(), 2);

        let (changed, lines) = send(&mut handler, &mut store, "DELBANK");
        assert!(changed);
        assert_eq!(lines, vec!["OK:BANK_REMOVED"]);
        assert_eq!(store.active_banks(), 1);
    }

    #[test]
    fn test_savebank_rename() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "SAVEBANK:0:MAINSET");
        assert!(changed);
        assert_eq!(lines, vec!["OK:BANK_RENAMED"]);
        assert_eq!(store.bank_name(0), Some("MAINSET"));

        // Malformed renames stay silent.
        let (changed, lines) = send(&mut handler, &mut store, "SAVEBANK:0");
        assert!(!changed);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_reset() {
        let (mut store, mut handler) = fresh();
        send(&mut handler, &mut store, "ADDBANK");
        send(&mut handler, &mut store, "SAVE:0:0:XXXX:C:1:2");

        let (changed, lines) = send(&mut handler, &mut store, "RESET");
        assert!(changed);
        assert_eq!(lines, vec!["OK:RESET_DONE"]);
        assert_eq!(
            *store.image(),
            crate::store::ConfigImage::factory_defaults()
        );
    }

    #[test]
    fn test_unknown_verb_is_silent() {
        let (mut store, mut handler) = fresh();
        let (changed, lines) = send(&mut handler, &mut store, "BOGUS:1:2");
        assert!(!changed);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_overflow_reports_and_discards() {
        let (mut store, mut handler) = fresh();
        let mut out = LineCollector::default();
        let long = vec![b'A'; LINE_CAPACITY + 1];
        let changed = handler.update(&mut store, &long, &mut out);
        assert!(!changed);
        assert_eq!(out.lines, vec!["ERR:BUFF_OVF"]);

        // The stream recovers on the next terminated command.
        let (_, lines) = send(&mut handler, &mut store, "HELLO");
        assert_eq!(lines, vec!["READY:FOOTCTL_V3"]);
    }

    #[test]
    fn test_multiple_commands_in_one_feed() {
        let (mut store, mut handler) = fresh();
        let mut out = LineCollector::default();
        let changed = handler.update(&mut store, b"HELLO\r\nADDBANK\r\n", &mut out);
        assert!(changed);
        assert_eq!(out.lines, vec!["READY:FOOTCTL_V3", "OK:BANK_ADDED"]);
    }
}
