//! ConfigStore - persistent button/bank configuration
//!
//! Owns the versioned record set (banks × presets, global buttons, bank
//! names, active bank count) in working memory, mirrors it to
//! non-volatile storage, and provides the only mutation surface. Every
//! mutating operation persists the whole image before returning;
//! partial writes are not worth their complexity at human-paced write
//! frequency.

pub mod codec;
pub mod storage;
pub mod types;

pub use codec::SCHEMA_VERSION;
pub use storage::{FileStorage, MemStorage, NvStorage};
pub use types::{
    ActionKind, ActionSpec, Bank, ButtonConfig, ConfigImage, BANK_NAME_LEN, GLOBAL_BUTTONS,
    MAX_BANKS, PRESETS_PER_BANK, SLOT_NAME_LEN,
};

use thiserror::Error;
use tracing::{info, warn};

/// Typed failure modes of store operations. The protocol layer maps
/// each variant onto its wire response.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bank capacity reached ({MAX_BANKS})")]
    BankLimit,
    #[error("cannot remove the last remaining bank")]
    LastBank,
    #[error("index out of range")]
    OutOfRange,
    #[error("storage backend failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// The persistent configuration store.
///
/// Constructed once at startup; [`ConfigStore::begin`] gates the stored
/// image on its version tag and rebuilds defaults on mismatch. All
/// later mutation goes through the operations here, never through
/// direct field writes.
pub struct ConfigStore<S: NvStorage> {
    storage: S,
    image: ConfigImage,
}

impl<S: NvStorage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            image: ConfigImage::factory_defaults(),
        }
    }

    /// Load the stored image, or rebuild and persist defaults when the
    /// image is absent, truncated, or carries a different version tag.
    /// Always leaves the store valid and persisted.
    pub fn begin(&mut self) -> Result<(), StoreError> {
        match self.storage.load()? {
            Some(raw) => match codec::decode(&raw) {
                Ok(image) => {
                    self.image = image;
                    info!(
                        active_banks = self.image.active_banks,
                        "configuration loaded"
                    );
                    Ok(())
                }
                Err(e) => {
                    info!("no usable configuration ({e}), rebuilding defaults");
                    self.image = ConfigImage::factory_defaults();
                    self.save()
                }
            },
            None => {
                info!("no stored configuration, writing defaults");
                self.image = ConfigImage::factory_defaults();
                self.save()
            }
        }
    }

    /// Persist the current image. The in-memory image is left intact
    /// even when the backend fails.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let raw = codec::encode(&self.image);
        self.storage.store(&raw)?;
        Ok(())
    }

    /// Number of live banks, `1..=MAX_BANKS`.
    pub fn active_banks(&self) -> usize {
        self.image.active_banks
    }

    /// Read-only view of the full record set.
    pub fn image(&self) -> &ConfigImage {
        &self.image
    }

    /// Bounds against capacity, not the active count: editing an
    /// inactive bank ahead of activation is permitted.
    pub fn slot(&self, bank: usize, preset: usize) -> Option<&ButtonConfig> {
        self.image.banks.get(bank).and_then(|b| b.slots.get(preset))
    }

    pub fn global(&self, id: usize) -> Option<&ButtonConfig> {
        self.image.globals.get(id)
    }

    pub fn bank_name(&self, bank: usize) -> Option<&str> {
        self.image.banks.get(bank).map(|b| b.name())
    }

    /// Overwrite one slot and persist.
    pub fn write_slot(
        &mut self,
        bank: usize,
        preset: usize,
        config: ButtonConfig,
    ) -> Result<(), StoreError> {
        let slot = self
            .image
            .banks
            .get_mut(bank)
            .and_then(|b| b.slots.get_mut(preset))
            .ok_or(StoreError::OutOfRange)?;
        *slot = config;
        self.save()
    }

    /// Overwrite one global button and persist.
    pub fn write_global(&mut self, id: usize, config: ButtonConfig) -> Result<(), StoreError> {
        let slot = self
            .image
            .globals
            .get_mut(id)
            .ok_or(StoreError::OutOfRange)?;
        *slot = config;
        self.save()
    }

    /// Append a factory-initialized bank at the current count's index
    /// and persist. Fails without touching the store at capacity.
    pub fn add_bank(&mut self) -> Result<(), StoreError> {
        if self.image.active_banks == MAX_BANKS {
            return Err(StoreError::BankLimit);
        }
        let index = self.image.active_banks;
        self.image.banks[index] = Bank::factory(index);
        self.image.active_banks += 1;
        info!(index, "bank added");
        self.save()
    }

    /// Remove the bank at `index` (or the last bank when `None`),
    /// shifting every higher bank down one position. The vacated
    /// trailing slot is re-initialized and marked `EMPTY` so stale data
    /// cannot resurface if the bank is re-added.
    pub fn remove_bank(&mut self, index: Option<usize>) -> Result<(), StoreError> {
        if self.image.active_banks <= 1 {
            return Err(StoreError::LastBank);
        }
        let index = index.unwrap_or(self.image.active_banks - 1);
        if index >= self.image.active_banks {
            return Err(StoreError::OutOfRange);
        }

        for b in index..self.image.active_banks - 1 {
            self.image.banks[b] = self.image.banks[b + 1].clone();
        }

        self.image.active_banks -= 1;
        let vacated = self.image.active_banks;
        self.image.banks[vacated] = Bank::factory(vacated);
        self.image.banks[vacated].set_name("EMPTY");

        info!(index, remaining = self.image.active_banks, "bank removed");
        self.save()
    }

    /// Rename a bank, truncating to the name capacity. An out-of-range
    /// index is tolerated as a no-op, matching the device's historical
    /// behavior toward sloppy editors.
    pub fn rename_bank(&mut self, bank: usize, name: &str) -> Result<(), StoreError> {
        match self.image.banks.get_mut(bank) {
            Some(b) => {
                b.set_name(name);
                self.save()
            }
            None => {
                warn!(bank, "rename ignored, bank index out of range");
                Ok(())
            }
        }
    }

    /// Rebuild every bank, global, and the active count to built-in
    /// defaults. Does not persist; callers persist explicitly.
    pub fn reset_to_defaults(&mut self) {
        self.image = ConfigImage::factory_defaults();
    }
}
