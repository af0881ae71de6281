//! Persistent storage for the fixture address.
//!
//! When no address is configured the link task scans for an SNL660 and
//! remembers what it found, so the next boot connects straight away.
//! The record lives in the nRF52840's internal flash via the
//! `sequential-storage` crate (embedded builds only); the record codec is
//! plain logic and tested on the host.
//!
//! Record layout:
//!   `[6 addr (SoftDevice byte order)][1 addr type][1 name_len][name_bytes...]`

use heapless::String;

const HEADER_LEN: usize = 8;

/// Longest stored name, in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Maximum serialized size of a fixture record.
/// 6 addr + 1 type + 1 name_len + 32 name = 40 bytes.
pub const MAX_RECORD_SIZE: usize = HEADER_LEN + MAX_NAME_LEN;

/// The fixture the firmware paired itself with.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixtureRecord {
    /// BLE address bytes as the SoftDevice reports them (LSB first).
    pub address: [u8; 6],
    /// SoftDevice address type (0 = public, 1 = random static, ...).
    pub address_type: u8,
    /// Advertised name, for logs.
    pub name: String<MAX_NAME_LEN>,
}

impl FixtureRecord {
    /// Create a new record, truncating the name to fit.
    pub fn new(address: [u8; 6], address_type: u8, name: &str) -> Self {
        let mut n: String<MAX_NAME_LEN> = String::new();
        for c in name.chars() {
            if n.push(c).is_err() {
                break;
            }
        }
        Self {
            address,
            address_type,
            name: n,
        }
    }

    /// Serialize to bytes for flash storage. Returns 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let name_bytes = self.name.as_bytes();
        let total = HEADER_LEN + name_bytes.len();
        if buf.len() < total {
            return 0;
        }

        buf[0..6].copy_from_slice(&self.address);
        buf[6] = self.address_type;
        buf[7] = name_bytes.len() as u8;
        buf[HEADER_LEN..total].copy_from_slice(name_bytes);
        total
    }

    /// Deserialize from bytes.
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }

        let mut address = [0u8; 6];
        address.copy_from_slice(&data[0..6]);
        let address_type = data[6];
        let name_len = data[7] as usize;

        if data.len() < HEADER_LEN + name_len {
            return None;
        }

        let name = core::str::from_utf8(&data[HEADER_LEN..HEADER_LEN + name_len]).unwrap_or("");
        Some(Self::new(address, address_type, name))
    }
}

#[cfg(feature = "embedded")]
pub use flash::{FixtureStore, FIXTURE_STORE};

#[cfg(feature = "embedded")]
mod flash {
    use super::{FixtureRecord, MAX_RECORD_SIZE};
    use crate::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
    use crate::error::Error;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::mutex::Mutex;

    /// Flash page size for nRF52840 (4 KB).
    const FLASH_PAGE_SIZE: u32 = 4096;

    /// Start address of our storage region.
    const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

    /// End address (exclusive) of our storage region.
    const STORAGE_END: u32 =
        (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

    /// Key for the fixture record in the map storage.
    const KEY_FIXTURE: u8 = 0x01;

    /// Scratch buffer for map operations: the serialized key plus one record.
    const MAP_BUF_SIZE: usize = MAX_RECORD_SIZE + 8;

    /// In-memory cache of the fixture record, synced with flash.
    pub struct FixtureStore {
        fixture: Option<FixtureRecord>,
        /// Dirty flag - true if cache differs from flash.
        dirty: bool,
    }

    impl FixtureStore {
        pub const fn new() -> Self {
            Self {
                fixture: None,
                dirty: false,
            }
        }

        /// Async load from flash using sequential-storage.
        pub async fn load_from_flash(
            &mut self,
            flash: &mut impl embedded_storage_async::nor_flash::NorFlash,
        ) -> Result<(), Error> {
            let mut buf = [0u8; MAP_BUF_SIZE];

            let fetched = sequential_storage::map::fetch_item::<u8, &[u8], _>(
                flash,
                STORAGE_START..STORAGE_END,
                &mut sequential_storage::cache::NoCache::new(),
                &mut buf,
                &KEY_FIXTURE,
            )
            .await;
            self.dirty = false;

            match fetched {
                Ok(Some(data)) => {
                    self.fixture = FixtureRecord::deserialize(data);
                    if let Some(f) = &self.fixture {
                        info!("Loaded fixture {} from flash", f.name.as_str());
                    }
                    Ok(())
                }
                Ok(None) => {
                    info!("No fixture in flash");
                    self.fixture = None;
                    Ok(())
                }
                Err(e) => {
                    error!("Flash read error: {:?}", defmt::Debug2Format(&e));
                    self.fixture = None;
                    Err(Error::Storage)
                }
            }
        }

        /// Persist the fixture record to flash.
        pub async fn save_to_flash(
            &mut self,
            flash: &mut impl embedded_storage_async::nor_flash::NorFlash,
        ) -> Result<(), Error> {
            if !self.dirty {
                debug!("FixtureStore: no changes to save");
                return Ok(());
            }
            let Some(fixture) = &self.fixture else {
                return Ok(());
            };

            let mut buf = [0u8; MAP_BUF_SIZE];
            let mut data_buf = [0u8; MAX_RECORD_SIZE];
            let len = fixture.serialize(&mut data_buf);
            let item = &data_buf[..len];

            match sequential_storage::map::store_item::<u8, &[u8], _>(
                flash,
                STORAGE_START..STORAGE_END,
                &mut sequential_storage::cache::NoCache::new(),
                &mut buf,
                &KEY_FIXTURE,
                &item,
            )
            .await
            {
                Ok(_) => {
                    info!("Saved fixture {} to flash", fixture.name.as_str());
                    self.dirty = false;
                    Ok(())
                }
                Err(e) => {
                    error!("Flash write error: {:?}", defmt::Debug2Format(&e));
                    Err(Error::Storage)
                }
            }
        }

        /// Remember a fixture found by scanning.
        pub fn set(&mut self, fixture: FixtureRecord) {
            if self.fixture.as_ref() == Some(&fixture) {
                return;
            }
            self.fixture = Some(fixture);
            self.dirty = true;
        }

        pub fn get(&self) -> Option<&FixtureRecord> {
            self.fixture.as_ref()
        }
    }

    /// Global fixture store (protected by mutex for async access).
    pub static FIXTURE_STORE: Mutex<CriticalSectionRawMutex, FixtureStore> =
        Mutex::new(FixtureStore::new());
}
