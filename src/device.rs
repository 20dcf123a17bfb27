//! Device memory map and per-format address profiles

use std::str::FromStr;

use crate::Error;

/// Start of the XIP flash window on the target
pub const FLASH_BASE: u32 = 0x1000_0000;
/// Size of one flash sector, the last of which is reserved for configuration data
pub const FLASH_SECTOR_SIZE: u32 = 4096;
/// Version tag shared by the layout and settings schemas
pub const CONFIG_VERSION: u16 = 0x03AA;

/// Offset of the layout record from the EEPROM base in UF2 images
const UF2_LAYOUT_OFFSET: u32 = 256;
/// Address of the layout record in HEX images, which target the older EEPROM layout
const HEX_LAYOUT_OFFSET: u32 = 0x7E00 - 16;
const UF2_SETTINGS_OFFSET: u32 = 0;

/// Fixed memory map and schema versions of the target device.
///
/// This is built once and passed by reference to the composer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceConfig {
    /// Address of the first byte of flash
    pub flash_base: u32,
    /// Total size of the flash in bytes
    pub flash_size: u32,
    /// Size of the trailing region that holds the emulated EEPROM
    pub reserved_size: u32,
    /// Version tag written at the start of the layout record
    pub layout_version: u16,
    /// Version tag written at the start of the settings record
    pub settings_version: u16,
}

impl DeviceConfig {
    /// Returns a device config for a flash chip of `megabytes` MiB with the default map.
    ///
    /// Fails if the flash doesn't fit in the 32-bit address space.
    pub fn with_flash_size_mb(megabytes: u32) -> Result<DeviceConfig, Error> {
        let flash_size = megabytes
            .checked_mul(0x10_0000)
            .ok_or(Error::FlashSizeTooLarge(megabytes))?;
        let device = DeviceConfig {
            flash_size,
            ..DeviceConfig::default()
        };

        device.eeprom_start()?;

        Ok(device)
    }

    /// Returns the address of the emulated EEPROM page at the top of flash
    pub fn eeprom_start(&self) -> Result<u32, Error> {
        if self.reserved_size > self.flash_size {
            return Err(self.out_of_range());
        }

        self.flash_base
            .checked_add(self.flash_size)
            .map(|top| top - self.reserved_size)
            .ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> Error {
        Error::FlashOutOfRange {
            base: self.flash_base,
            size: self.flash_size,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> DeviceConfig {
        DeviceConfig {
            flash_base: FLASH_BASE,
            flash_size: 2 * 0x10_0000,
            reserved_size: FLASH_SECTOR_SIZE,
            layout_version: CONFIG_VERSION,
            settings_version: CONFIG_VERSION,
        }
    }
}

/// Output format, which decides where the configuration records are placed
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Format {
    /// USB mass storage flashing format made of 512-byte blocks
    Uf2,
    /// Intel HEX text records
    Hex,
}

impl Format {
    /// Returns the address the record offsets are relative to
    pub fn eeprom_base(self, device: &DeviceConfig) -> Result<u32, Error> {
        match self {
            Format::Uf2 => device.eeprom_start(),
            Format::Hex => Ok(0),
        }
    }

    pub fn layout_offset(self) -> u32 {
        match self {
            Format::Uf2 => UF2_LAYOUT_OFFSET,
            Format::Hex => HEX_LAYOUT_OFFSET,
        }
    }

    /// Returns the settings offset, or `None` if the format doesn't carry settings
    pub fn settings_offset(self) -> Option<u32> {
        match self {
            Format::Uf2 => Some(UF2_SETTINGS_OFFSET),
            Format::Hex => None,
        }
    }

    pub fn layout_address(self, device: &DeviceConfig) -> Result<u32, Error> {
        offset_address(self.eeprom_base(device)?, self.layout_offset(), device)
    }

    /// Returns the settings address, or `None` if the format doesn't carry settings
    pub fn settings_address(self, device: &DeviceConfig) -> Result<Option<u32>, Error> {
        match self.settings_offset() {
            Some(offset) => {
                offset_address(self.eeprom_base(device)?, offset, device).map(Some)
            }
            None => Ok(None),
        }
    }

    /// File extension used for images of this format
    pub fn extension(self) -> &'static str {
        match self {
            Format::Uf2 => "uf2",
            Format::Hex => "hex",
        }
    }

    /// Well-known location of the released base firmware
    pub fn default_firmware_path(self) -> &'static str {
        match self {
            Format::Uf2 => "firmware/firmware.uf2",
            Format::Hex => "firmware/firmware.hex",
        }
    }
}

fn offset_address(base: u32, offset: u32, device: &DeviceConfig) -> Result<u32, Error> {
    base.checked_add(offset).ok_or_else(|| device.out_of_range())
}

/// What an export contains
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExportKind {
    /// Base firmware with the configuration records added
    Full,
    /// Configuration records only
    Config,
    /// The base firmware, unchanged
    Firmware,
}

impl ExportKind {
    /// Returns the default file name of an export of this kind
    pub fn file_name(self, format: Format, version: &str) -> String {
        let prefix = match self {
            ExportKind::Full => "firmware-config",
            ExportKind::Config => "config",
            ExportKind::Firmware => "firmware",
        };

        format!("{}_v{}.{}", prefix, version, format.extension())
    }

    /// Whether the export needs the base firmware image
    pub fn needs_firmware(self) -> bool {
        !matches!(self, ExportKind::Config)
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<ExportKind, Self::Err> {
        match s {
            "full" => Ok(ExportKind::Full),
            "config" => Ok(ExportKind::Config),
            "firmware" => Ok(ExportKind::Firmware),
            _ => Err(format!(
                "unknown export kind {:?}, expected one of full, config, firmware",
                s
            )),
        }
    }
}
