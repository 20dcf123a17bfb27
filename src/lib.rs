//! Composes bootloader update images that carry device configuration.
//!
//! Two formats are supported: UF2 images for the USB mass storage bootloader, which hold
//! both the layout and the settings records, and Intel HEX images for the serial
//! bootloader, which hold only the layout record.
//!
//! # Examples
//!
//! ```
//! use fwpack::{compose_block_image, DeviceConfig, Layout, Settings};
//!
//! let device = DeviceConfig::default();
//! let image = compose_block_image(&device, &Layout::default(), &Settings::default(), None)?;
//!
//! assert_eq!(image.to_bytes().len(), 2 * 512);
//!
//! # Ok::<(), fwpack::Error>(())
//! ```

pub mod device;
mod error;
pub mod hexfile;
pub mod image;
pub mod record;
pub mod source;
pub mod uf2;

pub use device::{DeviceConfig, ExportKind, Format};
pub use error::{Error, RetrievalError};
pub use image::{compose_block_image, compose_record_image, BlockImage, RecordImage};
pub use record::{Layout, Settings};
pub use source::{FileSource, FirmwareSource, MemorySource};
