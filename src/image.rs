//! Composition of complete update images from firmware and configuration records

use std::convert::TryFrom;
use std::fmt;
use std::io::Write;

use log::{debug, trace, warn};

use crate::device::{DeviceConfig, Format};
use crate::hexfile;
use crate::record::{Layout, Settings};
use crate::uf2::{Block, BLOCK_LEN};
use crate::{Error, RetrievalError};

/// A UF2 image made of the firmware blocks followed by the layout and settings blocks.
///
/// The order is fixed by construction: every firmware block comes first, in the order
/// it was read, then the layout block and finally the settings block.
#[derive(Debug, Clone)]
pub struct BlockImage {
    firmware: Vec<Block>,
    layout: Block,
    settings: Block,
}

impl BlockImage {
    pub fn firmware(&self) -> &[Block] {
        &self.firmware
    }

    pub fn layout(&self) -> &Block {
        &self.layout
    }

    pub fn settings(&self) -> &Block {
        &self.settings
    }

    /// Returns the total number of blocks in the image
    pub fn len(&self) -> usize {
        self.firmware.len() + 2
    }

    /// Always false, an image holds at least the two configuration blocks
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates over all blocks in image order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.firmware
            .iter()
            .chain(std::iter::once(&self.layout))
            .chain(std::iter::once(&self.settings))
    }

    /// Writes all blocks of the image to the given `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        for block in self.blocks() {
            block.write_to(writer)?;
        }

        Ok(())
    }

    /// Returns the encoded image
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len() * BLOCK_LEN);

        for block in self.blocks() {
            buf.extend_from_slice(&block.encode());
        }

        buf
    }
}

/// A HEX image made of the firmware records followed by the layout record.
#[derive(Debug, Clone)]
pub struct RecordImage {
    /// Firmware records without their end-of-file record
    firmware: String,
    /// The data record holding the layout
    layout: String,
}

impl RecordImage {
    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }
}

impl fmt::Display for RecordImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.firmware)?;
        f.write_str(&self.layout)?;
        f.write_str(hexfile::encode_end_of_file())
    }
}

/// Splits a UF2 `firmware` image into validated blocks
fn decode_firmware(firmware: &[u8]) -> Result<Vec<Block>, Error> {
    if firmware.is_empty() {
        return Err(RetrievalError::Empty.into());
    }

    if firmware.len() % BLOCK_LEN != 0 {
        return Err(RetrievalError::Truncated(firmware.len()).into());
    }

    firmware
        .chunks_exact(BLOCK_LEN)
        .enumerate()
        .map(|(index, chunk)| {
            let block = Block::decode(chunk)?;
            block.validate()?;

            // The configuration blocks take the indices after the firmware, so the
            // firmware must be numbered from zero without gaps
            if block.block_no as usize != index {
                return Err(RetrievalError::BlockIndex {
                    expected: index as u32,
                    actual: block.block_no,
                }
                .into());
            }

            Ok(block)
        })
        .collect()
}

/// Composes a UF2 image from the `layout` and `settings` records and an optional base
/// `firmware` image.
///
/// Without firmware the image only holds the two configuration blocks.
pub fn compose_block_image(
    device: &DeviceConfig,
    layout: &Layout,
    settings: &Settings,
    firmware: Option<&[u8]>,
) -> Result<BlockImage, Error> {
    let mut firmware = match firmware {
        Some(data) => decode_firmware(data)?,
        None => Vec::new(),
    };

    if let Some(first) = firmware.first() {
        if first.num_blocks as usize != firmware.len() {
            warn!(
                "Firmware image claims {} blocks but contains {}",
                first.num_blocks,
                firmware.len()
            );
        }
    }

    let num_blocks = firmware.len() as u32 + 2;

    debug!(
        "Composing UF2 image of {} blocks ({} firmware blocks)",
        num_blocks,
        firmware.len()
    );

    for block in firmware.iter_mut() {
        block.num_blocks = num_blocks;
    }

    let format = Format::Uf2;
    let layout_address = format.layout_address(device)?;
    let settings_address = match format.settings_address(device)? {
        Some(address) => address,
        None => format.eeprom_base(device)?,
    };

    let mut layout = Block::with_payload(layout_address, &layout.encode(device.layout_version));
    layout.block_no = num_blocks - 2;
    layout.num_blocks = num_blocks;

    let mut settings = Block::with_payload(
        settings_address,
        &settings.encode(device.settings_version),
    );
    settings.block_no = num_blocks - 1;
    settings.num_blocks = num_blocks;

    trace!("Layout block at {:#010x}", layout.address);
    trace!("Settings block at {:#010x}", settings.address);

    Ok(BlockImage {
        firmware,
        layout,
        settings,
    })
}

/// Composes a HEX image from the `layout` record and an optional base `firmware` image.
///
/// The settings record has no place in HEX images and is never embedded.
pub fn compose_record_image(
    device: &DeviceConfig,
    layout: &Layout,
    firmware: Option<&str>,
) -> Result<RecordImage, Error> {
    let firmware = match firmware {
        Some(text) => hexfile::strip_end_of_file(text)?.to_owned(),
        None => String::new(),
    };

    let address = Format::Hex.layout_address(device)?;
    let address = u16::try_from(address).map_err(|_| Error::AddressOutOfRange(address))?;

    debug!(
        "Composing HEX image with {} bytes of firmware records",
        firmware.len()
    );
    trace!("Layout record at {:#06x}", address);

    let layout = hexfile::encode_data_record(address, &layout.encode(device.layout_version))?;

    Ok(RecordImage { firmware, layout })
}

#[cfg(test)]
mod tests {
    use assert_hex::*;

    use super::*;
    use crate::record::{LAYOUT_LEN, SETTINGS_LEN};

    fn layout() -> Layout {
        Layout {
            wing: 1,
            nose: 2,
            fuselage: 3,
            tail: 4,
            nav: 5,
            ..Layout::default()
        }
    }

    /// Builds a UF2 firmware image of `count` blocks at the start of flash
    fn firmware(count: u32) -> Vec<u8> {
        let mut data = Vec::new();

        for i in 0..count {
            let mut block = Block::with_payload(0x1000_0000 + i * 256, &[i as u8; 256]);
            block.block_no = i;
            block.num_blocks = count;
            data.extend_from_slice(&block.encode());
        }

        data
    }

    #[test]
    fn it_should_compose_config_only_image() {
        let device = DeviceConfig::default();
        let image = compose_block_image(&device, &layout(), &Settings::default(), None).unwrap();
        let blocks: Vec<&Block> = image.blocks().collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(image.len(), 2);
        assert!(blocks.iter().all(|b| b.num_blocks == 2));
        assert_eq!(blocks[0].block_no, 0);
        assert_eq!(blocks[1].block_no, 1);
        assert_eq!(blocks[0].address - blocks[1].address, 256);
        assert_eq_hex!(blocks[0].address, 0x101F_F100);
        assert_eq_hex!(blocks[1].address, 0x101F_F000);
    }

    #[test]
    fn it_should_embed_records_in_blocks() {
        let device = DeviceConfig::default();
        let settings = Settings::from_shows(&[9; 20]);
        let image = compose_block_image(&device, &layout(), &settings, None).unwrap();

        assert_eq_hex!(
            &image.layout().data[..LAYOUT_LEN],
            &layout().encode(device.layout_version)[..]
        );
        assert!(image.layout().data[LAYOUT_LEN..].iter().all(|&b| b == 0));
        assert_eq_hex!(
            &image.settings().data[..SETTINGS_LEN],
            &settings.encode(device.settings_version)[..]
        );
        assert_eq!(image.settings().size, 256);
    }

    #[test]
    fn it_should_append_config_to_firmware() {
        let device = DeviceConfig::default();
        let data = firmware(3);
        let image =
            compose_block_image(&device, &layout(), &Settings::default(), Some(&data[..])).unwrap();
        let bytes = image.to_bytes();

        assert_eq!(bytes.len(), 5 * BLOCK_LEN);
        assert_eq!(image.firmware().len(), 3);

        let blocks: Vec<Block> = bytes
            .chunks_exact(BLOCK_LEN)
            .map(|chunk| Block::decode(chunk).unwrap())
            .collect();

        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.num_blocks, 5);
            assert_eq!(block.block_no, i as u32);
        }

        assert_eq!(blocks[2].data[0], 2);
        assert_eq!(&blocks[3], image.layout());
        assert_eq!(&blocks[4], image.settings());
    }

    #[test]
    fn it_should_write_same_bytes_as_to_bytes() {
        let device = DeviceConfig::default();
        let data = firmware(2);
        let image =
            compose_block_image(&device, &layout(), &Settings::default(), Some(&data[..])).unwrap();
        let mut buf: Vec<u8> = Vec::new();

        image.write_to(&mut buf).unwrap();

        assert_eq!(buf, image.to_bytes());
    }

    #[test]
    fn it_should_reject_truncated_firmware() {
        let device = DeviceConfig::default();
        let data = firmware(2);
        let result =
            compose_block_image(&device, &layout(), &Settings::default(), Some(&data[..700]));

        assert!(matches!(
            result,
            Err(Error::RetrievalFailure(RetrievalError::Truncated(700)))
        ));
    }

    #[test]
    fn it_should_reject_empty_firmware() {
        let device = DeviceConfig::default();
        let settings = Settings::default();
        let result = compose_block_image(&device, &layout(), &settings, Some(&[][..]));

        assert!(matches!(
            result,
            Err(Error::RetrievalFailure(RetrievalError::Empty))
        ));
    }

    #[test]
    fn it_should_reject_firmware_not_numbered_from_zero() {
        let device = DeviceConfig::default();
        let mut data = Vec::new();

        for i in 1..=2 {
            let mut block = Block::with_payload(0x1000_0000 + i * 256, &[0xAA; 256]);
            block.block_no = i;
            block.num_blocks = 2;
            data.extend_from_slice(&block.encode());
        }

        let settings = Settings::default();
        let result = compose_block_image(&device, &layout(), &settings, Some(&data[..]));

        assert!(matches!(
            result,
            Err(Error::RetrievalFailure(RetrievalError::BlockIndex {
                expected: 0,
                actual: 1
            }))
        ));
    }

    #[test]
    fn it_should_reject_unmappable_flash() {
        let device = DeviceConfig {
            flash_size: 0xF000_0000,
            ..DeviceConfig::default()
        };
        let result = compose_block_image(&device, &layout(), &Settings::default(), None);

        assert!(matches!(result, Err(Error::FlashOutOfRange { .. })));
    }

    #[test]
    fn it_should_reject_foreign_blocks() {
        let device = DeviceConfig::default();
        let mut data = firmware(2);
        data[BLOCK_LEN + 4] ^= 0xFF;

        let settings = Settings::default();
        let result = compose_block_image(&device, &layout(), &settings, Some(&data[..]));

        assert!(matches!(result, Err(Error::InvalidMagic { offset: 4, .. })));
    }

    #[test]
    fn it_should_compose_config_only_hex() {
        let device = DeviceConfig::default();
        let image = compose_record_image(&device, &layout(), None).unwrap();

        assert_eq!(
            image.to_string(),
            ":0C7DF00003AA01020304050000000000CB\r\n:00000001FF\r\n"
        );
    }

    #[test]
    fn it_should_splice_layout_before_end_of_file() {
        let device = DeviceConfig::default();
        let base = ":0400000001020304F2\r\n:00000001FF\r\n";
        let image = compose_record_image(&device, &layout(), Some(base)).unwrap();
        let text = image.to_string();

        assert_eq!(image.firmware(), ":0400000001020304F2\r\n");
        assert!(text.starts_with(":0400000001020304F2\r\n:0C7DF000"));
        assert!(text.ends_with("\r\n:00000001FF\r\n"));
        assert_eq!(text.matches(":00000001FF").count(), 1);
    }

    #[test]
    fn it_should_reject_hex_without_end_of_file() {
        let device = DeviceConfig::default();
        let result = compose_record_image(&device, &layout(), Some(":0400000001020304F2\r\n"));

        assert!(matches!(
            result,
            Err(Error::RetrievalFailure(RetrievalError::MissingEndOfFile))
        ));
    }

    #[test]
    fn it_should_reject_empty_hex_firmware() {
        let device = DeviceConfig::default();

        assert!(matches!(
            compose_record_image(&device, &layout(), Some("")),
            Err(Error::RetrievalFailure(RetrievalError::MissingEndOfFile))
        ));
    }
}
