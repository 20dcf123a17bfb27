//! UF2 block codec

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::Error;

/// Total length of an encoded block
pub const BLOCK_LEN: usize = 512;
/// Length of the payload region of a block
pub const PAYLOAD_LEN: usize = 476;

pub const MAGIC_START0: u32 = 0x0A32_4655;
pub const MAGIC_START1: u32 = 0x9E5D_5157;
pub const MAGIC_END: u32 = 0x0AB1_6F30;

/// The family id field is present
pub const FLAG_FAMILY_ID_PRESENT: u32 = 0x0000_2000;
/// Family id of the RP2040
pub const RP2040_FAMILY_ID: u32 = 0xE48B_FF56;

const HEADER_LEN: usize = 32;
const MAGIC_END_OFFSET: usize = BLOCK_LEN - 4;

/// A single 512-byte UF2 block
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Block {
    pub magic_start0: u32,
    pub magic_start1: u32,
    pub flags: u32,
    /// Flash address the payload is written to
    pub address: u32,
    /// Number of payload bytes the bootloader writes
    pub size: u32,
    /// Index of this block in the image
    pub block_no: u32,
    /// Total number of blocks in the image
    pub num_blocks: u32,
    pub family: u32,
    pub data: [u8; PAYLOAD_LEN],
    pub magic_end: u32,
}

impl Default for Block {
    fn default() -> Block {
        Block {
            magic_start0: MAGIC_START0,
            magic_start1: MAGIC_START1,
            flags: FLAG_FAMILY_ID_PRESENT,
            address: 0,
            size: 256,
            block_no: 0,
            num_blocks: 1,
            family: RP2040_FAMILY_ID,
            data: [0u8; PAYLOAD_LEN],
            magic_end: MAGIC_END,
        }
    }
}

impl Block {
    /// Creates a block that writes `payload` to `address`
    pub fn with_payload(address: u32, payload: &[u8]) -> Block {
        let mut block = Block {
            address,
            ..Block::default()
        };

        block.set_payload(payload);
        block
    }

    /// Decodes a block from exactly `BLOCK_LEN` bytes of `raw` data.
    ///
    /// The magic values are not checked, use `validate` for that.
    pub fn decode(raw: &[u8]) -> Result<Block, Error> {
        if raw.len() != BLOCK_LEN {
            return Err(Error::MalformedBlock(raw.len()));
        }

        let mut reader = Cursor::new(raw);
        let mut block = Block {
            magic_start0: reader.read_u32::<LittleEndian>()?,
            magic_start1: reader.read_u32::<LittleEndian>()?,
            flags: reader.read_u32::<LittleEndian>()?,
            address: reader.read_u32::<LittleEndian>()?,
            size: reader.read_u32::<LittleEndian>()?,
            block_no: reader.read_u32::<LittleEndian>()?,
            num_blocks: reader.read_u32::<LittleEndian>()?,
            family: reader.read_u32::<LittleEndian>()?,
            data: [0u8; PAYLOAD_LEN],
            magic_end: 0,
        };

        reader.read_exact(&mut block.data)?;
        block.magic_end = reader.read_u32::<LittleEndian>()?;

        Ok(block)
    }

    /// Checks that the three magic values identify this as a UF2 block
    pub fn validate(&self) -> Result<(), Error> {
        let magics = [
            (0, self.magic_start0, MAGIC_START0),
            (4, self.magic_start1, MAGIC_START1),
            (MAGIC_END_OFFSET, self.magic_end, MAGIC_END),
        ];

        for &(offset, value, expected) in magics.iter() {
            if value != expected {
                return Err(Error::InvalidMagic { offset, value });
            }
        }

        Ok(())
    }

    /// Replaces the payload with `payload`, truncated or zero-padded to `PAYLOAD_LEN`
    pub fn set_payload(&mut self, payload: &[u8]) {
        let len = payload.len().min(PAYLOAD_LEN);

        self.data = [0u8; PAYLOAD_LEN];
        self.data[..len].copy_from_slice(&payload[..len]);
    }

    /// Writes the encoded block to the given `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u32::<LittleEndian>(self.magic_start0)?;
        writer.write_u32::<LittleEndian>(self.magic_start1)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.address)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>(self.block_no)?;
        writer.write_u32::<LittleEndian>(self.num_blocks)?;
        writer.write_u32::<LittleEndian>(self.family)?;
        writer.write_all(&self.data)?;
        writer.write_u32::<LittleEndian>(self.magic_end)?;

        Ok(())
    }

    /// Returns the encoded block
    pub fn encode(&self) -> [u8; BLOCK_LEN] {
        let mut buf = [0u8; BLOCK_LEN];

        {
            let (header, rest) = buf.split_at_mut(HEADER_LEN);
            let fields = [
                self.magic_start0,
                self.magic_start1,
                self.flags,
                self.address,
                self.size,
                self.block_no,
                self.num_blocks,
                self.family,
            ];

            for (dst, field) in header.chunks_exact_mut(4).zip(fields.iter()) {
                dst.copy_from_slice(&field.to_le_bytes());
            }

            rest[..PAYLOAD_LEN].copy_from_slice(&self.data);
        }

        buf[MAGIC_END_OFFSET..].copy_from_slice(&self.magic_end.to_le_bytes());

        buf
    }
}

#[cfg(test)]
mod tests {
    use assert_hex::*;
    use hex_literal::hex;

    use super::*;

    fn sample_block() -> Block {
        let mut block = Block::with_payload(0x1000_0100, &[0xDE, 0xAD, 0xBE, 0xEF]);
        block.block_no = 3;
        block.num_blocks = 7;
        block.flags = 0x2001;
        block
    }

    #[test]
    fn it_should_encode_default_header() {
        let buf = Block::default().encode();

        assert_eq!(buf.len(), BLOCK_LEN);
        assert_eq_hex!(
            &buf[..32],
            &hex!(
                "55 46 32 0A 57 51 5D 9E 00 20 00 00 00 00 00 00
                 00 01 00 00 00 00 00 00 01 00 00 00 56 FF 8B E4"
            )[..]
        );
        assert_eq_hex!(&buf[508..], &hex!("30 6F B1 0A")[..]);
    }

    #[test]
    fn it_should_round_trip_block() {
        let block = sample_block();
        let decoded = Block::decode(&block.encode()).unwrap();

        assert_eq!(decoded, block);
    }

    #[test]
    fn it_should_write_same_bytes_as_encode() {
        let block = sample_block();
        let mut buf: Vec<u8> = Vec::with_capacity(BLOCK_LEN);

        block.write_to(&mut buf).unwrap();

        assert_eq!(&buf[..], &block.encode()[..]);
    }

    #[test]
    fn it_should_zero_pad_short_payloads() {
        let buf = sample_block().encode();

        assert_eq_hex!(&buf[32..36], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(buf[36..508].iter().all(|&b| b == 0));
    }

    #[test]
    fn it_should_truncate_long_payloads() {
        let payload = vec![0xAB; PAYLOAD_LEN + 10];
        let buf = Block::with_payload(0, &payload).encode();

        assert_eq!(buf.len(), BLOCK_LEN);
        assert!(buf[32..508].iter().all(|&b| b == 0xAB));
        assert_eq_hex!(&buf[508..], &MAGIC_END.to_le_bytes()[..]);
    }

    #[test]
    fn it_should_reject_wrong_length() {
        match Block::decode(&[0u8; 511]) {
            Err(Error::MalformedBlock(511)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn it_should_decode_foreign_magic_permissively() {
        let mut raw = Block::default().encode();
        raw[0] = 0;

        let block = Block::decode(&raw).unwrap();

        assert_eq_hex!(block.magic_start0, 0x0A32_4600);
        match block.validate() {
            Err(Error::InvalidMagic { offset: 0, .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn it_should_validate_trailing_magic() {
        let mut block = Block::default();
        block.magic_end = 0;

        match block.validate() {
            Err(Error::InvalidMagic { offset: 508, value: 0 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(Block::default().validate().is_ok());
    }
}
