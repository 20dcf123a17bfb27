use std::io;

use thiserror::Error;

use crate::uf2::BLOCK_LEN;

/// Errors raised while fetching the base firmware image from an external source
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("I/O error: {}", _0)]
    IoError(#[from] io::Error),
    #[error("The firmware image is empty")]
    Empty,
    #[error(
        "The firmware image is {} bytes long, which is not a multiple of the {} byte block size",
        _0,
        BLOCK_LEN
    )]
    Truncated(usize),
    #[error("The firmware image is not valid text")]
    NotText,
    #[error("Firmware block {} is numbered {}", expected, actual)]
    BlockIndex { expected: u32, actual: u32 },
    #[error("The firmware image does not end with an end-of-file record")]
    MissingEndOfFile,
}

/// Errors that abort an export
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed block - expected {} bytes, got {}", BLOCK_LEN, _0)]
    MalformedBlock(usize),
    #[error("Invalid magic value {value:#010x} at block offset {offset:#x}")]
    InvalidMagic { offset: usize, value: u32 },
    #[error("Record payload is {} bytes long, the maximum is 255", _0)]
    PayloadTooLarge(usize),
    #[error("Could not encode HEX record: {}", _0)]
    RecordEncoding(String),
    #[error("Record address {:#x} does not fit in 16 bits", _0)]
    AddressOutOfRange(u32),
    #[error("A flash of {} MiB does not fit in the 32-bit address space", _0)]
    FlashSizeTooLarge(u32),
    #[error("Flash of {size:#x} bytes at {base:#010x} exceeds the 32-bit address space")]
    FlashOutOfRange { base: u32, size: u32 },
    #[error("Could not retrieve the firmware image: {}", _0)]
    RetrievalFailure(#[from] RetrievalError),
    #[error("I/O error: {}", _0)]
    IoError(#[from] io::Error),
}
