//! Intel HEX records as written by the serial bootloader's tooling

use ihex::{Record, WriterError};

use crate::{Error, RetrievalError};

pub use ihex::checksum;

/// Line ending expected by the bootloader's HEX parser
pub const LINE_ENDING: &str = "\r\n";

/// The end-of-file record that terminates every HEX file
pub const END_OF_FILE: &str = ":00000001FF\r\n";

/// Renders a single `record` as a CRLF terminated line
fn to_line(record: &Record) -> Result<String, Error> {
    let mut line = record.to_record_string().map_err(|err| match err {
        WriterError::DataExceedsMaximumLength(len) => Error::PayloadTooLarge(len),
        err => Error::RecordEncoding(err.to_string()),
    })?;

    line.push_str(LINE_ENDING);

    Ok(line)
}

/// Encodes a data record that writes `payload` to `address`.
///
/// Fails with `Error::PayloadTooLarge` if the payload is longer than 255 bytes.
pub fn encode_data_record(address: u16, payload: &[u8]) -> Result<String, Error> {
    to_line(&Record::Data {
        offset: address,
        value: payload.to_vec(),
    })
}

/// Returns the end-of-file record
pub fn encode_end_of_file() -> &'static str {
    END_OF_FILE
}

/// Returns `text` with its trailing end-of-file record removed.
///
/// Everything before the final record is kept verbatim, including the line ending of the
/// last data record.
pub fn strip_end_of_file(text: &str) -> Result<&str, RetrievalError> {
    let start = text.rfind(':').ok_or(RetrievalError::MissingEndOfFile)?;

    match Record::from_record_string(text[start..].trim_end()) {
        Ok(Record::EndOfFile) => Ok(&text[..start]),
        _ => Err(RetrievalError::MissingEndOfFile),
    }
}
