//! Configuration records stored in the device's emulated EEPROM

/// Encoded length of a layout record
pub const LAYOUT_LEN: usize = 12;
/// Number of show slots in the settings record
pub const NUM_SHOWS: usize = 20;
/// Encoded length of a settings record
pub const SETTINGS_LEN: usize = NUM_SHOWS + 3;

/// Physical layout of the light components and their orientation.
///
/// The identifiers and flags are opaque to the encoder and are written as-is.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Layout {
    pub wing: u8,
    pub nose: u8,
    pub fuselage: u8,
    pub tail: u8,
    pub nav: u8,
    pub wing_reversed: u8,
    pub nose_reversed: u8,
    pub fuselage_reversed: u8,
    pub tail_reversed: u8,
    /// Non-zero when the nose and fuselage strips are wired as one
    pub nose_fuselage_joined: u8,
}

impl Layout {
    /// Encodes the layout record, prefixed with the big endian `version` tag
    pub fn encode(&self, version: u16) -> [u8; LAYOUT_LEN] {
        let [version_hi, version_lo] = version.to_be_bytes();

        [
            version_hi,
            version_lo,
            self.wing,
            self.nose,
            self.fuselage,
            self.tail,
            self.nav,
            self.wing_reversed,
            self.nose_reversed,
            self.fuselage_reversed,
            self.tail_reversed,
            self.nose_fuselage_joined,
        ]
    }
}

/// The selected show for each slot
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Settings {
    pub shows: [u8; NUM_SHOWS],
}

impl Settings {
    /// Creates settings from the given `shows`.
    ///
    /// Slots without a value are set to zero and values beyond `NUM_SHOWS` are ignored.
    pub fn from_shows(shows: &[u8]) -> Settings {
        let mut settings = Settings::default();
        let len = shows.len().min(NUM_SHOWS);

        settings.shows[..len].copy_from_slice(&shows[..len]);
        settings
    }

    /// Encodes the settings record, prefixed with the big endian `version` tag.
    ///
    /// The final byte of the record is always zero.
    pub fn encode(&self, version: u16) -> [u8; SETTINGS_LEN] {
        let mut buf = [0u8; SETTINGS_LEN];

        buf[..2].copy_from_slice(&version.to_be_bytes());
        buf[2..2 + NUM_SHOWS].copy_from_slice(&self.shows);

        buf
    }
}

#[cfg(test)]
mod tests {
    use assert_hex::*;
    use hex_literal::hex;

    use super::*;
    use crate::device::CONFIG_VERSION;

    #[test]
    fn it_should_encode_layout() {
        let layout = Layout {
            wing: 1,
            nose: 2,
            fuselage: 3,
            tail: 4,
            nav: 5,
            ..Layout::default()
        };

        assert_eq_hex!(
            layout.encode(CONFIG_VERSION),
            [0x03, 0xAA, 1, 2, 3, 4, 5, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn it_should_encode_layout_flags_after_ids() {
        let layout = Layout {
            wing_reversed: 1,
            tail_reversed: 1,
            nose_fuselage_joined: 0xFF,
            ..Layout::default()
        };

        assert_eq_hex!(
            layout.encode(0x1234),
            hex!("12 34 00 00 00 00 00 01 00 00 01 FF")
        );
    }

    #[test]
    fn it_should_encode_settings() {
        let settings = Settings::from_shows(&[7, 8, 9]);
        let buf = settings.encode(CONFIG_VERSION);

        assert_eq!(buf.len(), 23);
        assert_eq_hex!(&buf[..5], &[0x03, 0xAA, 7, 8, 9]);
        assert!(buf[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn it_should_ignore_extra_shows() {
        let shows: Vec<u8> = (1..=25).collect();
        let buf = Settings::from_shows(&shows).encode(CONFIG_VERSION);

        assert_eq!(buf[2 + NUM_SHOWS - 1], 20);
        assert_eq!(buf[SETTINGS_LEN - 1], 0);
    }
}
