use std::path::PathBuf;

use structopt::StructOpt;

use fwpack::{ExportKind, Layout, Settings};

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Build a UF2 image for the USB mass storage bootloader
    Uf2 {
        #[structopt(flatten)]
        export: ExportOpts,
        #[structopt(flatten)]
        layout: LayoutOpts,
        #[structopt(flatten)]
        settings: SettingsOpts,
    },
    /// Build an Intel HEX image for the serial bootloader
    Hex {
        #[structopt(flatten)]
        export: ExportOpts,
        #[structopt(flatten)]
        layout: LayoutOpts,
    },
    /// Print the block headers of a UF2 image
    Info {
        /// The UF2 filename
        filename: PathBuf,
    },
}

#[derive(StructOpt, Debug)]
pub struct ExportOpts {
    /// What to export - one of full, config or firmware
    #[structopt(short = "k", long = "kind", default_value = "full")]
    pub kind: ExportKind,
    /// The base firmware image, defaults to the released firmware for the format
    #[structopt(short = "f", long = "firmware")]
    pub firmware: Option<PathBuf>,
    /// The file to write the image to, defaults to a name derived from the kind
    #[structopt(short = "o", long = "output")]
    pub output: Option<PathBuf>,
    /// The firmware version used in the default output filename
    #[structopt(long = "fw-version", default_value = "0")]
    pub version: String,
}

#[derive(StructOpt, Debug)]
pub struct LayoutOpts {
    /// Wing component id
    #[structopt(long = "wing", default_value = "0")]
    pub wing: u8,
    /// Nose component id
    #[structopt(long = "nose", default_value = "0")]
    pub nose: u8,
    /// Fuselage component id
    #[structopt(long = "fuselage", default_value = "0")]
    pub fuselage: u8,
    /// Tail component id
    #[structopt(long = "tail", default_value = "0")]
    pub tail: u8,
    /// Navigation light component id
    #[structopt(long = "nav", default_value = "0")]
    pub nav: u8,
    #[structopt(long = "wing-reversed")]
    pub wing_reversed: bool,
    #[structopt(long = "nose-reversed")]
    pub nose_reversed: bool,
    #[structopt(long = "fuselage-reversed")]
    pub fuselage_reversed: bool,
    #[structopt(long = "tail-reversed")]
    pub tail_reversed: bool,
    /// The nose and fuselage strips are wired as one
    #[structopt(long = "nose-fuselage-joined")]
    pub nose_fuselage_joined: bool,
}

impl LayoutOpts {
    pub fn to_layout(&self) -> Layout {
        Layout {
            wing: self.wing,
            nose: self.nose,
            fuselage: self.fuselage,
            tail: self.tail,
            nav: self.nav,
            wing_reversed: self.wing_reversed as u8,
            nose_reversed: self.nose_reversed as u8,
            fuselage_reversed: self.fuselage_reversed as u8,
            tail_reversed: self.tail_reversed as u8,
            nose_fuselage_joined: self.nose_fuselage_joined as u8,
        }
    }
}

#[derive(StructOpt, Debug)]
pub struct SettingsOpts {
    /// Comma separated show selected for each slot, missing slots are set to 0
    #[structopt(short = "s", long = "shows", use_delimiter = true)]
    pub shows: Vec<u8>,
}

impl SettingsOpts {
    pub fn to_settings(&self) -> Settings {
        Settings::from_shows(&self.shows)
    }
}

#[derive(StructOpt, Debug)]
pub struct Opts {
    #[structopt(subcommand)]
    pub command: Command,

    /// The size of the target's flash in MiB
    #[structopt(env = "FLASH_SIZE_MB", long = "flash-size", default_value = "2")]
    pub flash_size_mb: u32,
}
