use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{info, warn};
use structopt::StructOpt;

use fwpack::uf2::{Block, BLOCK_LEN};
use fwpack::{
    compose_block_image, compose_record_image, DeviceConfig, ExportKind, FileSource,
    FirmwareSource, Format,
};

mod cli;

use cli::{Command, ExportOpts, LayoutOpts, SettingsOpts};

/// Returns the output path of an export, falling back to the kind's default file name
fn output_path(export: &ExportOpts, format: Format) -> PathBuf {
    export
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(export.kind.file_name(format, &export.version)))
}

/// Returns the source of the base firmware for the given `format`
fn firmware_source(export: &ExportOpts, format: Format) -> FileSource {
    match &export.firmware {
        Some(path) => FileSource::new(path),
        None => FileSource::new(format.default_firmware_path()),
    }
}

/// Copies the base firmware to the output unchanged
fn export_firmware(source: &FileSource, output: &Path) -> Result<(), anyhow::Error> {
    let data = source
        .fetch()
        .with_context(|| format!("Failed to read firmware image {}", source.location()))?;

    fs::write(output, &data)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok(())
}

fn export_uf2(
    device: &DeviceConfig,
    export: &ExportOpts,
    layout: &LayoutOpts,
    settings: &SettingsOpts,
) -> Result<(), anyhow::Error> {
    let format = Format::Uf2;
    let output = output_path(export, format);
    let source = firmware_source(export, format);

    if export.kind == ExportKind::Firmware {
        return export_firmware(&source, &output);
    }

    let firmware = if export.kind.needs_firmware() {
        let data = source
            .fetch()
            .with_context(|| format!("Failed to read firmware image {}", source.location()))?;

        Some(data)
    } else {
        None
    };

    let image = compose_block_image(
        device,
        &layout.to_layout(),
        &settings.to_settings(),
        firmware.as_deref(),
    )
    .with_context(|| "Failed to compose UF2 image")?;

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    image
        .write_to(&mut writer)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Wrote {} blocks to {}", image.len(), output.display());

    Ok(())
}

fn export_hex(
    device: &DeviceConfig,
    export: &ExportOpts,
    layout: &LayoutOpts,
) -> Result<(), anyhow::Error> {
    let format = Format::Hex;
    let output = output_path(export, format);
    let source = firmware_source(export, format);

    if export.kind == ExportKind::Firmware {
        return export_firmware(&source, &output);
    }

    let firmware = if export.kind.needs_firmware() {
        let text = source
            .fetch_text()
            .with_context(|| format!("Failed to read firmware image {}", source.location()))?;

        Some(text)
    } else {
        None
    };

    let image = compose_record_image(device, &layout.to_layout(), firmware.as_deref())
        .with_context(|| "Failed to compose HEX image")?;

    fs::write(&output, image.to_string())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Wrote HEX image to {}", output.display());

    Ok(())
}

fn print_info<P: AsRef<Path>>(input_path: P) -> Result<(), anyhow::Error> {
    let data = fs::read(&input_path)
        .with_context(|| format!("Failed to read '{}'", input_path.as_ref().display()))?;

    if data.len() % BLOCK_LEN != 0 {
        warn!(
            "{} trailing bytes are not part of a block",
            data.len() % BLOCK_LEN
        );
    }

    for (i, chunk) in data.chunks_exact(BLOCK_LEN).enumerate() {
        let block = Block::decode(chunk)?;
        let status = match block.validate() {
            Ok(()) => "ok".to_owned(),
            Err(err) => err.to_string(),
        };

        println!(
            "#{:<4} block {}/{} addr {:#010x} size {} flags {:#010x} family {:#010x} ({})",
            i,
            block.block_no,
            block.num_blocks,
            block.address,
            block.size,
            block.flags,
            block.family,
            status
        );
    }

    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    // Create a timestamped logger, filtered through RUST_LOG
    pretty_env_logger::init_timed();

    // Parse the command-line arguments
    let opts = cli::Opts::from_args();
    let device = DeviceConfig::with_flash_size_mb(opts.flash_size_mb)
        .with_context(|| format!("Invalid flash size of {} MiB", opts.flash_size_mb))?;

    match &opts.command {
        Command::Uf2 {
            export,
            layout,
            settings,
        } => {
            export_uf2(&device, export, layout, settings)?;
        }
        Command::Hex { export, layout } => {
            export_hex(&device, export, layout)?;
        }
        Command::Info { filename } => {
            print_info(filename)?;
        }
    }

    Ok(())
}
