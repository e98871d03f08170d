// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{error, info};

use gdrom::core::cdrom::{Msf, GDROM_SECTOR_SIZE};
use gdrom::core::config::GdromConfig;
use gdrom::core::error::{GdromError, Result};
use gdrom::core::gdrom::{
    Gdrom, Status, ATA_CMD_PACKET, GDROM_REG_BASE, PACKET_LEN, PKT_CD_READ, REG_COMMAND,
    REG_DATA, REG_ERROR, REG_FEATURES, REG_GDDIR, REG_GDEN, REG_GDLEN, REG_GDLEND, REG_GDST,
    REG_GDSTAR, REG_STATUS,
};
use gdrom::core::host::{RamHost, RAM_BASE};
use gdrom::core::mount::MountRegion;

/// Dreamcast GD-ROM image inspector
#[derive(Parser)]
#[command(name = "gdinfo")]
#[command(about = "Inspect GDI/CDI/CHD images through the emulated GD-ROM drive", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show disc type, sessions and the Dreamcast header
    Info {
        /// Disc image (.gdi, .cdi or .chd)
        image: Option<PathBuf>,
    },
    /// Print the table of contents
    Toc {
        image: Option<PathBuf>,

        /// Show the high-density area instead of the single-density one
        #[arg(long)]
        hd: bool,
    },
    /// Read sectors with a CD_READ packet issued through the drive registers
    Read {
        image: Option<PathBuf>,

        /// First frame address
        #[arg(short = 'f', long)]
        fad: u32,

        /// Number of sectors
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Transfer over G1 DMA instead of PIO
        #[arg(long)]
        dma: bool,

        /// Bytes to hex-dump
        #[arg(long, default_value = "256")]
        dump: usize,
    },
}

impl Command {
    fn image(&self) -> Option<&PathBuf> {
        match self {
            Command::Info { image } | Command::Toc { image, .. } | Command::Read { image, .. } => {
                image.as_ref()
            }
        }
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GdromConfig::load(path)?,
        None => GdromConfig::default(),
    };
    config.apply_env();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log.level.as_str()),
    )
    .init();

    info!("gdinfo v{}", env!("CARGO_PKG_VERSION"));

    let image = args
        .command
        .image()
        .cloned()
        .or_else(|| config.drive.image.clone())
        .ok_or_else(|| {
            GdromError::Config("no image given and [drive] image is not set".to_string())
        })?;

    let mut drive = Gdrom::new(RamHost::new());
    if let Err(e) = drive.mount_image_with(&image, config.drive.chd_hunk_cache) {
        error!("Failed to mount {}: {}", image.display(), e);
        return Err(e);
    }

    match args.command {
        Command::Info { .. } => print_info(&mut drive),
        Command::Toc { hd, .. } => print_toc(&mut drive, hd),
        Command::Read {
            fad,
            count,
            dma,
            dump,
            ..
        } => {
            let data = if dma {
                read_dma(&mut drive, fad, count)?
            } else {
                read_pio(&mut drive, fad, count)?
            };
            println!("Read {} bytes from FAD {}", data.len(), fad);
            hex_dump(&data[..dump.min(data.len())]);
            Ok(())
        }
    }
}

fn print_info(drive: &mut Gdrom<RamHost>) -> Result<()> {
    let mount = drive.mount_mut();
    let leadout = mount.get_leadout()?;

    println!("Disc type:  {}", mount.get_disc_type()?);
    println!("Sessions:   {}", mount.session_count()?);
    for session in 0..mount.session_count()? {
        if let Some(start) = mount.get_session_start(session)? {
            println!(
                "  Session {}: track {:>2}, FAD {:>6} ({})",
                session + 1,
                start.first_track,
                start.fad,
                Msf::from_fad(start.fad)
            );
        }
    }
    println!("Leadout:    FAD {} ({})", leadout, Msf::from_fad(leadout));
    println!("HD area:    {}", if mount.has_hd_region()? { "yes" } else { "no" });

    match mount.get_meta() {
        Ok(meta) => {
            println!("Hardware:   {}", meta.hardware);
            println!("Maker:      {}", meta.maker);
            println!("Product:    {} {}", meta.product_number, meta.version);
            println!("Released:   {}", meta.release_date);
            println!("Area:       {}", meta.area_symbols);
            println!("Boot file:  {}", meta.boot_file);
            println!("Title:      {}", meta.title);
        }
        Err(e) => println!("Header:     unreadable ({})", e),
    }
    Ok(())
}

fn print_toc(drive: &mut Gdrom<RamHost>, hd: bool) -> Result<()> {
    let region = if hd {
        MountRegion::HighDensity
    } else {
        MountRegion::LowDensity
    };

    let toc = match drive.mount_mut().read_toc(region) {
        Ok(toc) => toc,
        Err(e) => {
            println!("No TOC for {:?}: {}", region, e);
            return Ok(());
        }
    };

    println!("Tracks {}..{}", toc.first_track, toc.last_track);
    for (number, track) in toc.valid_tracks() {
        let kind = if track.ctrl & 4 != 0 { "data" } else { "audio" };
        println!(
            "  {:>2}  {:<5}  FAD {:>6}  {}",
            number,
            kind,
            track.fad,
            Msf::from_fad(track.fad)
        );
    }
    println!("  leadout     FAD {:>6}  {}", toc.leadout, Msf::from_fad(toc.leadout));
    Ok(())
}

fn read_packet(fad: u32, count: u32) -> [u8; PACKET_LEN] {
    [
        PKT_CD_READ,
        0x20, // user data only, FAD addressing
        (fad >> 16) as u8,
        (fad >> 8) as u8,
        fad as u8,
        0,
        0,
        0,
        (count >> 16) as u8,
        (count >> 8) as u8,
        count as u8,
        0,
    ]
}

fn issue_read(drive: &mut Gdrom<RamHost>, fad: u32, count: u32, dma: bool) -> Result<()> {
    drive.write_reg(GDROM_REG_BASE + REG_FEATURES, 1, dma as u32)?;
    drive.write_reg(GDROM_REG_BASE + REG_COMMAND, 1, ATA_CMD_PACKET as u32)?;
    for pair in read_packet(fad, count).chunks(2) {
        let word = u16::from_le_bytes([pair[0], pair[1]]);
        drive.write_reg(GDROM_REG_BASE + REG_DATA, 2, word as u32)?;
    }
    check_status(drive)
}

fn check_status(drive: &mut Gdrom<RamHost>) -> Result<()> {
    let status = Status::from_bits_truncate(drive.read_reg(GDROM_REG_BASE + REG_STATUS, 1)? as u8);
    if status.contains(Status::CHECK) {
        let error = drive.read_reg(GDROM_REG_BASE + REG_ERROR, 1)?;
        error!(
            "Drive reported CHECK: sense key {:X}, additional sense {:02X}",
            error >> 4,
            drive.additional_sense() as u8
        );
    }
    Ok(())
}

fn read_pio(drive: &mut Gdrom<RamHost>, fad: u32, count: u32) -> Result<Vec<u8>> {
    issue_read(drive, fad, count, false)?;

    let mut data = Vec::with_capacity(count as usize * GDROM_SECTOR_SIZE);
    while drive.status().contains(Status::DRQ) {
        let word = drive.read_reg(GDROM_REG_BASE + REG_DATA, 2)? as u16;
        data.extend_from_slice(&word.to_le_bytes());
    }
    Ok(data)
}

fn read_dma(drive: &mut Gdrom<RamHost>, fad: u32, count: u32) -> Result<Vec<u8>> {
    let len = count * GDROM_SECTOR_SIZE as u32;
    drive.write_reg(GDROM_REG_BASE + REG_GDSTAR, 4, RAM_BASE)?;
    drive.write_reg(GDROM_REG_BASE + REG_GDLEN, 4, len)?;
    drive.write_reg(GDROM_REG_BASE + REG_GDDIR, 4, 1)?;
    drive.write_reg(GDROM_REG_BASE + REG_GDEN, 4, 1)?;

    issue_read(drive, fad, count, true)?;
    drive.write_reg(GDROM_REG_BASE + REG_GDST, 4, 1)?;

    let transferred = drive.read_reg(GDROM_REG_BASE + REG_GDLEND, 4)? as usize;
    info!(
        "DMA finished: {} bytes, {} DMA-complete interrupt(s)",
        transferred,
        drive.host().dma_complete_count
    );
    Ok(drive
        .host()
        .read(RAM_BASE, transferred)
        .map(<[u8]>::to_vec)
        .unwrap_or_default())
}

fn hex_dump(data: &[u8]) {
    for (row, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("{:08X}  {:<47}  {}", row * 16, hex.join(" "), ascii);
    }
}
