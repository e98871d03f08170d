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

//! Mount registry and the disc image abstraction
//!
//! A [`Disc`] is a format-specific reader (GDI, CDI or CHD) that can produce
//! 2048-byte user-data sectors and tables of contents. The [`Mount`] holds at
//! most one active disc and routes the drive's requests to it.
//!
//! # Example
//!
//! ```no_run
//! use gdrom::core::mount::{open_image, Mount, MountRegion};
//!
//! let mut mount = Mount::new();
//! mount.insert(open_image("game.gdi").unwrap());
//!
//! let toc = mount.read_toc(MountRegion::HighDensity).unwrap();
//! let mut sector = vec![0u8; 2048];
//! mount.read_sectors(&mut sector, toc.tracks[2].fad, 1).unwrap();
//! ```

use std::path::Path;

use crate::core::cdrom::{DiscType, CDROM_TOC_SIZE, GDROM_SECTOR_SIZE};
use crate::core::error::{DiscError, GdromError, Result, SenseError};

pub mod cdi;
pub mod chd;
pub mod gdi;
pub mod meta;
pub mod toc;

pub use cdi::CdiImage;
pub use chd::ChdImage;
pub use gdi::GdiImage;
pub use meta::{DiscMeta, DISC_META_SIZE};
pub use toc::{decode_toc, encode_toc, Toc, TocTrack};

/// Region of the disc a TOC is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountRegion {
    /// Single-density area (session 0); the whole disc on a CD
    LowDensity,
    /// High-density area (session 1), GD-ROM only
    HighDensity,
}

impl MountRegion {
    /// Region selected by the session bit of a `READ_TOC` packet
    pub fn from_session_bit(bit: u8) -> Self {
        if bit & 1 != 0 {
            MountRegion::HighDensity
        } else {
            MountRegion::LowDensity
        }
    }
}

/// First track and start address of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStart {
    pub first_track: u8,
    pub fad: u32,
}

/// Capability set every disc image backend provides
pub trait Disc {
    /// Human-readable backend name, used in log messages
    fn name(&self) -> &str;

    fn session_count(&self) -> usize;

    /// Build the TOC for `region`
    ///
    /// Returns `None` when the backend cannot describe that region.
    fn read_toc(&mut self, _region: MountRegion) -> Option<Toc> {
        None
    }

    /// Read the 2048 bytes of user data at `fad` into `buf`
    fn read_sector(&mut self, fad: u32, buf: &mut [u8]) -> std::result::Result<(), DiscError>;

    /// Read the Dreamcast header of the disc
    fn get_meta(&mut self) -> std::result::Result<DiscMeta, DiscError>;

    /// FAD just past the last track
    fn get_leadout(&self) -> u32;

    fn has_hd_region(&self) -> bool;

    fn get_disc_type(&self) -> DiscType;

    /// Start of the given 0-indexed session
    fn get_session_start(&self, session: usize) -> Option<SessionStart>;

    /// Release host resources; called exactly once when the disc is ejected
    fn cleanup(&mut self) {}
}

/// Holds the single active disc
#[derive(Default)]
pub struct Mount {
    disc: Option<Box<dyn Disc>>,
}

impl Mount {
    pub fn new() -> Self {
        Self { disc: None }
    }

    /// Install `disc`, ejecting whatever was mounted before
    pub fn insert(&mut self, disc: Box<dyn Disc>) {
        self.eject();
        log::info!("MOUNT: Inserted {} image", disc.name());
        self.disc = Some(disc);
    }

    /// Clean up and release the active disc, if any
    pub fn eject(&mut self) {
        if let Some(mut disc) = self.disc.take() {
            disc.cleanup();
            log::info!("MOUNT: Ejected {} image", disc.name());
        }
    }

    /// Whether a disc is mounted
    pub fn check(&self) -> bool {
        self.disc.is_some()
    }

    fn active(&self, operation: &'static str) -> Result<&dyn Disc> {
        self.disc
            .as_deref()
            .ok_or(GdromError::NoMount { operation })
    }

    fn active_mut(&mut self, operation: &'static str) -> Result<&mut (dyn Disc + 'static)> {
        self.disc
            .as_deref_mut()
            .ok_or(GdromError::NoMount { operation })
    }

    /// Read `count` consecutive sectors starting at `fad` into `buf`
    ///
    /// `buf` must hold at least `count * 2048` bytes. Stops at the first
    /// backend failure; bytes already copied are left in place.
    pub fn read_sectors(
        &mut self,
        buf: &mut [u8],
        fad_start: u32,
        count: u32,
    ) -> std::result::Result<(), SenseError> {
        let disc = self.disc.as_deref_mut().ok_or(SenseError::no_disc())?;

        let sectors = buf.chunks_exact_mut(GDROM_SECTOR_SIZE).take(count as usize);
        for (fad, sector) in (fad_start..).zip(sectors) {
            if let Err(e) = disc.read_sector(fad, sector) {
                log::warn!("MOUNT: Failed to read FAD {}: {}", fad, e);
                return Err(SenseError::illegal_request());
            }
        }

        Ok(())
    }

    /// Table of contents of `region`
    pub fn read_toc(&mut self, region: MountRegion) -> std::result::Result<Toc, SenseError> {
        let disc = self.disc.as_deref_mut().ok_or(SenseError::no_disc())?;

        if region == MountRegion::HighDensity && !disc.has_hd_region() {
            log::debug!("MOUNT: {} image has no high-density region", disc.name());
            return Err(SenseError::illegal_request());
        }

        disc.read_toc(region).ok_or_else(|| {
            log::debug!("MOUNT: {} image cannot build a TOC", disc.name());
            SenseError::illegal_request()
        })
    }

    pub fn get_meta(&mut self) -> Result<DiscMeta> {
        Ok(self.active_mut("get_meta")?.get_meta()?)
    }

    pub fn get_leadout(&self) -> Result<u32> {
        Ok(self.active("get_leadout")?.get_leadout())
    }

    pub fn has_hd_region(&self) -> Result<bool> {
        Ok(self.active("has_hd_region")?.has_hd_region())
    }

    pub fn get_disc_type(&self) -> Result<DiscType> {
        Ok(self.active("get_disc_type")?.get_disc_type())
    }

    pub fn session_count(&self) -> Result<usize> {
        Ok(self.active("session_count")?.session_count())
    }

    pub fn get_session_start(&self, session: usize) -> Result<Option<SessionStart>> {
        Ok(self.active("get_session_start")?.get_session_start(session))
    }

    /// Serialize `toc` into the `READ_TOC` wire format
    pub fn encode_toc(toc: &Toc) -> [u8; CDROM_TOC_SIZE] {
        encode_toc(toc)
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        self.eject();
    }
}

/// Open a disc image, choosing the backend from the file extension
pub fn open_image<P: AsRef<Path>>(path: P) -> Result<Box<dyn Disc>> {
    open_image_with(path, chd::DEFAULT_HUNK_CACHE)
}

/// Like [`open_image`], with an explicit CHD hunk cache size
pub fn open_image_with<P: AsRef<Path>>(path: P, chd_hunk_cache: usize) -> Result<Box<dyn Disc>> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let mut disc: Box<dyn Disc> = match ext.as_deref() {
        Some("gdi") => Box::new(GdiImage::open(path)?),
        Some("cdi") => Box::new(CdiImage::open(path)?),
        Some("chd") => Box::new(ChdImage::open_with_cache(path, chd_hunk_cache)?),
        _ => return Err(GdromError::UnsupportedImage(path.to_path_buf())),
    };

    match disc.get_meta() {
        Ok(meta) => log::info!(
            "MOUNT: {} [{}] {} {}",
            path.display(),
            disc.get_disc_type(),
            meta.product_number,
            meta.title
        ),
        Err(e) => log::info!(
            "MOUNT: {} [{}] (no header: {})",
            path.display(),
            disc.get_disc_type(),
            e
        ),
    }

    Ok(disc)
}
