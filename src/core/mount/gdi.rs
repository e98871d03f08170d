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

//! GDI (track list) disc images
//!
//! A `.gdi` file is a text descriptor next to one data file per track:
//!
//! ```text
//! 3
//! 1 0 4 2352 track01.bin 0
//! 2 756 0 2352 track02.raw 0
//! 3 45000 4 2352 track03.bin 0
//! ```
//!
//! Line 0 is the track count. Every other line is
//! `track_no lba ctrl sector_size path offset`, separated by spaces or tabs.
//! Paths containing spaces may be double-quoted. Tracks 1-2 form the
//! single-density session, tracks 3..N the high-density session.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::{Disc, DiscMeta, MountRegion, SessionStart, Toc, DISC_META_SIZE};
use crate::core::cdrom::{
    checked_lba_to_fad, checked_track_end, DiscType, CDROM_FRAME_SIZE, CDROM_MAX_TRACKS,
    GDROM_SECTOR_SIZE,
};
use crate::core::error::{DiscError, GdromError, Result};

/// Fewest tracks a GD-ROM can have: two single-density tracks and one data track
pub const GDI_MIN_TRACKS: usize = 3;

/// Track whose data file carries the disc header
const GDI_META_TRACK: usize = 3;

/// One parsed descriptor line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdiTrackDesc {
    pub number: usize,
    pub lba: u32,
    pub ctrl: u8,
    pub sector_size: usize,
    pub path: PathBuf,
    pub offset: u64,
}

#[derive(Debug)]
struct GdiTrack {
    desc: GdiTrackDesc,
    fad_start: u32,
    fad_len: u32,
    file: Option<File>,
}

impl GdiTrack {
    fn contains(&self, fad: u32) -> bool {
        fad >= self.fad_start && fad - self.fad_start < self.fad_len
    }

    /// Bytes to skip inside a stored sector to reach the user data
    fn data_offset(&self) -> u64 {
        (self.desc.sector_size - GDROM_SECTOR_SIZE).min(16) as u64
    }
}

/// Disc image described by a `.gdi` file
#[derive(Debug)]
pub struct GdiImage {
    path: PathBuf,
    tracks: Vec<GdiTrack>,
}

impl GdiImage {
    /// Parse the descriptor at `path` and open every track file
    ///
    /// Track paths are resolved relative to the descriptor's directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let descs = Self::parse(&text).map_err(|reason| GdromError::image_format(path, reason))?;

        let mut tracks = Vec::with_capacity(descs.len());
        for desc in descs {
            let track_path = base_dir.join(&desc.path);
            let file = File::open(&track_path).map_err(|e| {
                GdromError::image_format(
                    path,
                    format!("cannot open track {} '{}': {}", desc.number, track_path.display(), e),
                )
            })?;
            let file_len = file.metadata()?.len();
            let frames = file_len.saturating_sub(desc.offset) / desc.sector_size as u64;
            let (fad_start, fad_len) = checked_lba_to_fad(desc.lba)
                .zip(u32::try_from(frames).ok())
                .filter(|&(start, len)| checked_track_end(start, len).is_some())
                .ok_or_else(|| {
                    GdromError::image_format(
                        path,
                        format!(
                            "track {} at lba {} ({} frames) runs past the addressable range",
                            desc.number, desc.lba, frames
                        ),
                    )
                })?;

            log::debug!(
                "GDI: track {} lba {} ctrl {} size {} ({} frames) '{}'",
                desc.number,
                desc.lba,
                desc.ctrl,
                desc.sector_size,
                fad_len,
                track_path.display()
            );

            tracks.push(GdiTrack {
                fad_start,
                fad_len,
                file: Some(file),
                desc,
            });
        }

        for pair in tracks.windows(2) {
            if pair[0].fad_start + pair[0].fad_len > pair[1].fad_start {
                return Err(GdromError::image_format(
                    path,
                    format!(
                        "track {} overlaps track {}",
                        pair[0].desc.number, pair[1].desc.number
                    ),
                ));
            }
        }

        log::info!("GDI: Loaded {} tracks from '{}'", tracks.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            tracks,
        })
    }

    /// Parse descriptor text into tracks ordered by track number
    pub fn parse(text: &str) -> std::result::Result<Vec<GdiTrackDesc>, String> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let count_line = lines.next().ok_or("empty descriptor")?;
        let count: usize = count_line
            .parse()
            .map_err(|_| format!("invalid track count '{}'", count_line))?;
        if !(GDI_MIN_TRACKS..=CDROM_MAX_TRACKS).contains(&count) {
            return Err(format!(
                "track count {} outside {}..={}",
                count, GDI_MIN_TRACKS, CDROM_MAX_TRACKS
            ));
        }

        let mut slots: Vec<Option<GdiTrackDesc>> = vec![None; count];
        for line in lines {
            let desc = Self::parse_line(line)?;
            let slot = desc
                .number
                .checked_sub(1)
                .and_then(|idx| slots.get_mut(idx))
                .ok_or_else(|| format!("track number {} out of range", desc.number))?;
            if slot.is_some() {
                return Err(format!("track {} specified more than once", desc.number));
            }
            *slot = Some(desc);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| slot.ok_or_else(|| format!("track {} is missing", idx + 1)))
            .collect()
    }

    fn parse_line(line: &str) -> std::result::Result<GdiTrackDesc, String> {
        let cols = split_columns(line);
        if cols.len() != 6 {
            return Err(format!("expected 6 columns, got {}: '{}'", cols.len(), line));
        }

        fn num<T: std::str::FromStr>(col: &str, what: &str) -> std::result::Result<T, String> {
            col.parse().map_err(|_| format!("invalid {} '{}'", what, col))
        }

        let sector_size: usize = num(&cols[3], "sector size")?;
        if sector_size != CDROM_FRAME_SIZE && sector_size != GDROM_SECTOR_SIZE {
            return Err(format!("unsupported sector size {}", sector_size));
        }

        Ok(GdiTrackDesc {
            number: num(&cols[0], "track number")?,
            lba: num(&cols[1], "lba")?,
            ctrl: num::<u8>(&cols[2], "control")? & 0x0F,
            sector_size,
            path: PathBuf::from(&cols[4]),
            offset: num(&cols[5], "offset")?,
        })
    }

    fn track_for_fad(&mut self, fad: u32) -> Option<&mut GdiTrack> {
        self.tracks.iter_mut().find(|t| t.contains(fad))
    }

    fn toc_for(&self, range: std::ops::RangeInclusive<usize>) -> Option<Toc> {
        let tracks = self.tracks.get(range.start() - 1..*range.end())?;
        let last = tracks.last()?;

        let mut toc = Toc::default();
        for track in tracks {
            toc.set_track(track.desc.number, track.fad_start, track.desc.ctrl);
        }
        toc.first_track = *range.start() as u8;
        toc.last_track = *range.end() as u8;
        toc.leadout = last.fad_start + last.fad_len;
        Some(toc)
    }
}

/// Split a descriptor line on whitespace, keeping double-quoted runs together
fn split_columns(line: &str) -> Vec<String> {
    let mut cols = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    cols.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        cols.push(current);
    }
    cols
}

impl Disc for GdiImage {
    fn name(&self) -> &str {
        "GDI"
    }

    fn session_count(&self) -> usize {
        2
    }

    fn read_toc(&mut self, region: MountRegion) -> Option<Toc> {
        match region {
            MountRegion::LowDensity => self.toc_for(1..=2),
            MountRegion::HighDensity => self.toc_for(GDI_META_TRACK..=self.tracks.len()),
        }
    }

    fn read_sector(&mut self, fad: u32, buf: &mut [u8]) -> std::result::Result<(), DiscError> {
        let track = self
            .track_for_fad(fad)
            .ok_or(DiscError::FadOutOfRange { fad })?;

        let pos = track.desc.offset
            + (fad - track.fad_start) as u64 * track.desc.sector_size as u64
            + track.data_offset();
        let file = track.file.as_mut().ok_or(DiscError::Missing("open track file"))?;

        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut buf[..GDROM_SECTOR_SIZE])?;
        Ok(())
    }

    fn get_meta(&mut self) -> std::result::Result<DiscMeta, DiscError> {
        let track = self
            .tracks
            .get_mut(GDI_META_TRACK - 1)
            .ok_or(DiscError::Missing("data track"))?;
        let pos = track.desc.offset + track.data_offset();
        let file = track.file.as_mut().ok_or(DiscError::Missing("open track file"))?;

        let mut raw = [0u8; DISC_META_SIZE];
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut raw)?;
        Ok(DiscMeta::parse(&raw))
    }

    fn get_leadout(&self) -> u32 {
        self.tracks
            .last()
            .map(|t| t.fad_start + t.fad_len)
            .unwrap_or(0)
    }

    fn has_hd_region(&self) -> bool {
        true
    }

    fn get_disc_type(&self) -> DiscType {
        DiscType::GdRom
    }

    fn get_session_start(&self, session: usize) -> Option<SessionStart> {
        let track_no = match session {
            0 => 1,
            1 => GDI_META_TRACK,
            _ => return None,
        };
        self.tracks.get(track_no - 1).map(|t| SessionStart {
            first_track: track_no as u8,
            fad: t.fad_start,
        })
    }

    fn cleanup(&mut self) {
        for track in &mut self.tracks {
            track.file = None;
        }
        log::debug!("GDI: Closed track files of '{}'", self.path.display());
    }
}
