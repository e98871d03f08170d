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

//! CHD (MAME compressed hunks of data) disc images
//!
//! Track layout comes from the `CHGD` (GD-ROM) or `CHT2` (CD-ROM) metadata
//! entries. Every CD frame is stored as 2352 bytes of sector data followed by
//! 96 bytes of subcode, and each track is padded to a multiple of four frames.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chd::metadata::Metadata;
use chd::Chd;

use super::{Disc, DiscMeta, MountRegion, SessionStart, Toc, DISC_META_SIZE};
use crate::core::cdrom::{
    checked_track_end, DiscType, CDROM_FRAME_SIZE, CDROM_MAX_TRACKS, FAD_OFFSET,
    GDROM_HD_AREA_FAD, GDROM_SECTOR_SIZE, TRACK_CTRL_AUDIO, TRACK_CTRL_DATA,
};
use crate::core::error::{DiscError, GdromError, Result};

/// Number of decompressed hunks kept in memory by default
pub const DEFAULT_HUNK_CACHE: usize = 4;

/// Bytes per frame in the hunk stream
pub const CHD_FRAME_SIZE: usize = CDROM_FRAME_SIZE + 96;

/// Tracks are padded to a multiple of this many frames
const CHD_TRACK_PADDING: u32 = 4;

pub const CHGD_TAG: u32 = u32::from_be_bytes(*b"CHGD");
pub const CHT2_TAG: u32 = u32::from_be_bytes(*b"CHT2");

/// Offset of the user data inside a raw mode 1 frame
const MODE1_RAW_DATA_OFFSET: usize = 16;

/// One parsed track metadata entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChdTrackMeta {
    pub number: usize,
    pub track_type: String,
    pub frames: u32,
    pub pregap: u32,
    pub pregap_type: String,
}

impl ChdTrackMeta {
    /// Parse a `TRACK:n TYPE:t ... FRAMES:f ... PREGAP:p PGTYPE:g ...` entry
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let text = text.trim_end_matches('\0').trim();

        let mut number = None;
        let mut track_type = None;
        let mut frames = None;
        let mut pregap = 0;
        let mut pregap_type = String::new();

        for field in text.split_whitespace() {
            let Some((key, value)) = field.split_once(':') else {
                continue;
            };
            let int = || {
                value
                    .parse::<u32>()
                    .map_err(|_| format!("bad {} value '{}'", key, value))
            };
            match key {
                "TRACK" => number = Some(int()? as usize),
                "TYPE" => track_type = Some(value.to_string()),
                "FRAMES" => frames = Some(int()?),
                "PREGAP" => pregap = int()?,
                "PGTYPE" => pregap_type = value.to_string(),
                _ => {}
            }
        }

        Ok(Self {
            number: number.ok_or_else(|| format!("no TRACK in '{}'", text))?,
            track_type: track_type.ok_or_else(|| format!("no TYPE in '{}'", text))?,
            frames: frames.ok_or_else(|| format!("no FRAMES in '{}'", text))?,
            pregap,
            pregap_type,
        })
    }

    /// Pregap frames stored in the hunk stream ahead of the track data
    fn stored_pregap(&self) -> u32 {
        if self.pregap_type.starts_with('V') {
            self.pregap
        } else {
            0
        }
    }
}

/// A track with its position in both the FAD space and the hunk stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChdTrack {
    pub number: usize,
    pub ctrl: u8,
    pub fad_start: u32,
    pub fad_len: u32,
    /// First frame of track data in the hunk stream
    pub chd_frame_start: u32,
    data_offset: usize,
}

impl ChdTrack {
    fn contains(&self, fad: u32) -> bool {
        fad >= self.fad_start && fad - self.fad_start < self.fad_len
    }

    /// Hunk number and byte offset of the user data for `fad`
    pub(crate) fn locate(&self, fad: u32, frames_per_hunk: usize) -> Option<(u32, usize)> {
        if !self.contains(fad) || frames_per_hunk == 0 {
            return None;
        }
        let frame = self.chd_frame_start as usize + (fad - self.fad_start) as usize;
        let hunk = u32::try_from(frame / frames_per_hunk).ok()?;
        let offset = (frame % frames_per_hunk) * CHD_FRAME_SIZE + self.data_offset;
        Some((hunk, offset))
    }
}

/// Decompressed hunks, most recently used first
#[derive(Debug)]
pub(crate) struct HunkCache {
    capacity: usize,
    entries: VecDeque<(u32, Vec<u8>)>,
}

impl HunkCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Move `hunk_num` to the front; false if it is not cached
    pub(crate) fn touch(&mut self, hunk_num: u32) -> bool {
        match self.entries.iter().position(|(n, _)| *n == hunk_num) {
            Some(pos) => {
                if let Some(entry) = self.entries.remove(pos) {
                    self.entries.push_front(entry);
                }
                true
            }
            None => false,
        }
    }

    /// Evict the least recently used hunk when full, handing back its buffer
    pub(crate) fn evict(&mut self) -> Option<Vec<u8>> {
        if self.entries.len() >= self.capacity {
            self.entries.pop_back().map(|(_, buf)| buf)
        } else {
            None
        }
    }

    pub(crate) fn insert(&mut self, hunk_num: u32, buf: Vec<u8>) {
        self.entries.push_front((hunk_num, buf));
        self.entries.truncate(self.capacity);
    }

    pub(crate) fn front(&self) -> Option<&[u8]> {
        self.entries.front().map(|(_, buf)| buf.as_slice())
    }

    #[cfg(test)]
    pub(crate) fn hunk_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }
}

/// Lay out the tracks described by `metas`
///
/// With `gdrom` set, track 3 is placed at the start of the high-density area.
pub fn build_tracks(
    metas: &[ChdTrackMeta],
    gdrom: bool,
) -> std::result::Result<Vec<ChdTrack>, String> {
    if metas.is_empty() {
        return Err("no track metadata".to_string());
    }
    if metas.len() > CDROM_MAX_TRACKS {
        return Err(format!("{} tracks exceeds the maximum", metas.len()));
    }

    let mut ordered: Vec<Option<&ChdTrackMeta>> = vec![None; metas.len()];
    for meta in metas {
        let slot = meta
            .number
            .checked_sub(1)
            .and_then(|i| ordered.get_mut(i))
            .ok_or_else(|| format!("track number {} out of range", meta.number))?;
        if slot.is_some() {
            return Err(format!("track {} described twice", meta.number));
        }
        *slot = Some(meta);
    }

    let mut tracks = Vec::with_capacity(metas.len());
    let mut chd_frame = 0u32;
    let mut fad = FAD_OFFSET;

    for (idx, meta) in ordered.into_iter().enumerate() {
        let meta = meta.ok_or_else(|| format!("track {} missing", idx + 1))?;

        let (ctrl, data_offset) = match meta.track_type.as_str() {
            "MODE1_RAW" => (TRACK_CTRL_DATA, MODE1_RAW_DATA_OFFSET),
            "AUDIO" => (TRACK_CTRL_AUDIO, 0),
            other => return Err(format!("unsupported track type {}", other)),
        };

        let overflow = || format!("track {} runs past the addressable range", meta.number);

        let stored = meta.stored_pregap();
        if meta.number > 1 && stored == 0 {
            fad = fad.checked_add(meta.pregap).ok_or_else(overflow)?;
        }
        let fad_start = if gdrom && meta.number == 3 {
            GDROM_HD_AREA_FAD
        } else {
            fad.checked_add(stored).ok_or_else(overflow)?
        };
        let fad_len = meta.frames.saturating_sub(stored);
        let fad_end = checked_track_end(fad_start, fad_len).ok_or_else(overflow)?;
        let chd_frame_start = chd_frame.checked_add(stored).ok_or_else(overflow)?;
        let padded = meta
            .frames
            .div_ceil(CHD_TRACK_PADDING)
            .checked_mul(CHD_TRACK_PADDING)
            .ok_or_else(overflow)?;

        tracks.push(ChdTrack {
            number: meta.number,
            ctrl,
            fad_start,
            fad_len,
            chd_frame_start,
            data_offset,
        });

        fad = fad_end;
        chd_frame = chd_frame.checked_add(padded).ok_or_else(overflow)?;
    }

    Ok(tracks)
}

/// Disc image stored as a `.chd` file
pub struct ChdImage {
    path: PathBuf,
    chd: Option<Chd<BufReader<File>>>,
    gdrom: bool,
    tracks: Vec<ChdTrack>,
    hunk_size: usize,
    cache: HunkCache,
    cmp_buf: Vec<u8>,
}

impl ChdImage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_cache(path, DEFAULT_HUNK_CACHE)
    }

    pub fn open_with_cache<P: AsRef<Path>>(path: P, cache_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let mut chd = Chd::open(file, None).map_err(|e| GdromError::Chd(e.to_string()))?;

        let hunk_size = chd.header().hunk_size() as usize;
        if hunk_size < CHD_FRAME_SIZE || hunk_size % CHD_FRAME_SIZE != 0 {
            return Err(GdromError::image_format(
                path,
                format!("hunk size {} is not a whole number of frames", hunk_size),
            ));
        }

        let metadata: Vec<Metadata> = chd
            .metadata_refs()
            .try_into()
            .map_err(|e: chd::Error| GdromError::Chd(e.to_string()))?;

        let gdrom = metadata.iter().any(|m| m.metatag == CHGD_TAG);
        let tag = if gdrom { CHGD_TAG } else { CHT2_TAG };
        let metas = metadata
            .iter()
            .filter(|m| m.metatag == tag)
            .map(|m| ChdTrackMeta::parse(&String::from_utf8_lossy(&m.value)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|reason| GdromError::image_format(path, reason))?;

        let tracks =
            build_tracks(&metas, gdrom).map_err(|reason| GdromError::image_format(path, reason))?;

        log::info!(
            "CHD: Loaded {} tracks from '{}' ({}, {} byte hunks)",
            tracks.len(),
            path.display(),
            if gdrom { "GD-ROM" } else { "CD-ROM" },
            hunk_size
        );

        Ok(Self {
            path: path.to_path_buf(),
            chd: Some(chd),
            gdrom,
            tracks,
            hunk_size,
            cache: HunkCache::new(cache_size),
            cmp_buf: Vec::new(),
        })
    }

    pub fn tracks(&self) -> &[ChdTrack] {
        &self.tracks
    }

    /// Decompressed contents of `hunk_num`, going through the cache
    fn hunk(&mut self, hunk_num: u32) -> std::result::Result<&[u8], DiscError> {
        if !self.cache.touch(hunk_num) {
            let chd = self.chd.as_mut().ok_or(DiscError::Missing("open CHD file"))?;
            let mut out = self
                .cache
                .evict()
                .unwrap_or_else(|| chd.get_hunksized_buffer());
            out.resize(self.hunk_size, 0);

            let mut hunk = chd
                .hunk(hunk_num)
                .map_err(|e| DiscError::Chd(e.to_string()))?;
            hunk.read_hunk_in(&mut self.cmp_buf, &mut out)
                .map_err(|e| DiscError::Chd(e.to_string()))?;
            log::trace!("CHD: Decompressed hunk {}", hunk_num);

            self.cache.insert(hunk_num, out);
        }

        self.cache
            .front()
            .ok_or(DiscError::Missing("cached hunk"))
    }
}

impl Disc for ChdImage {
    fn name(&self) -> &str {
        "CHD"
    }

    fn session_count(&self) -> usize {
        if self.gdrom {
            2
        } else {
            1
        }
    }

    fn read_toc(&mut self, region: MountRegion) -> Option<Toc> {
        let range = match (region, self.gdrom) {
            (MountRegion::LowDensity, true) => &self.tracks[..self.tracks.len().min(2)],
            (MountRegion::HighDensity, true) => self.tracks.get(2..)?,
            (MountRegion::LowDensity, false) => &self.tracks[..],
            (MountRegion::HighDensity, false) => return None,
        };
        let (first, last) = (range.first()?, range.last()?);

        let mut toc = Toc::default();
        for track in range {
            toc.set_track(track.number, track.fad_start, track.ctrl);
        }
        toc.first_track = first.number as u8;
        toc.last_track = last.number as u8;
        toc.leadout = last.fad_start + last.fad_len;
        Some(toc)
    }

    fn read_sector(&mut self, fad: u32, buf: &mut [u8]) -> std::result::Result<(), DiscError> {
        let track = self
            .tracks
            .iter()
            .find(|t| t.contains(fad))
            .ok_or(DiscError::FadOutOfRange { fad })?;

        let (hunk_num, offset) = track
            .locate(fad, self.hunk_size / CHD_FRAME_SIZE)
            .ok_or(DiscError::FadOutOfRange { fad })?;

        let hunk = self.hunk(hunk_num)?;
        buf[..GDROM_SECTOR_SIZE].copy_from_slice(&hunk[offset..offset + GDROM_SECTOR_SIZE]);
        Ok(())
    }

    fn get_meta(&mut self) -> std::result::Result<DiscMeta, DiscError> {
        let header_track = if self.gdrom {
            self.tracks.get(2)
        } else {
            self.tracks.iter().find(|t| t.ctrl == TRACK_CTRL_DATA)
        };
        let fad = header_track
            .map(|t| t.fad_start)
            .ok_or(DiscError::Missing("data track"))?;

        let mut sector = [0u8; GDROM_SECTOR_SIZE];
        self.read_sector(fad, &mut sector)?;

        let mut raw = [0u8; DISC_META_SIZE];
        raw.copy_from_slice(&sector[..DISC_META_SIZE]);
        Ok(DiscMeta::parse(&raw))
    }

    fn get_leadout(&self) -> u32 {
        self.tracks
            .last()
            .map(|t| t.fad_start + t.fad_len)
            .unwrap_or(0)
    }

    fn has_hd_region(&self) -> bool {
        self.gdrom
    }

    fn get_disc_type(&self) -> DiscType {
        if self.gdrom {
            DiscType::GdRom
        } else {
            DiscType::CdRom
        }
    }

    fn get_session_start(&self, session: usize) -> Option<SessionStart> {
        let track = match (session, self.gdrom) {
            (0, _) => self.tracks.first()?,
            (1, true) => self.tracks.get(2)?,
            _ => return None,
        };
        Some(SessionStart {
            first_track: track.number as u8,
            fad: track.fad_start,
        })
    }

    fn cleanup(&mut self) {
        self.chd = None;
        self.cache.entries.clear();
        log::debug!("CHD: Closed '{}'", self.path.display());
    }
}
