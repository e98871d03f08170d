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

//! CDI (DiscJuggler) disc images
//!
//! The descriptor lives at the end of the file. The last 8 bytes hold the
//! format version and the position of the session header:
//!
//! | Version      | Header position                    |
//! |--------------|------------------------------------|
//! | `0x80000004` | absolute offset from start of file |
//! | `0x80000005` | absolute offset from start of file |
//! | `0x80000006` | offset backwards from end of file  |
//!
//! Sector data for all tracks is stored back to back from the start of the
//! file, each track preceded by its pregap.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::{Disc, DiscMeta, MountRegion, SessionStart, Toc, DISC_META_SIZE};
use crate::core::cdrom::{
    cdrom_lba_to_fad, checked_lba_to_fad, checked_track_end, DiscType, CDROM_FRAME_SIZE,
    CDROM_MAX_TRACKS, CDROM_MODE2_SIZE, GDROM_SECTOR_SIZE, TRACK_CTRL_AUDIO, TRACK_CTRL_DATA,
};
use crate::core::error::{DiscError, GdromError, Result};

pub const CDI_V2: u32 = 0x8000_0004;
pub const CDI_V3: u32 = 0x8000_0005;
pub const CDI_V35: u32 = 0x8000_0006;

/// Sentinel every track record carries after its leading bytes
pub const CDI_TRACK_START_MARK: [u8; 14] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Subheader bytes in front of the user data of a 2336-byte sector
const CDI_SUBHEADER_SIZE: usize = 8;

/// A track as described by the CDI trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdiTrack {
    /// 1-indexed across all sessions
    pub number: usize,
    pub session: usize,
    pub pregap: u32,
    pub length: u32,
    pub start_lba: u32,
    pub total_length: u32,
    pub sector_size: usize,
    pub ctrl: u8,
    /// Byte offset of the track's pregap in the image
    pub start: u64,
}

impl CdiTrack {
    pub fn fad_start(&self) -> u32 {
        cdrom_lba_to_fad(self.start_lba)
    }

    fn contains(&self, fad: u32) -> bool {
        fad >= self.fad_start() && fad - self.fad_start() < self.length
    }

    /// File offset of the user data of `fad`
    fn byte_offset(&self, fad: u32) -> u64 {
        let sector_size = self.sector_size as u64;
        let data_skip = (self.sector_size - CDROM_MODE2_SIZE + CDI_SUBHEADER_SIZE) as u64;
        self.start
            + self.pregap as u64 * sector_size
            + data_skip
            + (fad - self.fad_start()) as u64 * sector_size
    }
}

/// Disc image stored as a single `.cdi` file
pub struct CdiImage {
    path: PathBuf,
    file: Option<BufReader<File>>,
    /// Track ranges of each session, as indices into `tracks`
    sessions: Vec<std::ops::Range<usize>>,
    tracks: Vec<CdiTrack>,
}

impl CdiImage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = BufReader::new(File::open(path)?);

        let (sessions, tracks) =
            Self::parse(&mut file).map_err(|reason| GdromError::image_format(path, reason))?;

        log::info!(
            "CDI: Loaded {} sessions, {} tracks from '{}'",
            sessions.len(),
            tracks.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            sessions,
            tracks,
        })
    }

    /// Parse the trailer and session descriptors of an image
    pub fn parse<R: Read + Seek>(
        reader: &mut R,
    ) -> std::result::Result<(Vec<std::ops::Range<usize>>, Vec<CdiTrack>), String> {
        let io = |e: std::io::Error| format!("truncated descriptor: {}", e);

        let file_len = reader.seek(SeekFrom::End(0)).map_err(io)?;
        if file_len < 8 {
            return Err("file too short for a CDI trailer".to_string());
        }
        reader.seek(SeekFrom::End(-8)).map_err(io)?;
        let version = read_u32(reader).map_err(io)?;
        let header_pos = read_u32(reader).map_err(io)? as u64;

        let header_start = match version {
            CDI_V2 | CDI_V3 => header_pos,
            CDI_V35 => file_len
                .checked_sub(header_pos)
                .ok_or_else(|| format!("header offset {} past start of file", header_pos))?,
            _ => return Err(format!("unrecognized CDI version {:#010x}", version)),
        };
        log::debug!(
            "CDI: version {:#010x}, header at {:#x}",
            version,
            header_start
        );
        reader.seek(SeekFrom::Start(header_start)).map_err(io)?;

        let session_count = read_u16(reader).map_err(io)? as usize;
        let mut sessions = Vec::with_capacity(session_count);
        let mut tracks: Vec<CdiTrack> = Vec::new();
        let mut data_pos = 0u64;

        for session in 0..session_count {
            let track_count = read_u16(reader).map_err(io)? as usize;
            let first = tracks.len();

            for _ in 0..track_count {
                if tracks.len() >= CDROM_MAX_TRACKS {
                    return Err(format!("more than {} tracks", CDROM_MAX_TRACKS));
                }
                let mut track = Self::parse_track(reader, version)?;
                track.number = tracks.len() + 1;
                checked_lba_to_fad(track.start_lba)
                    .and_then(|fad| checked_track_end(fad, track.length))
                    .ok_or_else(|| {
                        format!(
                            "track {} at lba {} ({} frames) runs past the addressable range",
                            track.number, track.start_lba, track.length
                        )
                    })?;
                track.session = session;
                track.start = data_pos;
                data_pos += track.total_length as u64 * track.sector_size as u64;

                log::debug!(
                    "CDI: session {} track {} lba {} pregap {} length {} sector {}",
                    session,
                    track.number,
                    track.start_lba,
                    track.pregap,
                    track.length,
                    track.sector_size
                );
                tracks.push(track);
            }

            sessions.push(first..tracks.len());
            skip(reader, if version == CDI_V2 { 12 } else { 13 }).map_err(io)?;
        }

        for pair in tracks.windows(2) {
            if pair[0].fad_start() + pair[0].length > pair[1].fad_start() {
                return Err(format!(
                    "track {} overlaps track {}",
                    pair[0].number, pair[1].number
                ));
            }
        }

        Ok((sessions, tracks))
    }

    fn parse_track<R: Read + Seek>(
        reader: &mut R,
        version: u32,
    ) -> std::result::Result<CdiTrack, String> {
        let io = |e: std::io::Error| format!("truncated track record: {}", e);

        // DiscJuggler 3.00.780 and later prepend 8 bytes of extra data
        if read_u32(reader).map_err(io)? != 0 {
            skip(reader, 8).map_err(io)?;
        }
        skip(reader, 6).map_err(io)?;

        let mut mark = [0u8; 14];
        reader.read_exact(&mut mark).map_err(io)?;
        if mark != CDI_TRACK_START_MARK {
            return Err(format!("bad track start mark {:02X?}", mark));
        }

        skip(reader, 4).map_err(io)?;
        let path_len = read_u8(reader).map_err(io)? as i64;
        skip(reader, path_len + 19).map_err(io)?;
        // DiscJuggler 4 inserts another 8 bytes
        if read_u32(reader).map_err(io)? == 0x8000_0000 {
            skip(reader, 8).map_err(io)?;
        }
        skip(reader, 2).map_err(io)?;

        let pregap = read_u32(reader).map_err(io)?;
        let length = read_u32(reader).map_err(io)?;
        skip(reader, 6).map_err(io)?;
        let mode = read_u32(reader).map_err(io)?;
        skip(reader, 12).map_err(io)?;
        let start_lba = read_u32(reader).map_err(io)?;
        let total_length = read_u32(reader).map_err(io)?;
        skip(reader, 16).map_err(io)?;

        let sector_type = read_u32(reader).map_err(io)?;
        let sector_size = match sector_type {
            1 => CDROM_MODE2_SIZE,
            2 => CDROM_FRAME_SIZE,
            other => return Err(format!("unsupported sector type {}", other)),
        };
        // control nibble derived from the track mode (0 = audio, 1/2 = data)
        let ctrl = if mode == 0 {
            TRACK_CTRL_AUDIO
        } else {
            TRACK_CTRL_DATA
        };

        skip(reader, 29).map_err(io)?;
        if version != CDI_V2 {
            skip(reader, 5).map_err(io)?;
            if read_u32(reader).map_err(io)? == 0xFFFF_FFFF {
                skip(reader, 78).map_err(io)?;
            }
        }

        Ok(CdiTrack {
            number: 0,
            session: 0,
            pregap,
            length,
            start_lba,
            total_length,
            sector_size,
            ctrl,
            start: 0,
        })
    }

    pub fn tracks(&self) -> &[CdiTrack] {
        &self.tracks
    }
}

fn read_u8<R: Read>(reader: &mut R) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn skip<R: Seek>(reader: &mut R, n: i64) -> std::io::Result<()> {
    reader.seek(SeekFrom::Current(n)).map(|_| ())
}

impl Disc for CdiImage {
    fn name(&self) -> &str {
        "CDI"
    }

    fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn read_toc(&mut self, region: MountRegion) -> Option<Toc> {
        if region != MountRegion::LowDensity {
            return None;
        }
        let last = self.tracks.last()?;

        let mut toc = Toc::default();
        for track in &self.tracks {
            toc.set_track(track.number, track.fad_start(), track.ctrl);
        }
        toc.first_track = 1;
        toc.last_track = last.number as u8;
        toc.leadout = last.fad_start() + last.length;
        Some(toc)
    }

    fn read_sector(&mut self, fad: u32, buf: &mut [u8]) -> std::result::Result<(), DiscError> {
        let track = self
            .tracks
            .iter()
            .find(|t| t.contains(fad))
            .ok_or(DiscError::FadOutOfRange { fad })?;
        let pos = track.byte_offset(fad);

        let file = self.file.as_mut().ok_or(DiscError::Missing("open image file"))?;
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(&mut buf[..GDROM_SECTOR_SIZE])?;
        Ok(())
    }

    fn get_meta(&mut self) -> std::result::Result<DiscMeta, DiscError> {
        let fad = self
            .sessions
            .get(1)
            .and_then(|s| self.tracks.get(s.start))
            .map(CdiTrack::fad_start)
            .ok_or(DiscError::Missing("second session"))?;

        let mut sector = [0u8; GDROM_SECTOR_SIZE];
        self.read_sector(fad, &mut sector)?;

        let mut raw = [0u8; DISC_META_SIZE];
        raw.copy_from_slice(&sector[..DISC_META_SIZE]);
        Ok(DiscMeta::parse(&raw))
    }

    fn get_leadout(&self) -> u32 {
        self.tracks
            .last()
            .map(|t| t.fad_start() + t.length)
            .unwrap_or(0)
    }

    fn has_hd_region(&self) -> bool {
        false
    }

    fn get_disc_type(&self) -> DiscType {
        DiscType::CdRomXa
    }

    fn get_session_start(&self, session: usize) -> Option<SessionStart> {
        let range = self.sessions.get(session)?;
        let track = self.tracks.get(range.start)?;
        if range.is_empty() {
            return None;
        }
        Some(SessionStart {
            first_track: track.number as u8,
            fad: track.fad_start(),
        })
    }

    fn cleanup(&mut self) {
        self.file = None;
        log::debug!("CDI: Closed '{}'", self.path.display());
    }
}
