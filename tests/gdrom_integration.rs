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

//! GD-ROM integration tests
//!
//! Every test here talks to the drive through its register file only, the
//! way guest software does.

mod common;

use common::assertions::{assert_check, assert_ready, drain_pio, read8, send_packet, write8};
use common::fixtures::{
    sector_byte, write_gdi_image, FIXTURE_TITLE, HD_DATA_FAD, HD_DATA_FRAMES,
};
use gdrom::core::gdrom::{
    Gdrom, IntReason, Status, GDROM_REG_BASE, PACKET_LEN, PKT_CD_READ, PKT_GET_TOC,
    PKT_REQ_ERROR, PKT_REQ_SES, PKT_TEST_UNIT, REG_BYTE_COUNT_HIGH, REG_BYTE_COUNT_LOW,
    REG_FEATURES, REG_GDAPRO, REG_GDDIR, REG_GDEN, REG_GDLEN, REG_GDLEND, REG_GDST, REG_GDSTAR,
    REG_DATA, REG_INT_REASON, REG_SECTOR_NUMBER, REG_STATUS,
};
use gdrom::core::host::{RamHost, RAM_BASE};
use gdrom::core::mount::{decode_toc, Toc};
use gdrom::core::save_state::GdromSnapshot;
use tempfile::TempDir;

fn mounted_drive() -> (Gdrom<RamHost>, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut drive = Gdrom::new(RamHost::new());
    drive.mount_image(write_gdi_image(dir.path())).unwrap();
    (drive, dir)
}

fn packet(opcode: u8, bytes: &[(usize, u8)]) -> [u8; PACKET_LEN] {
    let mut pkt = [0u8; PACKET_LEN];
    pkt[0] = opcode;
    for &(idx, value) in bytes {
        pkt[idx] = value;
    }
    pkt
}

fn read_packet(fad: u32, count: u32) -> [u8; PACKET_LEN] {
    packet(
        PKT_CD_READ,
        &[
            (1, 0x20),
            (2, (fad >> 16) as u8),
            (3, (fad >> 8) as u8),
            (4, fad as u8),
            (8, (count >> 16) as u8),
            (9, (count >> 8) as u8),
            (10, count as u8),
        ],
    )
}

fn read_toc(drive: &mut Gdrom<RamHost>, session: u8) -> Toc {
    send_packet(drive, packet(PKT_GET_TOC, &[(1, session), (3, 0x01), (4, 0x98)]));
    let bytes: [u8; 408] = drain_pio(drive).try_into().unwrap();
    decode_toc(&bytes)
}

#[test]
fn test_mount_and_read_tocs() {
    let (mut drive, _dir) = mounted_drive();

    send_packet(&mut drive, packet(PKT_TEST_UNIT, &[]));
    assert_ready(&mut drive);

    let low = read_toc(&mut drive, 0);
    assert_eq!((low.first_track, low.last_track), (1, 2));
    assert!(low.tracks[0].valid && low.tracks[1].valid);
    assert_eq!(low.tracks[0].fad, 150);
    assert_eq!(low.tracks[0].ctrl, 4);
    assert_eq!(low.tracks[1].ctrl, 0);

    let high = read_toc(&mut drive, 1);
    assert_eq!((high.first_track, high.last_track), (3, 3));
    assert!(high.tracks[2].valid);
    assert_eq!(high.tracks[2].fad, HD_DATA_FAD);
    assert_eq!(high.leadout, HD_DATA_FAD + HD_DATA_FRAMES);
}

#[test]
fn test_no_disc_reports_not_ready() {
    let mut drive = Gdrom::new(RamHost::new());
    assert_eq!(read8(&mut drive, REG_SECTOR_NUMBER) & 0x0F, 7);

    send_packet(&mut drive, packet(PKT_TEST_UNIT, &[]));
    assert_check(&mut drive, 0x2);

    send_packet(&mut drive, packet(PKT_REQ_ERROR, &[(4, 10)]));
    let sense = drain_pio(&mut drive);
    assert_eq!(sense[2] & 0x0F, 0x2);
    assert_eq!(sense[8], 0x3A);
}

#[test]
fn test_pio_read_of_disc_header() {
    let (mut drive, _dir) = mounted_drive();
    send_packet(&mut drive, read_packet(HD_DATA_FAD, 2));

    let count = read8(&mut drive, REG_BYTE_COUNT_LOW) as u16
        | (read8(&mut drive, REG_BYTE_COUNT_HIGH) as u16) << 8;
    assert_eq!(count, 4096);
    assert_eq!(
        IntReason::from_bits_truncate(read8(&mut drive, REG_INT_REASON)),
        IntReason::IO
    );

    let data = drain_pio(&mut drive);
    assert_eq!(data.len(), 4096);
    assert_eq!(&data[..16], b"SEGA SEGAKATANA ");
    assert_eq!(&data[0x80..0x80 + FIXTURE_TITLE.len()], FIXTURE_TITLE.as_bytes());
    assert_eq!(data[2048], sector_byte(HD_DATA_FAD + 1, 0));
    assert_eq!(data[4095], sector_byte(HD_DATA_FAD + 1, 2047));

    assert_eq!(
        IntReason::from_bits_truncate(read8(&mut drive, REG_INT_REASON)),
        IntReason::COD | IntReason::IO
    );
    assert_ready(&mut drive);
    assert_eq!(drive.host().ext_interrupt_count, 2);
}

#[test]
fn test_read_from_cooked_track() {
    let (mut drive, _dir) = mounted_drive();
    send_packet(&mut drive, read_packet(152, 1));

    let data = drain_pio(&mut drive);
    let expected: Vec<u8> = (0..2048).map(|i| sector_byte(152, i)).collect();
    assert_eq!(data, expected);
}

#[test]
fn test_read_past_leadout_sets_sense() {
    let (mut drive, _dir) = mounted_drive();
    send_packet(&mut drive, read_packet(HD_DATA_FAD + HD_DATA_FRAMES - 1, 2));

    assert_check(&mut drive, 0x5);
    assert!(drain_pio(&mut drive).is_empty());

    // the next TEST_UNIT clears the latched error
    send_packet(&mut drive, packet(PKT_TEST_UNIT, &[]));
    assert_ready(&mut drive);
}

#[test]
fn test_dma_read_into_ram() {
    let (mut drive, _dir) = mounted_drive();
    let dest = RAM_BASE + 0x0001_0000;

    write8(&mut drive, REG_FEATURES, 1);
    drive.write_reg(GDROM_REG_BASE + REG_GDSTAR, 4, dest).unwrap();
    drive.write_reg(GDROM_REG_BASE + REG_GDLEN, 4, 3 * 2048).unwrap();
    drive.write_reg(GDROM_REG_BASE + REG_GDDIR, 4, 1).unwrap();
    drive.write_reg(GDROM_REG_BASE + REG_GDEN, 4, 1).unwrap();

    send_packet(&mut drive, read_packet(HD_DATA_FAD + 4, 3));
    let status = Status::from_bits_truncate(read8(&mut drive, REG_STATUS));
    assert!(!status.contains(Status::DRQ));
    assert_eq!(drive.host().dma_complete_count, 0);

    drive.write_reg(GDROM_REG_BASE + REG_GDST, 4, 1).unwrap();

    assert_eq!(drive.read_reg(GDROM_REG_BASE + REG_GDLEND, 4).unwrap(), 3 * 2048);
    assert_eq!(drive.read_reg(GDROM_REG_BASE + REG_GDST, 4).unwrap(), 0);
    assert_eq!(drive.host().dma_complete_count, 1);

    let ram = drive.host().read(dest, 3 * 2048).unwrap();
    for sector in 0..3 {
        let fad = HD_DATA_FAD + 4 + sector as u32;
        assert_eq!(ram[sector * 2048], sector_byte(fad, 0));
        assert_eq!(ram[sector * 2048 + 2047], sector_byte(fad, 2047));
    }
}

#[test]
fn test_dma_respects_protection_window() {
    let (mut drive, _dir) = mounted_drive();
    // window 0x0C000000..=0x0C1FFFFF
    drive
        .write_reg(GDROM_REG_BASE + REG_GDAPRO, 4, 0x8843_4041)
        .unwrap();
    let dest = 0x0C1F_F800;

    write8(&mut drive, REG_FEATURES, 1);
    drive.write_reg(GDROM_REG_BASE + REG_GDSTAR, 4, dest).unwrap();
    drive.write_reg(GDROM_REG_BASE + REG_GDLEN, 4, 2 * 2048).unwrap();
    drive.write_reg(GDROM_REG_BASE + REG_GDDIR, 4, 1).unwrap();
    drive.write_reg(GDROM_REG_BASE + REG_GDEN, 4, 1).unwrap();

    send_packet(&mut drive, read_packet(HD_DATA_FAD + 1, 2));
    drive.write_reg(GDROM_REG_BASE + REG_GDST, 4, 1).unwrap();

    assert_eq!(drive.read_reg(GDROM_REG_BASE + REG_GDLEND, 4).unwrap(), 2048);
    assert_eq!(
        drive.host().read(dest, 1).unwrap()[0],
        sector_byte(HD_DATA_FAD + 1, 0)
    );
    assert!(drive
        .host()
        .read(0x0C20_0000, 2048)
        .unwrap()
        .iter()
        .all(|&b| b == 0));
}

#[test]
fn test_session_query() {
    let (mut drive, _dir) = mounted_drive();

    send_packet(&mut drive, packet(PKT_REQ_SES, &[(4, 6)]));
    let leadout = HD_DATA_FAD + HD_DATA_FRAMES;
    assert_eq!(
        drain_pio(&mut drive),
        vec![1, 0, 2, (leadout >> 16) as u8, (leadout >> 8) as u8, leadout as u8]
    );

    send_packet(&mut drive, packet(PKT_REQ_SES, &[(2, 1), (4, 6)]));
    assert_eq!(drain_pio(&mut drive), vec![1, 0, 1, 0, 0, 150]);
}

#[test]
fn test_eject_and_remount() {
    let (mut drive, dir) = mounted_drive();
    assert_eq!(read8(&mut drive, REG_SECTOR_NUMBER) >> 4, 0x8);

    drive.eject();
    send_packet(&mut drive, packet(PKT_TEST_UNIT, &[]));
    assert_check(&mut drive, 0x2);

    drive.mount_image(dir.path().join("game.gdi")).unwrap();
    send_packet(&mut drive, packet(PKT_TEST_UNIT, &[]));
    assert_ready(&mut drive);
}

#[test]
fn test_snapshot_resumes_pio_transfer() {
    let (mut drive, _dir) = mounted_drive();
    send_packet(&mut drive, read_packet(HD_DATA_FAD + 2, 2));

    let mut first = Vec::new();
    for _ in 0..1500 {
        let word = drive.read_reg(GDROM_REG_BASE + REG_DATA, 2).unwrap() as u16;
        first.extend_from_slice(&word.to_le_bytes());
    }

    let bytes = GdromSnapshot::capture(&drive).to_bytes().unwrap();
    let snapshot = GdromSnapshot::from_bytes(&bytes).unwrap();

    let mut restored = Gdrom::new(RamHost::new());
    restored
        .mount_image(snapshot.image.as_deref().unwrap())
        .unwrap();
    snapshot.restore(&mut restored).unwrap();

    let rest = drain_pio(&mut restored);
    assert_eq!(first.len() + rest.len(), 4096);
    assert_eq!(rest, drain_pio(&mut drive));

    first.extend(rest);
    for (i, byte) in first.iter().enumerate() {
        let fad = HD_DATA_FAD + 2 + (i / 2048) as u32;
        assert_eq!(*byte, sector_byte(fad, i % 2048));
    }
}
