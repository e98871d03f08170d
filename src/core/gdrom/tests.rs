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

//! Tests for the GD-ROM controller, driven through the register interface

use super::*;
use crate::core::cdrom::GDROM_SECTOR_SIZE;
use crate::core::host::RamHost;
use crate::core::mount::decode_toc;
use crate::core::mount::tests::{fixture_byte, write_gdi_fixture};
use tempfile::TempDir;

const BASE: u32 = GDROM_REG_BASE;

fn drive() -> Gdrom<RamHost> {
    Gdrom::new(RamHost::new())
}

fn drive_with_disc() -> (Gdrom<RamHost>, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut drive = drive();
    drive.mount_image(write_gdi_fixture(dir.path())).unwrap();
    (drive, dir)
}

fn write8(drive: &mut Gdrom<RamHost>, offset: u32, value: u8) {
    drive.write_reg(BASE + offset, 1, value as u32).unwrap();
}

fn read8(drive: &mut Gdrom<RamHost>, offset: u32) -> u8 {
    drive.read_reg(BASE + offset, 1).unwrap() as u8
}

fn send_packet(drive: &mut Gdrom<RamHost>, pkt: [u8; PACKET_LEN]) -> Result<()> {
    drive.write_reg(BASE + REG_COMMAND, 1, ATA_CMD_PACKET as u32)?;
    for pair in pkt.chunks(2) {
        let word = u16::from_le_bytes([pair[0], pair[1]]);
        drive.write_reg(BASE + REG_DATA, 2, word as u32)?;
    }
    Ok(())
}

/// Read `len` bytes through 16-bit data register reads
fn pio_read(drive: &mut Gdrom<RamHost>, len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let word = drive.read_reg(BASE + REG_DATA, 2).unwrap() as u16;
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.truncate(len);
    out
}

fn cd_read(fad: u32, count: u32) -> [u8; PACKET_LEN] {
    [
        PKT_CD_READ,
        0x20,
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

fn short_packet(opcode: u8, b1: u8, b2: u8, b4: u8) -> [u8; PACKET_LEN] {
    let mut pkt = [0u8; PACKET_LEN];
    pkt[0] = opcode;
    pkt[1] = b1;
    pkt[2] = b2;
    pkt[4] = b4;
    pkt
}

fn get_toc(session: u8, len: u16) -> [u8; PACKET_LEN] {
    let mut pkt = [0u8; PACKET_LEN];
    pkt[0] = PKT_GET_TOC;
    pkt[1] = session;
    pkt[3..5].copy_from_slice(&len.to_be_bytes());
    pkt
}

fn byte_count(drive: &mut Gdrom<RamHost>) -> u16 {
    let low = read8(drive, REG_BYTE_COUNT_LOW) as u16;
    let high = read8(drive, REG_BYTE_COUNT_HIGH) as u16;
    high << 8 | low
}

fn setup_dma(drive: &mut Gdrom<RamHost>, start: u32) {
    write8(drive, REG_FEATURES, 0x01);
    drive.write_reg(BASE + REG_GDSTAR, 4, start).unwrap();
    drive.write_reg(BASE + REG_GDLEN, 4, 0x10000).unwrap();
    drive.write_reg(BASE + REG_GDDIR, 4, 1).unwrap();
    drive.write_reg(BASE + REG_GDEN, 4, 1).unwrap();
}

#[test]
fn test_initial_state() {
    let mut drive = drive();
    assert_eq!(drive.state(), GdromState::Norm);
    assert_eq!(read8(&mut drive, REG_ALT_STATUS), Status::DRDY.bits());
    assert_eq!(drive.dma_regs().gdapro, GDAPRO_DEFAULT);
    assert_eq!(drive.name(), "GD-ROM");
}

#[test]
fn test_packet_input_state_machine() {
    let mut drive = drive();
    write8(&mut drive, REG_COMMAND, ATA_CMD_PACKET);

    assert_eq!(drive.state(), GdromState::InputPkt);
    assert!(drive.status().contains(Status::DRQ));
    assert_eq!(drive.int_reason(), IntReason::COD);

    for _ in 0..5 {
        drive.write_reg(BASE + REG_DATA, 2, 0).unwrap();
        assert_eq!(drive.state(), GdromState::InputPkt);
    }
    assert_eq!(drive.host().ext_interrupt_count, 0);

    drive.write_reg(BASE + REG_DATA, 2, 0).unwrap();
    assert_eq!(drive.state(), GdromState::Norm);
    assert!(!drive.status().contains(Status::DRQ));
    assert_eq!(drive.host().ext_interrupt_count, 1);
}

#[test]
fn test_packet_bytes_split_across_access_sizes() {
    let (mut drive, _dir) = drive_with_disc();
    write8(&mut drive, REG_COMMAND, ATA_CMD_PACKET);

    let pkt = short_packet(PKT_REQ_MODE, 0, 0x12, 4);
    drive
        .write_reg(BASE + REG_DATA, 4, u32::from_le_bytes([pkt[0], pkt[1], pkt[2], pkt[3]]))
        .unwrap();
    for &b in &pkt[4..] {
        write8(&mut drive, REG_DATA, b);
    }

    assert_eq!(pio_read(&mut drive, 4), b"Rev ");
}

#[test]
fn test_test_unit_without_disc() {
    let mut drive = drive();
    send_packet(&mut drive, short_packet(PKT_TEST_UNIT, 0, 0, 0)).unwrap();

    assert!(drive.status().contains(Status::CHECK));
    assert!(drive.status().contains(Status::DRDY));
    assert_eq!(read8(&mut drive, REG_ERROR) >> 4, SenseKey::NotReady as u8);

    send_packet(&mut drive, short_packet(PKT_REQ_ERROR, 0, 0, 10)).unwrap();
    assert_eq!(
        pio_read(&mut drive, 10),
        vec![0xF0, 0, 0x02, 0, 0, 0, 0, 0, 0x3A, 0]
    );
}

#[test]
fn test_test_unit_with_disc_clears_error() {
    let (mut drive, _dir) = drive_with_disc();
    drive.set_sense(SenseError::illegal_request());

    send_packet(&mut drive, short_packet(PKT_TEST_UNIT, 0, 0, 0)).unwrap();
    assert!(!drive.status().contains(Status::CHECK));
    assert_eq!(drive.error_reg().sense_key, SenseKey::NoSense);
    assert_eq!(drive.additional_sense(), AdditionalSense::None);
}

#[test]
fn test_req_error_truncates() {
    let mut drive = drive();
    send_packet(&mut drive, short_packet(PKT_REQ_ERROR, 0, 0, 3)).unwrap();
    assert_eq!(drive.bufq().byte_len(), 3);
    assert_eq!(byte_count(&mut drive), 3);
}

#[test]
fn test_req_mode_window() {
    let mut drive = drive();
    send_packet(&mut drive, short_packet(PKT_REQ_MODE, 0, 0x12, 14)).unwrap();
    assert_eq!(pio_read(&mut drive, 14), b"Rev 6.43990408");

    // window clamped to the end of the page
    send_packet(&mut drive, short_packet(PKT_REQ_MODE, 0, 0x1E, 10)).unwrap();
    assert_eq!(drive.bufq().byte_len(), 2);
}

#[test]
fn test_set_mode_patches_mode_page() {
    let mut drive = drive();
    write8(&mut drive, REG_BYTE_COUNT_LOW, 2);
    write8(&mut drive, REG_BYTE_COUNT_HIGH, 0);

    send_packet(&mut drive, short_packet(PKT_SET_MODE, 0, 0x12, 2)).unwrap();
    assert_eq!(drive.state(), GdromState::SetMode);
    assert!(drive.status().contains(Status::DRQ));
    let interrupts = drive.host().ext_interrupt_count;

    drive
        .write_reg(BASE + REG_DATA, 2, u16::from_le_bytes(*b"XY") as u32)
        .unwrap();
    assert_eq!(drive.state(), GdromState::Norm);
    assert!(!drive.status().contains(Status::DRQ));
    assert_eq!(drive.host().ext_interrupt_count, interrupts + 1);

    send_packet(&mut drive, short_packet(PKT_REQ_MODE, 0, 0x12, 4)).unwrap();
    assert_eq!(pio_read(&mut drive, 4), b"XYv ");
}

#[test]
fn test_set_mode_with_dma_is_fatal() {
    let mut drive = drive();
    write8(&mut drive, REG_FEATURES, 0x01);
    assert!(matches!(
        send_packet(&mut drive, short_packet(PKT_SET_MODE, 0, 0, 2)),
        Err(GdromError::Unimplemented { .. })
    ));
}

#[test]
fn test_get_toc_both_sessions() {
    let (mut drive, _dir) = drive_with_disc();

    send_packet(&mut drive, get_toc(0, CDROM_TOC_SIZE_U16)).unwrap();
    let bytes: [u8; 408] = pio_read(&mut drive, 408).try_into().unwrap();
    let toc = decode_toc(&bytes);
    assert_eq!((toc.first_track, toc.last_track), (1, 2));
    assert!(toc.tracks[0].valid && toc.tracks[1].valid);

    send_packet(&mut drive, get_toc(1, CDROM_TOC_SIZE_U16)).unwrap();
    let bytes: [u8; 408] = pio_read(&mut drive, 408).try_into().unwrap();
    let toc = decode_toc(&bytes);
    assert_eq!((toc.first_track, toc.last_track), (3, 3));
    assert_eq!(toc.tracks[2].fad, 45150);
}

const CDROM_TOC_SIZE_U16: u16 = 408;

#[test]
fn test_get_toc_truncated_and_without_disc() {
    let (mut drive, _dir) = drive_with_disc();
    send_packet(&mut drive, get_toc(0, 8)).unwrap();
    assert_eq!(pio_read(&mut drive, 8), vec![0x41, 0, 0, 0x96, 0x01, 0, 0x03, 0x8A]);

    send_packet(&mut drive, get_toc(0, 0x1000)).unwrap();
    assert_eq!(drive.bufq().byte_len(), 408);

    let mut empty = self::drive();
    send_packet(&mut empty, get_toc(0, 408)).unwrap();
    assert!(empty.status().contains(Status::CHECK));
    assert!(empty.bufq().is_empty());
    assert_eq!(empty.additional_sense(), AdditionalSense::NoDisc);
}

#[test]
fn test_cd_read_pio() {
    let (mut drive, _dir) = drive_with_disc();
    send_packet(&mut drive, cd_read(45151, 2)).unwrap();

    assert!(drive.status().contains(Status::DRQ));
    assert_eq!(drive.int_reason(), IntReason::IO);
    assert_eq!(drive.bufq().node_count(), 2);
    assert_eq!(byte_count(&mut drive), 4096);
    assert_eq!(drive.host().ext_interrupt_count, 1);

    let data = pio_read(&mut drive, 2 * GDROM_SECTOR_SIZE - 2);
    for (i, byte) in data.iter().enumerate() {
        let fad = 45151 + (i / GDROM_SECTOR_SIZE) as u32;
        assert_eq!(*byte, fixture_byte(fad, i % GDROM_SECTOR_SIZE));
    }
    assert!(drive.status().contains(Status::DRQ));
    assert_eq!(drive.host().ext_interrupt_count, 1);

    pio_read(&mut drive, 2);
    assert!(!drive.status().contains(Status::DRQ));
    assert!(drive.status().contains(Status::DRDY));
    assert_eq!(drive.int_reason(), IntReason::COD | IntReason::IO);
    assert_eq!(drive.host().ext_interrupt_count, 2);

    // reading past the end pads with zero and does not interrupt again
    assert_eq!(pio_read(&mut drive, 4), vec![0, 0, 0, 0]);
    assert_eq!(drive.host().ext_interrupt_count, 2);
}

#[test]
fn test_cd_read_out_of_range_sets_sense() {
    let (mut drive, _dir) = drive_with_disc();
    send_packet(&mut drive, cd_read(45181, 2)).unwrap();

    assert_eq!(drive.state(), GdromState::Norm);
    assert!(!drive.status().contains(Status::DRQ));
    assert!(drive.status().contains(Status::CHECK));
    assert_eq!(drive.error_reg().sense_key, SenseKey::IllegalRequest);
    assert!(drive.bufq().is_empty());
}

#[test]
fn test_cd_read_huge_count_is_refused() {
    let (mut drive, _dir) = drive_with_disc();
    send_packet(&mut drive, cd_read(45151, 0x00FF_FFFF)).unwrap();

    assert_eq!(drive.state(), GdromState::Norm);
    assert!(!drive.status().contains(Status::DRQ));
    assert!(drive.status().contains(Status::CHECK));
    assert_eq!(drive.error_reg().sense_key, SenseKey::IllegalRequest);
    assert!(drive.bufq().is_empty());

    send_packet(&mut drive, cd_read(0x00FF_FFFF, 0x00FF_FFFF)).unwrap();
    assert_eq!(drive.error_reg().sense_key, SenseKey::IllegalRequest);
    assert!(drive.bufq().is_empty());
}

#[test]
fn test_cd_read_into_track_gap_discards_partial_data() {
    let (mut drive, _dir) = drive_with_disc();
    // track 1 covers FAD 150..166
    send_packet(&mut drive, cd_read(164, 4)).unwrap();

    assert_eq!(drive.state(), GdromState::Norm);
    assert!(drive.status().contains(Status::CHECK));
    assert_eq!(drive.error_reg().sense_key, SenseKey::IllegalRequest);
    assert!(drive.bufq().is_empty());
}

#[test]
fn test_cd_read_unsupported_modes_are_fatal() {
    let (mut drive, _dir) = drive_with_disc();

    let mut msf = cd_read(45150, 1);
    msf[1] = 0x21;
    assert!(matches!(
        send_packet(&mut drive, msf),
        Err(GdromError::Unimplemented { .. })
    ));

    let (mut drive, _dir) = drive_with_disc();
    let mut headers = cd_read(45150, 1);
    headers[1] = 0xE0;
    assert!(send_packet(&mut drive, headers).is_err());
}

#[test]
fn test_cd_read_dma() {
    let (mut drive, _dir) = drive_with_disc();
    setup_dma(&mut drive, 0x0C01_0000);

    send_packet(&mut drive, cd_read(45152, 2)).unwrap();
    let status = drive.status();
    assert!(!status.contains(Status::DRQ));
    assert_eq!(drive.host().ext_interrupt_count, 1);
    assert_eq!(drive.bufq().node_count(), 2);

    drive.write_reg(BASE + REG_GDST, 4, 1).unwrap();

    assert_eq!(drive.read_reg(BASE + REG_GDLEND, 4).unwrap(), 4096);
    assert_eq!(drive.read_reg(BASE + REG_GDSTARD, 4).unwrap(), 0x0C01_1000);
    assert_eq!(drive.read_reg(BASE + REG_GDST, 4).unwrap(), 0);
    assert!(drive.bufq().is_empty());
    assert_eq!(drive.host().ext_interrupt_count, 2);
    assert_eq!(drive.host().dma_complete_count, 1);

    let ram = drive.host().read(0x0C01_0000, 4096).unwrap();
    assert_eq!(ram[0], fixture_byte(45152, 0));
    assert_eq!(ram[2048], fixture_byte(45153, 0));
    assert_eq!(ram[4095], fixture_byte(45153, 2047));
}

#[test]
fn test_dma_start_with_gden_clear_ends_transfer() {
    let (mut drive, _dir) = drive_with_disc();
    setup_dma(&mut drive, 0x0C01_0000);
    drive.write_reg(BASE + REG_GDEN, 4, 0).unwrap();

    send_packet(&mut drive, cd_read(45152, 2)).unwrap();
    assert_eq!(drive.host().ext_interrupt_count, 1);
    drive.write_reg(BASE + REG_GDST, 4, 1).unwrap();

    assert_eq!(drive.read_reg(BASE + REG_GDLEND, 4).unwrap(), 0);
    assert_eq!(drive.read_reg(BASE + REG_GDST, 4).unwrap(), 0);
    assert!(drive.bufq().is_empty());
    assert_eq!(drive.state(), GdromState::Norm);
    assert!(drive.status().contains(Status::DRDY));
    assert!(!drive.status().contains(Status::BSY));
    assert_eq!(drive.host().ext_interrupt_count, 2);
    assert_eq!(drive.host().dma_complete_count, 1);
    assert!(drive
        .host()
        .read(0x0C01_0000, 16)
        .unwrap()
        .iter()
        .all(|&b| b == 0));
}

#[test]
fn test_dma_clipped_to_protection_window() {
    let (mut drive, _dir) = drive_with_disc();
    setup_dma(&mut drive, 0x0C0F_F800);
    drive.write_reg(BASE + REG_GDAPRO, 4, 0x8843_4040).unwrap();
    assert_eq!(drive.dma_regs().prot.bot, 0x0C0F_FFFF);

    send_packet(&mut drive, cd_read(45152, 2)).unwrap();
    drive.write_reg(BASE + REG_GDST, 4, 1).unwrap();

    assert_eq!(drive.dma_regs().len_done, 2048);
    let ram = drive.host().read(0x0C0F_F800, 0x800).unwrap();
    assert_eq!(ram[0], fixture_byte(45152, 0));
    assert!(drive
        .host()
        .read(0x0C10_0000, 0x800)
        .unwrap()
        .iter()
        .all(|&b| b == 0));
}

#[test]
fn test_locked_gdapro_write_is_ignored() {
    let mut drive = drive();
    drive.write_reg(BASE + REG_GDAPRO, 4, 0x1234_4040).unwrap();
    assert_eq!(drive.read_reg(BASE + REG_GDAPRO, 4).unwrap(), GDAPRO_DEFAULT);
    assert_eq!(drive.dma_regs().prot, DmaProtection::default());
}

#[test]
fn test_dma_to_drive_is_fatal() {
    let (mut drive, _dir) = drive_with_disc();
    setup_dma(&mut drive, 0x0C01_0000);
    drive.write_reg(BASE + REG_GDDIR, 4, 0).unwrap();
    send_packet(&mut drive, cd_read(45152, 1)).unwrap();

    assert!(drive.write_reg(BASE + REG_GDST, 4, 1).is_err());
}

#[test]
fn test_identify() {
    let mut drive = drive();
    write8(&mut drive, REG_COMMAND, ATA_CMD_IDENTIFY);

    assert!(drive.status().contains(Status::DRQ));
    let block = pio_read(&mut drive, 80);
    assert_eq!(&block[8..10], b"SE");
    assert_eq!(&block[24..36], b"CD-ROM DRIVE");
    assert!(!drive.status().contains(Status::DRQ));
}

#[test]
fn test_set_features() {
    let mut drive = drive();
    write8(&mut drive, REG_FEATURES, 0x03);
    write8(&mut drive, REG_SECTOR_COUNT, 0x22);
    write8(&mut drive, REG_COMMAND, ATA_CMD_SET_FEATURES);
    assert_eq!(drive.transfer_mode(TransferMode::MultiWordDma), 2);

    write8(&mut drive, REG_SECTOR_COUNT, 0x0C);
    write8(&mut drive, REG_COMMAND, ATA_CMD_SET_FEATURES);
    assert_eq!(drive.transfer_mode(TransferMode::PioFlowControl), 4);

    write8(&mut drive, REG_SECTOR_COUNT, 0x40);
    assert!(matches!(
        drive.write_reg(BASE + REG_COMMAND, 1, ATA_CMD_SET_FEATURES as u32),
        Err(GdromError::InvalidTransferMode { value: 0x40 })
    ));

    write8(&mut drive, REG_FEATURES, 0x02);
    assert!(drive
        .write_reg(BASE + REG_COMMAND, 1, ATA_CMD_SET_FEATURES as u32)
        .is_err());
}

#[test]
fn test_unknown_commands_are_fatal() {
    let mut drive = drive();
    assert!(matches!(
        drive.write_reg(BASE + REG_COMMAND, 1, 0x20),
        Err(GdromError::UnknownAtaCommand { command: 0x20 })
    ));

    assert!(matches!(
        send_packet(&mut drive, short_packet(0x20, 0, 0, 0)),
        Err(GdromError::UnimplementedPacket { opcode: 0x20 })
    ));
}

#[test]
fn test_command_during_packet_input() {
    let mut drive = drive();
    write8(&mut drive, REG_COMMAND, ATA_CMD_PACKET);
    drive.write_reg(BASE + REG_DATA, 2, 0).unwrap();

    assert!(drive
        .write_reg(BASE + REG_COMMAND, 1, ATA_CMD_IDENTIFY as u32)
        .is_err());

    write8(&mut drive, REG_COMMAND, ATA_CMD_SOFT_RESET);
    assert_eq!(drive.state(), GdromState::Norm);
}

#[test]
fn test_data_write_while_idle_is_fatal() {
    let mut drive = drive();
    assert!(drive.write_reg(BASE + REG_DATA, 2, 0).is_err());
}

#[test]
fn test_nien_masks_interrupt() {
    let mut drive = drive();
    write8(&mut drive, REG_DEV_CTRL, DevCtrl::NIEN.bits());
    send_packet(&mut drive, short_packet(PKT_TEST_UNIT, 0, 0, 0)).unwrap();
    assert_eq!(drive.host().ext_interrupt_count, 0);
}

#[test]
fn test_status_read_clears_interrupt() {
    let mut drive = drive();
    send_packet(&mut drive, short_packet(PKT_TEST_UNIT, 0, 0, 0)).unwrap();
    assert!(drive.host().ext_interrupt);

    read8(&mut drive, REG_ALT_STATUS);
    assert!(drive.host().ext_interrupt);

    read8(&mut drive, REG_STATUS);
    assert!(!drive.host().ext_interrupt);
}

#[test]
fn test_srst_resets_registers() {
    let mut drive = drive();
    write8(&mut drive, REG_COMMAND, ATA_CMD_PACKET);
    write8(&mut drive, REG_DEV_CTRL, DevCtrl::SRST.bits());

    assert_eq!(drive.state(), GdromState::Norm);
    assert_eq!(drive.status(), Status::DRDY);
}

#[test]
fn test_sector_number_register() {
    let mut drive = drive();
    assert_eq!(read8(&mut drive, REG_SECTOR_NUMBER), DriveStatus::NoDisc as u8);

    let (mut drive, _dir) = drive_with_disc();
    assert_eq!(read8(&mut drive, REG_SECTOR_NUMBER), 0x81);
}

#[test]
fn test_req_ses() {
    let (mut drive, _dir) = drive_with_disc();

    send_packet(&mut drive, short_packet(PKT_REQ_SES, 0, 0, 6)).unwrap();
    let leadout = 45150 + 32u32;
    assert_eq!(
        pio_read(&mut drive, 6),
        vec![1, 0, 2, 0, (leadout >> 8) as u8, leadout as u8]
    );

    send_packet(&mut drive, short_packet(PKT_REQ_SES, 0, 2, 6)).unwrap();
    assert_eq!(pio_read(&mut drive, 6), vec![1, 0, 3, 0x00, 0xB0, 0x5E]);

    send_packet(&mut drive, short_packet(PKT_REQ_SES, 0, 3, 6)).unwrap();
    assert!(drive.status().contains(Status::CHECK));
    assert_eq!(drive.error_reg().sense_key, SenseKey::IllegalRequest);
}

#[test]
fn test_req_stat_after_read() {
    let (mut drive, _dir) = drive_with_disc();
    send_packet(&mut drive, cd_read(45152, 1)).unwrap();
    pio_read(&mut drive, GDROM_SECTOR_SIZE);

    send_packet(&mut drive, short_packet(PKT_REQ_STAT, 0, 0, 10)).unwrap();
    let stat = pio_read(&mut drive, 10);
    assert_eq!(stat[0], DriveStatus::Pause as u8);
    assert_eq!(stat[1], 0x80);
    assert_eq!(stat[3], 3);
    assert_eq!(&stat[5..8], &[0x00, 0xB0, 0x61]);
}

#[test]
fn test_packet_71_response() {
    let mut drive = drive();
    send_packet(&mut drive, short_packet(PKT_UNKNOWN_71, 0, 0, 0)).unwrap();
    assert_eq!(drive.bufq().byte_len(), 960);
    assert_eq!(pio_read(&mut drive, 4), vec![0x96, 0x0B, 0x45, 0xF0]);
}

#[test]
fn test_get_scd_placeholder() {
    let mut drive = drive();
    let mut pkt = short_packet(PKT_GET_SCD, 0, 0, 0x10);
    pkt[3] = 0;
    send_packet(&mut drive, pkt).unwrap();
    assert_eq!(pio_read(&mut drive, 16), vec![0; 16]);
}

#[test]
fn test_start_disk_has_no_data_phase() {
    let mut drive = drive();
    send_packet(&mut drive, short_packet(PKT_START_DISK, 0, 0, 0)).unwrap();
    assert!(!drive.status().contains(Status::DRQ));
    assert!(drive.bufq().is_empty());
}

#[test]
fn test_invalid_register_access() {
    let mut drive = drive();
    assert!(matches!(
        drive.read_reg(BASE + 0x40, 4),
        Err(GdromError::InvalidRegisterAccess { address, size: 4 }) if address == BASE + 0x40
    ));
    assert!(drive.read_reg(BASE + 0x500, 4).is_err());
    assert!(drive.write_reg(BASE + REG_DATA, 3, 0).is_err());
}
