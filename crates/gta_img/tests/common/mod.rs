use binrw::BinWrite;
use std::io::Cursor;

use gta_img::types::{pad_to_sector, sectors_for, DirRecord, V2Header, SECTOR_SIZE};
use gta_img::MemFs;

fn records(entries: &[(&str, &[u8])], first_offset: u64) -> (Vec<u8>, Vec<u8>) {
    let mut table = Cursor::new(Vec::new());
    let mut payloads = Vec::new();
    let mut cursor = first_offset;

    for (name, data) in entries {
        DirRecord {
            name: DirRecord::encode_name(name),
            offset_sectors: (cursor / SECTOR_SIZE) as u32,
            size_sectors: sectors_for(data.len() as u64) as u32,
        }
        .write(&mut table)
        .unwrap();

        payloads.extend_from_slice(data);
        payloads.resize(
            (cursor - first_offset + pad_to_sector(data.len() as u64)) as usize,
            0,
        );
        cursor += pad_to_sector(data.len() as u64);
    }

    (table.into_inner(), payloads)
}

/// Seed a V1 `.dir` + `.img` pair into `fs`.
pub fn seed_v1(fs: &MemFs, stem: &str, entries: &[(&str, &[u8])]) {
    let (table, payloads) = records(entries, 0);
    fs.insert(format!("{stem}.dir"), table);
    fs.insert(format!("{stem}.img"), payloads);
}

/// Seed a single-file V2 archive into `fs`.
pub fn seed_v2(fs: &MemFs, path: &str, entries: &[(&str, &[u8])]) {
    let table_len = 8 + 32 * entries.len() as u64;
    let first_offset = pad_to_sector(table_len);
    let (table, payloads) = records(entries, first_offset);

    let mut bytes = Cursor::new(Vec::new());
    V2Header {
        entry_count: entries.len() as u32,
    }
    .write(&mut bytes)
    .unwrap();
    let mut bytes = bytes.into_inner();
    bytes.extend_from_slice(&table);
    bytes.resize(first_offset as usize, 0);
    bytes.extend_from_slice(&payloads);

    fs.insert(path, bytes);
}
