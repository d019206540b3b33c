//! Byte-level builders for the scripted test server.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpStream;

use quill_mysql::constant::CapabilityFlags;

pub const VAR_STRING: u8 = 0xFD;
pub const LONGLONG: u8 = 0x08;
pub const BLOB_TYPE: u8 = 0xFC;

/// SERVER_STATUS_AUTOCOMMIT
pub const AUTOCOMMIT: u16 = 0x0002;

pub fn write_frame(stream: &mut TcpStream, seq: u8, payload: &[u8]) {
    let len = (payload.len() as u32).to_le_bytes();
    stream.write_all(&[len[0], len[1], len[2], seq]).unwrap();
    stream.write_all(payload).unwrap();
    stream.flush().unwrap();
}

/// Send a payload larger than one packet, splitting at the 16 MiB boundary.
pub fn write_payload_chunked(stream: &mut TcpStream, mut seq: u8, payload: &[u8]) {
    let mut remaining = payload;
    loop {
        let chunk_len = remaining.len().min(0xFFFFFF);
        let (chunk, rest) = remaining.split_at(chunk_len);
        write_frame(stream, seq, chunk);
        seq = seq.wrapping_add(1);
        remaining = rest;
        if remaining.is_empty() && chunk_len < 0xFFFFFF {
            break;
        }
    }
}

pub fn read_frame(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).unwrap();
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).unwrap();
    (header[3], payload)
}

fn write_lenenc(out: &mut Vec<u8>, value: u64) {
    if value < 251 {
        out.push(value as u8);
    } else if value < (1 << 16) {
        out.push(0xFC);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value < (1 << 24) {
        out.push(0xFD);
        out.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        out.push(0xFE);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_lenenc_str(out: &mut Vec<u8>, s: &str) {
    write_lenenc(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn server_caps() -> CapabilityFlags {
    CapabilityFlags::CLIENT_PROTOCOL_41
        | CapabilityFlags::CLIENT_PLUGIN_AUTH
        | CapabilityFlags::CLIENT_DEPRECATE_EOF
        | CapabilityFlags::CLIENT_SECURE_CONNECTION
        | CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
        | CapabilityFlags::CLIENT_LONG_FLAG
        | CapabilityFlags::CLIENT_TRANSACTIONS
        | CapabilityFlags::CLIENT_MULTI_RESULTS
        | CapabilityFlags::CLIENT_PS_MULTI_RESULTS
        | CapabilityFlags::CLIENT_CONNECT_WITH_DB
        | CapabilityFlags::CLIENT_MULTI_STATEMENTS
}

/// A protocol-10 server hello advertising version 8.0.33.
pub fn server_hello(plugin: &str, nonce: &[u8; 20]) -> Vec<u8> {
    let caps = server_caps().bits();
    let mut payload = vec![10u8];
    payload.extend_from_slice(b"8.0.33\0");
    payload.extend_from_slice(&42u32.to_le_bytes()); // connection id
    payload.extend_from_slice(&nonce[..8]);
    payload.push(0); // filler
    payload.extend_from_slice(&((caps & 0xFFFF) as u16).to_le_bytes());
    payload.push(33); // character set
    payload.extend_from_slice(&AUTOCOMMIT.to_le_bytes()); // status flags
    payload.extend_from_slice(&((caps >> 16) as u16).to_le_bytes());
    payload.push(21); // auth plugin data length
    payload.extend_from_slice(&[0u8; 10]); // reserved
    payload.extend_from_slice(&nonce[8..]);
    payload.push(0); // trailing NUL of part 2
    payload.extend_from_slice(plugin.as_bytes());
    payload.push(0);
    payload
}

pub fn ok_packet(
    header: u8,
    affected_rows: u64,
    last_insert_id: u64,
    status: u16,
    warnings: u16,
    info: &str,
) -> Vec<u8> {
    let mut payload = vec![header];
    write_lenenc(&mut payload, affected_rows);
    write_lenenc(&mut payload, last_insert_id);
    payload.extend_from_slice(&status.to_le_bytes());
    payload.extend_from_slice(&warnings.to_le_bytes());
    payload.extend_from_slice(info.as_bytes());
    payload
}

pub fn err_packet(code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut payload = vec![0xFF];
    payload.extend_from_slice(&code.to_le_bytes());
    payload.push(b'#');
    payload.extend_from_slice(sql_state.as_bytes());
    payload.extend_from_slice(message.as_bytes());
    payload
}

pub fn coldef(name: &str, column_type: u8, charset: u16, decimals: u8) -> Vec<u8> {
    let mut payload = Vec::new();
    write_lenenc_str(&mut payload, "def");
    write_lenenc_str(&mut payload, "db");
    write_lenenc_str(&mut payload, "t");
    write_lenenc_str(&mut payload, "t");
    write_lenenc_str(&mut payload, name);
    write_lenenc_str(&mut payload, name);

    let mut fixed = Vec::new();
    fixed.extend_from_slice(&charset.to_le_bytes());
    fixed.extend_from_slice(&255u32.to_le_bytes()); // column length
    fixed.push(column_type);
    fixed.extend_from_slice(&0u16.to_le_bytes()); // flags
    fixed.push(decimals);
    fixed.extend_from_slice(&0u16.to_le_bytes()); // reserved
    write_lenenc(&mut payload, fixed.len() as u64);
    payload.extend_from_slice(&fixed);
    payload
}

pub fn prepare_ok(statement_id: u32, num_columns: u16, num_params: u16) -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend_from_slice(&statement_id.to_le_bytes());
    payload.extend_from_slice(&num_columns.to_le_bytes());
    payload.extend_from_slice(&num_params.to_le_bytes());
    payload.push(0); // reserved
    payload.extend_from_slice(&0u16.to_le_bytes()); // warning count
    payload
}

pub fn text_row(fields: &[&str]) -> Vec<u8> {
    let mut payload = Vec::new();
    for field in fields {
        write_lenenc_str(&mut payload, field);
    }
    payload
}
