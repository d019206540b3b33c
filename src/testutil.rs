//! Builders shared by the unit tests.

use crate::constant::{ColumnFlags, ProtocolFieldType};
use crate::metadata::ColumnMetadata;
use crate::protocol::primitive::*;
use crate::protocol::response::OK_PACKET_HEADER;

pub(crate) fn meta(
    protocol_type: ProtocolFieldType,
    flags: ColumnFlags,
    charset: u16,
    decimals: u8,
) -> ColumnMetadata {
    named_meta("c", protocol_type, flags, charset, decimals)
}

pub(crate) fn named_meta(
    name: &str,
    protocol_type: ProtocolFieldType,
    flags: ColumnFlags,
    charset: u16,
    decimals: u8,
) -> ColumnMetadata {
    ColumnMetadata {
        schema: "db".into(),
        table: "t".into(),
        org_table: "t".into(),
        name: name.into(),
        org_name: name.into(),
        charset,
        column_length: 255,
        protocol_type,
        flags,
        decimals,
    }
}

/// Serialize a column definition packet for the given metadata.
pub(crate) fn coldef_payload(meta: &ColumnMetadata) -> Vec<u8> {
    let mut out = Vec::new();
    write_string_lenenc(&mut out, "def");
    write_string_lenenc(&mut out, &meta.schema);
    write_string_lenenc(&mut out, &meta.table);
    write_string_lenenc(&mut out, &meta.org_table);
    write_string_lenenc(&mut out, &meta.name);
    write_string_lenenc(&mut out, &meta.org_name);

    let mut fixed = Vec::new();
    write_int_2(&mut fixed, meta.charset);
    write_int_4(&mut fixed, meta.column_length);
    write_int_1(&mut fixed, meta.protocol_type as u8);
    write_int_2(&mut fixed, meta.flags.bits());
    write_int_1(&mut fixed, meta.decimals);
    write_int_2(&mut fixed, 0); // reserved filler
    write_bytes_lenenc(&mut out, &fixed);
    out
}

/// Serialize an OK payload with the given header byte.
pub(crate) fn ok_payload(
    header: u8,
    affected_rows: u64,
    last_insert_id: u64,
    status_flags: u16,
    warnings: u16,
    info: &str,
) -> Vec<u8> {
    let mut out = vec![header];
    write_int_lenenc(&mut out, affected_rows);
    write_int_lenenc(&mut out, last_insert_id);
    write_int_2(&mut out, status_flags);
    write_int_2(&mut out, warnings);
    out.extend_from_slice(info.as_bytes());
    out
}

pub(crate) fn plain_ok(status_flags: u16) -> Vec<u8> {
    ok_payload(OK_PACKET_HEADER, 0, 0, status_flags, 0, "")
}
