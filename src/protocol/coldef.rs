use crate::constant::{ColumnFlags, ProtocolFieldType};
use crate::error::{Error, Result};
use crate::metadata::{ColumnMetadata, MetadataMode};
use crate::protocol::primitive::*;

/// Deserialize a column definition packet.
///
/// The packet is seven length-encoded strings; the last is a length-prefixed
/// block of fixed-width fields. The block's length prefix exists for forward
/// compatibility: unknown trailing bytes inside it are ignored, while bytes
/// after it in the packet are an error.
///
/// In [`MetadataMode::Minimal`] the string fields are dropped and only what
/// row decoding needs is kept.
pub fn read_column_definition(payload: &[u8], mode: MetadataMode) -> Result<ColumnMetadata> {
    let (catalog, data) = read_string_lenenc(payload)?;
    let _ = catalog; // always "def"
    let (schema, data) = read_string_lenenc(data)?;
    let (table, data) = read_string_lenenc(data)?;
    let (org_table, data) = read_string_lenenc(data)?;
    let (name, data) = read_string_lenenc(data)?;
    let (org_name, data) = read_string_lenenc(data)?;
    let (fixed_fields, data) = read_string_lenenc(data)?;
    check_extra_bytes(data)?;

    let (charset, fixed) = read_int_2(fixed_fields)?;
    let (column_length, fixed) = read_int_4(fixed)?;
    let (type_byte, fixed) = read_int_1(fixed)?;
    let (flags, fixed) = read_int_2(fixed)?;
    let (decimals, _fixed) = read_int_1(fixed)?;

    let protocol_type = ProtocolFieldType::from_u8(type_byte).ok_or(Error::ProtocolValueError)?;

    let lossy = |bytes: &[u8]| match mode {
        MetadataMode::Minimal => String::new(),
        MetadataMode::Full => String::from_utf8_lossy(bytes).to_string(),
    };

    Ok(ColumnMetadata {
        schema: lossy(schema),
        table: lossy(table),
        org_table: lossy(org_table),
        name: lossy(name),
        org_name: lossy(org_name),
        charset,
        column_length,
        protocol_type,
        flags: ColumnFlags::from_bits_truncate(flags),
        decimals,
    })
}
