use zerocopy::byteorder::little_endian::{U16 as U16LE, U32 as U32LE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::constant::{CommandByte, DbFlavor};
use crate::error::{Error, Result};
use crate::protocol::binary::{write_param_null_bitmap, write_param_type, write_param_value};
use crate::protocol::primitive::*;
use crate::protocol::response::{ERR_PACKET_HEADER, process_err_packet};
use crate::value::Value;

/// Write COM_QUERY
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Write COM_STMT_PREPARE
pub fn write_prepare(out: &mut Vec<u8>, sql: &str) {
    write_int_1(out, CommandByte::StmtPrepare as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Write COM_STMT_EXECUTE.
///
/// Parameter types are always re-sent (`new_params_bound_flag = 1`); values
/// are packed with the binary field codec, nulls carried by the bitmap.
pub fn write_execute(out: &mut Vec<u8>, statement_id: u32, params: &[Value<'_>]) {
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);
    write_int_1(out, 0x00); // flags: CURSOR_TYPE_NO_CURSOR
    write_int_4(out, 1); // iteration count, always 1

    if !params.is_empty() {
        write_param_null_bitmap(out, params);
        write_int_1(out, 0x01); // new-params-bound flag
        for param in params {
            write_param_type(out, param);
        }
        for param in params {
            write_param_value(out, param);
        }
    }
}

/// Write COM_STMT_CLOSE. The server sends no response.
pub fn write_close_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtClose as u8);
    write_int_4(out, statement_id);
}

/// Write COM_STMT_RESET
pub fn write_reset_statement(out: &mut Vec<u8>, statement_id: u32) {
    write_int_1(out, CommandByte::StmtReset as u8);
    write_int_4(out, statement_id);
}

/// Write COM_PING
pub fn write_ping(out: &mut Vec<u8>) {
    write_int_1(out, CommandByte::Ping as u8);
}

/// Write COM_QUIT. The server closes the transport instead of replying.
pub fn write_quit(out: &mut Vec<u8>) {
    write_int_1(out, CommandByte::Quit as u8);
}

/// Fixed-width tail of the COM_STMT_PREPARE OK response (zero-copy).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct PrepareOkTail {
    statement_id: U32LE,
    num_columns: U16LE,
    num_params: U16LE,
    _reserved: u8,
    warning_count: U16LE,
}

/// A successful COM_STMT_PREPARE response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOk {
    pub statement_id: u32,
    pub num_columns: u16,
    pub num_params: u16,
    pub warning_count: u16,
}

/// Deserialize the first packet of a prepare response.
///
/// After it, the server sends `num_params` column definitions for the
/// placeholders and `num_columns` for the resultset.
pub fn deserialize_prepare_response(payload: &[u8], flavor: DbFlavor) -> Result<PrepareOk> {
    let (status, data) = read_int_1(payload)?;
    match status {
        0x00 => {
            if data.len() < 11 {
                return Err(Error::IncompleteMessage);
            }
            let tail = PrepareOkTail::ref_from_bytes(&data[..11])?;
            check_extra_bytes(&data[11..])?;
            Ok(PrepareOk {
                statement_id: tail.statement_id.get(),
                num_columns: tail.num_columns.get(),
                num_params: tail.num_params.get(),
                warning_count: tail.warning_count.get(),
            })
        }
        ERR_PACKET_HEADER => Err(process_err_packet(data, flavor, true)),
        _ => Err(Error::ProtocolValueError),
    }
}
