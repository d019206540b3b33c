use crate::constant::{DbFlavor, ServerStatusFlags};
use crate::error::{Diagnostics, Error, Result, ServerCode};
use crate::protocol::primitive::*;

/// Header byte of a command-phase OK packet.
pub const OK_PACKET_HEADER: u8 = 0x00;

/// Header byte of an OK packet in row-terminator position (with
/// `CLIENT_DEPRECATE_EOF`, the only EOF representation on the wire).
pub const EOF_PACKET_HEADER: u8 = 0xFE;

/// Header byte of an ERR packet.
pub const ERR_PACKET_HEADER: u8 = 0xFF;

/// A parsed OK packet, either as command response or as resultset terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
    pub info: String,
}

impl OkPacket {
    /// Deserialize the payload following the header byte.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let (affected_rows, data) = read_int_lenenc(data)?;
        let (last_insert_id, data) = read_int_lenenc(data)?;
        let (status_flags, data) = read_int_2(data)?;
        let (warnings, data) = read_int_2(data)?;
        // info is optional and extends to the end of the packet
        let info = read_string_eof(data);

        Ok(OkPacket {
            affected_rows,
            last_insert_id,
            status_flags: ServerStatusFlags::from_bits_truncate(status_flags),
            warnings,
            info: String::from_utf8_lossy(info).to_string(),
        })
    }

    pub fn more_results(&self) -> bool {
        self.status_flags
            .contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS)
    }

    pub fn is_out_params(&self) -> bool {
        self.status_flags
            .contains(ServerStatusFlags::SERVER_PS_OUT_PARAMS)
    }

    pub fn backslash_escapes(&self) -> bool {
        !self
            .status_flags
            .contains(ServerStatusFlags::SERVER_STATUS_NO_BACKSLASH_ESCAPES)
    }
}

/// Read an OK packet from a full payload, accepting either header form.
pub fn read_ok_packet(payload: &[u8]) -> Result<OkPacket> {
    let (header, data) = read_int_1(payload)?;
    if header != OK_PACKET_HEADER && header != EOF_PACKET_HEADER {
        return Err(Error::ProtocolValueError);
    }
    OkPacket::deserialize(data)
}

/// A parsed ERR packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: String,
    pub message: String,
}

impl ErrPacket {
    /// Deserialize the payload following the `0xFF` header byte.
    ///
    /// `has_sql_state` is false only for the pre-negotiation rejection the
    /// server may send in place of its hello, before it knows the client
    /// speaks the 4.1 protocol.
    pub fn deserialize(data: &[u8], has_sql_state: bool) -> Result<Self> {
        let (error_code, data) = read_int_2(data)?;

        let (sql_state, data) = if has_sql_state {
            let (_marker, data) = read_string_fix(data, 1)?; // '#'
            let (sql_state, data) = read_string_fix(data, 5)?;
            (String::from_utf8_lossy(sql_state).to_string(), data)
        } else {
            (String::new(), data)
        };

        let message = read_string_eof(data);

        Ok(ErrPacket {
            error_code,
            sql_state,
            message: String::from_utf8_lossy(message).to_string(),
        })
    }
}

/// Turn an ERR payload (after the header byte) into an [`Error::Server`],
/// partitioning the code by flavor.
pub fn process_err_packet(data: &[u8], flavor: DbFlavor, has_sql_state: bool) -> Error {
    match ErrPacket::deserialize(data, has_sql_state) {
        Ok(err) => Error::Server {
            code: ServerCode::from_raw(err.error_code, flavor),
            diagnostics: Diagnostics::new(err.message, err.sql_state),
        },
        Err(err) => err,
    }
}

/// Parse a response that must be OK or ERR (ping, reset statement, the OK
/// following fast auth).
pub fn read_ok_response(payload: &[u8], flavor: DbFlavor) -> Result<OkPacket> {
    let (header, data) = read_int_1(payload)?;
    match header {
        OK_PACKET_HEADER => OkPacket::deserialize(data),
        ERR_PACKET_HEADER => Err(process_err_packet(data, flavor, true)),
        _ => Err(Error::ProtocolValueError),
    }
}
