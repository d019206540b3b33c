use crate::constant::{CapabilityFlags, DbFlavor};
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::response::{
    ERR_PACKET_HEADER, EOF_PACKET_HEADER, OK_PACKET_HEADER, OkPacket, process_err_packet,
};

const PROTOCOL_VERSION_9: u8 = 9;
const PROTOCOL_VERSION_10: u8 = 10;
const AUTH_MORE_DATA_HEADER: u8 = 0x01;

/// Payload of an auth-more-data packet meaning "auth complete, an OK packet
/// follows".
const FAST_AUTH_COMPLETE: &[u8] = &[0x03];

/// The server's initial hello (HandshakeV10).
#[derive(Debug, Clone)]
pub struct ServerHello {
    pub flavor: DbFlavor,
    pub server_version: String,
    pub connection_id: u32,
    pub server_capabilities: CapabilityFlags,
    pub auth_plugin_name: String,
    pub auth_plugin_data: Vec<u8>,
}

/// Deserialize the first packet of the connection.
///
/// Protocol version 9 servers are too old; an ERR packet in this position is
/// a pre-negotiation rejection and carries no SQL state.
pub fn deserialize_server_hello(payload: &[u8]) -> Result<ServerHello> {
    let (version, data) = read_int_1(payload)?;
    match version {
        PROTOCOL_VERSION_9 => Err(Error::ServerUnsupported),
        ERR_PACKET_HEADER => Err(process_err_packet(data, DbFlavor::Mysql, false)),
        PROTOCOL_VERSION_10 => deserialize_server_hello_v10(data),
        _ => Err(Error::ProtocolValueError),
    }
}

fn deserialize_server_hello_v10(data: &[u8]) -> Result<ServerHello> {
    let (version_bytes, data) = read_string_null(data)?;
    let server_version = String::from_utf8_lossy(version_bytes).to_string();
    let flavor = if server_version.contains("MariaDB") {
        DbFlavor::Mariadb
    } else {
        DbFlavor::Mysql
    };

    let (connection_id, data) = read_int_4(data)?;
    let (auth_data_1, data) = read_string_fix(data, 8)?;
    let (_filler, data) = read_int_1(data)?;
    let (cap_low, data) = read_int_2(data)?;
    let (_charset, data) = read_int_1(data)?;
    let (_status_flags, data) = read_int_2(data)?;
    let (cap_high, data) = read_int_2(data)?;

    let cap_bits = ((cap_high as u32) << 16) | (cap_low as u32);
    let server_capabilities = CapabilityFlags::from_bits_truncate(cap_bits);

    // Without pluggable auth we cannot even finish parsing this frame.
    if !server_capabilities.contains(CapabilityFlags::CLIENT_PLUGIN_AUTH) {
        return Err(Error::ServerUnsupported);
    }

    let (auth_data_len, data) = read_int_1(data)?;
    let (_reserved, data) = read_string_fix(data, 10)?;

    // Part 2 is max(13, total - 8) bytes; the last one is a NUL that is not
    // part of the nonce.
    let auth_data_2_len = (auth_data_len as usize).saturating_sub(auth_data_1.len()).max(13);
    let (auth_data_2, data) = read_string_fix(data, auth_data_2_len)?;

    let (plugin_bytes, data) = read_string_null(data)?;
    check_extra_bytes(data)?;

    let mut auth_plugin_data = Vec::with_capacity(auth_data_1.len() + auth_data_2.len() - 1);
    auth_plugin_data.extend_from_slice(auth_data_1);
    auth_plugin_data.extend_from_slice(&auth_data_2[..auth_data_2.len() - 1]);

    Ok(ServerHello {
        flavor,
        server_version,
        connection_id,
        server_capabilities,
        auth_plugin_name: String::from_utf8_lossy(plugin_bytes).to_string(),
        auth_plugin_data,
    })
}

/// The client's reply to the hello (HandshakeResponse41).
#[derive(Debug, Clone)]
pub struct HandshakeResponse<'a> {
    pub capabilities: CapabilityFlags,
    pub max_packet_size: u32,
    pub collation_id: u16,
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin_name: &'a str,
}

impl HandshakeResponse<'_> {
    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_int_4(out, self.capabilities.bits());
        write_int_4(out, self.max_packet_size);
        write_int_1(out, self.collation_id as u8); // low byte only
        out.extend_from_slice(&[0u8; 23]);
        write_string_null(out, self.username);

        if self
            .capabilities
            .contains(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA)
        {
            write_bytes_lenenc(out, self.auth_response);
        } else {
            write_int_1(out, self.auth_response.len() as u8);
            out.extend_from_slice(self.auth_response);
        }

        if let Some(db) = self.database {
            if self
                .capabilities
                .contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB)
            {
                write_string_null(out, db);
            }
        }

        write_string_null(out, self.auth_plugin_name);
    }
}

/// The stub response that precedes a TLS handshake: only capabilities,
/// max packet size and charset.
#[derive(Debug, Clone, Copy)]
pub struct SslRequest {
    pub capabilities: CapabilityFlags,
    pub max_packet_size: u32,
    pub collation_id: u16,
}

impl SslRequest {
    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_int_4(out, self.capabilities.bits());
        write_int_4(out, self.max_packet_size);
        write_int_1(out, self.collation_id as u8);
        out.extend_from_slice(&[0u8; 23]);
    }
}

/// The server wants the client to redo auth with a different plugin.
#[derive(Debug, Clone)]
pub struct AuthSwitch {
    pub plugin_name: String,
    pub auth_data: Vec<u8>,
}

fn deserialize_auth_switch(data: &[u8]) -> Result<AuthSwitch> {
    let (plugin_bytes, data) = read_string_null(data)?;
    let mut auth_data = read_string_eof(data);
    // an extra trailing NUL is not part of the challenge
    if auth_data.last() == Some(&0) {
        auth_data = &auth_data[..auth_data.len() - 1];
    }
    Ok(AuthSwitch {
        plugin_name: String::from_utf8_lossy(plugin_bytes).to_string(),
        auth_data: auth_data.to_vec(),
    })
}

/// One server message during the authentication exchange.
#[derive(Debug)]
pub enum HandshakeServerResponse {
    /// Authentication accepted.
    Ok(OkPacket),
    /// Redo the auth computation with another plugin and nonce.
    AuthSwitch(AuthSwitch),
    /// Fast auth succeeded; the next packet must be an OK.
    OkFollows,
    /// Plugin-specific continuation data.
    AuthMoreData(Vec<u8>),
}

/// Classify a packet received after the handshake response (or after any auth
/// continuation).
pub fn deserialize_handshake_server_response(
    payload: &[u8],
    flavor: DbFlavor,
) -> Result<HandshakeServerResponse> {
    let (header, data) = read_int_1(payload)?;
    match header {
        OK_PACKET_HEADER => Ok(HandshakeServerResponse::Ok(OkPacket::deserialize(data)?)),
        ERR_PACKET_HEADER => Err(process_err_packet(data, flavor, true)),
        EOF_PACKET_HEADER => Ok(HandshakeServerResponse::AuthSwitch(
            deserialize_auth_switch(data)?,
        )),
        AUTH_MORE_DATA_HEADER => {
            let more = read_string_eof(data);
            if more == FAST_AUTH_COMPLETE {
                Ok(HandshakeServerResponse::OkFollows)
            } else {
                Ok(HandshakeServerResponse::AuthMoreData(more.to_vec()))
            }
        }
        _ => Err(Error::ProtocolValueError),
    }
}
