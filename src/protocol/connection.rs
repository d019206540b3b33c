use tracing::debug;

use crate::constant::{
    CAPABILITIES_MANDATORY, CAPABILITIES_OPTIONAL, CapabilityFlags, DbFlavor, MAX_PACKET_SIZE,
};
use crate::error::{Error, Result, eyre};
use crate::opts::{Opts, SslMode};
use crate::protocol::auth::{AuthPlugin, CSHA2_FULL_AUTH_REQUIRED};
use crate::protocol::handshake::{
    HandshakeResponse, HandshakeServerResponse, SslRequest, deserialize_handshake_server_response,
    deserialize_server_hello,
};
use crate::protocol::response::read_ok_response;

/// What the connection driver must do next.
#[derive(Debug)]
pub enum HandshakeAction {
    /// Send these bytes, then read the server's reply.
    Send(Vec<u8>),
    /// Send these bytes, run the TLS handshake on the transport, then call
    /// [`Handshake::tls_established`].
    StartTls(Vec<u8>),
    /// Read the next packet without sending anything.
    Read,
    /// The connection is authenticated.
    Complete(HandshakeOutcome),
}

/// Connection-level facts established by the handshake.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub flavor: DbFlavor,
    pub server_version: String,
    pub connection_id: u32,
    pub capabilities: CapabilityFlags,
    pub backslash_escapes: bool,
    pub tls_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    /// Waiting for the server hello.
    ServerHello,
    /// SSLRequest sent; the driver is upgrading the transport.
    TlsUpgrade,
    /// Full handshake response (or an auth continuation) sent.
    AuthSent,
    /// Fast auth completed; the next packet must be the final OK.
    FastAuthOk,
    Complete,
}

/// Sans-I/O state machine for the connection phase.
///
/// The driver reads a packet, calls [`drive`](Handshake::drive), and performs
/// the returned action. Framing and sequence numbers stay with the driver;
/// the sequence counter starts at 0 on the server hello and runs through the
/// whole handshake, across the TLS upgrade.
#[derive(Debug)]
pub struct Handshake {
    username: String,
    password: String,
    database: Option<String>,
    collation_id: u16,
    ssl_mode: SslMode,
    multi_queries: bool,
    /// Whether the transport is able to upgrade to TLS at all.
    tls_available: bool,

    state: HandshakeState,
    flavor: DbFlavor,
    server_version: String,
    connection_id: u32,
    capabilities: CapabilityFlags,
    plugin: Option<AuthPlugin>,
    nonce: Vec<u8>,
    tls_active: bool,
}

impl Handshake {
    pub fn new(opts: &Opts, tls_available: bool) -> Self {
        Self {
            username: opts.user.clone(),
            password: opts.password.clone(),
            database: opts.db.clone(),
            collation_id: opts.collation_id,
            ssl_mode: opts.ssl_mode,
            multi_queries: opts.multi_queries,
            tls_available,
            state: HandshakeState::ServerHello,
            flavor: DbFlavor::Mysql,
            server_version: String::new(),
            connection_id: 0,
            capabilities: CapabilityFlags::empty(),
            plugin: None,
            nonce: Vec::new(),
            tls_active: false,
        }
    }

    /// Feed the next server packet.
    pub fn drive(&mut self, payload: &[u8]) -> Result<HandshakeAction> {
        match self.state {
            HandshakeState::ServerHello => self.on_server_hello(payload),
            HandshakeState::AuthSent => self.on_auth_reply(payload),
            HandshakeState::FastAuthOk => {
                let ok = read_ok_response(payload, self.flavor)?;
                self.state = HandshakeState::Complete;
                Ok(HandshakeAction::Complete(self.outcome(ok.backslash_escapes())))
            }
            HandshakeState::TlsUpgrade => Err(Error::LibraryBug(eyre!(
                "drive called while the transport upgrade is pending"
            ))),
            HandshakeState::Complete => Err(Error::LibraryBug(eyre!(
                "drive called after handshake completion"
            ))),
        }
    }

    /// Continue after the driver finished the TLS handshake.
    pub fn tls_established(&mut self) -> Result<HandshakeAction> {
        if self.state != HandshakeState::TlsUpgrade {
            return Err(Error::LibraryBug(eyre!("no TLS upgrade in progress")));
        }
        self.tls_active = true;
        self.state = HandshakeState::AuthSent;
        Ok(HandshakeAction::Send(self.auth_response()?))
    }

    fn on_server_hello(&mut self, payload: &[u8]) -> Result<HandshakeAction> {
        let hello = deserialize_server_hello(payload)?;
        debug!(
            server_version = %hello.server_version,
            connection_id = hello.connection_id,
            plugin = %hello.auth_plugin_name,
            "received server hello"
        );

        if !hello.server_capabilities.contains(CAPABILITIES_MANDATORY) {
            return Err(Error::ServerUnsupported);
        }

        let mut capabilities =
            CAPABILITIES_MANDATORY | (hello.server_capabilities & CAPABILITIES_OPTIONAL);
        if self.database.is_some()
            && hello
                .server_capabilities
                .contains(CapabilityFlags::CLIENT_CONNECT_WITH_DB)
        {
            capabilities |= CapabilityFlags::CLIENT_CONNECT_WITH_DB;
        }
        if self.multi_queries {
            if !hello
                .server_capabilities
                .contains(CapabilityFlags::CLIENT_MULTI_STATEMENTS)
            {
                return Err(Error::ServerUnsupported);
            }
            capabilities |= CapabilityFlags::CLIENT_MULTI_STATEMENTS;
        }

        let server_has_tls = hello
            .server_capabilities
            .contains(CapabilityFlags::CLIENT_SSL);
        let use_tls = match self.ssl_mode {
            SslMode::Disable => false,
            SslMode::Enable => server_has_tls && self.tls_available,
            SslMode::Require => {
                if !server_has_tls {
                    return Err(Error::SslUnsupported);
                }
                if !self.tls_available {
                    return Err(Error::BadConfig(
                        "ssl_mode is 'require' but TLS support is not compiled in".to_string(),
                    ));
                }
                true
            }
        };

        self.flavor = hello.flavor;
        self.server_version = hello.server_version;
        self.connection_id = hello.connection_id;
        self.plugin = Some(AuthPlugin::from_name(&hello.auth_plugin_name)?);
        self.nonce = hello.auth_plugin_data;

        if use_tls {
            capabilities |= CapabilityFlags::CLIENT_SSL;
            self.capabilities = capabilities;
            let mut out = Vec::new();
            SslRequest {
                capabilities,
                max_packet_size: MAX_PACKET_SIZE as u32,
                collation_id: self.collation_id,
            }
            .serialize(&mut out);
            self.state = HandshakeState::TlsUpgrade;
            Ok(HandshakeAction::StartTls(out))
        } else {
            self.capabilities = capabilities;
            self.state = HandshakeState::AuthSent;
            Ok(HandshakeAction::Send(self.auth_response()?))
        }
    }

    fn on_auth_reply(&mut self, payload: &[u8]) -> Result<HandshakeAction> {
        match deserialize_handshake_server_response(payload, self.flavor)? {
            HandshakeServerResponse::Ok(ok) => {
                self.state = HandshakeState::Complete;
                Ok(HandshakeAction::Complete(self.outcome(ok.backslash_escapes())))
            }
            HandshakeServerResponse::AuthSwitch(switch) => {
                debug!(plugin = %switch.plugin_name, "auth switch requested");
                let plugin = AuthPlugin::from_name(&switch.plugin_name)?;
                self.plugin = Some(plugin);
                self.nonce = switch.auth_data;
                Ok(HandshakeAction::Send(
                    plugin.scramble(&self.password, &self.nonce),
                ))
            }
            HandshakeServerResponse::OkFollows => {
                self.state = HandshakeState::FastAuthOk;
                Ok(HandshakeAction::Read)
            }
            HandshakeServerResponse::AuthMoreData(data) => self.on_auth_more_data(&data),
        }
    }

    fn on_auth_more_data(&mut self, data: &[u8]) -> Result<HandshakeAction> {
        match (self.plugin, data) {
            (Some(AuthPlugin::CachingSha2Password), [CSHA2_FULL_AUTH_REQUIRED]) => {
                // cache miss: the cleartext password may only travel over TLS
                if !self.tls_active {
                    return Err(Error::AuthPluginRequiresSsl);
                }
                let mut out = Vec::with_capacity(self.password.len() + 1);
                out.extend_from_slice(self.password.as_bytes());
                out.push(0);
                Ok(HandshakeAction::Send(out))
            }
            _ => Err(Error::ProtocolValueError),
        }
    }

    fn auth_response(&self) -> Result<Vec<u8>> {
        let plugin = self
            .plugin
            .ok_or_else(|| Error::LibraryBug(eyre!("auth response before server hello")))?;
        let scramble = plugin.scramble(&self.password, &self.nonce);

        let mut out = Vec::new();
        HandshakeResponse {
            capabilities: self.capabilities,
            max_packet_size: MAX_PACKET_SIZE as u32,
            collation_id: self.collation_id,
            username: &self.username,
            auth_response: &scramble,
            database: self.database.as_deref(),
            auth_plugin_name: plugin.name(),
        }
        .serialize(&mut out);
        Ok(out)
    }

    fn outcome(&self, backslash_escapes: bool) -> HandshakeOutcome {
        HandshakeOutcome {
            flavor: self.flavor,
            server_version: self.server_version.clone(),
            connection_id: self.connection_id,
            capabilities: self.capabilities,
            backslash_escapes,
            tls_active: self.tls_active,
        }
    }
}
