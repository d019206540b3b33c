use crate::error::{Error, Result};

/// Server request for the client to send the cleartext password
/// (`caching_sha2_password` cache miss).
pub const CSHA2_FULL_AUTH_REQUIRED: u8 = 0x04;

/// The authentication plugins this client implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlugin {
    MysqlNativePassword,
    CachingSha2Password,
}

impl AuthPlugin {
    /// Resolve a server-advertised plugin name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "mysql_native_password" => Ok(Self::MysqlNativePassword),
            "caching_sha2_password" => Ok(Self::CachingSha2Password),
            other => Err(Error::UnknownAuthPlugin(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MysqlNativePassword => "mysql_native_password",
            Self::CachingSha2Password => "caching_sha2_password",
        }
    }

    /// Compute the challenge response for this plugin.
    ///
    /// An empty password always produces an empty response. Both initial
    /// responses are safe to send over a plaintext channel.
    pub fn scramble(&self, password: &str, nonce: &[u8]) -> Vec<u8> {
        if password.is_empty() {
            return Vec::new();
        }
        // servers pad the nonce with a NUL that is not part of the challenge
        let challenge = &nonce[..nonce.len().min(20)];
        match self {
            Self::MysqlNativePassword => scramble_native(password.as_bytes(), challenge),
            Self::CachingSha2Password => scramble_caching_sha2(password.as_bytes(), challenge),
        }
    }

    /// Whether this plugin may need a continuation exchange after the initial
    /// response.
    pub fn may_continue(&self) -> bool {
        matches!(self, Self::CachingSha2Password)
    }
}

/// `mysql_native_password`: SHA1(P) XOR SHA1(C || SHA1(SHA1(P)))
fn scramble_native(password: &[u8], challenge: &[u8]) -> Vec<u8> {
    use sha1::{Digest, Sha1};

    let stage1 = Sha1::digest(password);
    let stage2 = Sha1::digest(stage1);

    let mut hasher = Sha1::new();
    hasher.update(challenge);
    hasher.update(stage2);
    let salted = hasher.finalize();

    stage1
        .iter()
        .zip(salted.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// `caching_sha2_password`: SHA256(P) XOR SHA256(SHA256(SHA256(P)) || C)
fn scramble_caching_sha2(password: &[u8], challenge: &[u8]) -> Vec<u8> {
    use sha2::{Digest, Sha256};

    let stage1 = Sha256::digest(password);
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(challenge);
    let salted = hasher.finalize();

    stage1
        .iter()
        .zip(salted.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}
