//! SASL payloads for the AUTHENTICATE mechanisms.
//!
//! Pure functions: they build the bytes sent in reply to continuation
//! requests and never touch the network.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::Md5;

use crate::{Error, Result};

type HmacMd5 = Hmac<Md5>;

/// Base64-encodes one LOGIN step (username or password).
#[must_use]
pub fn login_step(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Builds the PLAIN blob `\0<user>\0<password>`.
///
/// The blob is sent unencoded, exactly as the servers this engine targets
/// accept it.
///
/// # Errors
///
/// Returns [`Error::Config`] if either field contains CR, LF or NUL: the
/// blob travels as one raw line.
pub fn plain_blob(username: &str, password: &str) -> Result<Vec<u8>> {
    for (field, value) in [("username", username), ("password", password)] {
        if let Some(byte) = value.bytes().find(|b| matches!(b, b'\r' | b'\n' | 0)) {
            return Err(Error::Config(format!(
                "PLAIN {field} contains byte 0x{byte:02x}"
            )));
        }
    }

    let mut blob = Vec::with_capacity(username.len() + password.len() + 2);
    blob.push(0);
    blob.extend_from_slice(username.as_bytes());
    blob.push(0);
    blob.extend_from_slice(password.as_bytes());
    Ok(blob)
}

/// Computes the CRAM-MD5 reply to a Base64 challenge.
///
/// The decoded challenge must look like `<...>`. The reply is the
/// lowercase hex HMAC-MD5 of the challenge keyed by `password`, Base64-encoded.
///
/// # Errors
///
/// Returns [`Error::Response`] if the challenge is not valid Base64 or is not
/// enclosed in angle brackets.
pub fn cram_md5_response(challenge_b64: &str, password: &str) -> Result<String> {
    let challenge = STANDARD
        .decode(challenge_b64.trim())
        .map_err(|e| Error::Response(format!("CRAM-MD5 challenge is not Base64: {e}")))?;

    if challenge.len() < 2 || challenge.first() != Some(&b'<') || challenge.last() != Some(&b'>')
    {
        return Err(Error::Response(
            "CRAM-MD5 challenge is not enclosed in angle brackets".to_string(),
        ));
    }

    let digest = hmac_md5_hex(password.as_bytes(), &challenge)?;
    Ok(STANDARD.encode(digest))
}

fn hmac_md5_hex(key: &[u8], data: &[u8]) -> Result<String> {
    let mut mac = HmacMd5::new_from_slice(key)
        .map_err(|e| Error::Response(format!("HMAC-MD5 key rejected: {e}")))?;
    mac.update(data);
    Ok(to_hex(&mac.finalize().into_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
