// HTTP digest authentication (RFC 2617, MD5).
//
// The ColorTouch embedded web server protects its API with digest auth
// under the "thermostat" realm. reqwest has no built-in digest support,
// so the challenge/response handshake is implemented here: the client
// sends unauthenticated, answers the first 401's challenge, and caches
// the parsed challenge so later requests in the session authorize
// preemptively.

use std::sync::Mutex;

use md5::{Digest, Md5};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Credential holder plus cached challenge state for one device session.
///
/// Dropped together with the owning client, so credentials never survive
/// a reconnect.
pub(crate) struct DigestAccess {
    username: String,
    password: SecretString,
    state: Mutex<Option<ChallengeState>>,
}

#[derive(Debug, Clone)]
struct Challenge {
    realm: String,
    nonce: String,
    qop: Option<String>,
    opaque: Option<String>,
}

struct ChallengeState {
    challenge: Challenge,
    /// Nonce use count, incremented per authorized request.
    nc: u32,
}

impl DigestAccess {
    pub(crate) fn new(username: String, password: SecretString) -> Self {
        Self {
            username,
            password,
            state: Mutex::new(None),
        }
    }

    /// Build an `Authorization` header from the cached challenge, if any.
    pub(crate) fn authorize(&self, method: &Method, uri: &str) -> Option<String> {
        let mut guard = self.state.lock().ok()?;
        let state = guard.as_mut()?;
        state.nc += 1;
        Some(self.header_for(&state.challenge, state.nc, method, uri))
    }

    /// Accept a fresh `WWW-Authenticate` challenge and build the
    /// `Authorization` header answering it.
    pub(crate) fn accept_challenge(
        &self,
        header: &str,
        method: &Method,
        uri: &str,
    ) -> Result<String, Error> {
        let challenge = parse_challenge(header)?;
        let mut guard = self.state.lock().map_err(|_| Error::Authentication {
            message: "authentication state poisoned".into(),
        })?;
        *guard = Some(ChallengeState {
            challenge: challenge.clone(),
            nc: 1,
        });
        Ok(self.header_for(&challenge, 1, method, uri))
    }

    fn header_for(&self, challenge: &Challenge, nc: u32, method: &Method, uri: &str) -> String {
        let cnonce = uuid::Uuid::new_v4().simple().to_string();
        let nc_hex = format!("{nc:08x}");
        let response = digest_response(
            &self.username,
            &challenge.realm,
            self.password.expose_secret(),
            method.as_str(),
            uri,
            &challenge.nonce,
            challenge.qop.as_deref(),
            &nc_hex,
            &cnonce,
        );

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", \
             response=\"{response}\", algorithm=MD5",
            self.username, challenge.realm, challenge.nonce
        );
        if let Some(qop) = &challenge.qop {
            header.push_str(&format!(", qop={qop}, nc={nc_hex}, cnonce=\"{cnonce}\""));
        }
        if let Some(opaque) = &challenge.opaque {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        header
    }
}

/// Compute the digest `response` value.
///
/// With a qop the full `HA1:nonce:nc:cnonce:qop:HA2` form is used;
/// without one, the legacy `HA1:nonce:HA2` form.
#[allow(clippy::too_many_arguments)]
fn digest_response(
    username: &str,
    realm: &str,
    password: &str,
    method: &str,
    uri: &str,
    nonce: &str,
    qop: Option<&str>,
    nc_hex: &str,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{realm}:{password}"));
    let ha2 = md5_hex(&format!("{method}:{uri}"));
    match qop {
        Some(qop) => md5_hex(&format!("{ha1}:{nonce}:{nc_hex}:{cnonce}:{qop}:{ha2}")),
        None => md5_hex(&format!("{ha1}:{nonce}:{ha2}")),
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Parse a `WWW-Authenticate: Digest ...` challenge header.
fn parse_challenge(header: &str) -> Result<Challenge, Error> {
    let trimmed = header.trim();
    let params = trimmed
        .strip_prefix("Digest")
        .or_else(|| trimmed.strip_prefix("digest"))
        .ok_or_else(|| Error::Authentication {
            message: format!("unsupported authentication scheme: {header}"),
        })?;

    let mut realm = None;
    let mut nonce = None;
    let mut qop = None;
    let mut opaque = None;

    for (key, value) in split_params(params) {
        match key.as_str() {
            "realm" => realm = Some(value),
            "nonce" => nonce = Some(value),
            "qop" => qop = Some(value),
            "opaque" => opaque = Some(value),
            _ => {}
        }
    }

    // A qop list must contain "auth"; auth-int would require body hashing.
    let qop = match qop {
        Some(list) if list.split(',').any(|q| q.trim() == "auth") => Some("auth".to_owned()),
        Some(list) => {
            return Err(Error::Authentication {
                message: format!("unsupported digest qop: {list}"),
            });
        }
        None => None,
    };

    Ok(Challenge {
        realm: realm.ok_or_else(|| missing("realm"))?,
        nonce: nonce.ok_or_else(|| missing("nonce"))?,
        qop,
        opaque,
    })
}

fn missing(field: &str) -> Error {
    Error::Authentication {
        message: format!("digest challenge missing {field}"),
    }
}

/// Split `key="value", key=value` pairs, respecting quoted commas.
fn split_params(input: &str) -> Vec<(String, String)> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);

    parts
        .iter()
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| {
            (
                k.trim().to_ascii_lowercase(),
                v.trim().trim_matches('"').to_owned(),
            )
        })
        .collect()
}
