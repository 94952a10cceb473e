// ColorTouch local API HTTP client
//
// Wraps `reqwest::Client` with device-relative URL construction and the
// digest authentication handshake. Endpoint methods return parsed wire
// models; status classification beyond 401/403 is left to the caller.

use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::DigestAccess;
use crate::error::Error;
use crate::models::{ControlRequest, ControlResponse, InfoData, SensorReadings};
use crate::transport::TransportConfig;

/// Raw HTTP client for one Venstar ColorTouch thermostat.
///
/// Holds the digest credential state for the session; dropping the client
/// drops the credentials, so a reconnect always starts a fresh handshake.
pub struct ColorTouchClient {
    http: reqwest::Client,
    base_url: Url,
    auth: DigestAccess,
}

impl ColorTouchClient {
    /// Create a client for the device at `base_url`
    /// (e.g. `http://192.168.1.50`).
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            auth: DigestAccess::new(username, password),
        })
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /query/sensors` — current readings from all attached sensors.
    pub async fn sensors(&self) -> Result<SensorReadings, Error> {
        self.get_json("/query/sensors").await
    }

    /// `GET /query/info` — setpoints, mode, state, and unit configuration.
    pub async fn info(&self) -> Result<InfoData, Error> {
        self.get_json("/query/info").await
    }

    /// `POST /control` — push a full desired state to the device.
    ///
    /// A 2xx response with `success=false` means the device refused the
    /// values (e.g. setpoints too close together); that surfaces as
    /// [`Error::ControlRejected`] with the device's reason.
    pub async fn control(&self, request: &ControlRequest) -> Result<(), Error> {
        let fields = request.form_fields();
        let body = self.send(Method::POST, "/control", Some(&fields)).await?;
        let response: ControlResponse = parse_json(&body)?;
        if response.success {
            Ok(())
        } else {
            Err(Error::ControlRejected {
                reason: response
                    .reason
                    .unwrap_or_else(|| "no reason given".to_owned()),
            })
        }
    }

    // ── Request plumbing ─────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let body = self.send(Method::GET, path, None).await?;
        parse_json(&body)
    }

    /// Send a request, answering at most one digest challenge.
    ///
    /// The first attempt carries the cached authorization if a challenge
    /// was answered earlier in the session. A 401 on the retry (or a 403
    /// at any point) is a credentials problem.
    async fn send(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&'static str, String)]>,
    ) -> Result<String, Error> {
        let url = self.base_url.join(path)?;
        let uri = url.path().to_owned();
        debug!("{} {}", method, url);

        let mut authorization = self.auth.authorize(&method, &uri);
        for attempt in 0..2 {
            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(header) = &authorization {
                request = request.header(AUTHORIZATION, header);
            }
            if let Some(fields) = form {
                request = request.form(fields);
            }

            let response = request.send().await?;
            let status = response.status();
            trace!("response status {}", status);

            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                let challenge = response
                    .headers()
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
                    .ok_or_else(|| Error::Authentication {
                        message: "401 without a digest challenge".into(),
                    })?;
                authorization = Some(self.auth.accept_challenge(&challenge, &method, &uri)?);
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(Error::Authentication {
                    message: "thermostat rejected the configured credentials".into(),
                });
            }

            if !status.is_success() {
                return Err(Error::UnexpectedStatus {
                    status: status.as_u16(),
                });
            }

            let body = response.text().await?;
            trace!("response body {}", body);
            return Ok(body);
        }

        Err(Error::Authentication {
            message: "digest handshake did not converge".into(),
        })
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}
