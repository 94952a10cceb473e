use std::time::Duration;

use md5::{Digest, Md5};
use opensprinkler_api::{Error, FirmwareVersion, connect};
use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSWORD: &str = "opendoor";
const TIMEOUT: Duration = Duration::from_secs(5);

async fn setup(firmware: FirmwareVersion) -> (MockServer, Box<dyn opensprinkler_api::SprinklerApi>)
{
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let api = connect(firmware, base, PASSWORD, TIMEOUT).unwrap();
    (server, api)
}

#[tokio::test]
async fn v213_sends_hashed_password() {
    let (server, api) = setup(FirmwareVersion::V213).await;
    let hashed = hex::encode(Md5::digest(PASSWORD.as_bytes()));

    Mock::given(method("GET"))
        .and(path("/jc"))
        .and(query_param("pw", hashed))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "devt": 1_724_000_000_u64,
            "nbrd": 2,
            "en": 1,
            "rd": 0,
            "rdst": 0,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vars = api.controller_variables().await.unwrap();
    assert!(vars.enabled());
    assert!(!vars.rain_delay_active());
    assert_eq!(vars.station_count(), 16);
}

#[tokio::test]
async fn v210_sends_plaintext_password() {
    let (server, api) = setup(FirmwareVersion::V210).await;

    Mock::given(method("GET"))
        .and(path("/jc"))
        .and(query_param("pw", PASSWORD))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "devt": 1_724_000_000_u64,
            "nbrd": 1,
            "en": 0,
            "rd": 1,
            "rdst": 1_724_003_600_u64,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vars = api.controller_variables().await.unwrap();
    assert!(!vars.enabled());
    assert!(vars.rain_delay_active());
    assert_eq!(vars.station_count(), 8);
}

#[tokio::test]
async fn station_status_decodes_per_station_bits() {
    let (server, api) = setup(FirmwareVersion::V213).await;

    Mock::given(method("GET"))
        .and(path("/js"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sn": [0, 1, 0, 0, 0, 0, 0, 0],
            "nstations": 8,
        })))
        .mount(&server)
        .await;

    let status = api.station_status().await.unwrap();
    assert_eq!(status.is_on(0), Some(false));
    assert_eq!(status.is_on(1), Some(true));
    assert_eq!(status.is_on(8), None);
}

#[tokio::test]
async fn set_station_on_carries_index_enable_and_duration() {
    let (server, api) = setup(FirmwareVersion::V213).await;

    Mock::given(method("GET"))
        .and(path("/cm"))
        .and(query_param("sid", "3"))
        .and(query_param("en", "1"))
        .and(query_param("t", "600"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;

    api.set_station(3, true, Some(600)).await.unwrap();
}

#[tokio::test]
async fn set_station_off_omits_duration() {
    let (server, api) = setup(FirmwareVersion::V210).await;

    Mock::given(method("GET"))
        .and(path("/cm"))
        .and(query_param("sid", "3"))
        .and(query_param("en", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;

    api.set_station(3, false, Some(600)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(
        !requests[0].url.query_pairs().any(|(k, _)| k == "t"),
        "duration must not be sent when switching a station off"
    );
}

#[tokio::test]
async fn result_two_is_an_authentication_error() {
    let (server, api) = setup(FirmwareVersion::V213).await;

    Mock::given(method("GET"))
        .and(path("/cv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": 2})))
        .mount(&server)
        .await;

    let err = api.set_rain_delay(2).await.unwrap_err();
    assert!(matches!(err, Error::Authentication));
}

#[tokio::test]
async fn other_result_codes_are_rejections() {
    let (server, api) = setup(FirmwareVersion::V213).await;

    Mock::given(method("GET"))
        .and(path("/cm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": 17})))
        .mount(&server)
        .await;

    let err = api.set_station(200, true, None).await.unwrap_err();
    assert!(matches!(err, Error::Rejected { code: 17 }));
    assert!(err.to_string().contains("out of range"));
}

#[tokio::test]
async fn rain_delay_sends_hours() {
    let (server, api) = setup(FirmwareVersion::V213).await;

    Mock::given(method("GET"))
        .and(path("/cv"))
        .and(query_param("rd", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;

    api.set_rain_delay(6).await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_a_deserialization_error() {
    let (server, api) = setup(FirmwareVersion::V213).await;

    Mock::given(method("GET"))
        .and(path("/js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = api.station_status().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}
