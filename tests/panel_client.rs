// HTTP client tests against a mock panel web server

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tuxedo_bridge::{ArmMode, PanelApi, PanelClient, PanelConfig, TuxedoError};

const STATUS_PATH: &str = "/system_http_api/API_REV01/GetSecurityStatus";
const ARM_PATH: &str = "/system_http_api/API_REV01/AdvancedSecurity/ArmWithCode";

fn client_for(server: &MockServer) -> PanelClient {
    client_with_code(server, "1234")
}

fn client_with_code(server: &MockServer, code: &str) -> PanelClient {
    let addr = server.address();
    let config = PanelConfig::builder()
        .host(addr.ip().to_string())
        .port(Some(addr.port()))
        .alarm_code(code)
        .request_timeout_ms(500)
        .build();
    PanelClient::new(&config).unwrap()
}

async fn mount_status(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn query_status_reads_status_field() {
    let server = MockServer::start().await;
    mount_status(&server, r#"{"Status":"Armed Away"}"#).await;

    let client = client_for(&server);
    assert_eq!(client.query_status().await.as_str(), "Armed Away");
}

#[tokio::test]
async fn query_status_ignores_trailing_disclaimer() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "{\"Status\":\"  Ready To Arm \"}\n<!-- Copyright Honeywell International. All rights reserved. -->",
    )
    .await;

    let client = client_for(&server);
    assert_eq!(client.query_status().await.as_str(), "Ready To Arm");
}

#[tokio::test]
async fn query_status_countdown_passes_through() {
    let server = MockServer::start().await;
    mount_status(&server, r#"{"Status":"27 Secs Remaining"}"#).await;

    let client = client_for(&server);
    assert_eq!(client.query_status().await.as_str(), "27 Secs Remaining");
}

#[tokio::test]
async fn query_status_http_error_becomes_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.query_status().await.as_str(), "Error");
}

#[tokio::test]
async fn query_status_timeout_becomes_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"Status":"Ready To Arm"}"#)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.query_status().await.as_str(), "Error");
}

#[tokio::test]
async fn query_status_unparseable_body_becomes_error_status() {
    let server = MockServer::start().await;
    mount_status(&server, "<html>Login required</html>").await;

    let client = client_for(&server);
    assert_eq!(client.query_status().await.as_str(), "Error");
}

#[tokio::test]
async fn query_status_unreachable_panel_becomes_error_status() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    drop(server);

    assert_eq!(client.query_status().await.as_str(), "Error");
}

#[tokio::test]
async fn arm_sends_mode_partition_and_code() {
    let server = MockServer::start().await;
    for mode in ["STAY", "AWAY", "NIGHT"] {
        Mock::given(method("GET"))
            .and(path(ARM_PATH))
            .and(query_param("arming", mode))
            .and(query_param("pID", "1"))
            .and(query_param("ucode", "1234"))
            .and(query_param("operation", "set"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Result":"Success"}"#))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    client.arm(ArmMode::Stay).await.unwrap();
    client.arm(ArmMode::Away).await.unwrap();
    client.arm(ArmMode::Night).await.unwrap();
}

#[tokio::test]
async fn disarm_uses_keypad_handler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/handlerequest.html"))
        .and(query_param("cmd", "3"))
        .and(query_param("Type", "3"))
        .and(query_param("pID", "1"))
        .and(query_param("uCode", "1234"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.disarm().await.unwrap();
}

#[tokio::test]
async fn alarm_code_is_percent_encoded() {
    let server = MockServer::start().await;
    // Matchers compare decoded values, so an unencoded '&' or '#' would split
    // or truncate the code and miss these mocks
    Mock::given(method("GET"))
        .and(path(ARM_PATH))
        .and(query_param("ucode", "12&4 #"))
        .and(query_param("operation", "set"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Result":"Success"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/handlerequest.html"))
        .and(query_param("uCode", "12&4 #"))
        .and(query_param("pID", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_code(&server, "12&4 #");
    client.arm(ArmMode::Away).await.unwrap();
    client.disarm().await.unwrap();
}

#[tokio::test]
async fn arm_rejected_by_panel_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ARM_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.arm(ArmMode::Away).await.unwrap_err();
    match &err {
        TuxedoError::HttpStatus { status, url } => {
            assert_eq!(*status, 401);
            assert!(!url.contains("1234"), "alarm code leaked into error: {url}");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    assert!(err.is_transport());
}

#[tokio::test]
async fn refresh_session_fetches_home_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.refresh_session().await.unwrap();
}
