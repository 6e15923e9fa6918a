use serde_json::json;
use uniwash_server::configs::Sms;
use uniwash_server::services::*;
use uniwash_server::tests::test_settings;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sms_for(server: &MockServer) -> Sms {
    Sms {
        base_url: server.uri(),
        api_key: String::from("test-key"),
        provider: String::from("kavenegar"),
        developer_mobile: String::from("09350000000"),
        timeout_secs: 2,
    }
}

#[tokio::test]
async fn test_http_gateway_returns_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("x-api-key", "test-key"))
        .and(body_partial_json(json!({
            "provider": "kavenegar",
            "template_id": 8698,
            "method": "sms",
            "params": ["7"],
            "mobile": "09120000000"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reference_id": "abc-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpSmsGateway::new(&sms_for(&server)).unwrap();
    let receipt = gateway
        .send(SmsRequest::new(
            "kavenegar",
            COMMAND_TEMPLATE_ID,
            vec![String::from("7")],
            "09120000000",
        ))
        .await
        .unwrap();

    assert_eq!(receipt.reference_id, "abc-1");
}

#[tokio::test]
async fn test_http_gateway_rejects_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let gateway = HttpSmsGateway::new(&sms_for(&server)).unwrap();
    let error = gateway
        .send(SmsRequest::new("kavenegar", COMMAND_TEMPLATE_ID, vec![String::from("2")], "09120000000"))
        .await
        .unwrap_err();

    match error {
        SmsError::Rejected(message) => assert!(message.contains("quota exceeded")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_http_gateway_rejects_empty_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reference_id": "" })))
        .mount(&server)
        .await;

    let gateway = HttpSmsGateway::new(&sms_for(&server)).unwrap();
    let result = gateway
        .send(SmsRequest::new("kavenegar", COMMAND_TEMPLATE_ID, vec![String::from("3")], "09120000000"))
        .await;

    assert!(matches!(result, Err(SmsError::Rejected(_))));
}

#[tokio::test]
async fn test_non_production_gateway_retargets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(json!({ "mobile": "09350000000" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reference_id": "dev-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = test_settings(false);
    settings.sms = sms_for(&server);

    let gateway = build_gateway(&settings).unwrap();
    let receipt = gateway
        .send(SmsRequest::new(
            "kavenegar",
            TURN_ON_REMINDER_TEMPLATE_ID,
            vec![String::from("W-01"), String::from("07:45")],
            "09122000000",
        ))
        .await
        .unwrap();

    assert_eq!(receipt.reference_id, "dev-1");
}

#[tokio::test]
async fn test_production_gateway_keeps_recipient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(json!({ "mobile": "09122000000" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reference_id": "prod-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = test_settings(true);
    settings.sms = sms_for(&server);

    let gateway = build_gateway(&settings).unwrap();
    let receipt = gateway
        .send(SmsRequest::new(
            "kavenegar",
            TURN_OFF_REMINDER_TEMPLATE_ID,
            vec![String::from("W-01"), String::from("09:15")],
            "09122000000",
        ))
        .await
        .unwrap();

    assert_eq!(receipt.reference_id, "prod-1");
}
