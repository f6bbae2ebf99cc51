mod common;

use common::{client, json, text};
use payretailers::{
    Country, CountryClient, Currency, Environment, ErrorKind, PayerDetails, PaywallParams,
    TransactionParams,
};
use serde_json::json;

fn params() -> TransactionParams {
    TransactionParams::new(
        "250.00",
        "Order 7",
        "order-7",
        "https://shop.example.com/webhook",
        "buyer@example.com",
    )
    .with_payer(PayerDetails {
        first_name: Some("Ana".into()),
        last_name: Some("Silva".into()),
        personal_id: Some("123.456.789-00".into()),
        ..PayerDetails::default()
    })
}

fn methods_list() -> serde_json::Value {
    json!({
        "list": [
            {"paymentMethodTag": "PIX", "name": "Pix"},
            {"paymentMethodTag": "BOLETO", "name": "Boleto"},
            {"name": "untagged"}
        ]
    })
}

#[tokio::test]
async fn test_sandbox_rejects_unknown_tag_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let br = CountryClient::with_client(
        client(Environment::Sandbox, &dir.path().join("h2h.json"), vec![]),
        Country::Br,
    );

    let err = br
        .create_transaction(params().with_payment_method_tag("CREDIT_CARD"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().contains("ONLINE, PIX, BOLETO"));
    assert_eq!(br.client().transport().calls(), 0);
}

#[tokio::test]
async fn test_sandbox_requires_tag() {
    let dir = tempfile::tempdir().unwrap();
    let mx = CountryClient::with_client(
        client(Environment::Sandbox, &dir.path().join("h2h.json"), vec![]),
        Country::Mx,
    );

    let err = mx.create_transaction(params()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().contains("Available tags for MX: ONLINE, CREDIT_CARD, CASH"));
    assert_eq!(mx.client().transport().calls(), 0);
}

#[tokio::test]
async fn test_sandbox_transaction_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let br = CountryClient::with_client(
        client(
            Environment::Sandbox,
            &dir.path().join("h2h.json"),
            vec![json(201, json!({"id": "tx-1", "status": "PENDING"}))],
        ),
        Country::Br,
    );
    assert_eq!(br.default_currency(), Currency::Brl);

    let resp = br
        .create_transaction(params().with_payment_method_tag("PIX"))
        .await
        .unwrap();
    assert_eq!(resp["id"], "tx-1");

    let requests = br.client().transport().requests();
    assert_eq!(requests.len(), 1);
    let body = requests[0].body.as_ref().unwrap();
    assert_eq!(body["currency"], "BRL");
    assert_eq!(body["language"], "ES");
    assert_eq!(body["paymentMethodTagName"], "PIX");
    assert_eq!(body["customer"]["country"], "BR");
    assert_eq!(body["customer"]["firstName"], "Ana");
}

#[tokio::test]
async fn test_production_tags_fetched_once() {
    let dir = tempfile::tempdir().unwrap();
    let br = CountryClient::with_client(
        client(
            Environment::Production,
            &dir.path().join("h2h.json"),
            vec![
                json(200, methods_list()),
                json(201, json!({"id": "tx-1", "status": "PENDING"})),
                json(200, json!({"qrCode": "abc"})),
                json(201, json!({"id": "tx-2", "status": "FAILED"})),
            ],
        ),
        Country::Br,
    );

    let first = br
        .create_transaction(params().with_payment_method_tag("PIX"))
        .await
        .unwrap();
    assert_eq!(first["h2h"]["qrCode"], "abc");

    let second = br
        .create_transaction(params().with_payment_method_tag("BOLETO"))
        .await
        .unwrap();
    assert_eq!(second["status"], "FAILED");

    let requests = br.client().transport().requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[0].url.ends_with("/paymentMethods"));
    assert_eq!(
        requests[0].query,
        [
            ("country".to_string(), "BR".to_string()),
            ("currency".to_string(), "BRL".to_string()),
        ]
    );
    assert!(requests[3].url.ends_with("/transactions"));
}

#[tokio::test]
async fn test_production_rejects_inactive_tag_with_sorted_list() {
    let dir = tempfile::tempdir().unwrap();
    let br = CountryClient::with_client(
        client(
            Environment::Production,
            &dir.path().join("h2h.json"),
            vec![json(200, methods_list())],
        ),
        Country::Br,
    );

    for _ in 0..2 {
        let err = br
            .create_transaction(params().with_payment_method_tag("CARD"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("Active methods for BR are: BOLETO, PIX"));
    }
    assert_eq!(br.client().transport().calls(), 1);
}

#[tokio::test]
async fn test_failed_tag_fetch_is_retried_on_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let br = CountryClient::with_client(
        client(
            Environment::Production,
            &dir.path().join("h2h.json"),
            vec![
                text(403, r#"{"code":"FORBIDDEN","message":"no access"}"#),
                json(200, methods_list()),
            ],
        ),
        Country::Br,
    );

    let err = br.validate_payment_method_tag(Some("PIX")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);

    let tag = br.validate_payment_method_tag(Some("PIX")).await.unwrap();
    assert_eq!(tag, "PIX");
    assert_eq!(br.client().transport().calls(), 2);
}

#[tokio::test]
async fn test_paywall_uses_default_currency_without_tag_check() {
    let dir = tempfile::tempdir().unwrap();
    let pe = CountryClient::with_client(
        client(
            Environment::Sandbox,
            &dir.path().join("h2h.json"),
            vec![json(201, json!({"uid": "pw-1"}))],
        ),
        Country::Pe,
    );

    let mut paywall = PaywallParams::new(
        "80.00",
        "Subscription",
        "sub-1",
        "https://shop.example.com/webhook",
        "buyer@example.com",
    );
    paywall.payment_channel_type_code = Some("ONLINE".into());
    paywall.return_url = Some("https://shop.example.com/done".into());

    let resp = pe.create_paywall(paywall).await.unwrap();
    assert_eq!(resp["uid"], "pw-1");

    let requests = pe.client().transport().requests();
    let body = requests[0].body.as_ref().unwrap();
    assert!(requests[0].url.ends_with("/paywalls"));
    assert_eq!(body["currency"], "PEN");
    assert_eq!(body["paymentChannelTypeCode"], "ONLINE");
    assert_eq!(body["returnUrl"], "https://shop.example.com/done");
    assert_eq!(body["customer"]["country"], "PE");
    assert!(body["customer"].get("firstName").is_none());
}

#[tokio::test]
async fn test_payment_methods_default_to_country() {
    let dir = tempfile::tempdir().unwrap();
    let co = CountryClient::with_client(
        client(
            Environment::Sandbox,
            &dir.path().join("h2h.json"),
            vec![json(200, json!({"list": []})), json(200, json!({"list": []}))],
        ),
        Country::Co,
    );

    co.get_payment_methods(None, None, None).await.unwrap();

    let requests = co.client().transport().requests();
    assert_eq!(
        requests[0].query,
        [
            ("country".to_string(), "CO".to_string()),
            ("currency".to_string(), "COP".to_string()),
        ]
    );

    co.get_payment_methods(Some(Country::Pe), None, Some("ONLINE"))
        .await
        .unwrap();
    let requests = co.client().transport().requests();
    assert_eq!(
        requests[1].query,
        [
            ("country".to_string(), "PE".to_string()),
            ("currency".to_string(), "COP".to_string()),
            ("channel".to_string(), "ONLINE".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_extra_payer_fields_reach_the_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let br = CountryClient::with_client(
        client(
            Environment::Sandbox,
            &dir.path().join("h2h.json"),
            vec![json(201, json!({"id": "tx-1", "status": "PENDING"}))],
        ),
        Country::Br,
    );

    let params = TransactionParams::new(
        "10.00",
        "Order 8",
        "order-8",
        "https://shop.example.com/webhook",
        "buyer@example.com",
    )
    .with_payer(PayerDetails {
        zip_code: Some("01310-100".into()),
        device_id: Some("device-42".into()),
        ip: Some("203.0.113.7".into()),
        ..PayerDetails::default()
    })
    .with_payment_method_tag("PIX");
    br.create_transaction(params).await.unwrap();

    let requests = br.client().transport().requests();
    let customer = &requests[0].body.as_ref().unwrap()["customer"];
    assert_eq!(customer["zip"], "01310-100");
    assert_eq!(customer["deviceId"], "device-42");
    assert_eq!(customer["ip"], "203.0.113.7");
    assert_eq!(customer["country"], "BR");
}
