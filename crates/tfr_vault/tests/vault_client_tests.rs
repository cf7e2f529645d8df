//! Integration tests for the Vault client against a mocked HTTP API.

use serde_json::{json, Value};
use tfr_vault::{KvData, KvSchema, KvValue, SecretRef, SecretStore, VaultClient, VaultError};
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "hvs.test-token";

async fn client(server: &MockServer) -> VaultClient {
    VaultClient::with_token(server.uri(), TOKEN).unwrap()
}

fn outputs() -> KvData {
    let mut data = KvData::new();
    data.insert("subnet_count".to_string(), KvValue::from(3i64));
    data.insert("vpc_id".to_string(), KvValue::from("vpc-0a1b2c"));
    data
}

/// Standard Vault response envelope around `data`.
fn envelope(data: Value) -> Value {
    json!({
        "request_id": "7f0c2b9e-51f4-4c1e-8f3c-0d6c1f0a9b11",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": data,
        "wrap_info": null,
        "warnings": null,
        "auth": null
    })
}

fn version_metadata(version: u64) -> Value {
    json!({
        "created_time": "2024-03-01T10:00:00.000000Z",
        "custom_metadata": null,
        "deletion_time": "",
        "destroyed": false,
        "version": version
    })
}

fn kv2_secret(data: Value, version: u64) -> Value {
    envelope(json!({ "data": data, "metadata": version_metadata(version) }))
}

fn mount(kind: &str, options: Value) -> Value {
    json!({
        "accessor": format!("{}_1a2b3c", kind),
        "config": {"default_lease_ttl": 0, "force_no_cache": false, "max_lease_ttl": 0},
        "description": "",
        "external_entropy_access": false,
        "local": false,
        "options": options,
        "seal_wrap": false,
        "type": kind
    })
}

#[tokio::test]
async fn test_approle_login_sets_token() {
    let server = MockServer::start().await;

    let mut login = envelope(Value::Null);
    login["auth"] = json!({
        "client_token": "hvs.issued",
        "accessor": "acc",
        "policies": ["default", "terraform"],
        "token_policies": ["default", "terraform"],
        "metadata": {"role_name": "tf-executor"},
        "lease_duration": 3600,
        "renewable": true,
        "entity_id": "e-1",
        "token_type": "service",
        "orphan": true
    });

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_partial_json(json!({"role_id": "role", "secret_id": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(login))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/sys/mounts"))
        .and(header("X-Vault-Token", "hvs.issued"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "terraform/": mount("kv", json!({"version": "2"})),
            "legacy/": mount("kv", json!({"version": "1"})),
            "sys/": mount("system", Value::Null)
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let client = VaultClient::authenticate(&server.uri(), "role", "secret").await.unwrap();
    let mounts = client.mounts().await.unwrap();

    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts.schema_for("terraform/creds").unwrap(), KvSchema::V2);
    assert_eq!(mounts.schema_for("legacy/creds").unwrap(), KvSchema::V1);
}

#[tokio::test]
async fn test_approle_login_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": ["invalid role or secret ID"]
        })))
        .mount(&server)
        .await;

    let result = VaultClient::authenticate(&server.uri(), "role", "bad-secret").await;

    match result {
        Err(VaultError::Auth(message)) => {
            assert!(message.contains("invalid role or secret ID"));
            assert!(!message.contains("bad-secret"));
        }
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mount_discovery_failure_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/sys/mounts"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": ["permission denied"]
        })))
        .mount(&server)
        .await;

    let result = client(&server).await.mounts().await;

    assert!(matches!(
        result,
        Err(VaultError::Api { status: 403, message }) if message == "permission denied"
    ));
}

#[tokio::test]
async fn test_v2_read_unwraps_data_envelope_and_pins_version() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/terraform/data/creds/prod-account"))
        .and(query_param("version", "4"))
        .and(header("X-Vault-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(kv2_secret(
            json!({
                "aws_access_key_id": "AKIA",
                "aws_secret_access_key": "shh",
                "region": "us-east-1",
                "bucket": "app-sre"
            }),
            4,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let secret = SecretRef::new("terraform/creds/prod-account").with_version(4);
    let data = client(&server).await.read(&secret, KvSchema::V2).await.unwrap();

    assert_eq!(data.len(), 4);
    assert_eq!(data["region"], KvValue::from("us-east-1"));
}

#[tokio::test]
async fn test_v2_unpinned_read_gets_latest() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/terraform/data/inputs"))
        .and(query_param("version", "0"))
        .respond_with(ResponseTemplate::new(400))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/terraform/data/inputs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(kv2_secret(json!({"cidr": "10.0.0.0/16"}), 9)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let data = client(&server)
        .await
        .read(&SecretRef::new("terraform/inputs").with_version(0), KvSchema::V2)
        .await
        .unwrap();

    assert_eq!(data["cidr"], KvValue::from("10.0.0.0/16"));
}

#[tokio::test]
async fn test_v1_read_is_flat() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/legacy/creds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "aws_access_key_id": "AKIA",
            "enabled": true
        }))))
        .mount(&server)
        .await;

    let secret = SecretRef::new("legacy/creds").with_version(7);
    let data = client(&server).await.read(&secret, KvSchema::V1).await.unwrap();

    assert_eq!(data["enabled"], KvValue::Bool(true));
}

#[tokio::test]
async fn test_missing_secret_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/terraform/data/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .read(&SecretRef::new("terraform/missing"), KvSchema::V2)
        .await;

    assert!(matches!(result, Err(VaultError::NotFound(p)) if p == "terraform/missing"));
}

#[tokio::test]
async fn test_empty_secret_is_schema_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/legacy/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({}))))
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .read(&SecretRef::new("legacy/empty"), KvSchema::V1)
        .await;

    assert!(matches!(result, Err(VaultError::Schema { .. })));
}

#[tokio::test]
async fn test_v2_without_envelope_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/terraform/data/flat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "aws_access_key_id": "AKIA"
        }))))
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .read(&SecretRef::new("terraform/flat"), KvSchema::V2)
        .await;

    assert!(result.is_err());
    assert!(!matches!(result, Err(VaultError::NotFound(_))));
}

#[tokio::test]
async fn test_nested_value_is_schema_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/legacy/nested"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "tags": {"team": "sre"}
        }))))
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .read(&SecretRef::new("legacy/nested"), KvSchema::V1)
        .await;

    match result {
        Err(VaultError::Schema { message, .. }) => assert!(message.contains("tags")),
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_v2_write_wraps_body_in_data_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/terraform/data/stage/outputs"))
        .and(header("X-Vault-Token", TOKEN))
        .and(body_partial_json(json!({
            "data": {"subnet_count": 3, "vpc_id": "vpc-0a1b2c"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(version_metadata(2))))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .write(&SecretRef::new("terraform/stage/outputs"), &outputs(), KvSchema::V2)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_v1_write_is_unwrapped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/terraform/stage/outputs"))
        .and(body_json(json!({"subnet_count": "3", "vpc_id": "vpc-0a1b2c"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .write(&SecretRef::new("terraform/stage/outputs"), &outputs(), KvSchema::V1)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_write_failure_reports_vault_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/terraform/data/stage/outputs"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": ["permission denied"]
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .write(&SecretRef::new("terraform/stage/outputs"), &outputs(), KvSchema::V2)
        .await;

    match result {
        Err(VaultError::Write { path, message }) => {
            assert_eq!(path, "terraform/stage/outputs");
            assert_eq!(message, "permission denied");
        }
        other => panic!("expected write error, got {:?}", other),
    }
}
