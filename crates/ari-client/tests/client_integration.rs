//! Integration tests for the client facade against an in-process mock ARI
//! server, covering the schema fan-out (S1, including the `events`
//! namespace's own operations), instance auto-bind (S3, for both an
//! `id`-keyed and a `name`-keyed kind), and instance-vs-namespace request
//! equivalence (P5) testable properties.
//!
//! Grounded on `zed-industries-codex/codex-rs/core/tests/common/responses.rs`
//! for the `wiremock` usage shape; the fixture documents themselves are
//! written directly against the Swagger 1.2-style shape `ari-transport`'s
//! schema loader expects.

use ari_core::resource::InstanceArgs;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOURCE_NAMES: &[&str] = &[
    "asterisk",
    "applications",
    "bridges",
    "channels",
    "deviceStates",
    "endpoints",
    "events",
    "mailboxes",
    "playbacks",
    "recordings",
    "sounds",
];

fn bridges_doc() -> Value {
    json!({
        "apis": [
            {
                "path": "/bridges",
                "operations": [
                    {
                        "nickname": "create",
                        "httpMethod": "POST",
                        "responseClass": "Bridge",
                        "parameters": [
                            { "name": "type", "paramType": "query", "required": false, "dataType": "string" },
                            { "name": "bridgeId", "paramType": "query", "required": false, "dataType": "string" }
                        ]
                    }
                ]
            },
            {
                "path": "/bridges/{bridgeId}",
                "operations": [
                    {
                        "nickname": "get",
                        "httpMethod": "GET",
                        "responseClass": "Bridge",
                        "parameters": [
                            { "name": "bridgeId", "paramType": "path", "required": true, "dataType": "string" }
                        ]
                    }
                ]
            }
        ],
        "models": {
            "Bridge": { "properties": { "id": { "type": "string" }, "bridge_type": { "type": "string" } } }
        }
    })
}

fn device_states_doc() -> Value {
    json!({
        "apis": [
            {
                "path": "/deviceStates/{deviceName}",
                "operations": [
                    {
                        "nickname": "get",
                        "httpMethod": "GET",
                        "responseClass": "DeviceState",
                        "parameters": [
                            { "name": "deviceName", "paramType": "path", "required": true, "dataType": "string" }
                        ]
                    }
                ]
            }
        ],
        "models": {
            "DeviceState": { "properties": { "name": { "type": "string" }, "state": { "type": "string" } } }
        }
    })
}

fn events_doc() -> Value {
    json!({
        "apis": [
            {
                "path": "/events/user/{eventName}",
                "operations": [
                    {
                        "nickname": "generateUserEvent",
                        "httpMethod": "POST",
                        "responseClass": "void",
                        "parameters": [
                            { "name": "eventName", "paramType": "path", "required": true, "dataType": "string" },
                            { "name": "application", "paramType": "query", "required": true, "dataType": "string" }
                        ]
                    }
                ]
            }
        ],
        "models": {
            "UserEvent": { "properties": { "eventname": { "type": "string" } } }
        }
    })
}

/// Mounts `resources.json` plus a per-resource document for every name the
/// schema loader fetches: `overrides` supplies the real fixture for names
/// under test, everything else gets an empty-but-valid `apis: []` document.
async fn mount_minimal_schema(server: &MockServer, overrides: &[(&str, Value)]) {
    let apis: Vec<Value> = RESOURCE_NAMES
        .iter()
        .map(|name| json!({ "path": format!("/{name}") }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/ari/api-docs/resources.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "apis": apis })))
        .mount(server)
        .await;

    for &name in RESOURCE_NAMES {
        let doc = overrides
            .iter()
            .find(|(override_name, _)| *override_name == name)
            .map(|(_, doc)| doc.clone())
            .unwrap_or_else(|| json!({ "apis": [] }));
        Mock::given(method("GET"))
            .and(path(format!("/ari/api-docs/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(doc))
            .mount(server)
            .await;
    }
}

fn base_url(server: &MockServer) -> String {
    server.uri()
}

/// S1 — every documented resource contributes its operation table; a client
/// connected against a server serving all eleven per-resource documents must
/// expose a working namespace for each, not just the ones the test happens
/// to exercise.
#[tokio::test]
async fn schema_fan_out_exposes_all_documented_namespaces() {
    let server = MockServer::start().await;
    mount_minimal_schema(&server, &[("bridges", bridges_doc())]).await;

    Mock::given(method("GET"))
        .and(path("/ari/bridges/known-id"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = ari_client::connect(&base_url(&server), "user", "secret").await.unwrap();

    // The bridges namespace knows about `get` (loaded from the mock doc)...
    let outcome = client.bridges().call("get", json!({ "bridgeId": "known-id" })).await;
    assert!(outcome.is_ok());

    // ...and rejects an operation the mock doc never declared, proving the
    // table came from the fetched document rather than being vacuously
    // empty or wildcard-accepting.
    let err = client.bridges().call("not_a_real_operation", json!({})).await.unwrap_err();
    assert!(matches!(err, ari_core::ClientError::Operation(_)));

    // Namespace-only resources (asterisk/applications/events) and
    // instantiable ones with an empty operation table are still callable
    // handles, just with nothing to call successfully.
    let err = client.asterisk().call("getInfo", json!({})).await.unwrap_err();
    assert!(matches!(err, ari_core::ClientError::Operation(_)));
}

/// S3 — constructing a bridge instance and calling `create` on it must bind
/// the instance's identity into the request as the `bridgeId` query
/// parameter automatically, without the caller supplying it.
#[tokio::test]
async fn instance_create_auto_binds_identity_as_query_param() {
    let server = MockServer::start().await;
    mount_minimal_schema(&server, &[("bridges", bridges_doc())]).await;

    Mock::given(method("POST"))
        .and(path("/ari/bridges"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = ari_client::connect(&base_url(&server), "user", "secret").await.unwrap();
    let bridge = client.bridge(InstanceArgs::new().id("abc-123")).unwrap();

    bridge.call("create", json!({ "type": "holding" })).await.unwrap();

    let requests = server.received_requests().await.expect("mock server should not fail");
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method.as_str(), "POST");
    let pairs: std::collections::BTreeMap<_, _> = req.url.query_pairs().into_owned().collect();
    assert_eq!(pairs.get("type").map(String::as_str), Some("holding"));
    assert_eq!(pairs.get("bridgeId").map(String::as_str), Some("abc-123"));
}

/// P5 — an instance call and a namespace call with the identity supplied
/// manually must produce the same request (method, path, query).
#[tokio::test]
async fn instance_call_matches_namespace_call_with_explicit_id() {
    let server = MockServer::start().await;
    mount_minimal_schema(&server, &[("bridges", bridges_doc())]).await;

    Mock::given(method("GET"))
        .and(path("/ari/bridges/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = ari_client::connect(&base_url(&server), "user", "secret").await.unwrap();
    let bridge = client.bridge(InstanceArgs::new().id("abc-123")).unwrap();

    bridge.call("get", json!({})).await.unwrap();
    client.bridges().call("get", json!({ "bridgeId": "abc-123" })).await.unwrap();

    let requests = server.received_requests().await.expect("mock server should not fail");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, requests[1].method);
    assert_eq!(requests[0].url.path(), requests[1].url.path());
    assert_eq!(
        requests[0].url.query_pairs().into_owned().collect::<Vec<_>>(),
        requests[1].url.query_pairs().into_owned().collect::<Vec<_>>()
    );
}

/// S1 — the `events` document's `apis[]` must feed `schema.resources` the
/// same as any other resource document, not just its `models` into
/// `schema.events`; otherwise `client.events()` can never call a real
/// operation regardless of what the server declares.
#[tokio::test]
async fn events_namespace_calls_operation_from_its_own_doc() {
    let server = MockServer::start().await;
    mount_minimal_schema(&server, &[("events", events_doc())]).await;

    Mock::given(method("POST"))
        .and(path("/ari/events/user/MyEvent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = ari_client::connect(&base_url(&server), "user", "secret").await.unwrap();

    let outcome = client
        .events()
        .call("generateUserEvent", json!({ "eventName": "MyEvent", "application": "my-app" }))
        .await;
    assert!(outcome.is_ok());
}

/// Analogous to the bridge instance-call tests, for a `name`-keyed kind
/// whose schema parameter (`deviceName`) isn't simply its identity
/// attribute (`name`).
#[tokio::test]
async fn device_state_instance_call_binds_device_name() {
    let server = MockServer::start().await;
    mount_minimal_schema(&server, &[("deviceStates", device_states_doc())]).await;

    Mock::given(method("GET"))
        .and(path("/ari/deviceStates/custom-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = ari_client::connect(&base_url(&server), "user", "secret").await.unwrap();
    let device = client.device_state(InstanceArgs::new().id("custom-1")).unwrap();

    device.call("get", json!({})).await.unwrap();

    let requests = server.received_requests().await.expect("mock server should not fail");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/ari/deviceStates/custom-1");
}
