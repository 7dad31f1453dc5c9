//! Fetches and parses the Swagger 1.2-style API description ARI serves at
//! connect time, turning it into an `ari_core::Schema`.
//!
//! Grounded on `alloy-transport`'s `http_client.rs` for the "one reqwest
//! client, Basic auth, map everything below an HTTP response into
//! `ClientError::HostIsNotReachable`" shape; there is no teacher analogue
//! for parsing a self-describing API document, so the per-document parsing
//! here is written directly against `spec.md` §4.1/§3.

use std::collections::{HashMap, HashSet};

use ari_core::schema::{
    DataType, EventModel, EventProperty, HttpMethod, OperationSpec, ParamLocation, ParamSpec,
    ResponseKind, Schema,
};
use ari_core::{ClientError, ClientResult, Connection};
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::{debug, warn};

const RESOURCE_DOCS: &[&str] = &[
    "recordings",
    "bridges",
    "endpoints",
    "asterisk",
    "sounds",
    "channels",
    "playbacks",
    "deviceStates",
    "mailboxes",
    "applications",
    "events",
];

/// Fetches `resources.json` and every per-resource document it references,
/// parsing them into a full [`Schema`]. Any fetch or parse failure
/// short-circuits with `ClientError::ApiLoad` (§4.1).
pub async fn load_schema(http: &HttpClient, connection: &Connection) -> ClientResult<Schema> {
    let root_url = format!("{}/api-docs/resources.json", connection.rest_base_url());
    let root = fetch_json(http, connection, &root_url).await?;

    let apis = root
        .get("apis")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::ApiLoad {
            reason: "resources.json has no `apis` array".to_string(),
        })?;

    let mut doc_paths = HashMap::new();
    for api in apis {
        let Some(path) = api.get("path").and_then(Value::as_str) else {
            continue;
        };
        let name = path.trim_start_matches('/').to_string();
        doc_paths.insert(name, path.to_string());
    }

    let mut schema = Schema::default();
    for &name in RESOURCE_DOCS {
        let Some(path) = doc_paths.get(name) else {
            warn!(resource = name, "resources.json did not list this document, skipping");
            continue;
        };
        let doc_url = format!("{}/api-docs{}", connection.rest_base_url(), path);
        let doc = fetch_json(http, connection, &doc_url).await?;

        let known_models = collect_model_names(&doc);

        parse_resource_doc(name, &doc, &known_models, &mut schema)?;
        if name == "events" {
            parse_event_models(&doc, &known_models, &mut schema)?;
        }
    }

    Ok(schema)
}

async fn fetch_json(http: &HttpClient, connection: &Connection, url: &str) -> ClientResult<Value> {
    debug!(url, "fetching schema document");
    let resp = http
        .get(url)
        .basic_auth(&connection.user, Some(&connection.secret))
        .send()
        .await
        .map_err(|e| ClientError::HostIsNotReachable { cause: e.to_string() })?;

    if !resp.status().is_success() {
        return Err(ClientError::ApiLoad {
            reason: format!("GET {url} returned {}", resp.status()),
        });
    }

    resp.json::<Value>()
        .await
        .map_err(|e| ClientError::ApiLoad { reason: format!("{url}: {e}") })
}

fn collect_model_names(doc: &Value) -> HashSet<String> {
    doc.get("models")
        .and_then(Value::as_object)
        .map(|models| models.keys().cloned().collect())
        .unwrap_or_default()
}

fn parse_resource_doc(
    resource: &str,
    doc: &Value,
    known_models: &HashSet<String>,
    schema: &mut Schema,
) -> ClientResult<()> {
    let apis = doc.get("apis").and_then(Value::as_array).ok_or_else(|| ClientError::ApiLoad {
        reason: format!("{resource}.json has no `apis` array"),
    })?;

    let mut ops = HashMap::new();
    for api in apis {
        let path = api.get("path").and_then(Value::as_str).unwrap_or_default().to_string();
        let Some(operations) = api.get("operations").and_then(Value::as_array) else {
            continue;
        };
        for op in operations {
            let spec = parse_operation(&path, op, known_models)?;
            ops.insert(spec.name.clone(), spec);
        }
    }
    schema.resources.insert(resource.to_string(), ops);
    Ok(())
}

fn parse_operation(path: &str, op: &Value, known_models: &HashSet<String>) -> ClientResult<OperationSpec> {
    let name = op
        .get("nickname")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::ApiLoad { reason: "operation missing `nickname`".to_string() })?
        .to_string();

    let method_str = op.get("httpMethod").and_then(Value::as_str).unwrap_or_default();
    let method = HttpMethod::parse(method_str).ok_or_else(|| ClientError::ApiLoad {
        reason: format!("operation `{name}` has unrecognized httpMethod `{method_str}`"),
    })?;

    let response = op
        .get("responseClass")
        .and_then(Value::as_str)
        .map(|raw| ResponseKind::from_datatype(DataType::parse(raw, known_models)))
        .unwrap_or(ResponseKind::None);

    let mut params = Vec::new();
    if let Some(raw_params) = op.get("parameters").and_then(Value::as_array) {
        for p in raw_params {
            params.push(parse_param(p, known_models)?);
        }
    }

    Ok(OperationSpec {
        name,
        method,
        path: path.to_string(),
        params,
        response,
    })
}

fn parse_param(p: &Value, known_models: &HashSet<String>) -> ClientResult<ParamSpec> {
    let name = p
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::ApiLoad { reason: "parameter missing `name`".to_string() })?
        .to_string();
    let location_str = p.get("paramType").and_then(Value::as_str).unwrap_or_default();
    let location = ParamLocation::parse(location_str).ok_or_else(|| ClientError::ApiLoad {
        reason: format!("parameter `{name}` has unrecognized paramType `{location_str}`"),
    })?;
    let required = p.get("required").and_then(Value::as_bool).unwrap_or(false);
    let datatype_raw = p.get("dataType").and_then(Value::as_str).unwrap_or("string");
    let datatype = DataType::parse(datatype_raw, known_models);
    let description = p
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ParamSpec {
        name,
        location,
        required,
        datatype,
        description,
    })
}

fn parse_event_models(doc: &Value, known_models: &HashSet<String>, schema: &mut Schema) -> ClientResult<()> {
    let Some(models) = doc.get("models").and_then(Value::as_object) else {
        return Ok(());
    };
    for (name, model) in models {
        let mut properties = Vec::new();
        if let Some(props) = model.get("properties").and_then(Value::as_object) {
            for (prop_name, prop) in props {
                let datatype_raw = prop.get("type").or_else(|| prop.get("$ref")).and_then(Value::as_str).unwrap_or("string");
                properties.push(EventProperty {
                    name: prop_name.clone(),
                    datatype: DataType::parse(datatype_raw, known_models),
                });
            }
        }
        schema.events.insert(
            name.clone(),
            EventModel {
                name: name.clone(),
                properties,
            },
        );
    }
    Ok(())
}
