//! The HTTP operation engine: turns an `OperationSpec` and a caller-supplied
//! options map into a real request, and classifies the response.
//!
//! Grounded on `alloy-transport::http_client`'s `post_json` closure for the
//! "one reqwest client, Basic auth, map below-HTTP failures into
//! `HostIsNotReachable`" shape. Path/query/body binding and response
//! classification have no teacher analogue and are written directly from
//! `spec.md` §4.2.

use std::collections::HashSet;

use ari_core::resource::{OperationOutcome, ResourceKind};
use ari_core::schema::{OperationSpec, ParamLocation, ResponseKind};
use ari_core::{ClientError, ClientResult, Connection};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Client as HttpClient;
use serde_json::{Map, Value};
use tracing::trace;

/// The model name ARI uses for the channel-variables container; a `body`
/// parameter of this model is wrapped as `{"variables": {...}}` rather than
/// merged flat into the request body (§4.2).
const VARIABLES_MODEL: &str = "Variables";

/// Invokes one operation: builds the request from `spec` and `options`,
/// sends it, and classifies the response.
pub async fn invoke(
    http: &HttpClient,
    connection: &Connection,
    spec: &OperationSpec,
    options: &Map<String, Value>,
) -> ClientResult<OperationOutcome> {
    validate_required(spec, options)?;

    let path = substitute_path(spec, options)?;
    let url = format!("{}{}", connection.rest_base_url(), path);

    let mut req = match spec.method {
        ari_core::schema::HttpMethod::Get => http.get(&url),
        ari_core::schema::HttpMethod::Post => http.post(&url),
        ari_core::schema::HttpMethod::Put => http.put(&url),
        ari_core::schema::HttpMethod::Delete => http.delete(&url),
    };
    req = req.basic_auth(&connection.user, Some(&connection.secret));

    let query = collect_query(spec, options);
    if !query.is_empty() {
        req = req.query(&query);
    }

    if let Some(body) = collect_body(spec, options) {
        req = req.json(&body);
    }

    trace!(url = %url, method = ?spec.method, "invoking ARI operation");

    let resp = req
        .send()
        .await
        .map_err(|e| ClientError::HostIsNotReachable { cause: e.to_string() })?;

    classify_response(spec, resp).await
}

fn validate_required(spec: &OperationSpec, options: &Map<String, Value>) -> ClientResult<()> {
    for param in &spec.params {
        if param.required && !options.contains_key(&param.name) {
            return Err(ClientError::Operation(format!(
                "missing required parameter `{}` for operation `{}`",
                param.name, spec.name
            )));
        }
    }
    Ok(())
}

fn substitute_path(spec: &OperationSpec, options: &Map<String, Value>) -> ClientResult<String> {
    let placeholders = spec.path_placeholders();
    let mut path = spec.path.clone();
    for name in &placeholders {
        let value = options
            .get(name)
            .ok_or_else(|| ClientError::Operation(format!(
                "missing path parameter `{name}` for operation `{}`",
                spec.name
            )))?;
        let raw = value_to_path_segment(value);
        let encoded = utf8_percent_encode(&raw, NON_ALPHANUMERIC).to_string();
        path = path.replace(&format!("{{{name}}}"), &encoded);
    }
    Ok(path)
}

fn value_to_path_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn collect_query(spec: &OperationSpec, options: &Map<String, Value>) -> Vec<(String, String)> {
    spec.params
        .iter()
        .filter(|p| p.location == ParamLocation::Query)
        .filter_map(|p| options.get(&p.name).map(|v| (p.name.clone(), value_to_path_segment(v))))
        .collect()
}

fn collect_body(spec: &OperationSpec, options: &Map<String, Value>) -> Option<Value> {
    let body_params: Vec<_> = spec.params.iter().filter(|p| p.location == ParamLocation::Body).collect();
    if body_params.is_empty() {
        return None;
    }

    let mut body = Map::new();
    for param in body_params {
        let Some(value) = options.get(&param.name) else {
            continue;
        };
        if param.datatype.model_name() == Some(VARIABLES_MODEL) {
            let mut wrapper = Map::new();
            wrapper.insert("variables".to_string(), value.clone());
            for (k, v) in wrapper {
                body.insert(k, v);
            }
        } else {
            body.insert(param.name.clone(), value.clone());
        }
    }

    if body.is_empty() {
        None
    } else {
        Some(Value::Object(body))
    }
}

async fn classify_response(spec: &OperationSpec, resp: reqwest::Response) -> ClientResult<OperationOutcome> {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(ClientError::Operation(extract_error_message(&text)));
    }

    if text.trim().is_empty() {
        return Ok(OperationOutcome::None);
    }

    let value: Value = serde_json::from_str(&text).map_err(|e| ClientError::Operation(format!(
        "could not parse response body for `{}`: {e}",
        spec.name
    )))?;

    Ok(match &spec.response {
        ResponseKind::None => OperationOutcome::None,
        ResponseKind::Primitive(_) => OperationOutcome::Value(value),
        ResponseKind::Model(model) => match ResourceKind::from_model_name(model) {
            Some(kind) => OperationOutcome::Instance(kind, value),
            None => OperationOutcome::Value(value),
        },
        ResponseKind::ListOfModel(model) => match ResourceKind::from_model_name(model) {
            Some(kind) => {
                let items = value.as_array().cloned().unwrap_or_default();
                OperationOutcome::List(kind, items)
            }
            None => OperationOutcome::Value(value),
        },
    })
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Placeholder names an operation's path uses, kept here so callers building
/// an `InstanceArgs`-derived options map can check which identity aliases an
/// operation expects without parsing the path template themselves.
pub fn path_placeholder_set(spec: &OperationSpec) -> HashSet<String> {
    spec.path_placeholders().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ari_core::schema::{DataType, HttpMethod, ParamSpec};

    fn spec_with(path: &str, params: Vec<ParamSpec>, response: ResponseKind) -> OperationSpec {
        OperationSpec {
            name: "test".to_string(),
            method: HttpMethod::Post,
            path: path.to_string(),
            params,
            response,
        }
    }

    #[test]
    fn variables_param_wraps_in_variables_key() {
        let spec = spec_with(
            "/channels",
            vec![ParamSpec {
                name: "variables".to_string(),
                location: ParamLocation::Body,
                required: false,
                datatype: DataType::Model("Variables".to_string()),
                description: String::new(),
            }],
            ResponseKind::None,
        );
        let mut options = Map::new();
        let mut vars = Map::new();
        vars.insert("CALLERID(name)".to_string(), Value::String("Alice".to_string()));
        options.insert("variables".to_string(), Value::Object(vars));

        let body = collect_body(&spec, &options).unwrap();
        assert_eq!(body["variables"]["CALLERID(name)"], "Alice");
    }

    #[test]
    fn path_substitution_percent_encodes_segment() {
        let spec = spec_with("/endpoints/{tech}/{resource}", vec![], ResponseKind::None);
        let mut options = Map::new();
        options.insert("tech".to_string(), Value::String("PJSIP".to_string()));
        options.insert("resource".to_string(), Value::String("soft phone".to_string()));

        let path = substitute_path(&spec, &options).unwrap();
        assert_eq!(path, "/endpoints/PJSIP/soft%20phone");
    }

    #[test]
    fn missing_required_param_errors_before_request() {
        let spec = spec_with(
            "/bridges/{bridgeId}",
            vec![ParamSpec {
                name: "bridgeId".to_string(),
                location: ParamLocation::Path,
                required: true,
                datatype: DataType::Primitive("string".to_string()),
                description: String::new(),
            }],
            ResponseKind::None,
        );
        let err = validate_required(&spec, &Map::new()).unwrap_err();
        assert!(matches!(err, ClientError::Operation(_)));
    }

    #[test]
    fn error_message_extracted_from_json_body() {
        assert_eq!(extract_error_message(r#"{"message":"Bridge not found"}"#), "Bridge not found");
        assert_eq!(extract_error_message("plain text"), "plain text");
    }
}
