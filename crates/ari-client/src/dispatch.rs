//! Event demultiplexer: turns one WebSocket text frame into a global
//! emission plus scoped fan-out, implementing `spec.md` §4.5 steps 1-7.
//!
//! Written directly from `spec.md` — the teacher has no schema-driven
//! promotion step to ground this against — but reuses the identity-keyed
//! routing idiom from `alloy-core::bot::BotManager` for the scoped listener
//! tables, and the emitter's snapshot-then-sweep pattern for `once` removal.

use std::collections::{HashMap, HashSet};

use ari_core::resource::{Instance, ResourceKind};
use ari_core::{ClientError, ClientResult, Promoted, RawEvent};
use serde_json::Value;
use tracing::warn;

use crate::client::Client;

/// Parses one raw frame, promotes its model-typed properties into
/// instances, emits the global event, then fans out to scoped listeners
/// and runs managed-instance cleanup.
pub(crate) fn dispatch_frame(client: &Client, text: &str) -> ClientResult<()> {
    let value: Value = serde_json::from_str(text).map_err(|e| ClientError::Protocol {
        reason: format!("malformed event frame: {e}"),
    })?;

    let event_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Protocol {
            reason: "event frame missing `type`".to_string(),
        })?
        .to_string();

    let promoted = promote_properties(client, &event_type, &value);

    let raw = RawEvent::new(event_type.clone(), value);
    client.0.global_emitter.emit_and_sweep((raw, promoted.clone()));

    fan_out_scoped(client, &event_type, &promoted);
    run_managed_cleanup(client, &event_type, &promoted);

    Ok(())
}

/// Builds the 0/1/many set of instances promoted from `event_type`'s
/// schema-declared properties (§4.5 step 3). A property whose declared
/// model matches one of the eight known resource kinds is promoted through
/// the resource factory; anything else is left in the raw frame only.
fn promote_properties(client: &Client, event_type: &str, value: &Value) -> Promoted {
    let Some(model) = client.0.schema.events.get(event_type) else {
        warn!(event_type, "event has no matching schema model, not promoting properties");
        return Promoted::None;
    };

    let mut instances = HashMap::new();
    for property in &model.properties {
        let Some(model_name) = property.datatype.model_name() else {
            continue;
        };
        let Some(kind) = ResourceKind::from_model_name(model_name) else {
            continue;
        };
        let Some(nested) = value.get(&property.name) else {
            continue;
        };
        if let Some(instance) = build_promoted_instance(client, kind, nested) {
            instances.insert(property.name.clone(), instance);
        }
    }

    Promoted::from_instances(instances)
}

fn build_promoted_instance(client: &Client, kind: ResourceKind, nested: &Value) -> Option<Instance> {
    let fields = nested.as_object()?.clone();
    let identity = fields.get(kind.identity_attr()).and_then(Value::as_str)?.to_string();
    Some(Instance::new(kind, identity, fields, client.weak_handle()))
}

/// Fires every scoped listener whose `(event_name, kind, identity)` matches
/// this event, de-duplicated within this one dispatch (§4.5 step 5) so a
/// listener registered on an instance that appears twice in one event's
/// properties still fires once.
fn fan_out_scoped(client: &Client, event_type: &str, promoted: &Promoted) {
    let mut fired: HashSet<(String, ResourceKind, String)> = HashSet::new();

    for instance in promoted.all() {
        let key = (event_type.to_string(), instance.kind(), instance.identity().to_string());
        if !fired.insert(key) {
            continue;
        }
        fire_instance_listeners(client, event_type, instance);
    }
}

fn fire_instance_listeners(client: &Client, event_type: &str, instance: &Instance) {
    let fire: Vec<_> = {
        let mut guard = client.0.instance_listeners.lock();
        let Some(list) = guard.get_mut(&(event_type.to_string(), instance.kind())) else {
            return;
        };
        let matching: Vec<_> = list
            .iter()
            .filter(|l| l.identity == instance.identity())
            .map(|l| (l.id, l.once, l.listener.clone()))
            .collect();
        list.retain(|l| !(l.identity == instance.identity() && l.once));
        matching
    };

    for (_, _, listener) in fire {
        listener(Value::Object(instance.fields()));
    }
}

/// Removes every scoped listener and the managed flag for `(kind,
/// identity)` when `event_type` is one of that kind's terminal events
/// (§4.5 step 7), before this dispatch returns.
fn run_managed_cleanup(client: &Client, event_type: &str, promoted: &Promoted) {
    for instance in promoted.all() {
        let kind = instance.kind();
        if !kind.terminal_events().contains(&event_type) {
            continue;
        }
        let identity = instance.identity().to_string();

        client.0.managed_instances.lock().remove(&(kind, identity.clone()));

        let mut guard = client.0.instance_listeners.lock();
        for (key, list) in guard.iter_mut() {
            if key.1 == kind {
                list.retain(|l| l.identity != identity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ari_core::schema::{DataType, EventModel, EventProperty};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_client() -> Client {
        let connection = ari_core::Connection::new(ari_core::Scheme::Http, "localhost:8088", "user", "secret");
        let mut schema = ari_core::schema::Schema::default();
        schema.events.insert(
            "StasisStart".to_string(),
            EventModel {
                name: "StasisStart".to_string(),
                properties: vec![EventProperty {
                    name: "channel".to_string(),
                    datatype: DataType::Model("Channel".to_string()),
                }],
            },
        );
        schema.events.insert(
            "StasisEnd".to_string(),
            EventModel {
                name: "StasisEnd".to_string(),
                properties: vec![EventProperty {
                    name: "channel".to_string(),
                    datatype: DataType::Model("Channel".to_string()),
                }],
            },
        );

        let inner = crate::client::test_support::build_inner(connection, schema);
        Client(Arc::new(inner))
    }

    #[test]
    fn promotes_channel_from_stasis_start() {
        let client = test_client();
        let frame = serde_json::json!({
            "type": "StasisStart",
            "application": "test-app",
            "channel": { "id": "chan-1", "name": "PJSIP/1000-000001" }
        })
        .to_string();

        dispatch_frame(&client, &frame).unwrap();
    }

    #[test]
    fn scoped_listener_fires_once_and_is_removed() {
        let client = test_client();
        let instance = client.instance(ResourceKind::Channel, ari_core::resource::InstanceArgs::new().id("chan-1")).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        instance.once(
            "StasisEnd",
            Arc::new(move |_| {
                calls2.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let frame = serde_json::json!({
            "type": "StasisEnd",
            "application": "test-app",
            "channel": { "id": "chan-1" }
        })
        .to_string();

        dispatch_frame(&client, &frame).unwrap();
        dispatch_frame(&client, &frame).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn terminal_event_clears_managed_flag() {
        let client = test_client();
        let instance = client.instance(ResourceKind::Channel, ari_core::resource::InstanceArgs::new().id("chan-1")).unwrap();
        instance.manage();
        assert!(instance.is_managed());

        let frame = serde_json::json!({
            "type": "StasisEnd",
            "application": "test-app",
            "channel": { "id": "chan-1" }
        })
        .to_string();
        dispatch_frame(&client, &frame).unwrap();

        assert!(!instance.is_managed());
    }
}
