//! Temporary→canonical identifier reconciliation.
//!
//! Offline-created entities get a `tmp-` prefixed id; once the server
//! assigns the canonical one, every local reference must be rewritten
//! before the next queued mutation goes out. Rewrites are exact-token
//! only (path segments and JSON string values), located through the
//! `mutation_refs` index rather than substring substitution over
//! serialized bodies.

use crate::client::store::ClientStore;
use crate::errors::AppResult;
use crate::models::mutation::is_temp_id;
use serde_json::Value;
use tracing::debug;

/// Temp ids referenced by a mutation's path or body.
pub fn collect_temp_refs(path: &str, body: Option<&Value>) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for segment in path.split('/') {
        if is_temp_id(segment) && !refs.iter().any(|r| r == segment) {
            refs.push(segment.to_string());
        }
    }
    if let Some(body) = body {
        collect_from_value(body, &mut refs);
    }
    refs
}

fn collect_from_value(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if is_temp_id(s) && !refs.iter().any(|r| r == s) {
                refs.push(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_from_value(item, refs);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_from_value(item, refs);
            }
        }
        _ => {}
    }
}

/// Replace string values equal to `temp_id` anywhere in a JSON tree.
/// Returns whether anything changed.
pub fn rewrite_value(value: &mut Value, temp_id: &str, canonical_id: &str) -> bool {
    match value {
        Value::String(s) if s == temp_id => {
            *s = canonical_id.to_string();
            true
        }
        Value::Array(items) => {
            let mut changed = false;
            for item in items {
                changed |= rewrite_value(item, temp_id, canonical_id);
            }
            changed
        }
        Value::Object(map) => {
            let mut changed = false;
            for item in map.values_mut() {
                changed |= rewrite_value(item, temp_id, canonical_id);
            }
            changed
        }
        _ => false,
    }
}

fn rewrite_path(path: &str, temp_id: &str, canonical_id: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment == temp_id {
                canonical_id
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Apply a (temp, canonical) remap across the whole local store: the
/// cached entity keyed by the temp id, foreign-key fields inside other
/// cached bodies, every still-pending mutation that references it, and
/// not-yet-synced time events. Afterwards nothing pending mentions the
/// temporary id.
pub fn apply(store: &mut ClientStore, temp_id: &str, canonical_id: &str) -> AppResult<()> {
    store.rekey_entity(temp_id, canonical_id)?;

    for (id, _entity, mut body) in store.entities_mentioning(temp_id)? {
        if rewrite_value(&mut body, temp_id, canonical_id) {
            store.update_entity_body(&id, &body)?;
        }
    }

    for mutation_id in store.mutations_referencing(temp_id)? {
        if let Some(mutation) = store.load_mutation(mutation_id)? {
            let new_path = rewrite_path(&mutation.path, temp_id, canonical_id);
            let mut new_body = mutation.body;
            if let Some(body) = new_body.as_mut() {
                rewrite_value(body, temp_id, canonical_id);
            }
            let refs = collect_temp_refs(&new_path, new_body.as_ref());
            store.rewrite_mutation(mutation_id, &new_path, new_body.as_ref(), &refs)?;
        }
    }

    store.rewrite_event_refs(temp_id, canonical_id)?;

    debug!(temp_id, canonical_id, "identifier reconciled");
    Ok(())
}
