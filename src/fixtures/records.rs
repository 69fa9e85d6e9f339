use serde_json::{json, Value};

use crate::record::{ProjectRecord, Record};

pub fn to_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// A group project listing entry shaped like GitLab's.
pub fn project_json(id: u64, name: &str, namespace: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "path": name.to_lowercase(),
        "path_with_namespace": format!("{}/{}", namespace.to_lowercase(), name.to_lowercase()),
        "namespace": {
            "id": 1000 + id,
            "name": namespace,
            "path": namespace.to_lowercase(),
            "kind": "group",
        },
    })
}

pub fn project(id: u64, name: &str, namespace: &str) -> ProjectRecord {
    ProjectRecord::new(to_record(project_json(id, name, namespace)))
}

/// A project known only by id and name, as restored from a snapshot.
pub fn named_project(id: u64, name: &str) -> ProjectRecord {
    ProjectRecord::new(to_record(json!({ "id": id, "name": name })))
}

pub fn variable_json(key: &str, value: &str) -> Value {
    json!({
        "variable_type": "env_var",
        "key": key,
        "value": value,
        "protected": false,
        "masked": false,
        "raw": false,
        "environment_scope": "*",
    })
}

pub fn variable(key: &str, value: &str) -> Record {
    to_record(variable_json(key, value))
}
