//! Configuration snapshots as seen by a binary that enables `preserve_order`.

use serde_json::Value;
use strata_core::{Credentials, Secret, StackConfig};

fn assert_sorted(value: &Value, at: &str) {
    match value {
        Value::Object(map) => {
            let keys: Vec<&String> = map.keys().collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted, "keys out of order at {at}");
            for (key, child) in map {
                assert_sorted(child, &format!("{at}.{key}"));
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                assert_sorted(item, &format!("{at}[{i}]"));
            }
        }
        _ => {}
    }
}

#[test]
fn dump_sorts_every_object() {
    let config = StackConfig::new()
        .with_debug_mode(true)
        .with_credentials(Credentials::StaticKeys {
            access_key_id: "AKIA".to_string(),
            secret_access_key: Secret::new("super-secret"),
        });

    let dump = config.dump();

    assert_sorted(&dump, "$");
    assert_eq!(dump["credentials"]["access_key_id"], "AKIA");
    assert!(!dump.to_string().contains("super-secret"));
}

#[test]
fn dump_text_is_stable() {
    let first = StackConfig::new().with_region("eu-west-1").dump().to_string();
    let second = StackConfig::new().with_region("eu-west-1").dump().to_string();
    assert_eq!(first, second);
    assert!(first.starts_with(r#"{"build":{"debug":"#));
}
