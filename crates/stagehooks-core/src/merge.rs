use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::error::{Component, Result, StateError};

/// Recursively merges `patch` into `target`. Objects merge key by key;
/// everything else, arrays included, replaces the target wholesale.
pub fn deep_merge(target: &mut Json, patch: Json) {
    match (target, patch) {
        (Json::Object(target), Json::Object(patch)) => {
            for (k, v) in patch {
                match target.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        target.insert(k, v);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Merges `partial` onto `current`. `current` must serialize to a JSON
/// object.
pub(crate) fn merge_onto<T>(
    component: Component,
    key: &str,
    current: Option<&T>,
    partial: Json,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let not_an_object = || StateError::NotAnObject {
        component,
        key: key.to_string(),
    };
    let current = current.ok_or_else(not_an_object)?;
    let serde_err = |source| StateError::Serde {
        component,
        key: key.to_string(),
        source,
    };

    let mut merged = serde_json::to_value(current).map_err(serde_err)?;
    if !merged.is_object() {
        return Err(not_an_object());
    }
    deep_merge(&mut merged, partial);
    serde_json::from_value(merged).map_err(serde_err)
}
