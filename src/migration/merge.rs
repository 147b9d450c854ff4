// SPDX-License-Identifier: MIT OR Apache-2.0

//! Priority merge of per-component configuration maps.

use crate::domain::EnvMap;
use crate::migration::discovery::priority_of;

/// Merges per-component maps in component priority order.
///
/// Maps are applied lowest priority first, so for a key defined by several
/// components the highest-priority definer wins. Maps of the same component
/// apply in the order given. Keys keep the position where they first appeared.
/// An empty value never replaces a non-empty one, so an unresolved reference
/// in a higher-priority component keeps the lower-priority definition.
///
/// ```
/// use unicfg::domain::EnvMap;
/// use unicfg::migration::merge;
///
/// let gateway: EnvMap = [("LOG_LEVEL", "debug")].into_iter().collect();
/// let common: EnvMap = [("LOG_LEVEL", "info"), ("APP_ENV", "test")].into_iter().collect();
///
/// let merged = merge(&[("gateway", gateway), ("common", common)]);
/// assert_eq!(merged.get("LOG_LEVEL"), Some("debug"));
/// assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["LOG_LEVEL", "APP_ENV"]);
/// ```
pub fn merge<S: AsRef<str>>(maps: &[(S, EnvMap)]) -> EnvMap {
    let mut ordered: Vec<&(S, EnvMap)> = maps.iter().collect();
    ordered.sort_by_key(|(component, _)| priority_of(component.as_ref()));

    let mut merged = EnvMap::new();
    for (component, map) in ordered {
        for (key, value) in map.iter() {
            if value.trim().is_empty() && merged.get_non_empty(key).is_some() {
                tracing::debug!("{} leaves {} empty; keeping the lower-priority value", component.as_ref(), key);
                continue;
            }
            if let Some(previous) = merged.insert(key, value) {
                if previous != value {
                    tracing::debug!("{} overrides {} from a lower-priority component", component.as_ref(), key);
                }
            }
        }
    }
    merged
}
