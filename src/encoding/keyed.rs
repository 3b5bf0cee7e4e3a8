//! The timestamp-keyed layout older consumers expect:
//!
//! ```json
//! { "2026-10-19T09:41:07.125Z": { "objNum": 1, "timestamp": "...", ... } }
//! ```

use log::warn;
use serde_json::{Map, Value};

use crate::error::EncodeError;
use crate::models::Sample;

/// Builds the keyed object. Keys sort in time order; when two samples share
/// a millisecond the later one wins.
pub fn to_keyed_map(samples: &[Sample]) -> Result<Map<String, Value>, EncodeError> {
    let mut map = Map::new();
    let mut collisions = 0usize;

    for sample in samples {
        let value = serde_json::to_value(sample)?;
        if map.insert(sample.timestamp.clone(), value).is_some() {
            collisions += 1;
        }
    }

    if collisions > 0 {
        warn!("{collisions} sample(s) shared a timestamp key and were overwritten");
    }

    Ok(map)
}

/// Parses the keyed object back into samples ordered by `objNum`.
pub fn from_keyed_map(map: Map<String, Value>) -> Result<Vec<Sample>, EncodeError> {
    let mut samples = map
        .into_iter()
        .map(|(_, value)| serde_json::from_value::<Sample>(value))
        .collect::<Result<Vec<_>, _>>()?;
    samples.sort_by_key(|sample| sample.obj_num);
    Ok(samples)
}
