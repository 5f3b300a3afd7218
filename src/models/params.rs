use serde::Serialize;
use serde_json::{Map, Value};

/// Echo of the request parameters as seen by a handler.
#[derive(Debug, Serialize)]
pub struct ParamsEcho {
    pub query: Map<String, Value>,
    /// Decoded JSON or form body; `null` when there is none.
    pub body: Value,
}

/// Collects decoded pairs into an ordered object. Later duplicates win.
pub fn pairs_to_object<I>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}
