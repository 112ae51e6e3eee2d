use serde_yaml::Value;

/// Parsed configuration document. Map fields keep document order, which
/// later drives overwrite semantics when flattened keys collide.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Scalar(String),
    Seq(Vec<ConfigNode>),
    Map(Vec<(String, ConfigNode)>)
}

impl ConfigNode {
    /// Converts a parsed document into a node tree. Returns `None` for a
    /// document that is nothing but null (empty file, comments only).
    pub fn from_document(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Some(Self::from_value(other))
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Scalar("null".to_string()),
            Value::Bool(b) => Self::Scalar(b.to_string()),
            Value::Number(n) => Self::Scalar(n.to_string()),
            Value::String(s) => Self::Scalar(s.clone()),
            Value::Sequence(items) => Self::Seq(items.iter().map(Self::from_value).collect()),
            Value::Mapping(fields) => Self::Map(
                fields
                    .iter()
                    .map(|(key, value)| (scalar_key(key), Self::from_value(value)))
                    .collect()
            ),
            Value::Tagged(tagged) => Self::from_value(&tagged.value)
        }
    }

    /// Depth-first flattening into (key, value) pairs. Keys join the field
    /// path onto `prefix` with `/`; sequence elements use their index as
    /// the path segment.
    pub fn flatten(&self, prefix: &str) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        self.flatten_into(prefix, &mut entries);
        entries
    }

    fn flatten_into(&self, prefix: &str, entries: &mut Vec<(String, String)>) {
        match self {
            Self::Scalar(value) => entries.push((prefix.to_string(), value.clone())),
            Self::Seq(items) => {
                for (index, item) in items.iter().enumerate() {
                    item.flatten_into(&format!("{prefix}/{index}"), entries);
                }
            }
            Self::Map(fields) => {
                for (key, value) in fields {
                    value.flatten_into(&format!("{prefix}/{key}"), entries);
                }
            }
        }
    }
}

fn scalar_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }
}
