use serde_json::Value;

/// Outcome of a failed path lookup. The two cases matter: absent keys are
/// absorbed by soft accessors, wrong shapes always propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// A key along the path does not exist.
    Missing,
    /// A node along the path is not the expected shape.
    WrongShape,
}

/// Immutable, already-parsed token response body.
///
/// Thin wrapper over `serde_json::Value` providing path lookups. Never
/// mutated after construction; accessors compute everything on demand.
#[derive(Debug, Clone)]
pub struct RawPayload(Value);

impl RawPayload {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    pub fn root(&self) -> &Value {
        &self.0
    }

    /// Walk `path` through nested objects.
    pub fn at(&self, path: &[&str]) -> Result<&Value, Lookup> {
        let mut node = &self.0;
        for key in path {
            let map = node.as_object().ok_or(Lookup::WrongShape)?;
            node = map.get(*key).ok_or(Lookup::Missing)?;
        }
        Ok(node)
    }

    /// Lookup expecting a string leaf.
    pub fn str_at(&self, path: &[&str]) -> Result<String, Lookup> {
        self.at(path)?
            .as_str()
            .map(str::to_owned)
            .ok_or(Lookup::WrongShape)
    }

    /// Lookup expecting a list node.
    pub fn list_at(&self, path: &[&str]) -> Result<&Vec<Value>, Lookup> {
        self.at(path)?.as_array().ok_or(Lookup::WrongShape)
    }

    /// Key presence, value irrelevant. Any lookup failure counts as absent.
    pub fn contains(&self, path: &[&str]) -> bool {
        self.at(path).is_ok()
    }

    /// Key present and truthy (non-empty container/string, true, non-zero).
    pub fn truthy_at(&self, path: &[&str]) -> bool {
        self.at(path).map(is_truthy).unwrap_or(false)
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
