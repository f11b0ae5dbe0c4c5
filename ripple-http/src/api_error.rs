//! The parsed shape of a Discord REST error response body.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

use serde::{de::Error as DeError, Deserialize, Deserializer};
use serde_json::Value;

/// A non-success REST response body: `{"code", "message", "errors"?}`.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiError {
    /// Discord's numeric error code (distinct from the HTTP status).
    pub code: u64,
    /// Human-readable summary of the error.
    pub message: String,
    /// Field-level validation detail, present on `50035`-style responses.
    #[serde(default)]
    pub errors: Option<ErrorNode>,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "{} ({})", self.message, self.code)?;

        if let Some(ErrorNode::Interior(fields)) = &self.errors {
            for (name, node) in fields {
                node.render(name, 0, f)?;
            }
        }

        Ok(())
    }
}

/// One leaf validation failure: `{"code", "message"}` (both strings, unlike
/// the numeric top-level [`ApiError::code`]).
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorDetail {
    /// Discord's symbolic validation error code, e.g. `"BASE_TYPE_REQUIRED"`.
    pub code: String,
    /// Human-readable detail for this specific field.
    pub message: String,
}

/// A node in the recursive field-error tree Discord returns for validation
/// failures: either a leaf carrying one or more [`ErrorDetail`]s, or an
/// interior node mapping child field names to further nodes.
#[derive(Clone, Debug)]
pub enum ErrorNode {
    /// `{"_errors": [...]}`
    Leaf(Vec<ErrorDetail>),
    /// A map of field name to nested node.
    Interior(BTreeMap<String, ErrorNode>),
}

impl ErrorNode {
    fn render(&self, name: &str, indent: usize, f: &mut Formatter<'_>) -> FmtResult {
        let pad = "  ".repeat(indent);

        match self {
            Self::Leaf(details) => {
                for detail in details {
                    writeln!(f, "{pad}\"{name}\" {} ({})", detail.message, detail.code)?;
                }
            }
            Self::Interior(fields) => {
                writeln!(f, "{pad}In \"{name}\":")?;

                for (child_name, node) in fields {
                    node.render(child_name, indent + 1, f)?;
                }
            }
        }

        Ok(())
    }
}

impl<'de> Deserialize<'de> for ErrorNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

impl ErrorNode {
    fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut map) = value else {
            return Err("expected a JSON object for an error node".to_owned());
        };

        if let Some(errors) = map.remove("_errors") {
            let details: Vec<ErrorDetail> =
                serde_json::from_value(errors).map_err(|e| e.to_string())?;
            return Ok(Self::Leaf(details));
        }

        let mut fields = BTreeMap::new();

        for (key, child) in map {
            fields.insert(key, Self::from_value(child)?);
        }

        Ok(Self::Interior(fields))
    }
}
