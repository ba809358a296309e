use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::node::Node;
use crate::value::Value;

/// Document metadata entry set on roots read from several concatenated
/// documents.
pub const MULTI_DOCUMENT: &str = "multi_document";

/// Decodes bytes into a document.
pub trait Reader {
    fn read(&self, bytes: &[u8]) -> Result<Value>;
}

/// Encodes a value back into bytes.
pub trait Writer {
    fn write(&self, value: &Value) -> Result<Vec<u8>>;
}

/// Output knobs handed to writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub pretty: bool,
    pub indent: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { pretty: true, indent: 2 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonFormat {
    options: FormatOptions,
}

impl JsonFormat {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>> {
        if !self.options.pretty {
            return Ok(serde_json::to_vec(node)?);
        }
        let indent = " ".repeat(self.options.indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        node.serialize(&mut ser)?;
        Ok(out)
    }
}

impl Reader for JsonFormat {
    /// Empty input reads as `null`; several concatenated documents read as
    /// an array root tagged `multi_document`.
    fn read(&self, bytes: &[u8]) -> Result<Value> {
        let mut docs = serde_json::Deserializer::from_slice(bytes)
            .into_iter::<Node>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        match docs.len() {
            0 => Ok(Value::new(Node::Null)),
            1 => Ok(Value::new(docs.remove(0))),
            _ => {
                let root = Value::new(Node::Array(docs));
                root.document().set_metadata(MULTI_DOCUMENT, true);
                Ok(root)
            }
        }
    }
}

impl Writer for JsonFormat {
    fn write(&self, value: &Value) -> Result<Vec<u8>> {
        let node = value.to_node();
        let multi = value.is_root()
            && value.document().metadata(MULTI_DOCUMENT) == Some(Node::Bool(true));
        let mut out = Vec::new();
        match node {
            Node::Array(docs) if multi => {
                for doc in &docs {
                    out.extend(self.encode(doc)?);
                    out.push(b'\n');
                }
            }
            single => {
                out.extend(self.encode(&single)?);
                out.push(b'\n');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compact() -> JsonFormat {
        JsonFormat::new(FormatOptions { pretty: false, indent: 0 })
    }

    #[test]
    fn round_trip_keeps_key_order() {
        let input = br#"{"z":1,"a":{"y":true,"b":null}}"#;
        let value = compact().read(input).unwrap();
        let out = compact().write(&value).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"z\":1,\"a\":{\"y\":true,\"b\":null}}\n");
    }

    #[test]
    fn pretty_output_uses_indent() {
        let value = Value::new(Node::from(json!({"a": [1]})));
        let format = JsonFormat::new(FormatOptions { pretty: true, indent: 4 });
        let out = String::from_utf8(format.write(&value).unwrap()).unwrap();
        assert_eq!(out, "{\n    \"a\": [\n        1\n    ]\n}\n");
    }

    #[test]
    fn concatenated_documents() {
        let value = compact().read(b"{\"a\":1}\n{\"a\":2}").unwrap();
        assert_eq!(value.document().metadata(MULTI_DOCUMENT), Some(Node::Bool(true)));
        assert_eq!(value.to_node().to_json(), json!([{"a": 1}, {"a": 2}]));
        let out = String::from_utf8(compact().write(&value).unwrap()).unwrap();
        assert_eq!(out, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn empty_input_is_null() {
        let value = compact().read(b"  \n").unwrap();
        assert_eq!(value.to_node(), Node::Null);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: FormatOptions = serde_json::from_str(r#"{"indent": 8}"#).unwrap();
        assert_eq!(opts, FormatOptions { pretty: true, indent: 8 });
    }
}
