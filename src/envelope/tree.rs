//! Converts an XML document into a loose JSON tree.
//!
//! Element names keep the prefix they were written with (`soap:Body`,
//! `soap12:Body`, bare `GetHat_jsonResponse`). Attributes are dropped, a
//! text-only element becomes a string and repeated siblings become an array.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use crate::error::UpstreamError;

/// Parses `xml` and returns `{ "<root name>": <root contents> }`.
pub fn xml_to_value(xml: &str) -> Result<Value, UpstreamError> {
    let doc = Document::parse(xml).map_err(|e| UpstreamError::MalformedPayload(e.to_string()))?;
    let root = doc.root_element();

    let mut top = Map::new();
    top.insert(qualified_name(root), element_value(root));
    Ok(Value::Object(top))
}

fn qualified_name(node: Node) -> String {
    let name = node.tag_name();
    let prefix = name
        .namespace()
        .and_then(|ns| node.lookup_prefix(ns))
        .filter(|p| !p.is_empty());

    match prefix {
        Some(p) => format!("{p}:{}", name.name()),
        None => name.name().to_string(),
    }
}

fn element_value(node: Node) -> Value {
    let children: Vec<Node> = node.children().filter(|c| c.is_element()).collect();

    if children.is_empty() {
        let text: String = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect();
        return Value::String(text);
    }

    let mut map = Map::new();
    for child in children {
        let key = qualified_name(child);
        let value = element_value(child);
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefixes_are_kept() {
        let xml = r#"<?xml version="1.0"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body><PingResponse xmlns="http://tempuri.org/"><PingResult>ok</PingResult></PingResponse></soap:Body>
</soap:Envelope>"#;
        let tree = xml_to_value(xml).unwrap();
        assert_eq!(
            tree,
            json!({"soap:Envelope": {"soap:Body": {"PingResponse": {"PingResult": "ok"}}}})
        );
    }

    #[test]
    fn test_entities_are_unescaped() {
        let xml = r#"<R><V>[{&quot;a&quot;:1}]</V></R>"#;
        let tree = xml_to_value(xml).unwrap();
        assert_eq!(tree["R"]["V"], json!("[{\"a\":1}]"));
    }

    #[test]
    fn test_repeated_children_become_array() {
        let tree = xml_to_value("<R><I>1</I><I>2</I><I>3</I></R>").unwrap();
        assert_eq!(tree["R"]["I"], json!(["1", "2", "3"]));
    }

    #[test]
    fn test_invalid_xml_is_malformed() {
        let err = xml_to_value("<R><unclosed></R>").unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedPayload(_)));
    }
}
