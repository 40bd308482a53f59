//! Request envelopes for the legacy remote-call protocol, and result
//! extraction from the loosely shaped envelopes it sends back.

mod tree;

pub use tree::xml_to_value;

use serde_json::Value;

/// Envelope dialect used when building requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapVersion {
    #[default]
    V11,
    V12,
}

impl SoapVersion {
    fn prefix(self) -> &'static str {
        match self {
            SoapVersion::V11 => "soap",
            SoapVersion::V12 => "soap12",
        }
    }

    fn namespace(self) -> &'static str {
        match self {
            SoapVersion::V11 => "http://schemas.xmlsoap.org/soap/envelope/",
            SoapVersion::V12 => "http://www.w3.org/2003/05/soap-envelope",
        }
    }

    /// `Content-Type` header value for a request body in this dialect.
    pub fn content_type(self) -> &'static str {
        match self {
            SoapVersion::V11 => "text/xml; charset=utf-8",
            SoapVersion::V12 => "application/soap+xml; charset=utf-8",
        }
    }
}

/// Builds the request envelope for `method`.
///
/// Parameter values are inserted verbatim. The upstream expects them
/// unescaped, so callers must not pass markup.
pub fn build_envelope(
    version: SoapVersion,
    namespace: &str,
    method: &str,
    params: &[(&str, &str)],
) -> String {
    let prefix = version.prefix();
    let params_xml: String = params
        .iter()
        .map(|(k, v)| format!("<{k}>{v}</{k}>"))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<{prefix}:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:{prefix}="{soap_ns}">
  <{prefix}:Body>
    <{method} xmlns="{namespace}">{params_xml}</{method}>
  </{prefix}:Body>
</{prefix}:Envelope>"#,
        soap_ns = version.namespace(),
    )
}

/// The response layouts seen in the wild, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `soap:Envelope` / `soap:Body`
    Soap11,
    /// `soap12:Envelope` / `soap12:Body`
    Soap12,
    /// Any root element holding a `soap:Body` or `soap12:Body`.
    AnyRootPrefixedBody,
    /// Any root element holding a child whose name contains "body".
    BodyScan,
}

impl EnvelopeShape {
    pub const ORDER: [EnvelopeShape; 4] = [
        EnvelopeShape::Soap11,
        EnvelopeShape::Soap12,
        EnvelopeShape::AnyRootPrefixedBody,
        EnvelopeShape::BodyScan,
    ];

    fn body<'a>(self, tree: &'a Value) -> Option<&'a Value> {
        match self {
            EnvelopeShape::Soap11 => tree.get("soap:Envelope")?.get("soap:Body"),
            EnvelopeShape::Soap12 => tree.get("soap12:Envelope")?.get("soap12:Body"),
            EnvelopeShape::AnyRootPrefixedBody => {
                let root = first_value(tree)?;
                root.get("soap:Body").or_else(|| root.get("soap12:Body"))
            }
            EnvelopeShape::BodyScan => {
                let root = first_value(tree)?.as_object()?;
                root.iter()
                    .find(|(k, _)| k.to_lowercase().contains("body"))
                    .map(|(_, v)| v)
            }
        }
    }

    /// Returns the payload of `method` if the tree has this shape.
    pub fn extract(self, tree: &Value, method: &str) -> Option<Value> {
        let response = self.body(tree)?.get(format!("{method}Response"))?;
        let result = response
            .get(format!("{method}Result"))
            .unwrap_or(response);
        Some(result.clone())
    }
}

/// Extracts the result payload of `method` from a parsed response envelope.
///
/// Returns the first match in [`EnvelopeShape::ORDER`], or `None` when no
/// shape fits. `None` means "no data", not failure. The payload is returned
/// undecoded: it may still be JSON text.
pub fn extract_result(tree: &Value, method: &str) -> Option<Value> {
    extract_with_shape(tree, method).map(|(_, payload)| payload)
}

/// Like [`extract_result`], also reporting which shape matched.
pub fn extract_with_shape(tree: &Value, method: &str) -> Option<(EnvelopeShape, Value)> {
    EnvelopeShape::ORDER
        .iter()
        .find_map(|shape| shape.extract(tree, method).map(|p| (*shape, p)))
}

fn first_value(tree: &Value) -> Option<&Value> {
    tree.as_object()?.values().next()
}
