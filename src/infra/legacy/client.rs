use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{SoapVersion, build_envelope, extract_with_shape, xml_to_value};
use crate::error::UpstreamError;
use crate::fetch::{HttpClient, parse_url, send_text};
use crate::services::legacy_api::{LegacyApi, Operation};

pub const DEFAULT_NAMESPACE: &str = "http://tempuri.org/";

/// [`LegacyApi`] over HTTP, posting envelopes to `<base_url>/<service>`.
pub struct SoapClient<C> {
    http: C,
    base_url: String,
    namespace: String,
    version: SoapVersion,
}

impl<C: HttpClient> SoapClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            version: SoapVersion::default(),
        }
    }

    pub fn with_version(mut self, version: SoapVersion) -> Self {
        self.version = version;
        self
    }

    fn request(&self, op: &Operation, params: &[(&str, &str)]) -> Result<reqwest::Request, UpstreamError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), op.service);
        let body = build_envelope(self.version, &self.namespace, op.method, params);

        let mut req = reqwest::Request::new(reqwest::Method::POST, parse_url(&url)?);
        let headers = req.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(self.version.content_type()),
        );
        if self.version == SoapVersion::V11 {
            let action = format!("\"{}{}\"", self.namespace, op.method);
            let action = HeaderValue::from_str(&action)
                .map_err(|e| UpstreamError::Unreachable(format!("bad SOAPAction header: {e}")))?;
            headers.insert("SOAPAction", action);
        }
        *req.body_mut() = Some(body.into());
        if let Some(timeout) = op.timeout {
            *req.timeout_mut() = Some(timeout);
        }
        Ok(req)
    }
}

#[async_trait]
impl<C: HttpClient> LegacyApi for SoapClient<C> {
    #[tracing::instrument(skip(self, params), fields(method = op.method))]
    async fn call(
        &self,
        op: &Operation,
        params: &[(&str, &str)],
    ) -> Result<Option<Value>, UpstreamError> {
        let req = self.request(op, params)?;
        let text = send_text(&self.http, req).await?;
        let tree = xml_to_value(&text)?;

        match extract_with_shape(&tree, op.method) {
            Some((shape, payload)) => {
                debug!(?shape, "Envelope result extracted");
                Ok(Some(payload))
            }
            None => {
                warn!("Response envelope has no recognisable result");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use std::time::Duration;

    fn client(version: SoapVersion) -> SoapClient<BasicClient> {
        let http = BasicClient::new(Duration::from_secs(10)).unwrap();
        SoapClient::new(http, "https://legacy.example/iett/").with_version(version)
    }

    #[test]
    fn test_request_targets_service_path() {
        let req = client(SoapVersion::V11)
            .request(&Operation::LINES, &[("HatKodu", "")])
            .unwrap();
        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(
            req.url().as_str(),
            "https://legacy.example/iett/UlasimAnaVeri/HatDurakGuzergah.asmx"
        );
        assert_eq!(
            req.headers()["SOAPAction"],
            "\"http://tempuri.org/GetHat_json\""
        );
        assert_eq!(req.headers()[CONTENT_TYPE], "text/xml; charset=utf-8");
    }

    #[test]
    fn test_request_applies_operation_timeout() {
        let req = client(SoapVersion::V11)
            .request(&Operation::STOPS, &[("DurakKodu", "")])
            .unwrap();
        assert_eq!(req.timeout(), Some(&Duration::from_secs(30)));
    }

    #[test]
    fn test_soap12_request_has_no_action_header() {
        let req = client(SoapVersion::V12)
            .request(&Operation::LINES, &[])
            .unwrap();
        assert!(req.headers().get("SOAPAction").is_none());
        assert_eq!(
            req.headers()[CONTENT_TYPE],
            "application/soap+xml; charset=utf-8"
        );
    }
}
