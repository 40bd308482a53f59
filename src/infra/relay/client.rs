use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::route_page::extract_ordered_stops;
use crate::error::UpstreamError;
use crate::fetch::{HttpClient, parse_url, send_text};
use crate::services::relay_api::RelayApi;
use crate::services::route_stop_source::{OrderedStop, RouteStopSource};

#[derive(Serialize)]
struct LineRequest<'a> {
    line: &'a str,
}

/// Client for the relay service: JSON endpoints plus the HTML route page.
pub struct RelayClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> RelayClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Request, UpstreamError> {
        let mut url = parse_url(&format!("{}{}", self.base_url, path))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        let mut req = reqwest::Request::new(reqwest::Method::GET, url);
        req.headers_mut().insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        req.headers_mut()
            .insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        Ok(req)
    }

    fn post_line(&self, path: &str, line: &str) -> Result<reqwest::Request, UpstreamError> {
        let url = parse_url(&format!("{}{}", self.base_url, path))?;
        let body = serde_json::to_vec(&LineRequest { line })
            .map_err(|e| UpstreamError::MalformedPayload(e.to_string()))?;

        let mut req = reqwest::Request::new(reqwest::Method::POST, url);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(body.into());
        Ok(req)
    }

    async fn json(&self, req: reqwest::Request) -> Result<Value, UpstreamError> {
        let text = send_text(&self.http, req).await?;
        serde_json::from_str(&text).map_err(|e| UpstreamError::MalformedPayload(e.to_string()))
    }
}

#[async_trait]
impl<C: HttpClient> RelayApi for RelayClient<C> {
    #[tracing::instrument(skip(self))]
    async fn line_vehicles(&self, line: &str) -> Result<Value, UpstreamError> {
        self.json(self.post_line("/line-vehicles", line)?).await
    }

    #[tracing::instrument(skip(self))]
    async fn line_suggestions(&self, query: &str) -> Result<Value, UpstreamError> {
        self.json(self.get("/api/line-suggestions", &[("q", query)])?)
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn line_information(&self, line: &str) -> Result<Value, UpstreamError> {
        self.json(self.post_line("/line-information", line)?).await
    }
}

#[async_trait]
impl<C: HttpClient> RouteStopSource for RelayClient<C> {
    #[tracing::instrument(skip(self))]
    async fn fetch_ordered_stops(&self, line: &str) -> Result<Vec<OrderedStop>, UpstreamError> {
        let req = self.get("/api/route-stations", &[("hatkod", line), ("langid", "1")])?;
        let html = send_text(&self.http, req).await?;
        let stops = extract_ordered_stops(&html);
        debug!(count = stops.len(), "Route page stops extracted");
        Ok(stops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use std::time::Duration;

    fn client() -> RelayClient<BasicClient> {
        let http = BasicClient::new(Duration::from_secs(10)).unwrap();
        RelayClient::new(http, "https://relay.example/")
    }

    #[test]
    fn test_get_encodes_query() {
        let req = client()
            .get("/api/line-suggestions", &[("q", "kadıköy 34")])
            .unwrap();
        assert_eq!(req.url().path(), "/api/line-suggestions");
        let pairs: Vec<(String, String)> = req.url().query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("q".to_string(), "kadıköy 34".to_string())]);
    }

    #[test]
    fn test_post_line_sends_json_body() {
        let req = client().post_line("/line-vehicles", "34").unwrap();
        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.url().as_str(), "https://relay.example/line-vehicles");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"line":"34"}"#);
    }
}
