use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use transit_proxy::config::Settings;
use transit_proxy::error::UpstreamError;
use transit_proxy::facade::{QueryFacade, Upstreams};
use transit_proxy::server::create_router;
use transit_proxy::services::{LegacyApi, Operation, OrderedStop, RelayApi, RouteStopSource};

/// Legacy service answering from fixed payloads keyed by method.
#[derive(Default)]
struct FakeLegacy {
    lines_calls: AtomicUsize,
    arrivals_fail: bool,
}

#[async_trait]
impl LegacyApi for FakeLegacy {
    async fn call(
        &self,
        op: &Operation,
        _params: &[(&str, &str)],
    ) -> Result<Option<Value>, UpstreamError> {
        match op.method {
            m if m == Operation::LINES.method => {
                self.lines_calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(json!([
                    {"SHATKODU": "34", "SHATADI": "Avcılar - Zincirlikuyu"},
                    {"SHATKODU": "34A", "SHATADI": "Söğütlüçeşme - Cevizlibağ"},
                    {"SHATKODU": "500T", "SHATADI": "Tuzla - Cevizlibağ"}
                ])))
            }
            m if m == Operation::STOPS.method => Ok(Some(json!([
                {"SDURAKKODU": "1", "SDURAKADI": "Avcılar", "KOORDINAT": "POINT (28.72 40.98)", "SYON": "Zincirlikuyu"},
                {"SDURAKKODU": "2", "SDURAKADI": "Şirinevler", "KOORDINAT": "POINT (28.84 41.00)"},
                {"SDURAKKODU": "3", "SDURAKADI": "Zincirlikuyu", "KOORDINAT": "POINT (29.01 41.07)"},
                {"SDURAKKODU": "4", "SDURAKADI": "Kadıköy"}
            ]))),
            m if m == Operation::APPROACHING_VEHICLES.method => {
                if self.arrivals_fail {
                    Err(UpstreamError::Timeout)
                } else {
                    Ok(Some(json!([
                        {"hatkodu": "34", "kapino": "C-1", "dakika": 9, "mesafe": 3100, "yon": "G"},
                        {"hatkodu": "34A", "kapino": "C-2", "dakika": 2, "mesafe": 600, "yon": "G"}
                    ])))
                }
            }
            m if m == Operation::TIMETABLE.method => Ok(Some(json!([
                {"SGUNTIPI": "I", "SYON": "G", "DT": "06:30", "SGUZERAH": "34_G_A1"},
                {"SGUNTIPI": "I", "SYON": "G", "DT": "06:00", "SGUZERAH": "34_G_A1"}
            ]))),
            _ => Ok(None),
        }
    }
}

#[derive(Default)]
struct FakeRelay {
    vehicles_fail: bool,
}

#[async_trait]
impl RelayApi for FakeRelay {
    async fn line_vehicles(&self, _line: &str) -> Result<Value, UpstreamError> {
        if self.vehicles_fail {
            return Err(UpstreamError::Unreachable("connection refused".into()));
        }
        Ok(json!([
            {"vehicleDoorCode": "C-1", "lat": 40.9801, "lon": 28.7201, "guzergah": "34_G_A1", "direction": "ZİNCİRLİKUYU"},
            {"vehicleDoorCode": "C-2", "lat": 41.03, "lon": 28.9, "guzergah": "34_D_A1", "direction": "AVCILAR"}
        ]))
    }

    async fn line_suggestions(&self, _query: &str) -> Result<Value, UpstreamError> {
        Ok(json!([]))
    }

    async fn line_information(&self, _line: &str) -> Result<Value, UpstreamError> {
        Err(UpstreamError::Status {
            status: 500,
            body: "boom".into(),
        })
    }
}

struct FakeRoutes;

#[async_trait]
impl RouteStopSource for FakeRoutes {
    async fn fetch_ordered_stops(&self, _line: &str) -> Result<Vec<OrderedStop>, UpstreamError> {
        Ok(["1", "2", "3", "3", "2", "1"]
            .iter()
            .enumerate()
            .map(|(i, code)| OrderedStop {
                seq: i as u32 + 1,
                code: code.to_string(),
                name: format!("Stop {code}"),
            })
            .collect())
    }
}

fn facade(legacy: FakeLegacy, relay: FakeRelay) -> (Arc<QueryFacade>, Arc<FakeLegacy>) {
    let legacy = Arc::new(legacy);
    let upstreams = Upstreams {
        legacy: legacy.clone(),
        relay: Arc::new(relay),
        route_source: Arc::new(FakeRoutes),
    };
    (
        Arc::new(QueryFacade::new(upstreams, &Settings::default())),
        legacy,
    )
}

async fn spawn_server(facade: Arc<QueryFacade>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, create_router(facade)).await;
    });
    format!("http://{addr}")
}

async fn get(base: &str, path: &str) -> (u16, Value) {
    let res = reqwest::get(format!("{base}{path}")).await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_line_search_substring() {
    let (facade, _) = facade(FakeLegacy::default(), FakeRelay::default());
    let codes: Vec<String> = facade
        .search_lines("34")
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.code)
        .collect();
    assert_eq!(codes, vec!["34", "34A"]);

    let by_name = facade.search_lines("tuzla").await.unwrap();
    assert_eq!(by_name[0].code, "500T");
}

#[tokio::test]
async fn test_line_roster_is_idempotent_and_cached() {
    let (facade, legacy) = facade(FakeLegacy::default(), FakeRelay::default());
    let first = facade.all_lines().await.unwrap();
    let second = facade.all_lines().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(legacy.lines_calls.load(Ordering::SeqCst), 1);

    let base = spawn_server(facade).await;
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let res = reqwest::get(format!("{base}/lines/all")).await.unwrap();
        bodies.push(res.bytes().await.unwrap());
    }
    let (first_body, second_body) = (&bodies[0], &bodies[1]);
    assert!(!first_body.is_empty());
    assert_eq!(first_body, second_body);
    assert_eq!(legacy.lines_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_vehicle_failure_keeps_route() {
    let relay = FakeRelay {
        vehicles_fail: true,
    };
    let (facade, _) = facade(FakeLegacy::default(), relay);
    let live = facade.live("34").await;
    assert_eq!(live.outbound_stops.len(), 3);
    assert_eq!(live.return_stops.len(), 3);
    assert!(live.vehicles.is_empty());
    assert_eq!(
        live.advisory.as_deref(),
        Some("live vehicles unavailable: upstream unreachable: connection refused")
    );
}

#[tokio::test]
async fn test_vehicles_tagged_with_nearest_stop() {
    let (facade, _) = facade(FakeLegacy::default(), FakeRelay::default());
    let answer = facade.vehicles("34").await;
    assert_eq!(answer.total_vehicles, 2);
    assert_eq!(answer.vehicles[0].nearest_stop_code.as_deref(), Some("1"));
    assert!(answer.vehicles[1].nearest_stop_code.is_none());
    assert_eq!(answer.variant_groups.len(), 2);
    assert!(answer.advisory.is_none());
}

#[tokio::test]
async fn test_health_and_search_endpoints() {
    let (facade, _) = facade(FakeLegacy::default(), FakeRelay::default());
    let base = spawn_server(facade).await;

    let (status, body) = get(&base, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = get(&base, "/lines?query=34").await;
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = get(&base, "/stops?query=zincir").await;
    assert_eq!(body[0]["code"], "3");
    assert_eq!(body[0]["lat"], 41.07);

    let (_, body) = get(&base, "/lines/all").await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_route_and_vehicle_endpoints() {
    let (facade, _) = facade(FakeLegacy::default(), FakeRelay::default());
    let base = spawn_server(facade).await;

    let (status, body) = get(&base, "/routes/34").await;
    assert_eq!(status, 200);
    assert_eq!(body["outboundStops"][0]["code"], "1");
    assert_eq!(body["returnStops"][0]["seq"], 4);

    let (status, body) = get(&base, "/vehicles/34").await;
    assert_eq!(status, 200);
    assert_eq!(body["lineCode"], "34");
    assert_eq!(body["totalVehicles"], 2);
    assert_eq!(body["vehicles"][0]["direction"], "outbound");
    assert_eq!(body["vehicles"][0]["nearestStopCode"], "1");
    assert!(body["updatedAt"].is_string());

    let (status, body) = get(&base, "/lines/34/live").await;
    assert_eq!(status, 200);
    assert_eq!(body["vehicles"].as_array().unwrap().len(), 2);
    assert!(body.get("advisory").is_none());
}

#[tokio::test]
async fn test_stop_arrivals_endpoint() {
    let (facade, _) = facade(FakeLegacy::default(), FakeRelay::default());
    let base = spawn_server(facade).await;

    let (status, body) = get(&base, "/stops/1/arrivals").await;
    assert_eq!(status, 200);
    assert_eq!(body["stop"]["name"], "Avcılar");
    assert_eq!(body["arrivals"][0]["lineCode"], "34A");
    assert_eq!(body["arrivals"][0]["etaMinutes"], 2);
    assert_eq!(body["arrivals"][1]["distanceKm"], 3.1);

    let (status, body) = get(&base, "/stops/999/arrivals").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "stop not found");
}

#[tokio::test]
async fn test_stop_arrivals_degrade_on_live_failure() {
    let legacy = FakeLegacy {
        arrivals_fail: true,
        ..Default::default()
    };
    let (facade, _) = facade(legacy, FakeRelay::default());
    let base = spawn_server(facade).await;

    let (status, body) = get(&base, "/stops/2/arrivals").await;
    assert_eq!(status, 200);
    assert_eq!(body["arrivals"], json!([]));
    assert!(body["advisory"].is_string());
}

#[tokio::test]
async fn test_timetable_and_info_endpoints() {
    let (facade, _) = facade(FakeLegacy::default(), FakeRelay::default());
    let base = spawn_server(facade).await;

    let (status, body) = get(&base, "/lines/34/timetable").await;
    assert_eq!(status, 200);
    assert_eq!(body["weekday"]["outbound"][0]["time"], "06:00");
    assert_eq!(body["saturday"]["outbound"], json!([]));

    let (status, body) = get(&base, "/lines/34/info").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({}));
}
