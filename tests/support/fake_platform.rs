// ABOUTME: In-memory platform that answers the REST calls the deploy phases make.
// ABOUTME: Keeps cnames, units and env vars per app, with injectable rejections.

use async_trait::async_trait;
use bluegreen::platform::{
    Method, PlatformClient, PlatformError, PlatformRequest, PlatformResponse,
};
use bluegreen::types::ProcessTopology;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default, Clone)]
struct AppState {
    cnames: Vec<String>,
    units: Vec<String>,
    env: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    apps: BTreeMap<String, AppState>,
    rejections: Vec<(Method, String, u16)>,
    frozen: HashSet<String>,
    requests: Vec<PlatformRequest>,
    external_status: Option<u16>,
}

/// Fake platform API. Requests to other hosts are recorded and answered with 200.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(self, name: &str, cnames: &[&str], units: &[(&str, u32)]) -> Self {
        let app = AppState {
            cnames: cnames.iter().map(|c| c.to_string()).collect(),
            units: units
                .iter()
                .flat_map(|(process, count)| {
                    std::iter::repeat_n(process.to_string(), *count as usize)
                })
                .collect(),
            env: BTreeMap::new(),
        };
        self.state.lock().apps.insert(name.to_string(), app);
        self
    }

    pub fn with_env(self, app: &str, key: &str, value: &str) -> Self {
        if let Some(state) = self.state.lock().apps.get_mut(app) {
            state.env.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Answer every request whose method matches and whose path and query
    /// start with `path` with `status`, without applying it.
    pub fn reject(self, method: Method, path: &str, status: u16) -> Self {
        self.state
            .lock()
            .rejections
            .push((method, path.to_string(), status));
        self
    }

    /// Accept unit changes on `app` without applying them.
    pub fn freeze_units(self, app: &str) -> Self {
        self.state.lock().frozen.insert(app.to_string());
        self
    }

    /// Status returned to requests outside the platform API.
    pub fn external_status(self, status: u16) -> Self {
        self.state.lock().external_status = Some(status);
        self
    }

    pub fn cnames(&self, app: &str) -> Vec<String> {
        self.state
            .lock()
            .apps
            .get(app)
            .map(|a| a.cnames.clone())
            .unwrap_or_default()
    }

    pub fn topology(&self, app: &str) -> ProcessTopology {
        self.state
            .lock()
            .apps
            .get(app)
            .map(|a| ProcessTopology::from_units(a.units.iter()))
            .unwrap_or_default()
    }

    pub fn env(&self, app: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .apps
            .get(app)
            .and_then(|a| a.env.get(key).cloned())
    }

    pub fn requests(&self) -> Vec<PlatformRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests that went to hosts other than the platform.
    pub fn external_requests(&self) -> Vec<PlatformRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.path_and_query().starts_with("/apps/"))
            .collect()
    }

    /// Platform requests as `METHOD path?query` strings.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter(|r| r.path_and_query().starts_with("/apps/"))
            .map(|r| format!("{} {}", r.method, r.path_and_query()))
            .collect()
    }
}

fn reply(status: u16, body: impl Into<String>) -> PlatformResponse {
    PlatformResponse::new(status, body)
}

fn body_json(request: &PlatformRequest) -> Value {
    request
        .body
        .as_deref()
        .and_then(|b| serde_json::from_str(b).ok())
        .unwrap_or(Value::Null)
}

fn cname_list(request: &PlatformRequest) -> Vec<String> {
    body_json(request)["cname"]
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

impl State {
    fn handle(&mut self, request: &PlatformRequest) -> PlatformResponse {
        let full_path = request.path_and_query().to_string();
        let Some(rest) = full_path.strip_prefix("/apps/") else {
            return reply(self.external_status.unwrap_or(200), "");
        };

        if let Some((_, _, status)) = self
            .rejections
            .iter()
            .find(|(method, path, _)| *method == request.method && full_path.starts_with(path))
        {
            return reply(*status, "rejected");
        }

        let path = rest.split('?').next().unwrap_or_default();
        let (app_name, resource) = match path.split_once('/') {
            Some((app, resource)) => (app.to_string(), resource.to_string()),
            None => (path.to_string(), String::new()),
        };
        let frozen = self.frozen.contains(&app_name);
        let Some(app) = self.apps.get_mut(&app_name) else {
            return reply(404, "{}");
        };

        let query: BTreeMap<String, String> = request.query_pairs().into_iter().collect();
        let units: i64 = query
            .get("units")
            .and_then(|u| u.parse().ok())
            .unwrap_or_default();
        let process = query.get("process").cloned().unwrap_or_default();

        match (request.method, resource.as_str()) {
            (Method::Get, "") => {
                let units: Vec<Value> = app
                    .units
                    .iter()
                    .map(|p| json!({ "ProcessName": p }))
                    .collect();
                reply(
                    200,
                    json!({ "name": app_name, "cname": app.cnames, "units": units }).to_string(),
                )
            }
            (Method::Delete, "cname") => {
                let names = cname_list(request);
                app.cnames.retain(|c| !names.contains(c));
                reply(200, "")
            }
            (Method::Post, "cname") => {
                for name in cname_list(request) {
                    if !app.cnames.contains(&name) {
                        app.cnames.push(name);
                    }
                }
                reply(200, "")
            }
            (Method::Post, "env") => {
                if let Value::Object(vars) = body_json(request) {
                    for (key, value) in vars {
                        app.env
                            .insert(key, value.as_str().unwrap_or_default().to_string());
                    }
                }
                reply(200, "")
            }
            (Method::Get, "env") => {
                let keys = body_json(request);
                let found: Vec<Value> = keys
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|k| k.as_str())
                    .filter_map(|k| {
                        app.env
                            .get(k)
                            .map(|v| json!({ "name": k, "value": v, "public": true }))
                    })
                    .collect();
                if found.is_empty() {
                    reply(200, "null")
                } else {
                    reply(200, Value::Array(found).to_string())
                }
            }
            (Method::Put, "units") => {
                if units <= 0 {
                    return reply(400, "invalid number of units");
                }
                if !frozen {
                    app.units
                        .extend(std::iter::repeat_n(process, units as usize));
                }
                reply(200, "")
            }
            (Method::Delete, "units") => {
                let running = app.units.iter().filter(|p| **p == process).count() as i64;
                if units < 0 || units > running {
                    return reply(400, "invalid number of units");
                }
                if !frozen {
                    let mut left = units;
                    app.units.retain(|p| {
                        if left > 0 && *p == process {
                            left -= 1;
                            false
                        } else {
                            true
                        }
                    });
                }
                reply(200, "")
            }
            _ => reply(404, "not found"),
        }
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn execute(&self, request: PlatformRequest) -> Result<PlatformResponse, PlatformError> {
        let mut state = self.state.lock();
        let response = state.handle(&request);
        state.requests.push(request);
        Ok(response)
    }
}
