// ABOUTME: Typed platform API calls on top of a PlatformClient.
// ABOUTME: App descriptor, cname, env var and unit endpoints.

use serde::Deserialize;
use serde_json::json;
use snafu::ResultExt;

use super::app_ref::ApplicationRef;
use super::client::{CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, Method, PlatformClient, PlatformRequest};
use super::error::{MalformedBodySnafu, PlatformError};
use crate::types::{CnameSet, ProcessTopology};

/// Subset of `GET /apps/{app}` used by the deploy phases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppDescriptor {
    #[serde(default)]
    pub cname: Option<Vec<String>>,
    #[serde(default)]
    pub units: Option<Vec<UnitDescriptor>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitDescriptor {
    #[serde(rename = "ProcessName", default)]
    pub process_name: String,
}

impl AppDescriptor {
    pub fn cnames(&self) -> Option<CnameSet> {
        self.cname.clone().and_then(CnameSet::from_vec)
    }

    pub fn topology(&self) -> ProcessTopology {
        ProcessTopology::from_units(
            self.units
                .iter()
                .flatten()
                .map(|unit| unit.process_name.as_str()),
        )
    }
}

/// One entry of `GET /apps/{app}/env`.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Platform calls authenticated with a bearer token.
///
/// Mutating calls return `false` for any non-200 status and for transport
/// failures. Reads return transport failures as errors. A body that is not the
/// expected JSON is always an error.
pub struct PlatformApi<'a, C: ?Sized> {
    client: &'a C,
    token: &'a str,
}

impl<'a, C: PlatformClient + ?Sized> PlatformApi<'a, C> {
    pub fn new(client: &'a C, token: &'a str) -> Self {
        Self { client, token }
    }

    fn request(&self, method: Method, url: String) -> PlatformRequest {
        PlatformRequest::new(method, url)
            .header("Content-Type", CONTENT_TYPE_JSON)
            .bearer(self.token)
    }

    /// Send a mutating request and fold the response into a success flag.
    async fn mutate(&self, request: PlatformRequest) -> bool {
        let method = request.method;
        let url = request.url.clone();
        match self.client.execute(request).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                tracing::warn!("{} {} returned status {}", method, url, response.status);
                false
            }
            Err(e) => {
                tracing::warn!("{} {} failed: {}", method, url, e);
                false
            }
        }
    }

    /// `GET /apps/{app}`. The body is parsed whatever the status code.
    pub async fn app_descriptor(&self, app: &ApplicationRef) -> Result<AppDescriptor, PlatformError> {
        let url = app.url("");
        let response = self
            .client
            .execute(self.request(Method::Get, url.clone()))
            .await?;
        if !response.is_success() {
            tracing::debug!("GET {} returned status {}", url, response.status);
        }
        serde_json::from_str(&response.body).context(MalformedBodySnafu { url })
    }

    /// `DELETE /apps/{app}/cname`.
    pub async fn remove_cnames(&self, app: &ApplicationRef, cnames: &CnameSet) -> bool {
        let body = json!({ "cname": cnames });
        self.mutate(self.request(Method::Delete, app.url("/cname")).json(&body))
            .await
    }

    /// `POST /apps/{app}/cname`.
    pub async fn set_cnames(&self, app: &ApplicationRef, cnames: &CnameSet) -> bool {
        let body = json!({ "cname": cnames });
        self.mutate(self.request(Method::Post, app.url("/cname")).json(&body))
            .await
    }

    /// `POST /apps/{app}/env?noRestart=true`.
    pub async fn set_env(&self, app: &ApplicationRef, key: &str, value: &str) -> bool {
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        let request = self
            .request(Method::Post, app.url("/env?noRestart=true"))
            .json(&serde_json::Value::Object(body));
        self.mutate(request).await
    }

    /// `GET /apps/{app}/env` asking for one key.
    ///
    /// Returns `None` for a literal `null` body or an empty list, otherwise
    /// the value of the first entry.
    pub async fn get_env(
        &self,
        app: &ApplicationRef,
        key: &str,
    ) -> Result<Option<String>, PlatformError> {
        let url = app.url("/env");
        let request = self
            .request(Method::Get, url.clone())
            .json(&json!([key]));
        let response = self.client.execute(request).await?;
        let entries: Option<Vec<EnvEntry>> =
            serde_json::from_str(&response.body).context(MalformedBodySnafu { url })?;
        Ok(entries
            .and_then(|entries| entries.into_iter().next())
            .and_then(|entry| entry.value))
    }

    /// `PUT /apps/{app}/units?units=N&process=NAME`.
    pub async fn add_units(&self, app: &ApplicationRef, process: &str, count: i64) -> bool {
        let url = units_url(app, process, count);
        self.mutate(self.request(Method::Put, url)).await
    }

    /// `DELETE /apps/{app}/units?units=N&process=NAME`, sent with a form content type.
    pub async fn remove_units(&self, app: &ApplicationRef, process: &str, count: i64) -> bool {
        let url = units_url(app, process, count);
        let request = self
            .request(Method::Delete, url)
            .header("Content-Type", CONTENT_TYPE_FORM);
        self.mutate(request).await
    }
}

fn units_url(app: &ApplicationRef, process: &str, count: i64) -> String {
    app.url(&format!(
        "/units?units={}&process={}",
        count,
        urlencoding::encode(process)
    ))
}
