//! HTTP client for a remote automation session (W3C WebDriver + Appium)

use dpilot_core::prelude::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::capabilities::Capabilities;
use super::driver::{DeviceDriver, ElementId, SessionFactory};
use super::locator::Locator;
use super::protocol::{self, NO_SUCH_ELEMENT};

/// Default automation server endpoint
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4723";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// An open session on the automation server
#[derive(Debug)]
pub struct RemoteSession {
    http: Client,
    /// `<endpoint>/session/<id>/`
    session_url: Url,
    session_id: String,
    device_id: String,
}

impl RemoteSession {
    /// Open a new session for the device named in `capabilities.udid`
    pub async fn connect(
        endpoint: &str,
        capabilities: &Capabilities,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base = parse_endpoint(endpoint)?;
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Opening session on {} for device {}",
            base, capabilities.udid
        );

        let new_session = base
            .join("session")
            .map_err(|e| Error::session(format!("Invalid session URL: {}", e)))?;
        let value = send(
            &http,
            Method::POST,
            new_session,
            Some(capabilities.new_session_body()),
        )
        .await?;

        let session_id = protocol::parse_session_id(&value)?;
        let session_url = base
            .join(&format!("session/{}/", encode_segment(&session_id)))
            .map_err(|e| Error::session(format!("Invalid session URL: {}", e)))?;

        info!("Session {} opened for {}", session_id, capabilities.udid);

        Ok(Self {
            http,
            session_url,
            session_id,
            device_id: capabilities.udid.clone(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.session_url
            .join(path)
            .map_err(|e| Error::session(format!("Invalid command path '{}': {}", path, e)))
    }

    fn element_url(&self, element: &ElementId, command: &str) -> Result<Url> {
        self.url(&format!(
            "element/{}/{}",
            encode_segment(element.as_str()),
            command
        ))
    }

    async fn get(&self, url: Url) -> Result<Value> {
        send(&self.http, Method::GET, url, None).await
    }

    async fn post(&self, url: Url, body: Value) -> Result<Value> {
        send(&self.http, Method::POST, url, Some(body)).await
    }

    /// Run an Appium `mobile:` extension command
    async fn execute_mobile(&self, command: &str, args: Value) -> Result<Value> {
        let url = self.url("execute/sync")?;
        self.post(
            url,
            json!({
                "script": format!("mobile: {}", command),
                "args": [args],
            }),
        )
        .await
    }

    async fn find(&self, url: Url, locator: &Locator) -> Result<Vec<ElementId>> {
        let body = json!({
            "using": locator.strategy(),
            "value": locator.value(),
        });
        match self.post(url, body).await {
            Ok(value) => protocol::parse_elements(&value),
            Err(Error::WebDriver { kind, .. }) if kind == NO_SUCH_ELEMENT => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

impl DeviceDriver for RemoteSession {
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementId>> {
        let url = self.url("elements")?;
        self.find(url, locator).await
    }

    async fn find_child_elements(
        &self,
        parent: &ElementId,
        locator: &Locator,
    ) -> Result<Vec<ElementId>> {
        let url = self.element_url(parent, "elements")?;
        self.find(url, locator).await
    }

    async fn click(&self, element: &ElementId) -> Result<()> {
        let url = self.element_url(element, "click")?;
        self.post(url, json!({})).await.map(|_| ())
    }

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()> {
        let url = self.element_url(element, "value")?;
        let chars: Vec<String> = text.chars().map(String::from).collect();
        self.post(url, json!({ "text": text, "value": chars }))
            .await
            .map(|_| ())
    }

    async fn is_displayed(&self, element: &ElementId) -> Result<bool> {
        let url = self.element_url(element, "displayed")?;
        protocol::parse_bool(&self.get(url).await?)
    }

    async fn is_enabled(&self, element: &ElementId) -> Result<bool> {
        let url = self.element_url(element, "enabled")?;
        protocol::parse_bool(&self.get(url).await?)
    }

    async fn press_keycode(&self, keycode: u32) -> Result<()> {
        self.execute_mobile("pressKey", json!({ "keycode": keycode }))
            .await
            .map(|_| ())
    }

    async fn is_app_installed(&self, app_id: &str) -> Result<bool> {
        let value = self
            .execute_mobile("isAppInstalled", json!({ "appId": app_id }))
            .await?;
        protocol::parse_bool(&value)
    }

    async fn activate_app(&self, app_id: &str) -> Result<()> {
        self.execute_mobile("activateApp", json!({ "appId": app_id }))
            .await
            .map(|_| ())
    }

    async fn terminate_app(&self, app_id: &str) -> Result<bool> {
        let value = self
            .execute_mobile("terminateApp", json!({ "appId": app_id }))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn current_package(&self) -> Result<Option<String>> {
        let value = self.execute_mobile("getCurrentPackage", json!({})).await?;
        Ok(value
            .as_str()
            .filter(|pkg| !pkg.is_empty())
            .map(str::to_string))
    }

    async fn quit(&self) -> Result<()> {
        let url = self.session_url.clone();
        send(&self.http, Method::DELETE, url, None).await?;
        info!("Session {} closed", self.session_id);
        Ok(())
    }
}

/// Opens [`RemoteSession`]s against one server with a shared capability template
#[derive(Debug, Clone)]
pub struct AppiumSessionFactory {
    endpoint: String,
    capabilities: Capabilities,
    request_timeout: Duration,
}

impl AppiumSessionFactory {
    pub fn new(endpoint: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            endpoint: endpoint.into(),
            capabilities,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for AppiumSessionFactory {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL, Capabilities::default())
    }
}

impl SessionFactory for AppiumSessionFactory {
    type Driver = RemoteSession;

    async fn open(&self, device_id: &str) -> Result<RemoteSession> {
        let capabilities = self.capabilities.for_device(device_id);
        RemoteSession::connect(&self.endpoint, &capabilities, self.request_timeout).await
    }
}

async fn send(http: &Client, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
    trace!("{} {}", method, url);

    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(http_error)?;
    let status = response.status().as_u16();
    let text = response.text().await.map_err(http_error)?;

    protocol::parse_response(status, &text)
}

fn http_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::session(format!("Automation server did not respond in time: {}", e))
    } else if e.is_connect() {
        Error::session(format!("Cannot reach automation server: {}", e))
    } else {
        Error::http(e.to_string())
    }
}

/// Parse the endpoint, forcing a trailing slash so relative joins append
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint.trim())
        .map_err(|e| Error::config_invalid(format!("Bad server URL '{}': {}", endpoint, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
