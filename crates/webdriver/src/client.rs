use crate::client::consts::{CLICKABLE_POLL_INTERVAL_MS, ELEMENT_KEY};
use crate::error::WebDriverError;
use crate::locator::Locator;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

pub mod config;
pub mod consts;

pub type Result<T> = std::result::Result<T, WebDriverError>;

/// A reference to an element inside the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: String,
}

impl Element {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ProtocolError {
    error: String,
    #[serde(default)]
    message: String,
}

/// An open WebDriver session.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl Client {
    /// Opens a new browser session on the driver described by `config`.
    pub async fn connect(config: config::Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let base_url = config.base_url().to_string();

        let response = http
            .post(format!("{}/session", base_url))
            .json(&config.browser().capabilities())
            .send()
            .await?;
        let value = unwrap_response(response, None).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::UnexpectedResponse(value.to_string()))?
            .to_string();

        tracing::info!("WebDriver session {} opened for {}", session_id, config.browser());
        Ok(Self {
            http,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        locator: Option<&Locator>,
    ) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        unwrap_response(response, locator.map(ToString::to_string)).await
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        self.command(Method::POST, "/url", Some(json!({ "url": url })), None)
            .await?;
        Ok(())
    }

    /// Sets how long element lookups keep retrying before giving up.
    pub async fn set_implicit_wait(&self, wait: Duration) -> Result<()> {
        let body = json!({ "implicit": wait.as_millis() as u64 });
        self.command(Method::POST, "/timeouts", Some(body), None)
            .await?;
        Ok(())
    }

    pub async fn find(&self, locator: &Locator) -> Result<Element> {
        let value = self
            .command(Method::POST, "/element", Some(find_body(locator)), Some(locator))
            .await?;
        element_from(&value)
    }

    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>> {
        let value = self
            .command(Method::POST, "/elements", Some(find_body(locator)), Some(locator))
            .await?;
        elements_from(&value)
    }

    pub async fn find_from(&self, parent: &Element, locator: &Locator) -> Result<Element> {
        let path = format!("/element/{}/element", parent.id);
        let value = self
            .command(Method::POST, &path, Some(find_body(locator)), Some(locator))
            .await?;
        element_from(&value)
    }

    pub async fn find_all_from(&self, parent: &Element, locator: &Locator) -> Result<Vec<Element>> {
        let path = format!("/element/{}/elements", parent.id);
        let value = self
            .command(Method::POST, &path, Some(find_body(locator)), Some(locator))
            .await?;
        elements_from(&value)
    }

    /// Rendered text of an element.
    pub async fn text(&self, element: &Element) -> Result<String> {
        let path = format!("/element/{}/text", element.id);
        let value = self.command(Method::GET, &path, None, None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::UnexpectedResponse(value.to_string()))
    }

    /// An attribute value, or `None` when the element does not carry it.
    pub async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        let path = format!("/element/{}/attribute/{}", element.id, name);
        let value = self.command(Method::GET, &path, None, None).await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn is_enabled(&self, element: &Element) -> Result<bool> {
        let path = format!("/element/{}/enabled", element.id);
        let value = self.command(Method::GET, &path, None, None).await?;
        value
            .as_bool()
            .ok_or_else(|| WebDriverError::UnexpectedResponse(value.to_string()))
    }

    pub async fn click(&self, element: &Element) -> Result<()> {
        let path = format!("/element/{}/click", element.id);
        self.command(Method::POST, &path, Some(json!({})), None)
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &Element, text: &str) -> Result<()> {
        let path = format!("/element/{}/value", element.id);
        self.command(Method::POST, &path, Some(json!({ "text": text })), None)
            .await?;
        Ok(())
    }

    /// Waits until `locator` resolves to an enabled element.
    pub async fn wait_for_clickable(&self, locator: &Locator, timeout: Duration) -> Result<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(locator).await {
                Ok(element) => {
                    if self.is_enabled(&element).await? {
                        return Ok(element);
                    }
                }
                Err(WebDriverError::NoSuchElement(_)) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::Timeout(locator.to_string()));
            }
            tokio::time::sleep(Duration::from_millis(CLICKABLE_POLL_INTERVAL_MS)).await;
        }
    }

    pub async fn alert_text(&self) -> Result<String> {
        let value = self.command(Method::GET, "/alert/text", None, None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn dismiss_alert(&self) -> Result<()> {
        self.command(Method::POST, "/alert/dismiss", Some(json!({})), None)
            .await?;
        Ok(())
    }

    /// Closes the browser and ends the session.
    pub async fn quit(self) -> Result<()> {
        self.command(Method::DELETE, "", None, None).await?;
        tracing::info!("WebDriver session {} closed", self.session_id);
        Ok(())
    }
}

fn find_body(locator: &Locator) -> Value {
    let (using, value) = locator.strategy();
    json!({ "using": using, "value": value })
}

fn element_from(value: &Value) -> Result<Element> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| Element { id: id.to_string() })
        .ok_or_else(|| WebDriverError::UnexpectedResponse(value.to_string()))
}

fn elements_from(value: &Value) -> Result<Vec<Element>> {
    value
        .as_array()
        .ok_or_else(|| WebDriverError::UnexpectedResponse(value.to_string()))?
        .iter()
        .map(element_from)
        .collect()
}

/// Extracts `value` from a driver response, turning error payloads into
/// [`WebDriverError`]s.
async fn unwrap_response(response: reqwest::Response, locator: Option<String>) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    let envelope: Envelope = serde_json::from_str(&body)
        .map_err(|_| WebDriverError::UnexpectedResponse(format!("{}: {}", status, body)))?;

    if status.is_success() {
        return Ok(envelope.value);
    }
    match serde_json::from_value::<ProtocolError>(envelope.value) {
        Ok(err) => Err(WebDriverError::from_protocol(err.error, err.message, locator)),
        Err(_) => Err(WebDriverError::UnexpectedResponse(format!("{}: {}", status, body))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Browser;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn connected(server: &MockServer) -> Client {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "s1", "capabilities": {} }
            })))
            .mount(server)
            .await;

        let config = config::Config::builder()
            .with_base_url(&server.uri())
            .with_browser(Browser::Chrome)
            .build();
        Client::connect(config).await.expect("session should open")
    }

    #[tokio::test]
    async fn test_connect_sends_capabilities() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .and(body_partial_json(json!({
                "capabilities": { "alwaysMatch": { "browserName": "chrome" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "abc", "capabilities": {} }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = config::Config::builder().with_base_url(&server.uri()).build();
        let client = Client::connect(config).await.unwrap();

        assert_eq!(client.session_id(), "abc");
    }

    #[tokio::test]
    async fn test_find_all_and_text() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/s1/elements"))
            .and(body_partial_json(json!({ "using": "css selector", "value": ".Ss4fHf" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [ { ELEMENT_KEY: "e1" }, { ELEMENT_KEY: "e2" } ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/element/e2/text"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "value": "Alice" })),
            )
            .mount(&server)
            .await;

        let elements = client.find_all(&Locator::css(".Ss4fHf")).await.unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].id(), "e2");
        assert_eq!(client.text(&elements[1]).await.unwrap(), "Alice");
    }

    #[tokio::test]
    async fn test_missing_element_maps_to_no_such_element() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such element", "message": "Unable to locate element" }
            })))
            .mount(&server)
            .await;

        let err = client.find(&Locator::id("identifierId")).await.unwrap_err();
        assert!(matches!(err, WebDriverError::NoSuchElement(ref l) if l.contains("identifierId")));
    }

    #[tokio::test]
    async fn test_closed_window_is_session_lost() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/s1/elements"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such window", "message": "target window already closed" }
            })))
            .mount(&server)
            .await;

        let err = client.find_all(&Locator::css(".x")).await.unwrap_err();
        assert!(err.is_session_lost());
    }

    #[tokio::test]
    async fn test_missing_attribute_is_none() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("GET"))
            .and(path("/session/s1/element/e1/attribute/data-message-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .mount(&server)
            .await;

        let element = Element {
            id: "e1".to_string(),
        };
        let attr = client.attribute(&element, "data-message-id").await.unwrap();
        assert!(attr.is_none());
    }

    #[tokio::test]
    async fn test_quit_deletes_session() {
        let server = MockServer::start().await;
        let client = connected(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        client.quit().await.unwrap();
    }
}
