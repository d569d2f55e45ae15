//! Google Meet as a chat message source, driven through WebDriver.

use crate::store::Credentials;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use meet_relay_core::collaborators::MessageSource;
use meet_relay_core::message::RawChatEntry;
use meet_webdriver::{Browser, Client, Element, Locator};
use secrecy::ExposeSecret;
use std::time::Duration;

// --- Page Constants ---

const LOGIN_URL: &str = "https://accounts.google.com/ServiceLogin?hl=en&passive=true&continue=https://www.google.com/&ec=GAZAAQ";
const ACCOUNT_URL: &str = "https://accounts.google.com/";

const EMAIL_INPUT_ID: &str = "identifierId";
const EMAIL_NEXT_ID: &str = "identifierNext";
const PASSWORD_INPUT_XPATH: &str = r#"//*[@id="password"]/div[1]/div/div[1]/input"#;
const PASSWORD_NEXT_ID: &str = "passwordNext";

const MICROPHONE_XPATH: &str = "//div[@role='button' and contains(@aria-label, 'Turn off microphone')]";
const CAMERA_XPATH: &str = "//div[@role='button' and contains(@aria-label, 'Turn off camera')]";
const JOIN_BUTTON_CLASS: &str = "XCoPyb";
const CHAT_BUTTON_XPATH: &str = "//button[contains(@aria-label, 'Chat with everyone')]";

const MESSAGE_GROUP_CSS: &str = ".Ss4fHf";
const AUTHOR_CSS: &str = ".poVWob";
const TIMESTAMP_CSS: &str = ".MuzmKe";
const MESSAGE_BODY_CSS: &str = r#"[jsname="dTKtvb"]"#;
const MESSAGE_ID_ANCESTOR_XPATH: &str = "./ancestor::div[@data-message-id]";
const MESSAGE_ID_ATTRIBUTE: &str = "data-message-id";

const IMPLICIT_WAIT: Duration = Duration::from_secs(10);
const CLICKABLE_TIMEOUT: Duration = Duration::from_secs(10);
const RELOAD_GAP: Duration = Duration::from_millis(500);
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// A signed-in browser sitting in one meeting.
pub struct GoogleMeet {
    webdriver_url: String,
    browser: Browser,
    credentials: Credentials,
    client: Option<Client>,
}

impl GoogleMeet {
    pub fn new(webdriver_url: impl Into<String>, browser: Browser, credentials: Credentials) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            browser,
            credentials,
            client: None,
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("No browser session, join the meeting first"))
    }

    async fn login(&self, client: &Client) -> Result<()> {
        tracing::info!("Signing in as {}", self.credentials.email);
        client.goto(LOGIN_URL).await?;

        let email = client.find(&Locator::id(EMAIL_INPUT_ID)).await?;
        client.send_keys(&email, &self.credentials.email).await?;
        let next = client.find(&Locator::id(EMAIL_NEXT_ID)).await?;
        client.click(&next).await?;

        client.set_implicit_wait(IMPLICIT_WAIT).await?;

        let password = client.find(&Locator::xpath(PASSWORD_INPUT_XPATH)).await?;
        client
            .send_keys(&password, self.credentials.password.expose_secret())
            .await?;
        client.set_implicit_wait(IMPLICIT_WAIT).await?;
        let next = client.find(&Locator::id(PASSWORD_NEXT_ID)).await?;
        client.click(&next).await?;
        client.set_implicit_wait(IMPLICIT_WAIT).await?;

        client.goto(ACCOUNT_URL).await?;
        tracing::info!("Signed in");
        Ok(())
    }

    async fn enter_meeting(&self, client: &Client) -> Result<()> {
        let link = &self.credentials.meeting_link;
        tracing::info!("Opening meeting {}", link);
        client.goto(link).await?;
        // The first load sometimes lands on an interstitial page.
        tokio::time::sleep(RELOAD_GAP).await;
        client.goto(link).await?;
        client.set_implicit_wait(IMPLICIT_WAIT).await?;

        tokio::time::sleep(SETTLE_DELAY).await;
        click_when_ready(client, &Locator::xpath(MICROPHONE_XPATH), "microphone off").await;
        click_when_ready(client, &Locator::xpath(CAMERA_XPATH), "camera off").await;

        match client.alert_text().await {
            Ok(text) => {
                tracing::info!("Dismissing alert: {}", text);
                if let Err(e) = client.dismiss_alert().await {
                    tracing::warn!("Failed to dismiss alert: {}", e);
                }
            }
            Err(_) => tracing::debug!("No alert present"),
        }

        click_when_ready(client, &Locator::class_name(JOIN_BUTTON_CLASS), "join now").await;

        tokio::time::sleep(SETTLE_DELAY).await;
        click_when_ready(client, &Locator::xpath(CHAT_BUTTON_XPATH), "open chat").await;
        Ok(())
    }
}

/// Clicks an element once it is clickable. Failure is logged and ignored.
async fn click_when_ready(client: &Client, locator: &Locator, what: &str) -> bool {
    let clicked = match client.wait_for_clickable(locator, CLICKABLE_TIMEOUT).await {
        Ok(element) => client.click(&element).await,
        Err(e) => Err(e),
    };
    match clicked {
        Ok(()) => {
            tracing::info!("Clicked {}", what);
            true
        }
        Err(e) => {
            tracing::warn!("Could not click {}: {}", what, e);
            false
        }
    }
}

/// Reads every message body of one sender group.
async fn read_group(client: &Client, group: &Element) -> meet_webdriver::Result<Vec<RawChatEntry>> {
    let author = client
        .text(&client.find_from(group, &Locator::css(AUTHOR_CSS)).await?)
        .await?;
    let timestamp = client
        .text(&client.find_from(group, &Locator::css(TIMESTAMP_CSS)).await?)
        .await?;

    let mut entries = Vec::new();
    for body in client
        .find_all_from(group, &Locator::css(MESSAGE_BODY_CSS))
        .await?
    {
        let text = client.text(&body).await?;
        let message_id = match client
            .find_from(&body, &Locator::xpath(MESSAGE_ID_ANCESTOR_XPATH))
            .await
        {
            Ok(holder) => client.attribute(&holder, MESSAGE_ID_ATTRIBUTE).await?,
            Err(e) if e.is_session_lost() => return Err(e),
            Err(_) => None,
        };
        entries.push(RawChatEntry::new(
            timestamp.trim(),
            author.trim(),
            message_id,
            text.trim(),
        ));
    }
    Ok(entries)
}

#[async_trait]
impl MessageSource for GoogleMeet {
    async fn join(&mut self) -> Result<()> {
        if self.client.is_none() {
            let client = meet_webdriver::connect(&self.webdriver_url, self.browser)
                .await
                .with_context(|| format!("Failed to start {} via {}", self.browser, self.webdriver_url))?;
            tracing::info!("Browser session {} started", client.session_id());
            self.client = Some(client);
        }
        let client = self.client()?;
        self.login(client).await.context("Login failed")?;
        self.enter_meeting(client).await
    }

    async fn poll(&mut self) -> Result<Vec<RawChatEntry>> {
        let client = self.client()?;
        let groups = client
            .find_all(&Locator::css(MESSAGE_GROUP_CSS))
            .await
            .context("Failed to list chat messages")?;

        let mut snapshot = Vec::new();
        for group in &groups {
            match read_group(client, group).await {
                Ok(entries) => snapshot.extend(entries),
                Err(e) if e.is_session_lost() => {
                    return Err(e).context("Browser session lost while reading chat");
                }
                // Groups re-render while being read; the next poll picks them up.
                Err(e) => tracing::debug!("Skipping chat group: {}", e),
            }
        }
        Ok(snapshot)
    }

    async fn release(&mut self) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        tracing::info!("Closing browser session {}", client.session_id());
        client.quit().await.context("Failed to close the browser session")
    }
}
