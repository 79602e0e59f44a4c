//! Playwright browser automation
//!
//! Each session is one `node` child process running a generated bridge
//! script. Requests go to the child's stdin as JSON lines; replies and page
//! events come back on stdout the same way. The child is spawned with
//! kill-on-drop, so dropping a session always takes its browser down.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::driver::{BrowserLauncher, PageDriver, PageEvent};
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Attribute that carries element contract values
    pub testid_attribute: String,
    /// Upper bound for a single click or fill inside the browser
    pub action_timeout_ms: u64,
    /// Time allowed for the browser to come up
    pub launch_timeout_ms: u64,
    pub node_binary: PathBuf,
    /// Directory whose `node_modules` provides `playwright`
    pub project_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            testid_attribute: "data-testid".to_string(),
            action_timeout_ms: 10_000,
            launch_timeout_ms: 30_000,
            node_binary: PathBuf::from("node"),
            project_dir: PathBuf::from("."),
        }
    }
}

/// Check if Playwright is installed
pub fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
    let status = Command::new("npx")
        .args(["playwright", "--version"])
        .current_dir(&config.project_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

/// Build the bridge script for a configuration
pub fn build_script(config: &PlaywrightConfig) -> String {
    format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

const ATTR = {attr};
const ACTION_TIMEOUT = {action_timeout};
const emit = (obj) => process.stdout.write(JSON.stringify(obj) + '\n');
const describe = (e) => String((e && e.message) || e);

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  page.setDefaultTimeout(ACTION_TIMEOUT);

  page.on('pageerror', (err) => emit({{ event: 'page_error', message: describe(err) }}));
  page.on('console', (msg) => {{
    if (msg.type() === 'error') emit({{ event: 'console_error', text: msg.text() }});
  }});

  const byId = (id) => page.locator(`[${{ATTR}}="${{id}}"]`);
  const appear = async (id, ms) => {{
    try {{
      await byId(id).first().waitFor({{ state: 'visible', timeout: ms }});
      return true;
    }} catch (e) {{
      return false;
    }}
  }};

  const ops = {{
    goto: async (r) => {{
      const resp = await page.goto(r.url, {{ waitUntil: 'domcontentloaded' }});
      return resp ? resp.status() : null;
    }},
    click: async (r) => {{
      if (!(await appear(r.testid, ACTION_TIMEOUT))) return false;
      await byId(r.testid).first().click();
      return true;
    }},
    fill: async (r) => {{
      if (!(await appear(r.testid, ACTION_TIMEOUT))) return false;
      await byId(r.testid).first().fill(r.value);
      return true;
    }},
    count: async (r) => await byId(r.testid).count(),
    visible: async (r) => await appear(r.testid, r.wait_ms),
    attribute: async (r) => {{
      if ((await byId(r.testid).count()) === 0) return null;
      return await byId(r.testid).first().getAttribute(r.name);
    }},
    url: async () => page.url(),
    wait_for_url: async (r) => {{
      try {{
        await page.waitForURL((u) => u.toString().includes(r.needle), {{ timeout: r.wait_ms }});
        return true;
      }} catch (e) {{
        return page.url().includes(r.needle);
      }}
    }},
    text: async () => (await page.innerText('body')) || '',
    hrefs: async () =>
      await page.$$eval('a[href]', (as) => as.map((a) => a.href).filter(Boolean)),
    link_status: async (r) => (await page.request.get(r.url)).status(),
    close: async () => {{
      await context.close();
      await browser.close();
      return null;
    }},
  }};

  emit({{ event: 'ready' }});

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    let req;
    try {{
      req = JSON.parse(line);
    }} catch (e) {{
      continue;
    }}
    const op = ops[req.op];
    try {{
      if (!op) throw new Error('unknown op ' + req.op);
      const value = await op(req);
      emit({{ id: req.id, ok: true, value: value === undefined ? null : value }});
    }} catch (e) {{
      emit({{ id: req.id, ok: false, error: describe(e) }});
    }}
    if (req.op === 'close') break;
  }}
  process.exit(0);
}})().catch((e) => {{
  emit({{ event: 'fatal', message: describe(e) }});
  process.exit(1);
}});
"#,
        attr = json!(config.testid_attribute),
        action_timeout = config.action_timeout_ms,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
    )
}

/// A line from the bridge
#[derive(Debug)]
enum BridgeLine {
    Reply { id: u64, result: Result<Value, String> },
    Event(PageEvent),
    Ready,
    Fatal(String),
}

fn parse_line(line: &str) -> E2eResult<BridgeLine> {
    let value: Value = serde_json::from_str(line)?;
    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        let ok = value.get("ok").and_then(Value::as_bool).unwrap_or(false);
        let result = if ok {
            Ok(value.get("value").cloned().unwrap_or(Value::Null))
        } else {
            Err(value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown bridge error")
                .to_string())
        };
        return Ok(BridgeLine::Reply { id, result });
    }
    match value.get("event").and_then(Value::as_str) {
        Some("ready") => Ok(BridgeLine::Ready),
        Some("fatal") => Ok(BridgeLine::Fatal(
            value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )),
        _ => Ok(BridgeLine::Event(serde_json::from_value(value)?)),
    }
}

/// Launches one bridge process per session
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
    script_dir: tempfile::TempDir,
}

impl PlaywrightLauncher {
    /// Verify Playwright is available and write the bridge script
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed(&config)?;

        let script_dir = tempfile::tempdir()?;
        std::fs::write(script_dir.path().join("bridge.js"), build_script(&config))?;
        info!(
            "Playwright bridge ready ({}, headless: {})",
            config.browser.as_str(),
            config.headless
        );

        Ok(Self { config, script_dir })
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self) -> E2eResult<Box<dyn PageDriver>> {
        let script = self.script_dir.path().join("bridge.js");
        let project_dir = std::fs::canonicalize(&self.config.project_dir)?;

        let mut child = TokioCommand::new(&self.config.node_binary)
            .arg(&script)
            .current_dir(&project_dir)
            .env("NODE_PATH", project_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Bridge(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".into()))?;

        let mut driver = PlaywrightDriver {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            events: Vec::new(),
        };

        let limit = Duration::from_millis(self.config.launch_timeout_ms);
        match timeout(limit, driver.wait_ready()).await {
            Ok(result) => result?,
            Err(_) => return Err(E2eError::Timeout("browser launch".into())),
        }
        debug!("Browser context launched");
        Ok(Box::new(driver))
    }
}

/// One browser context behind a bridge process
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    events: Vec<PageEvent>,
}

impl PlaywrightDriver {
    async fn next_line(&mut self) -> E2eResult<BridgeLine> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Bridge("bridge exited".into()))?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(parsed) => return Ok(parsed),
                // browser or node noise on stdout
                Err(_) => debug!("bridge: {}", line),
            }
        }
    }

    async fn wait_ready(&mut self) -> E2eResult<()> {
        loop {
            match self.next_line().await? {
                BridgeLine::Ready => return Ok(()),
                BridgeLine::Fatal(message) => return Err(E2eError::Bridge(message)),
                BridgeLine::Event(event) => self.events.push(event),
                BridgeLine::Reply { id, .. } => warn!("Unexpected reply {} before ready", id),
            }
        }
    }

    /// Send one request and wait for its reply, collecting events on the way
    async fn call(&mut self, op: &str, mut args: Value) -> E2eResult<Value> {
        self.next_id += 1;
        let id = self.next_id;
        if let Value::Object(map) = &mut args {
            map.insert("id".into(), json!(id));
            map.insert("op".into(), json!(op));
        }

        let mut line = serde_json::to_string(&args)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        loop {
            match self.next_line().await? {
                BridgeLine::Reply { id: got, result } if got == id => {
                    return result.map_err(E2eError::Bridge);
                }
                BridgeLine::Reply { id: got, .. } => {
                    // left over from a request the caller stopped waiting for
                    warn!("Skipping stale bridge reply {} (waiting for {})", got, id);
                }
                BridgeLine::Event(event) => self.events.push(event),
                BridgeLine::Fatal(message) => return Err(E2eError::Bridge(message)),
                BridgeLine::Ready => {}
            }
        }
    }

    async fn call_bool(&mut self, op: &str, args: Value) -> E2eResult<bool> {
        Ok(self.call(op, args).await?.as_bool().unwrap_or(false))
    }

    async fn call_string(&mut self, op: &str, args: Value) -> E2eResult<String> {
        Ok(self.call(op, args).await?.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<Option<u16>> {
        let status = self.call("goto", json!({ "url": url })).await?;
        Ok(status.as_u64().map(|s| s as u16))
    }

    async fn click(&mut self, testid: &str) -> E2eResult<bool> {
        self.call_bool("click", json!({ "testid": testid })).await
    }

    async fn fill(&mut self, testid: &str, value: &str) -> E2eResult<bool> {
        self.call_bool("fill", json!({ "testid": testid, "value": value })).await
    }

    async fn count(&mut self, testid: &str) -> E2eResult<usize> {
        let n = self.call("count", json!({ "testid": testid })).await?;
        Ok(n.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&mut self, testid: &str, wait: Duration) -> E2eResult<bool> {
        self.call_bool("visible", json!({ "testid": testid, "wait_ms": wait.as_millis() as u64 }))
            .await
    }

    async fn attribute(&mut self, testid: &str, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .call("attribute", json!({ "testid": testid, "name": name }))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        self.call_string("url", json!({})).await
    }

    async fn wait_for_url(&mut self, needle: &str, wait: Duration) -> E2eResult<bool> {
        self.call_bool(
            "wait_for_url",
            json!({ "needle": needle, "wait_ms": wait.as_millis() as u64 }),
        )
        .await
    }

    async fn visible_text(&mut self) -> E2eResult<String> {
        self.call_string("text", json!({})).await
    }

    async fn anchor_hrefs(&mut self) -> E2eResult<Vec<String>> {
        let value = self.call("hrefs", json!({})).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn link_status(&mut self, url: &str) -> E2eResult<u16> {
        let status = self.call("link_status", json!({ "url": url })).await?;
        status
            .as_u64()
            .map(|s| s as u16)
            .ok_or_else(|| E2eError::Bridge(format!("no status for {}", url)))
    }

    fn drain_events(&mut self) -> Vec<PageEvent> {
        std::mem::take(&mut self.events)
    }

    async fn close(&mut self) -> E2eResult<()> {
        if let Err(e) = self.call("close", json!({})).await {
            debug!("Bridge close: {}", e);
        }
        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(_) => Ok(()),
            Err(_) => {
                warn!("Bridge did not exit; killing it");
                self.child.kill().await?;
                Ok(())
            }
        }
    }
}
