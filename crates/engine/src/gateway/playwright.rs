//! Playwright browser automation
//!
//! One persistent Node.js bridge process owns the browser. The bridge script
//! is generated at launch into a temporary directory and speaks
//! line-delimited JSON over stdio:
//!
//! ```text
//! -> {"id":3,"action":"click","args":{"selector":"input[value=\"Log In\"]"}}
//! <- {"id":3,"success":true,"snapshot":{"text":"Welcome ...","url":"https://..."}}
//! <- {"id":4,"success":false,"error":"Timeout 30000ms exceeded"}
//! ```
//!
//! The bridge announces `{"ready":true}` once the browser is up. Lines that
//! are not protocol messages, and responses to requests that already timed
//! out, are skipped.

use async_trait::async_trait;
use qaflow_common::{GatewayConfig, SelectorConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, trace, warn};

use super::{AutomationGateway, PageSnapshot};
use crate::action::{AbstractAction, ClickTarget, DropdownKind, FieldKind};
use crate::error::{GatewayError, GatewayResult};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const BRIDGE_TEMPLATE: &str = r#"
const readline = require('readline');

function emit(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

async function settle(page) {
  try {
    await page.waitForLoadState('domcontentloaded', { timeout: 10000 });
  } catch (_) {}
}

async function snapshot(page) {
  let text = '';
  try {
    text = await page.innerText('body', { timeout: 5000 });
  } catch (_) {}
  return { text, url: page.url() };
}

async function perform(page, request) {
  const args = request.args || {};
  switch (request.action) {
    case 'navigate':
      await page.goto(args.url, { waitUntil: 'domcontentloaded' });
      break;
    case 'fill_field':
      await page.fill(args.selector, args.value);
      break;
    case 'click':
      await page.locator(args.selector).first().click();
      await settle(page);
      break;
    case 'select_option':
      await page.selectOption(args.selector, args.value);
      break;
    case 'read_page':
      await settle(page);
      break;
    default:
      throw new Error('unknown action ' + request.action);
  }
}

(async () => {
  let browser;
  try {
    const playwright = require('playwright');
    browser = await playwright['__BROWSER__'].launch({ headless: __HEADLESS__, slowMo: __SLOW_MO__ });
  } catch (error) {
    emit({ ready: false, error: error.message });
    process.exit(1);
  }
  const page = await browser.newPage();
  page.setDefaultTimeout(__ACTION_TIMEOUT__);
  emit({ ready: true });

  const input = readline.createInterface({ input: process.stdin });
  for await (const line of input) {
    if (!line.trim()) continue;
    let request;
    try {
      request = JSON.parse(line);
    } catch (error) {
      emit({ error: 'malformed request: ' + error.message });
      continue;
    }
    if (request.action === 'close') {
      await browser.close();
      emit({ id: request.id, success: true });
      process.exit(0);
    }
    try {
      await perform(page, request);
      emit({ id: request.id, success: true, snapshot: await snapshot(page) });
    } catch (error) {
      emit({ id: request.id, success: false, error: error.message });
    }
  }
  await browser.close();
})();
"#;

/// Build the Node.js bridge script for a gateway configuration
pub fn bridge_script(config: &GatewayConfig) -> String {
    BRIDGE_TEMPLATE
        .replace("__BROWSER__", config.browser.as_str())
        .replace("__HEADLESS__", if config.headless { "true" } else { "false" })
        .replace("__SLOW_MO__", &config.slow_mo_ms.to_string())
        .replace("__ACTION_TIMEOUT__", &config.action_timeout_ms.to_string())
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    action: &'a str,
    args: Value,
}

#[derive(Debug, Deserialize)]
struct BridgeMessage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    snapshot: Option<PageSnapshot>,
    #[serde(default)]
    error: Option<String>,
}

/// Gateway backed by a Playwright-controlled browser
pub struct PlaywrightGateway {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    selectors: SelectorConfig,
    action_timeout: Duration,
    next_id: u64,
    closed: bool,
    _workdir: TempDir,
}

impl PlaywrightGateway {
    /// Start the bridge and wait for the browser to come up
    pub async fn launch(config: &GatewayConfig, selectors: SelectorConfig) -> GatewayResult<Self> {
        let script = bridge_script(config);
        let gateway = Self::spawn(config.node_binary.as_os_str(), &script, config, selectors).await?;
        info!(
            "Browser session ready ({}, {})",
            config.browser.as_str(),
            if config.headless { "headless" } else { "headed" }
        );
        Ok(gateway)
    }

    async fn spawn(
        program: &OsStr,
        script: &str,
        config: &GatewayConfig,
        selectors: SelectorConfig,
    ) -> GatewayResult<Self> {
        let workdir = tempfile::tempdir()
            .map_err(|e| GatewayError::Launch(format!("cannot create bridge directory: {}", e)))?;
        let script_path = workdir.path().join("bridge.js");
        std::fs::write(&script_path, script)
            .map_err(|e| GatewayError::Launch(format!("cannot write bridge script: {}", e)))?;
        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut command = Command::new(program);
        command
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The script lives in a temp dir, so resolve `playwright` from the working directory
        if std::env::var_os("NODE_PATH").is_none() {
            if let Ok(cwd) = std::env::current_dir() {
                command.env("NODE_PATH", cwd.join("node_modules"));
            }
        }

        let mut child = command.spawn().map_err(|e| {
            GatewayError::Launch(format!("cannot start {}: {}", program.to_string_lossy(), e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GatewayError::Launch("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GatewayError::Launch("bridge stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let mut gateway = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            selectors,
            action_timeout: Duration::from_millis(config.action_timeout_ms),
            next_id: 0,
            closed: false,
            _workdir: workdir,
        };

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        match tokio::time::timeout(launch_timeout, gateway.await_ready()).await {
            Ok(Ok(())) => Ok(gateway),
            Ok(Err(e)) => {
                gateway.kill().await;
                Err(GatewayError::Launch(e.to_string()))
            }
            Err(_) => {
                gateway.kill().await;
                Err(GatewayError::Launch(format!(
                    "bridge did not report ready within {} ms",
                    config.launch_timeout_ms
                )))
            }
        }
    }

    async fn await_ready(&mut self) -> GatewayResult<()> {
        loop {
            let line = self.read_line().await?;
            let Ok(message) = serde_json::from_str::<BridgeMessage>(line.trim()) else {
                continue;
            };
            match message.ready {
                Some(true) => return Ok(()),
                Some(false) => {
                    return Err(GatewayError::Protocol(
                        message.error.unwrap_or_else(|| "browser failed to start".to_string()),
                    ))
                }
                None => continue,
            }
        }
    }

    async fn read_line(&mut self) -> GatewayResult<String> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line).await? == 0 {
            return Err(GatewayError::Closed);
        }
        trace!("bridge <- {}", line.trim_end());
        Ok(line)
    }

    async fn send(&mut self, action: &str, args: Value) -> GatewayResult<u64> {
        self.next_id += 1;
        let id = self.next_id;
        let payload = serde_json::to_string(&BridgeRequest { id, action, args })?;
        trace!("bridge -> {}", payload);
        self.stdin.write_all(payload.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(id)
    }

    async fn roundtrip(&mut self, action: &str, args: Value) -> GatewayResult<BridgeMessage> {
        let id = self.send(action, args).await?;
        loop {
            let line = self.read_line().await?;
            match serde_json::from_str::<BridgeMessage>(line.trim()) {
                Ok(message) if message.id == Some(id) => return Ok(message),
                Ok(message) => debug!("Discarding bridge message for request {:?}", message.id),
                Err(_) => continue,
            }
        }
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("Bridge already gone: {}", e);
        }
    }
}

#[async_trait]
impl AutomationGateway for PlaywrightGateway {
    async fn execute(&mut self, action: &AbstractAction) -> GatewayResult<PageSnapshot> {
        if self.closed {
            return Err(GatewayError::Closed);
        }
        debug!("playwright {}", action);

        let args = action_args(&self.selectors, action);
        let timeout = self.action_timeout;
        let response = match tokio::time::timeout(timeout, self.roundtrip(action.name(), args)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                if matches!(e, GatewayError::Closed) {
                    self.closed = true;
                }
                return Err(e);
            }
            Err(_) => {
                warn!("{} timed out after {} ms", action, timeout.as_millis());
                return Err(GatewayError::Timeout {
                    action: action.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        };

        if response.success {
            Ok(response.snapshot.unwrap_or_default())
        } else {
            Err(GatewayError::ActionFailed {
                action: action.to_string(),
                reason: response
                    .error
                    .unwrap_or_else(|| "bridge reported failure without a reason".to_string()),
            })
        }
    }

    async fn close(&mut self) -> GatewayResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match tokio::time::timeout(CLOSE_TIMEOUT, self.roundtrip("close", json!({}))).await {
            Ok(Ok(_)) => debug!("Bridge acknowledged close"),
            Ok(Err(e)) => warn!("Bridge close failed: {}", e),
            Err(_) => warn!("Bridge did not acknowledge close within {:?}", CLOSE_TIMEOUT),
        }

        match tokio::time::timeout(CLOSE_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => debug!("Bridge exited with {}", status),
            _ => {
                warn!("Killing Playwright bridge");
                self.kill().await;
            }
        }
        info!("Browser session closed");
        Ok(())
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("bridge stderr: {}", line);
    }
}

/// Argument bag sent to the bridge for `action`
fn action_args(selectors: &SelectorConfig, action: &AbstractAction) -> Value {
    match action {
        AbstractAction::Navigate { url } => json!({ "url": url }),
        AbstractAction::FillField { field, value } => {
            let selector = match field {
                FieldKind::Username => &selectors.username,
                FieldKind::Password => &selectors.password,
            };
            json!({ "selector": selector, "value": value })
        }
        AbstractAction::Click { target } => json!({ "selector": click_selector(selectors, target) }),
        AbstractAction::SelectOption { dropdown, value } => {
            let selector = match dropdown {
                DropdownKind::AccountType => &selectors.account_type,
                DropdownKind::SourceAccount => &selectors.source_account,
            };
            json!({ "selector": selector, "value": value })
        }
        AbstractAction::ReadPage => json!({}),
    }
}

fn click_selector(selectors: &SelectorConfig, target: &ClickTarget) -> String {
    match target {
        ClickTarget::LoginButton => selectors.login_button.clone(),
        ClickTarget::OpenAccountButton => selectors.open_account_button.clone(),
        ClickTarget::SubmitButton => selectors.submit_button.clone(),
        ClickTarget::Labeled(label) => {
            let label = label.replace('\\', "\\\\").replace('"', "\\\"");
            format!(
                r#"button:has-text("{label}"), input[type="submit"][value="{label}"], input[type="button"][value="{label}"], a:has-text("{label}")"#
            )
        }
    }
}
