//! Playwright-backed browser surface.
//!
//! One long-lived `node` sidecar per session, speaking newline-delimited
//! JSON over stdin/stdout. The helper script is embedded here and written
//! to a temp dir at launch; the process is killed on drop as a backstop,
//! but every run is expected to call `close()` explicitly.

use crate::surface::{BrowserSurface, SurfaceError, SurfaceFactory, SurfaceResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

/// Node helper driving one Playwright page. Replies with exactly one JSON
/// line per command; errors are classified into protocol codes the Rust
/// side maps onto [`SurfaceError`].
const DRIVER_JS: &str = r#"
const readline = require('readline');
const { chromium, firefox, webkit } = require('playwright');

(async () => {
  const engines = { chromium, firefox, webkit };
  const name = process.argv[2] || 'chromium';
  const headless = process.argv[3] !== 'headed';
  const browser = await (engines[name] || chromium).launch({ headless });
  const context = await browser.newContext();
  const page = await context.newPage();
  const reply = (obj) => process.stdout.write(JSON.stringify(obj) + '\n');
  reply({ ok: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let msg;
    try { msg = JSON.parse(line); } catch (e) {
      reply({ ok: false, code: 'protocol', error: 'unparseable command' });
      continue;
    }
    try {
      switch (msg.cmd) {
        case 'navigate':
          await page.goto(msg.url, { waitUntil: 'load', timeout: msg.timeoutMs });
          reply({ ok: true });
          break;
        case 'click':
          await page.click(msg.selector, { timeout: msg.timeoutMs });
          reply({ ok: true });
          break;
        case 'fill':
          await page.fill(msg.selector, msg.text || '', { timeout: msg.timeoutMs });
          reply({ ok: true });
          break;
        case 'hover':
          await page.hover(msg.selector, { timeout: msg.timeoutMs });
          reply({ ok: true });
          break;
        case 'evaluate': {
          const value = await page.evaluate(msg.script);
          reply({ ok: true, value: value === undefined ? null : value });
          break;
        }
        case 'wait':
          await page.waitForTimeout(msg.ms || 0);
          reply({ ok: true });
          break;
        case 'close':
          reply({ ok: true });
          await browser.close();
          process.exit(0);
        default:
          reply({ ok: false, code: 'protocol', error: 'unknown cmd: ' + msg.cmd });
      }
    } catch (error) {
      const text = String((error && error.message) || error);
      const code = page.isClosed() ? 'crashed'
        : /timeout/i.test(text) ? 'timeout'
        : /not found|no node found|failed to find/i.test(text) ? 'not_found'
        : 'error';
      reply({ ok: false, code, error: text });
    }
  }
  await browser.close();
})().catch((error) => {
  process.stdout.write(JSON.stringify({ ok: false, code: 'crashed', error: String(error) }) + '\n');
  process.exit(1);
});
"#;

/// Browser engine the sidecar launches.
#[derive(Debug, Clone, Copy, Default)]
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

/// Configuration for the Playwright sidecar.
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    /// Engine-side cap on one driver round trip, in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            call_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    ok: bool,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

struct DriverIo {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

/// One exclusively-owned Playwright page session.
pub struct PlaywrightSurface {
    io: tokio::sync::Mutex<DriverIo>,
    call_timeout: Duration,
    closed: AtomicBool,
    // Holds the helper script for the lifetime of the session.
    _workdir: TempDir,
}

impl PlaywrightSurface {
    /// Spawn the sidecar and wait for its ready reply.
    pub async fn launch(config: &PlaywrightConfig) -> SurfaceResult<Self> {
        let workdir = TempDir::new()?;
        let script_path = workdir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        let mut child = Command::new("node")
            .arg(&script_path)
            .arg(config.browser.as_str())
            .arg(if config.headless { "headless" } else { "headed" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SurfaceError::SessionLost(format!("failed to spawn driver: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SurfaceError::Protocol("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SurfaceError::Protocol("driver stdout unavailable".to_string()))?;

        let surface = Self {
            io: tokio::sync::Mutex::new(DriverIo {
                child,
                stdin,
                reader: BufReader::new(stdout),
            }),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            closed: AtomicBool::new(false),
            _workdir: workdir,
        };

        // Ready handshake.
        let ready = surface.read_reply().await?;
        if !ready.ok {
            return Err(SurfaceError::SessionLost(
                ready.error.unwrap_or_else(|| "driver failed to start".to_string()),
            ));
        }
        info!("playwright driver ready");
        Ok(surface)
    }

    async fn read_reply(&self) -> SurfaceResult<DriverReply> {
        let mut io = self.io.lock().await;
        let fut = async {
            loop {
                let mut line = String::new();
                let n = io.reader.read_line(&mut line).await.map_err(pipe_error)?;
                if n == 0 {
                    return Err(SurfaceError::SessionLost("driver exited".to_string()));
                }
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                // Skip stray console output from the page.
                match serde_json::from_str::<DriverReply>(trimmed) {
                    Ok(reply) => return Ok(reply),
                    Err(_) => continue,
                }
            }
        };
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SurfaceError::Timeout("driver reply".to_string())),
        }
    }

    /// One command/reply round trip.
    async fn request(&self, what: &str, payload: Value) -> SurfaceResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SurfaceError::SessionLost("surface closed".to_string()));
        }

        let mut io = self.io.lock().await;
        let fut = async {
            let line = serde_json::to_string(&payload)
                .map_err(|e| SurfaceError::Protocol(e.to_string()))?;
            debug!(command = %line, "driver command");
            io.stdin.write_all(line.as_bytes()).await.map_err(pipe_error)?;
            io.stdin.write_all(b"\n").await.map_err(pipe_error)?;
            io.stdin.flush().await.map_err(pipe_error)?;

            loop {
                let mut line = String::new();
                let n = io.reader.read_line(&mut line).await.map_err(pipe_error)?;
                if n == 0 {
                    return Err(SurfaceError::SessionLost("driver exited".to_string()));
                }
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<DriverReply>(trimmed) {
                    Ok(reply) => return Ok(reply),
                    Err(_) => continue,
                }
            }
        };

        let reply = match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result?,
            Err(_) => return Err(SurfaceError::Timeout(what.to_string())),
        };

        if reply.ok {
            return Ok(reply.value.unwrap_or(Value::Null));
        }
        let detail = reply.error.unwrap_or_else(|| what.to_string());
        match reply.code.as_deref() {
            Some("timeout") => Err(SurfaceError::Timeout(detail)),
            Some("not_found") => Err(SurfaceError::NotFound(detail)),
            Some("crashed") => {
                self.closed.store(true, Ordering::SeqCst);
                Err(SurfaceError::SessionLost(detail))
            }
            _ => Err(SurfaceError::Protocol(detail)),
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.call_timeout.as_millis() as u64
    }
}

#[async_trait]
impl BrowserSurface for PlaywrightSurface {
    async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        self.request(
            "navigate",
            json!({"cmd": "navigate", "url": url, "timeoutMs": self.timeout_ms()}),
        )
        .await
        .map(|_| ())
    }

    async fn click(&self, selector: &str) -> SurfaceResult<()> {
        self.request(
            "click",
            json!({"cmd": "click", "selector": selector, "timeoutMs": self.timeout_ms()}),
        )
        .await
        .map(|_| ())
    }

    async fn fill(&self, selector: &str, text: &str) -> SurfaceResult<()> {
        self.request(
            "fill",
            json!({"cmd": "fill", "selector": selector, "text": text, "timeoutMs": self.timeout_ms()}),
        )
        .await
        .map(|_| ())
    }

    async fn hover(&self, selector: &str) -> SurfaceResult<()> {
        self.request(
            "hover",
            json!({"cmd": "hover", "selector": selector, "timeoutMs": self.timeout_ms()}),
        )
        .await
        .map(|_| ())
    }

    async fn evaluate(&self, script: &str) -> SurfaceResult<Value> {
        self.request("evaluate", json!({"cmd": "evaluate", "script": script}))
            .await
    }

    async fn wait_for(&self, ms: u64) -> SurfaceResult<()> {
        self.request("wait", json!({"cmd": "wait", "ms": ms}))
            .await
            .map(|_| ())
    }

    async fn close(&self) -> SurfaceResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Graceful close first; the sidecar exits on its own.
        let mut io = self.io.lock().await;
        let line = "{\"cmd\":\"close\"}\n";
        let graceful = async {
            io.stdin.write_all(line.as_bytes()).await?;
            io.stdin.flush().await?;
            Ok::<(), std::io::Error>(())
        };
        if tokio::time::timeout(Duration::from_secs(2), graceful)
            .await
            .map(|r| r.is_err())
            .unwrap_or(true)
        {
            warn!("graceful driver shutdown failed, killing");
        }
        let _ = io.child.start_kill();
        Ok(())
    }
}

impl Drop for PlaywrightSurface {
    fn drop(&mut self) {
        let _ = self.io.get_mut().child.start_kill();
    }
}

fn pipe_error(e: std::io::Error) -> SurfaceError {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof => {
            SurfaceError::SessionLost(format!("driver pipe closed: {}", e))
        }
        _ => SurfaceError::Io(e),
    }
}

/// Factory for real browser sessions.
pub struct PlaywrightFactory {
    config: PlaywrightConfig,
}

impl PlaywrightFactory {
    /// Verify Playwright is installed and build the factory.
    pub fn new(config: PlaywrightConfig) -> SurfaceResult<Self> {
        Self::check_installed()?;
        Ok(Self { config })
    }

    fn check_installed() -> SurfaceResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(SurfaceError::Protocol(
                "playwright not found; install with: npx playwright install".to_string(),
            )),
        }
    }
}

#[async_trait]
impl SurfaceFactory for PlaywrightFactory {
    async fn acquire(&self, base_url: &str) -> SurfaceResult<Box<dyn BrowserSurface>> {
        debug!(base_url, "acquiring playwright surface");
        Ok(Box::new(PlaywrightSurface::launch(&self.config).await?))
    }
}
