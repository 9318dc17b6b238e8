use super::wait::{poll_through_errors, POLL_INTERVAL};
use crate::artifact;
use crate::config::steps::{ScrollToBottomStep, SelectorWaitStep, WaitForTextStep};
use crate::config::{BrowserConfig, Step};
use crate::preflight;
use crate::{Error, Result};
use eoka::Page;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Visibility as browser-automation tools define it: attached, a non-empty
/// bounding box, and not hidden through `display` or `visibility`.
const IS_VISIBLE_JS: &str = r#"((sel) => {
    const el = document.querySelector(sel);
    if (!el) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
})"#;

/// Whitespace-collapsed `textContent`, or `null` when nothing matches.
const TEXT_OF_JS: &str = r#"((sel) => {
    const el = document.querySelector(sel);
    return el ? el.textContent.replace(/\s+/g, ' ').trim() : null;
})"#;

/// Tags the current document so a finished load can be told apart from the
/// page that was showing before it.
const MARK_STALE_JS: &str = "window.__pageVerifyStale = true";

const LOADED_JS: &str = "!window.__pageVerifyStale && document.readyState === 'complete'";

/// Settings shared by every step of a run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Bound on a navigation or reload, from request to `readyState == "complete"`.
    pub navigation_timeout: Duration,
}

impl ExecutionContext {
    pub fn new(browser: &BrowserConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_millis(browser.navigation_timeout_ms),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(&BrowserConfig::default())
    }
}

/// What a step left behind, if anything.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub screenshot: Option<PathBuf>,
}

/// Run a single step against the page.
pub async fn execute(page: &Page, step: &Step, ctx: &ExecutionContext) -> Result<StepOutcome> {
    match step {
        Step::Goto(s) => {
            info!("goto: {}", s.url);
            navigate(page, &s.url, ctx.navigation_timeout).await?;
        }
        Step::Reload => {
            debug!("reload");
            reload(page, ctx.navigation_timeout).await?;
        }
        Step::ScrollToBottom(s) => {
            info!("scroll_to_bottom: {:.0}%", s.fraction * 100.0);
            page.execute(&scroll_js(s)).await?;
        }
        Step::Wait(s) => {
            debug!("wait: {}ms", s.ms);
            page.wait(s.ms).await;
        }
        Step::WaitForVisible(s) => {
            info!("wait_for_visible: {} (timeout {}ms)", s.selector, s.timeout_ms);
            wait_for_visibility(page, s, true).await?;
        }
        Step::WaitForHidden(s) => {
            info!("wait_for_hidden: {} (timeout {}ms)", s.selector, s.timeout_ms);
            wait_for_visibility(page, s, false).await?;
        }
        Step::WaitForText(s) => {
            info!("wait_for_text: {} = {:?} (timeout {}ms)", s.selector, s.text, s.timeout_ms);
            wait_for_text(page, s).await?;
        }
        Step::Click(s) => {
            info!("click: {}", s.selector);
            page.click(&s.selector).await.map_err(|e| {
                Error::Assertion(format!("could not click '{}': {}", s.selector, e))
            })?;
        }
        Step::SetCookie(s) => {
            debug!("set_cookie: {}={}", s.name, s.value);
            page.set_cookie(&s.name, &s.value, s.domain.as_deref(), s.path.as_deref())
                .await?;
        }
        Step::AssertVisible(s) => {
            debug!("assert_visible: {}", s.selector);
            if !is_visible(page, &s.selector).await? {
                return Err(Error::Assertion(format!(
                    "element '{}' is hidden but should be visible",
                    s.selector
                )));
            }
        }
        Step::AssertHidden(s) => {
            debug!("assert_hidden: {}", s.selector);
            if is_visible(page, &s.selector).await? {
                return Err(Error::Assertion(format!(
                    "element '{}' is visible but should be hidden",
                    s.selector
                )));
            }
        }
        Step::AssertCookie(s) => {
            debug!("assert_cookie: {}={}", s.name, s.value);
            let cookie = page.cookies().await?.into_iter().find(|c| c.name == s.name);
            match cookie {
                Some(c) if c.value == s.value => {}
                Some(c) => {
                    return Err(Error::Assertion(format!(
                        "cookie '{}' is '{}', expected '{}'",
                        s.name, c.value, s.value
                    )))
                }
                None => {
                    return Err(Error::Assertion(format!("cookie '{}' is not set", s.name)))
                }
            }
        }
        Step::Screenshot(s) => {
            info!("screenshot: {}", s.path);
            let data = page.screenshot().await?;
            let path = artifact::write_png(&s.path, &data)?;
            return Ok(StepOutcome {
                screenshot: Some(path),
            });
        }
        Step::Log(s) => {
            info!("[log] {}", s.message);
        }
    }
    Ok(StepOutcome::default())
}

/// Load `url` and wait for it to finish loading, reporting every way it can
/// go wrong as [`Error::Navigation`].
pub async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<()> {
    preflight::ensure_reachable(url, preflight::CONNECT_TIMEOUT).await?;

    let deadline = Instant::now() + timeout;
    mark_stale(page).await;
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(Error::Navigation(format!("failed to load {}: {}", url, e))),
        Err(_) => {
            return Err(Error::Navigation(format!(
                "{} did not respond within {}ms",
                url,
                timeout.as_millis()
            )))
        }
    }
    wait_for_load(page, url, deadline, timeout).await?;

    let landed = page
        .url()
        .await
        .map_err(|e| Error::Navigation(format!("failed to read location of {}: {}", url, e)))?;
    if landed.starts_with("chrome-error://") {
        return Err(Error::Navigation(format!(
            "browser showed an error page for {}",
            url
        )));
    }
    debug!("loaded {}", landed);
    Ok(())
}

async fn reload(page: &Page, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    mark_stale(page).await;
    match tokio::time::timeout(timeout, page.reload()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(Error::Navigation(format!("reload failed: {}", e))),
        Err(_) => {
            return Err(Error::Navigation(format!(
                "reload did not respond within {}ms",
                timeout.as_millis()
            )))
        }
    }
    wait_for_load(page, "reload", deadline, timeout).await
}

async fn mark_stale(page: &Page) {
    // Nothing to tag when no document is showing yet.
    if let Err(e) = page.execute(MARK_STALE_JS).await {
        debug!("could not tag current document: {}", e);
    }
}

/// Poll until the new document reports `readyState == "complete"`.
async fn wait_for_load(
    page: &Page,
    what: &str,
    deadline: Instant,
    timeout: Duration,
) -> Result<()> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    poll_through_errors(remaining, POLL_INTERVAL, || async move {
        Ok::<_, Error>(page.evaluate::<bool>(LOADED_JS).await?)
    })
    .await
    .map_err(|last| {
        let mut msg = format!("{} did not finish loading within {}ms", what, timeout.as_millis());
        if let Some(e) = last {
            msg.push_str(&format!(" (last error: {})", e));
        }
        Error::Navigation(msg)
    })
}

async fn wait_for_visibility(page: &Page, step: &SelectorWaitStep, want: bool) -> Result<()> {
    let timeout = Duration::from_millis(step.timeout_ms);
    let result = poll_through_errors(timeout, POLL_INTERVAL, || async move {
        Ok::<_, Error>(is_visible(page, &step.selector).await? == want)
    })
    .await;

    let Err(last) = result else {
        return Ok(());
    };
    let state = if want { "visible" } else { "hidden" };
    let mut msg = format!(
        "element '{}' did not become {} within {}ms",
        step.selector, state, step.timeout_ms
    );
    if let Some(e) = last {
        msg.push_str(&format!(" (last error: {})", e));
    }
    Err(Error::Assertion(msg))
}

async fn wait_for_text(page: &Page, step: &WaitForTextStep) -> Result<()> {
    let want = normalize_text(&step.text);
    let timeout = Duration::from_millis(step.timeout_ms);
    let want_ref = want.as_str();
    let result = poll_through_errors(timeout, POLL_INTERVAL, || async move {
        Ok::<_, Error>(text_of(page, &step.selector).await?.as_deref() == Some(want_ref))
    })
    .await;

    if result.is_ok() {
        return Ok(());
    }
    let seen = match text_of(page, &step.selector).await {
        Ok(Some(text)) => format!("'{}'", text),
        Ok(None) => "no matching element".to_string(),
        Err(e) => format!("unreadable ({})", e),
    };
    Err(Error::Assertion(format!(
        "element '{}' did not read '{}' within {}ms (last seen: {})",
        step.selector, want, step.timeout_ms, seen
    )))
}

async fn is_visible(page: &Page, selector: &str) -> Result<bool> {
    let js = format!("{}({})", IS_VISIBLE_JS, quote(selector));
    Ok(page.evaluate(&js).await?)
}

async fn text_of(page: &Page, selector: &str) -> Result<Option<String>> {
    let js = format!("{}({})", TEXT_OF_JS, quote(selector));
    Ok(page.evaluate(&js).await?)
}

/// Collapse runs of whitespace the way `TEXT_OF_JS` does.
fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn scroll_js(step: &ScrollToBottomStep) -> String {
    if step.fraction >= 1.0 {
        "window.scrollTo(0, document.body.scrollHeight)".to_string()
    } else {
        format!(
            "window.scrollTo(0, document.body.scrollHeight * {})",
            step.fraction
        )
    }
}

/// JSON-quote a string for embedding in a script.
fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}
