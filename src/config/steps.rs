use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Default bound for the polling waits, matching the prompt's 10 second budget.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// One step of a scenario. Steps run strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    // Navigation
    Goto(GotoStep),
    Reload,

    // Scrolling
    ScrollToBottom(ScrollToBottomStep),

    // Waiting
    Wait(WaitStep),
    WaitForVisible(SelectorWaitStep),
    WaitForHidden(SelectorWaitStep),
    WaitForText(WaitForTextStep),

    // Interaction
    Click(SelectorStep),
    SetCookie(SetCookieStep),

    // Assertions
    AssertVisible(SelectorStep),
    AssertHidden(SelectorStep),
    AssertCookie(AssertCookieStep),

    // Evidence
    Screenshot(ScreenshotStep),
    Log(LogStep),
}

impl Step {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Goto(_) => "goto",
            Self::Reload => "reload",
            Self::ScrollToBottom(_) => "scroll_to_bottom",
            Self::Wait(_) => "wait",
            Self::WaitForVisible(_) => "wait_for_visible",
            Self::WaitForHidden(_) => "wait_for_hidden",
            Self::WaitForText(_) => "wait_for_text",
            Self::Click(_) => "click",
            Self::SetCookie(_) => "set_cookie",
            Self::AssertVisible(_) => "assert_visible",
            Self::AssertHidden(_) => "assert_hidden",
            Self::AssertCookie(_) => "assert_cookie",
            Self::Screenshot(_) => "screenshot",
            Self::Log(_) => "log",
        }
    }
}

const STEP_NAMES: &[&str] = &[
    "goto",
    "reload",
    "scroll_to_bottom",
    "wait",
    "wait_for_visible",
    "wait_for_hidden",
    "wait_for_text",
    "click",
    "set_cookie",
    "assert_visible",
    "assert_hidden",
    "assert_cookie",
    "screenshot",
    "log",
];

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StepVisitor)
    }
}

struct StepVisitor;

impl<'de> Visitor<'de> for StepVisitor {
    type Value = Step;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a step (bare name, or map with a single step key)")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match value {
            "reload" => Ok(Step::Reload),
            "scroll_to_bottom" => Ok(Step::ScrollToBottom(ScrollToBottomStep::default())),
            other => Err(de::Error::unknown_variant(
                other,
                &["reload", "scroll_to_bottom"],
            )),
        }
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::custom("expected step type key"))?;

        let step = match key.as_str() {
            "goto" => Step::Goto(map.next_value()?),
            "reload" => {
                let _: serde_yaml::Value = map.next_value()?;
                Step::Reload
            }
            "scroll_to_bottom" => {
                // `scroll_to_bottom:` with no body means the full height.
                let body: Option<ScrollToBottomStep> = map.next_value()?;
                Step::ScrollToBottom(body.unwrap_or_default())
            }
            "wait" => Step::Wait(map.next_value()?),
            "wait_for_visible" => Step::WaitForVisible(map.next_value()?),
            "wait_for_hidden" => Step::WaitForHidden(map.next_value()?),
            "wait_for_text" => Step::WaitForText(map.next_value()?),
            "click" => Step::Click(map.next_value()?),
            "set_cookie" => Step::SetCookie(map.next_value()?),
            "assert_visible" => Step::AssertVisible(map.next_value()?),
            "assert_hidden" => Step::AssertHidden(map.next_value()?),
            "assert_cookie" => Step::AssertCookie(map.next_value()?),
            "screenshot" => Step::Screenshot(map.next_value()?),
            "log" => Step::Log(map.next_value()?),
            other => return Err(de::Error::unknown_variant(other, STEP_NAMES)),
        };

        if let Some(extra) = map.next_key::<String>()? {
            return Err(de::Error::custom(format!(
                "step '{}' has an unexpected sibling key '{}'",
                key, extra
            )));
        }

        Ok(step)
    }
}

// --- Step payloads ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GotoStep {
    pub url: String,
}

fn default_fraction() -> f64 {
    1.0
}

/// Scroll to `fraction` of `document.body.scrollHeight`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScrollToBottomStep {
    #[serde(default = "default_fraction")]
    pub fraction: f64,
}

impl Default for ScrollToBottomStep {
    fn default() -> Self {
        Self {
            fraction: default_fraction(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaitStep {
    pub ms: u64,
}

fn default_wait_timeout_ms() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectorWaitStep {
    pub selector: String,
    #[serde(default = "default_wait_timeout_ms")]
    pub timeout_ms: u64,
}

/// Wait until the element's whitespace-normalised text equals `text`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaitForTextStep {
    pub selector: String,
    pub text: String,
    #[serde(default = "default_wait_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectorStep {
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetCookieStep {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssertCookieStep {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScreenshotStep {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogStep {
    pub message: String,
}
