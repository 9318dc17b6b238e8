use super::params::{self, ParamDef, Params};
use super::steps::Step;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A verification scenario: where to go and what to check there.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name of the scenario, used in logs and reports.
    pub name: String,

    /// Parameter definitions (optional).
    #[serde(default)]
    pub params: HashMap<String, ParamDef>,

    /// Browser launch settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Page loaded before the first step.
    pub target: TargetUrl,

    /// Steps run after the target has loaded.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Config {
    /// Load a scenario from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_params(path, &Params::new())
    }

    /// Load a scenario from a YAML file, expanding `${name}` placeholders.
    pub fn load_with_params<P: AsRef<Path>>(path: P, params: &Params) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse_with_params(&content, params)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Self::parse_with_params(yaml, &Params::new())
    }

    /// Parse a scenario from a YAML string with parameter substitution.
    pub fn parse_with_params(yaml: &str, params: &Params) -> Result<Self> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(yaml)?;

        // Definitions are read before substitution so defaults can apply.
        let defs: HashMap<String, ParamDef> = match value.get("params") {
            Some(v) => serde_yaml::from_value(v.clone())?,
            None => HashMap::new(),
        };

        params::substitute_value(&mut value, params, &defs)?;

        let config: Config = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("name is required".into()));
        }
        if self.target.url.is_empty() {
            return Err(Error::Config("target.url is required".into()));
        }
        check_url(&self.target.url).map_err(|e| Error::Config(format!("target.url {}", e)))?;
        if self.browser.navigation_timeout_ms == 0 {
            return Err(Error::Config(
                "browser.navigation_timeout_ms must be greater than 0".into(),
            ));
        }

        for (i, step) in self.steps.iter().enumerate() {
            let at = |msg: String| Error::Config(format!("step {} ({}): {}", i + 1, step.name(), msg));
            match step {
                Step::Goto(s) => check_url(&s.url).map_err(|e| at(format!("url {}", e)))?,
                Step::ScrollToBottom(s) => {
                    if !(0.0..=1.0).contains(&s.fraction) {
                        return Err(at(format!("fraction {} must be within 0..=1", s.fraction)));
                    }
                }
                Step::WaitForVisible(s) | Step::WaitForHidden(s) => {
                    if s.selector.trim().is_empty() {
                        return Err(at("selector is required".into()));
                    }
                    if s.timeout_ms == 0 {
                        return Err(at("timeout_ms must be greater than 0".into()));
                    }
                }
                Step::WaitForText(s) => {
                    if s.selector.trim().is_empty() {
                        return Err(at("selector is required".into()));
                    }
                    if s.timeout_ms == 0 {
                        return Err(at("timeout_ms must be greater than 0".into()));
                    }
                }
                Step::Click(s) | Step::AssertVisible(s) | Step::AssertHidden(s) => {
                    if s.selector.trim().is_empty() {
                        return Err(at("selector is required".into()));
                    }
                }
                Step::SetCookie(s) => {
                    if s.name.is_empty() {
                        return Err(at("cookie name is required".into()));
                    }
                }
                Step::AssertCookie(s) => {
                    if s.name.is_empty() {
                        return Err(at("cookie name is required".into()));
                    }
                }
                Step::Screenshot(s) => {
                    if s.path.trim().is_empty() {
                        return Err(at("path is required".into()));
                    }
                }
                Step::Reload | Step::Wait(_) | Step::Log(_) => {}
            }
        }
        Ok(())
    }

    /// Screenshot paths this scenario writes, in step order.
    pub fn screenshot_paths(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            Step::Screenshot(s) => Some(s.path.as_str()),
            _ => None,
        })
    }
}

fn check_url(raw: &str) -> std::result::Result<(), String> {
    let parsed =
        url::Url::parse(raw).map_err(|e| format!("'{}' is not a valid URL: {}", raw, e))?;
    match parsed.scheme() {
        "http" | "https" | "file" | "data" => Ok(()),
        other => Err(format!("'{}' has unsupported scheme '{}'", raw, other)),
    }
}

/// Browser launch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Custom user agent.
    pub user_agent: Option<String>,

    pub viewport: Option<Viewport>,

    /// How long a navigation or reload may take to reach `readyState == "complete"`.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            user_agent: None,
            viewport: None,
            navigation_timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetUrl {
    pub url: String,
}
