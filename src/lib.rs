//! # page-verify
//!
//! Scripted browser checks against a running site: load a page, act on it,
//! assert what the reader should see, and keep a screenshot as evidence.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use page_verify::{builtin, Params, Runner};
//!
//! # #[tokio::main]
//! # async fn main() -> page_verify::Result<()> {
//! let config = builtin::load("rss-prompt", &Params::new())?;
//! let mut runner = Runner::new(&config.browser).await?;
//! let report = runner.run(&config).await?;
//! println!("{} steps, screenshots: {:?}", report.steps_executed, report.screenshots);
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod builtin;
mod config;
pub mod preflight;
mod runner;

pub use config::{
    steps, BrowserConfig, Config, ParamDef, Params, Step, TargetUrl, Viewport,
};
pub use runner::{navigate, wait, Report, Runner};

/// Result type for page-verify operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop a scenario.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// The target could not be reached or did not load.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The page loaded but did not behave as expected.
    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("artifact error: {0}")]
    Artifact(String),
}
