mod executor;
pub mod wait;

use crate::config::{BrowserConfig, Config};
use crate::Result;
use eoka::{Browser, Page};
use executor::ExecutionContext;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use executor::navigate;

/// Outcome of a scenario that ran to completion.
#[derive(Debug, Clone)]
pub struct Report {
    /// Name of the scenario.
    pub scenario: String,
    /// Number of steps executed after the initial navigation.
    pub steps_executed: usize,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    /// Screenshots written, in the order they were taken.
    pub screenshots: Vec<PathBuf>,
}

/// Runs scenarios against a single browser page.
pub struct Runner {
    browser: Browser,
    page: Page,
}

impl Runner {
    /// Launch a browser configured by `config` and open a blank page.
    pub async fn new(config: &BrowserConfig) -> Result<Self> {
        let viewport = config.viewport.unwrap_or_default();
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, viewport: {}x{})",
            config.headless, viewport.width, viewport.height
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self { browser, page })
    }

    /// Navigate to the scenario's target, then run every step in order.
    ///
    /// The first failing step aborts the run and its error is returned as is;
    /// nothing after it runs, so a screenshot step placed after an assertion
    /// is only taken when the assertion held.
    pub async fn run(&mut self, config: &Config) -> Result<Report> {
        let start = Instant::now();
        info!("Running scenario: {}", config.name);

        let ctx = ExecutionContext::new(&config.browser);
        info!("Navigating to: {}", config.target.url);
        navigate(&self.page, &config.target.url, ctx.navigation_timeout)
            .await
            .inspect_err(|e| warn!("navigation failed: {}", e))?;

        let mut screenshots = Vec::new();
        for (i, step) in config.steps.iter().enumerate() {
            debug!("Executing step {}/{}: {}", i + 1, config.steps.len(), step.name());
            let outcome = executor::execute(&self.page, step, &ctx)
                .await
                .inspect_err(|e| warn!("step {} ({}) failed: {}", i + 1, step.name(), e))?;
            screenshots.extend(outcome.screenshot);
        }

        Ok(Report {
            scenario: config.name.clone(),
            steps_executed: config.steps.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            screenshots,
        })
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
