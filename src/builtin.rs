//! Scenarios compiled into the binary.

use crate::config::{Config, Params};
use crate::{Error, Result};

/// Scenario run when no config file is given.
pub const DEFAULT: &str = "rss-prompt";

const SCENARIOS: &[(&str, &str)] = &[
    ("rss-prompt", include_str!("../scenarios/rss-prompt.yaml")),
    (
        "rss-prompt-dismiss",
        include_str!("../scenarios/rss-prompt-dismiss.yaml"),
    ),
    (
        "rss-prompt-suppressed",
        include_str!("../scenarios/rss-prompt-suppressed.yaml"),
    ),
    (
        "rss-prompt-buttons",
        include_str!("../scenarios/rss-prompt-buttons.yaml"),
    ),
    (
        "rss-prompt-buttons-mobile",
        include_str!("../scenarios/rss-prompt-buttons-mobile.yaml"),
    ),
    (
        "rss-prompt-copy",
        include_str!("../scenarios/rss-prompt-copy.yaml"),
    ),
];

/// Names of all built-in scenarios.
pub fn names() -> impl Iterator<Item = &'static str> {
    SCENARIOS.iter().map(|(name, _)| *name)
}

/// Parse a built-in scenario with the given parameters.
pub fn load(name: &str, params: &Params) -> Result<Config> {
    let (_, yaml) = SCENARIOS
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| {
            Error::Config(format!(
                "unknown scenario '{}', expected one of: {}",
                name,
                names().collect::<Vec<_>>().join(", ")
            ))
        })?;
    Config::parse_with_params(yaml, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Step;

    #[test]
    fn test_all_builtins_parse() {
        for name in names() {
            let config = load(name, &Params::new())
                .unwrap_or_else(|e| panic!("scenario {} failed to parse: {}", name, e));
            assert!(!config.steps.is_empty(), "{} has no steps", name);
        }
    }

    #[test]
    fn test_default_scenario_shape() {
        let config = load(DEFAULT, &Params::new()).unwrap();

        assert_eq!(
            config.target.url,
            "http://localhost:8080/blog/2025-08-14-professional-productivity-system/"
        );
        assert_eq!(config.steps.len(), 3);

        match &config.steps[0] {
            Step::ScrollToBottom(s) => assert_eq!(s.fraction, 1.0),
            other => panic!("expected scroll_to_bottom, got {}", other.name()),
        }
        match &config.steps[1] {
            Step::WaitForVisible(s) => {
                assert_eq!(s.selector, "#rss-prompt");
                assert_eq!(s.timeout_ms, 10_000);
            }
            other => panic!("expected wait_for_visible, got {}", other.name()),
        }
        match &config.steps[2] {
            Step::Screenshot(s) => assert_eq!(s.path, "jules-scratch/verification/rss-prompt.png"),
            other => panic!("expected screenshot, got {}", other.name()),
        }
    }

    #[test]
    fn test_screenshot_is_last_step() {
        let config = load(DEFAULT, &Params::new()).unwrap();
        assert!(matches!(config.steps.last(), Some(Step::Screenshot(_))));
    }

    #[test]
    fn test_base_url_override() {
        let params = Params::new().set("base_url", "http://127.0.0.1:4000");
        let config = load(DEFAULT, &params).unwrap();
        assert_eq!(
            config.target.url,
            "http://127.0.0.1:4000/blog/2025-08-14-professional-productivity-system/"
        );
    }

    #[test]
    fn test_dismiss_checks_cookie() {
        let config = load("rss-prompt-dismiss", &Params::new()).unwrap();
        let cookie = config.steps.iter().find_map(|s| match s {
            Step::AssertCookie(c) => Some(c),
            _ => None,
        });
        let cookie = cookie.expect("dismiss scenario asserts the cookie");
        assert_eq!(cookie.name, "rss_prompt_dismissed");
        assert_eq!(cookie.value, "true");
    }

    fn visibility_checks(config: &Config) -> (Vec<&str>, Vec<&str>) {
        let mut visible = Vec::new();
        let mut hidden = Vec::new();
        for step in &config.steps {
            match step {
                Step::AssertVisible(s) => visible.push(s.selector.as_str()),
                Step::AssertHidden(s) => hidden.push(s.selector.as_str()),
                _ => {}
            }
        }
        (visible, hidden)
    }

    #[test]
    fn test_button_scenarios_are_mirrored() {
        let desktop = load("rss-prompt-buttons", &Params::new()).unwrap();
        let mobile = load("rss-prompt-buttons-mobile", &Params::new()).unwrap();

        assert_eq!(
            visibility_checks(&desktop),
            (vec!["#rss-copy-btn"], vec!["#rss-share-btn"])
        );
        assert_eq!(
            visibility_checks(&mobile),
            (vec!["#rss-share-btn"], vec!["#rss-copy-btn"])
        );

        let ua = mobile.browser.user_agent.as_deref().unwrap_or_default();
        assert!(ua.contains("iPhone"), "{}", ua);
        let viewport = mobile.browser.viewport.expect("mobile viewport");
        assert_eq!((viewport.width, viewport.height), (375, 667));

        let ua = desktop.browser.user_agent.as_deref().unwrap_or_default();
        assert!(!ua.contains("iPhone") && !ua.contains("Android"), "{}", ua);
    }

    #[test]
    fn test_copy_label_reverts_within_bound() {
        let config = load("rss-prompt-copy", &Params::new()).unwrap();
        let waits: Vec<_> = config
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::WaitForText(w) => Some((w.text.as_str(), w.timeout_ms)),
                _ => None,
            })
            .collect();

        assert_eq!(waits, vec![("Copied!", 10_000), ("Copy RSS URL", 2500)]);
        assert!(config
            .steps
            .iter()
            .any(|s| matches!(s, Step::Click(c) if c.selector == "#rss-copy-btn")));
    }

    #[test]
    fn test_unknown_scenario() {
        let err = load("nope", &Params::new()).unwrap_err();
        assert!(err.to_string().contains("rss-prompt"));
    }
}
