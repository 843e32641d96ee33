use crate::config::types::{
    BrowserConfig, Config, DiscoveryConfig, EnrichmentConfig, TargetConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration, including the target
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_settings(config)?;
    validate_target(&config.target)?;
    Ok(())
}

/// Validates everything except the target
///
/// The target is usually supplied after the file is loaded (command line
/// or prompt), so file loading only checks the rest.
pub fn validate_settings(config: &Config) -> Result<(), ConfigError> {
    validate_discovery_config(&config.discovery)?;
    validate_enrichment_config(&config.enrichment)?;
    validate_browser_config(&config.browser)?;
    Ok(())
}

/// Validates the target section
pub fn validate_target(target: &TargetConfig) -> Result<(), ConfigError> {
    if target.handle.is_empty() {
        return Err(ConfigError::Validation(
            "target handle cannot be empty".to_string(),
        ));
    }

    if target.handle.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "target handle must not contain whitespace, got '{}'",
            target.handle
        )));
    }

    if target.handle.contains('/') || target.handle.contains('?') || target.handle.contains('#') {
        return Err(ConfigError::Validation(format!(
            "target handle must not contain URL delimiters, got '{}'",
            target.handle
        )));
    }

    Ok(())
}

fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.load_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "discovery load-timeout must be >= 100ms, got {}ms",
            config.load_timeout
        )));
    }

    validate_selector("discovery.item-selector", &config.item_selector)?;
    validate_selector("discovery.link-selector", &config.link_selector)?;
    validate_selector("discovery.views-selector", &config.views_selector)?;

    Ok(())
}

fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "enrichment navigation-timeout must be >= 100ms, got {}ms",
            config.navigation_timeout
        )));
    }

    let selectors = &config.selectors;
    validate_selector("enrichment.selectors.likes", &selectors.likes)?;
    validate_selector("enrichment.selectors.comments", &selectors.comments)?;
    validate_selector("enrichment.selectors.shares", &selectors.shares)?;
    validate_selector("enrichment.selectors.caption", &selectors.caption)?;
    validate_selector("enrichment.selectors.upload-time", &selectors.upload_time)?;

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    for (name, value) in [
        ("window-width", config.window_width),
        ("window-height", config.window_height),
    ] {
        if value == Some(0) {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

/// Checks that a selector is non-empty and parses as CSS
fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!("{} cannot be empty", name)));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.target.handle = "someone".to_string();
        config.target.count = 5;
        config
    }

    #[test]
    fn test_default_config_with_target_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_handle_rejected() {
        let mut config = valid_config();
        config.target.handle = String::new();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_settings_ignore_missing_handle() {
        let config = Config::default();
        assert!(validate_settings(&config).is_ok());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_handle_with_space_rejected() {
        let mut config = valid_config();
        config.target.handle = "some one".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_handle_with_slash_rejected() {
        let mut config = valid_config();
        config.target.handle = "a/b".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut config = valid_config();
        config.discovery.item_selector = "div[[".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_empty_selector_rejected() {
        let mut config = valid_config();
        config.enrichment.selectors.caption = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_short_timeout_rejected() {
        let mut config = valid_config();
        config.enrichment.navigation_timeout = 10;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = valid_config();
        config.browser.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.browser.base_url = "ftp://example.com".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_window_size_rejected() {
        let mut config = valid_config();
        config.browser.window_width = Some(0);
        assert!(validate(&config).is_err());
    }
}
