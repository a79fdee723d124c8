//! CLI command: `quotabar config`
//!
//! Prints the effective configuration after all layers and clamping.

use crate::auth::ChainAuthProvider;
use crate::config::AppConfig;

/// Run the config subcommand.
pub fn run(app: &AppConfig) -> anyhow::Result<()> {
    println!("{}", render(app)?);
    let chain = ChainAuthProvider::from_config(&app.auth);
    println!("# credential lookup order: {}", chain.names().join(" -> "));
    Ok(())
}

fn render(app: &AppConfig) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(app)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_round_trips_through_toml() {
        let text = render(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.usage, AppConfig::default().usage);
        assert_eq!(parsed.endpoint.url, quotabar_client::DEFAULT_ENDPOINT);
        assert!(text.contains("[usage]"));
    }
}
