//! Config command handler

use anyhow::Result;
use tonbag_app::AppConfig;

use crate::ConfigAction;

/// Handle `config` subcommands.
pub fn handle_config(config: &AppConfig, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml_string()?);
        }
        ConfigAction::Check => {
            // load_config already validated
            println!(
                "configuration ok: polling every {} ms, default deposit {} TON",
                config.polling.interval_ms, config.transaction.default_deposit
            );
        }
    }
    Ok(())
}
