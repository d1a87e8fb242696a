//! `config set|get|list` command handlers: the only recognized key today is
//! `slippage` (C8's single-field record).

use rust_decimal::Decimal;

use crate::cli::output;
use crate::error::{Error, Result};
use crate::paths;
use crate::userconfig::{self, UserConfigUpdate};

pub fn execute_set(key: &str, value: &str, json: bool) -> Result<()> {
    let path = paths::user_config_path()?;
    match key {
        "slippage" => {
            let slippage: Decimal =
                value.parse().map_err(|_| Error::Other(format!("invalid slippage value: {value}")))?;
            if slippage.is_sign_negative() {
                return Err(Error::Other("slippage must be non-negative".into()));
            }
            let config = userconfig::save(&path, UserConfigUpdate { slippage: Some(slippage) })?;
            if json {
                println!("{}", serde_json::json!({ "slippage": config.slippage }));
            } else {
                output::success(&format!("slippage set to {}", config.slippage));
            }
            Ok(())
        }
        other => Err(Error::Other(format!("unknown config key: {other}"))),
    }
}

pub fn execute_get(key: &str, json: bool) -> Result<()> {
    let path = paths::user_config_path()?;
    let config = userconfig::load(&path);
    match key {
        "slippage" => {
            if json {
                println!("{}", serde_json::json!({ "slippage": config.slippage }));
            } else {
                output::field("slippage", config.slippage);
            }
            Ok(())
        }
        other => Err(Error::Other(format!("unknown config key: {other}"))),
    }
}

pub fn execute_list(json: bool) -> Result<()> {
    let path = paths::user_config_path()?;
    let config = userconfig::load(&path);
    if json {
        println!("{}", serde_json::to_string(&config)?);
    } else {
        output::section("User Config");
        output::field("slippage", config.slippage);
    }
    Ok(())
}
