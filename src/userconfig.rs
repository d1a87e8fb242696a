//! User config store (C8): the single `{slippage}` record at
//! `~/.hl/user-config.json`, read by ordering flows and written by `config`
//! commands.
//!
//! Load is a total function: a missing file, an empty file, and malformed
//! JSON all collapse to [`UserConfig::default`] rather than raising. Save
//! shallow-merges onto whatever is currently on disk and writes atomically
//! (temp file + rename), following `app/status_file.rs`'s `StatusWriter`
//! pattern.

use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const DEFAULT_SLIPPAGE: Decimal = dec!(1.0);

/// Converts market orders into IOC limit orders priced at
/// `mid × (1 ± slippage/100)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UserConfig {
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,
}

fn default_slippage() -> Decimal {
    DEFAULT_SLIPPAGE
}

impl Default for UserConfig {
    fn default() -> Self {
        Self { slippage: DEFAULT_SLIPPAGE }
    }
}

/// A patch applied on top of the currently-loaded config by [`save`].
/// Unset fields are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserConfigUpdate {
    pub slippage: Option<Decimal>,
}

impl UserConfig {
    fn merge(self, update: UserConfigUpdate) -> Self {
        Self { slippage: update.slippage.unwrap_or(self.slippage) }
    }
}

/// Loads the user config at `path`. Any I/O or parse error — missing file,
/// empty file, malformed JSON, unrecognized keys — collapses to the
/// defaults; unrecognized keys are otherwise ignored by serde's derive.
pub fn load(path: &Path) -> UserConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return UserConfig::default();
    };
    serde_json::from_str(&contents).unwrap_or_default()
}

/// Shallow-merges `update` onto the record currently on disk (loaded fresh,
/// not cached) and writes the result back atomically: write to a sibling
/// temp file, then rename over the target so a crash mid-write never
/// corrupts a subsequent read.
pub fn save(path: &Path, update: UserConfigUpdate) -> crate::error::Result<UserConfig> {
    let merged = load(path).merge(update);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serde_json::to_vec_pretty(&merged)?)?;
    fs::rename(&tmp_path, path)?;

    Ok(merged)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
