//! Payload types carried by the three cache slots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Asset symbol → mid-price string.
pub type Mids = HashMap<String, String>;

/// All fields are decimal strings, never floats, to preserve exchange-reported
/// precision. Optional fields reflect markets where the upstream genuinely
/// has no value (e.g. a freshly listed asset with no premium yet).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetContext {
    #[serde(rename = "dayNtlVlm")]
    pub day_ntl_vlm: String,
    pub funding: String,
    #[serde(rename = "impactPxs", skip_serializing_if = "Option::is_none")]
    pub impact_pxs: Option<(String, String)>,
    #[serde(rename = "markPx")]
    pub mark_px: String,
    #[serde(rename = "midPx")]
    pub mid_px: Option<String>,
    #[serde(rename = "openInterest")]
    pub open_interest: String,
    #[serde(rename = "oraclePx")]
    pub oracle_px: String,
    pub premium: Option<String>,
    #[serde(rename = "prevDayPx")]
    pub prev_day_px: String,
    #[serde(rename = "dayBaseVlm")]
    pub day_base_vlm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerpMarketMeta {
    pub symbol: String,
    #[serde(rename = "szDecimals")]
    pub sz_decimals: u32,
    #[serde(rename = "maxLeverage")]
    pub max_leverage: u32,
    #[serde(rename = "onlyIsolated")]
    pub only_isolated: bool,
}
