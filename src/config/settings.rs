use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProfileSettings {
    /// Loans are listed and edited for this owner only
    #[serde(default = "default_owner")]
    pub owner: String,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            owner: default_owner(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Months of the schedule shown unless --full is passed
    #[serde(default = "default_schedule_preview")]
    pub schedule_preview: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            schedule_preview: default_schedule_preview(),
        }
    }
}

fn default_owner() -> String {
    "me".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_schedule_preview() -> usize {
    12
}
