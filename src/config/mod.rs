mod settings;
pub mod state;

pub use settings::{Config, DisplaySettings, ProfileSettings};
pub use state::{format_loan_id, Counter, Loan, LoanDraft, LoanUpdate, State};

use crate::error::{LoanError, Result};
use directories::ProjectDirs;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.loanbook/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "loanbook") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.loanbook/
    let home = dirs_home().ok_or_else(|| {
        LoanError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".loanbook"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(LoanError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| LoanError::ConfigParse { path, source: e })
}

/// Load config.toml, falling back to defaults when it has not been created
pub fn load_config_or_default(config_dir: &Path) -> Result<Config> {
    if !config_dir.join("config.toml").exists() {
        return Ok(Config::default());
    }
    load_config(config_dir)
}

/// Load loans.toml (empty state if missing)
pub fn load_state(config_dir: &Path) -> Result<State> {
    let path = config_dir.join("loans.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| LoanError::ConfigParse { path, source: e })
}

/// Save loans.toml. Written to a sibling file first and renamed into place,
/// so readers never see a half-written store.
pub fn save_state(config_dir: &Path, state: &State) -> Result<()> {
    let path = config_dir.join("loans.toml");
    let tmp = config_dir.join("loans.toml.tmp");
    let content = toml::to_string_pretty(state)?;
    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    debug!("saved {} loans to {}", state.loans.len(), path.display());
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[profile]
owner = "me"   # loans are stored and listed per owner

[display]
currency_symbol = "$"
schedule_preview = 12   # months shown by 'calc' and 'schedule' without --full
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.profile.owner, "me");
        assert_eq!(config.display.currency_symbol, "$");
        assert_eq!(config.display.schedule_preview, 12);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[display]\ncurrency_symbol = \"€\"\n").unwrap();
        assert_eq!(config.profile.owner, "me");
        assert_eq!(config.display.currency_symbol, "€");
        assert_eq!(config.display.schedule_preview, 12);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config(dir.path()),
            Err(LoanError::ConfigFileNotFound(_))
        ));
        assert_eq!(load_config_or_default(dir.path()).unwrap().profile.owner, "me");
    }

    #[test]
    fn test_bad_config_reports_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "[display\n").unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_state() {
        let dir = TempDir::new().unwrap();
        assert!(load_state(dir.path()).unwrap().loans.is_empty());

        let mut state = State::default();
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        state
            .create(
                "me",
                LoanDraft {
                    name: "Car".to_string(),
                    principal: 12_000.0,
                    interest_rate: 4.9,
                    loan_term: 48,
                    notes: None,
                },
                now,
            )
            .unwrap();
        save_state(dir.path(), &state).unwrap();

        assert!(!dir.path().join("loans.toml.tmp").exists());
        let loaded = load_state(dir.path()).unwrap();
        assert_eq!(loaded.loans, state.loans);
        assert_eq!(loaded.counter.last_id, 1);
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory where loans.toml should be makes the rename fail
        let blocker = dir.path().join("loans.toml");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let err = save_state(dir.path(), &State::default()).unwrap_err();

        assert!(matches!(err, LoanError::Io(_)));
        assert!(!dir.path().join("loans.toml.tmp").exists());
        assert!(blocker.join("keep").exists());
    }
}
