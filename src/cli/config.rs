use std::{io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::notify::DEFAULT_CHECKLIST_NAME;

pub const CONFIG_FILE: &str = "config.json";

/// Contents of `config.json` in the application directory. Every field is optional in the
/// file.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct TimecardConfig {
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_checklist_name")]
    pub checklist_name: String,
}

fn default_checklist_name() -> String {
    DEFAULT_CHECKLIST_NAME.to_string()
}

impl Default for TimecardConfig {
    fn default() -> Self {
        Self {
            member_id: None,
            display_name: None,
            checklist_name: default_checklist_name(),
        }
    }
}

impl TimecardConfig {
    /// Loads the configuration, or returns defaults if the file doesn't exist yet.
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = app_dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse configuration file {path:?}")),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read configuration file {path:?}")),
        }
    }

    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let path = app_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write configuration file {path:?}"))
    }

    /// Display name only applies to the configured member. Acting as someone else through
    /// `--member` drops it.
    pub fn identity_for(&self, member_override: Option<String>) -> (Option<String>, Option<String>) {
        match member_override {
            Some(member) if Some(&member) != self.member_id.as_ref() => (Some(member), None),
            _ => (self.member_id.clone(), self.display_name.clone()),
        }
    }
}
