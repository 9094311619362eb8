//! Project-wide settings stored in `<project-root>/conf.d/`

use crate::environment::BuildPolicy;
use crate::error::Result;
use crate::wait::{DEFAULT_POLL_INTERVAL, WaitOptions};
use ham_config::{Attribute, Record, Value, ValueKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Blueprint used when none is configured
pub const DEFAULT_BLUEPRINT: &str = "default";

const SETTINGS_PREFIX: &str = "10";

const SETTINGS_SCHEMA: &[Attribute] = &[
    Attribute::new("blueprint", "project", ValueKind::Str),
    Attribute::new("poll_interval", "wait", ValueKind::Int),
    Attribute::new("timeout", "wait", ValueKind::Int),
    Attribute::new("fail_fast", "build", ValueKind::Bool),
];

/// Settings read from `conf.d/10_*.conf` at the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Key of the blueprint that populates new environments
    pub blueprint: String,

    /// Seconds between `wait` polling passes
    pub poll_interval: i64,

    /// Seconds before `wait` gives up; 0 disables the deadline
    pub timeout: i64,

    /// Stop `build` at the first failed boot
    pub fail_fast: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            blueprint: DEFAULT_BLUEPRINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL.as_secs() as i64,
            timeout: 0,
            fail_fast: false,
        }
    }
}

impl Record for ProjectSettings {
    fn schema() -> &'static [Attribute] {
        SETTINGS_SCHEMA
    }

    fn value(&self, name: &str) -> Option<Value> {
        match name {
            "blueprint" => Some(self.blueprint.clone().into()),
            "poll_interval" => Some(self.poll_interval.into()),
            "timeout" => Some(self.timeout.into()),
            "fail_fast" => Some(self.fail_fast.into()),
            _ => None,
        }
    }

    fn set_value(&mut self, name: &str, value: Value) -> bool {
        match (name, value) {
            ("blueprint", Value::Str(v)) => self.blueprint = v,
            ("poll_interval", Value::Int(v)) => self.poll_interval = v,
            ("timeout", Value::Int(v)) => self.timeout = v,
            ("fail_fast", Value::Bool(v)) => self.fail_fast = v,
            _ => return false,
        }
        true
    }
}

impl ProjectSettings {
    pub fn conf_dir(project_root: &Path) -> PathBuf {
        project_root.join("conf.d")
    }

    /// Read settings; absent values keep their zero value.
    pub fn load(project_root: &Path) -> Self {
        let mut settings = Self {
            blueprint: String::new(),
            poll_interval: 0,
            timeout: 0,
            fail_fast: false,
        };
        ham_config::load_record(&mut settings, &Self::conf_dir(project_root));
        settings
    }

    pub fn save(&self, project_root: &Path) -> Result<()> {
        ham_config::save_record(self, &Self::conf_dir(project_root), SETTINGS_PREFIX)?;
        Ok(())
    }

    /// Configured blueprint key, or [`DEFAULT_BLUEPRINT`]
    pub fn blueprint_key(&self) -> &str {
        if self.blueprint.is_empty() {
            DEFAULT_BLUEPRINT
        } else {
            &self.blueprint
        }
    }

    pub fn wait_options(&self) -> WaitOptions {
        let interval = if self.poll_interval > 0 {
            Duration::from_secs(self.poll_interval as u64)
        } else {
            DEFAULT_POLL_INTERVAL
        };
        let deadline = (self.timeout > 0).then(|| Duration::from_secs(self.timeout as u64));
        WaitOptions { interval, deadline }
    }

    pub fn build_policy(&self) -> BuildPolicy {
        if self.fail_fast {
            BuildPolicy::FailFast
        } else {
            BuildPolicy::ContinueOnError
        }
    }
}
