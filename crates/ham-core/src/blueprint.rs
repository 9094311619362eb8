//! Blueprints: the project-specific logic that decides which servers a new
//! environment gets.
//!
//! A [`BlueprintRegistry`] is built once at startup and the project picks an
//! entry by the `[project] blueprint` setting.

use crate::environment::Environment;
use crate::error::{CoreError, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ubuntu Precise image on the original target cloud
pub const DEFAULT_IMAGE_ID: &str = "e19a734c-c7e6-443a-830c-242209c4d65d";

/// Smallest flavor on the original target cloud
pub const DEFAULT_FLAVOR_ID: &str = "2";

/// Populates a fresh environment with servers
pub trait Blueprint: Send + Sync {
    /// One-line description shown in listings
    fn description(&self) -> &str;

    /// Add servers to `env`. `args` are the extra arguments given to
    /// `ham create <name> ...`.
    fn populate(&self, env: &mut Environment, args: &[String]) -> Result<()>;
}

/// Boot parameters accepted by the built-in blueprints
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "ham create <name>", no_binary_name = true)]
pub struct BootArgs {
    /// Image to boot
    #[arg(long, default_value = DEFAULT_IMAGE_ID)]
    pub image_id: String,

    /// Flavor (size) to boot
    #[arg(long, default_value = DEFAULT_FLAVOR_ID)]
    pub flavor_id: String,

    /// Disk partitioning mode (AUTO or MANUAL)
    #[arg(long, default_value = "")]
    pub disk_config: String,
}

impl BootArgs {
    pub fn parse_args(args: &[String]) -> Result<Self> {
        Self::try_parse_from(args).map_err(|e| CoreError::BlueprintArgs(e.to_string()))
    }

    fn attrs(&self) -> [(&str, &str); 3] {
        [
            ("image_id", self.image_id.as_str()),
            ("flavor_id", self.flavor_id.as_str()),
            ("disk_config", self.disk_config.as_str()),
        ]
    }
}

/// Servers with fixed names that share one set of boot parameters
#[derive(Debug, Clone)]
pub struct NamedServersBlueprint {
    description: String,
    server_names: Vec<String>,
}

impl NamedServersBlueprint {
    pub fn new<I, S>(description: impl Into<String>, server_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: description.into(),
            server_names: server_names.into_iter().map(Into::into).collect(),
        }
    }

    /// A single server named `example1`
    pub fn single() -> Self {
        Self::new("one server named example1", ["example1"])
    }

    /// Two servers named `node1` and `node2`
    pub fn pair() -> Self {
        Self::new("two servers named node1 and node2", ["node1", "node2"])
    }

    pub fn server_names(&self) -> &[String] {
        &self.server_names
    }
}

impl Blueprint for NamedServersBlueprint {
    fn description(&self) -> &str {
        &self.description
    }

    fn populate(&self, env: &mut Environment, args: &[String]) -> Result<()> {
        let boot = BootArgs::parse_args(args)?;
        for name in &self.server_names {
            env.create_server(name, boot.attrs())?;
        }
        Ok(())
    }
}

/// Explicit table of blueprints, keyed by the name used in settings
#[derive(Clone, Default)]
pub struct BlueprintRegistry {
    blueprints: BTreeMap<String, Arc<dyn Blueprint>>,
}

impl BlueprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `default` and `pair`
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("default", Arc::new(NamedServersBlueprint::single()));
        registry.register("pair", Arc::new(NamedServersBlueprint::pair()));
        registry
    }

    /// Add or replace a blueprint
    pub fn register(&mut self, key: impl Into<String>, blueprint: Arc<dyn Blueprint>) {
        self.blueprints.insert(key.into(), blueprint);
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn Blueprint>> {
        self.blueprints
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::UnknownBlueprint {
                key: key.to_string(),
                available: self.keys().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.blueprints.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Blueprint)> {
        self.blueprints
            .iter()
            .map(|(key, blueprint)| (key.as_str(), blueprint.as_ref()))
    }
}
