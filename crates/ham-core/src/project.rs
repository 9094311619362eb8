//! Project registry
//!
//! A project is the root directory holding every environment, the selected
//! environment pointer and the project settings. Nothing is cached between
//! invocations: [`Project::open`] rebuilds everything from disk.

use crate::blueprint::BlueprintRegistry;
use crate::environment::{self, Environment};
use crate::error::{CoreError, Result};
use crate::settings::ProjectSettings;
use crate::templates;
use ham_cloud::CloudGateway;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Blueprint hook source at the project root
pub const PROJECT_FILE_NAME: &str = "project.py";

/// Marker file holding the selected environment name
pub const WORKON_FILE_NAME: &str = ".workon";

/// Root registry of environments
pub struct Project {
    root: PathBuf,
    envs_root: PathBuf,
    environments: BTreeMap<String, Environment>,
    workon_environment: String,
    settings: ProjectSettings,
    gateway: Arc<dyn CloudGateway>,
    blueprints: BlueprintRegistry,
}

impl Project {
    /// Open the project at `root` and load every environment.
    ///
    /// A root that was never initialized opens as an empty project.
    pub fn open(
        root: impl Into<PathBuf>,
        gateway: Arc<dyn CloudGateway>,
        blueprints: BlueprintRegistry,
    ) -> Result<Self> {
        let root = root.into();
        let mut project = Self {
            envs_root: root.join("envs"),
            root,
            environments: BTreeMap::new(),
            workon_environment: String::new(),
            settings: ProjectSettings::default(),
            gateway,
            blueprints,
        };
        project.load()?;
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn envs_root(&self) -> &Path {
        &self.envs_root
    }

    pub fn project_file_path(&self) -> PathBuf {
        self.root.join(PROJECT_FILE_NAME)
    }

    fn workon_path(&self) -> PathBuf {
        self.envs_root.join(WORKON_FILE_NAME)
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &Arc<dyn CloudGateway> {
        &self.gateway
    }

    pub fn blueprints(&self) -> &BlueprintRegistry {
        &self.blueprints
    }

    /// Environments keyed by name
    pub fn environments(&self) -> &BTreeMap<String, Environment> {
        &self.environments
    }

    /// Selected environment name, empty when nothing is selected
    pub fn workon_environment(&self) -> &str {
        &self.workon_environment
    }

    /// Re-scan settings, environments and the workon pointer from disk.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load(&mut self) -> Result<()> {
        self.settings = ProjectSettings::load(&self.root);

        self.environments = BTreeMap::new();
        for name in environment::list_entries(&self.envs_root)? {
            let env = Environment::new(&self.envs_root, name.clone(), Arc::clone(&self.gateway))?;
            self.environments.insert(name, env);
        }

        self.workon_environment = match fs::read_to_string(self.workon_path()) {
            Ok(text) => text.lines().next().unwrap_or_default().trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if !self.workon_environment.is_empty()
            && !self.environments.contains_key(&self.workon_environment)
        {
            debug!(stale = %self.workon_environment, "Ignoring stale workon pointer");
            self.workon_environment.clear();
        }

        debug!(environments = self.environments.len(), "Loaded project");
        Ok(())
    }

    /// Create the on-disk skeleton. Fails if the project already exists.
    pub fn init(&mut self) -> Result<()> {
        if self.envs_root.exists() {
            return Err(CoreError::ProjectExists(self.root.clone()));
        }

        fs::create_dir_all(&self.envs_root)?;
        fs::write(self.workon_path(), "")?;
        templates::write_project_file(&self.project_file_path())?;
        ProjectSettings::default().save(&self.root)?;

        info!(root = %self.root.display(), "Initialized project");
        self.load()
    }

    /// Persist the selected environment; an empty name clears the selection.
    pub fn workon(&mut self, name: &str) -> Result<()> {
        if !name.is_empty() && !self.environments.contains_key(name) {
            return Err(CoreError::Lookup(format!("no environment named '{}'", name)));
        }

        fs::create_dir_all(&self.envs_root)?;
        fs::write(self.workon_path(), name)?;
        self.workon_environment = name.to_string();
        debug!(environment = name, "Updated workon pointer");
        Ok(())
    }

    /// Name `name` resolves to: the explicit name, else the workon pointer.
    pub fn resolve_name<'a>(&'a self, name: Option<&'a str>) -> Result<&'a str> {
        let key = name
            .filter(|n| !n.is_empty())
            .unwrap_or(self.workon_environment.as_str());
        if key.is_empty() {
            return Err(CoreError::Lookup(
                "no environment given and not working on any environment".to_string(),
            ));
        }
        if !self.environments.contains_key(key) {
            return Err(CoreError::Lookup(format!("no environment named '{}'", key)));
        }
        Ok(key)
    }

    pub fn get_environment(&self, name: Option<&str>) -> Result<&Environment> {
        let key = self.resolve_name(name)?.to_string();
        self.environments
            .get(&key)
            .ok_or_else(|| CoreError::Lookup(format!("no environment named '{}'", key)))
    }

    pub fn get_environment_mut(&mut self, name: Option<&str>) -> Result<&mut Environment> {
        let key = self.resolve_name(name)?.to_string();
        self.environments
            .get_mut(&key)
            .ok_or_else(|| CoreError::Lookup(format!("no environment named '{}'", key)))
    }

    /// Create environment `name` with the configured blueprint.
    ///
    /// Not atomic: if the blueprint adds no servers the directory it left
    /// behind stays on disk and `EmptyEnvironment` is returned.
    #[tracing::instrument(skip(self, extra_args))]
    pub fn create(&mut self, name: &str, extra_args: &[String]) -> Result<&Environment> {
        environment::validate_name(name)?;
        if self.environments.contains_key(name) {
            return Err(CoreError::EnvironmentExists(name.to_string()));
        }

        let blueprint = self.blueprints.get(self.settings.blueprint_key())?;
        let mut env = Environment::new(&self.envs_root, name, Arc::clone(&self.gateway))?;
        blueprint.populate(&mut env, extra_args)?;

        env.load()?;
        if env.is_empty() {
            warn!(environment = name, "Blueprint created no servers");
            return Err(CoreError::EmptyEnvironment(name.to_string()));
        }

        templates::write_fabfile(&env.fabfile_path(), &self.root, name)?;
        info!(environment = name, servers = env.servers().len(), "Created environment");

        Ok(self.environments.entry(name.to_string()).or_insert(env))
    }

    /// Delete an environment's files after checking no server is active.
    ///
    /// Clears the workon pointer when it named the deleted environment.
    pub async fn delete_environment(&mut self, name: Option<&str>) -> Result<String> {
        let key = self.resolve_name(name)?.to_string();
        if let Some(env) = self.environments.get_mut(&key) {
            env.delete().await?;
        }
        self.environments.remove(&key);

        if self.workon_environment == key {
            self.workon("")?;
        }
        Ok(key)
    }
}
