//! Environment orchestration
//!
//! An environment is a directory of servers that are built, waited on, torn
//! down and deleted together.

use crate::error::{CoreError, Result};
use crate::server::Server;
use crate::wait::{Sleeper, WaitOptions};
use ham_cloud::CloudGateway;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name of the generated task-runner entry point
pub const FABFILE_NAME: &str = "fabfile.py";

/// What `build` does after a failed boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildPolicy {
    /// Attempt every server, then return the first error
    #[default]
    ContinueOnError,
    /// Stop at the first error
    FailFast,
}

/// Aggregate status of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentStatus {
    Active,
    NotActive,
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentStatus::Active => write!(f, "ACTIVE"),
            EnvironmentStatus::NotActive => write!(f, "NOT_ACTIVE"),
        }
    }
}

/// Reject names that cannot be used as a single directory component.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains('/') {
        return Err(CoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Sorted names of the visible subdirectories of `dir`; a missing `dir` has none.
pub(crate) fn list_entries(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// A named group of servers sharing one lifecycle
pub struct Environment {
    name: String,
    root: PathBuf,
    servers: BTreeMap<String, Server>,
    gateway: Arc<dyn CloudGateway>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("servers", &self.servers)
            .field("gateway", &self.gateway.name())
            .finish()
    }
}

impl Environment {
    /// Open the environment at `<envs_root>/<name>` and load its servers.
    pub fn new(envs_root: &Path, name: impl Into<String>, gateway: Arc<dyn CloudGateway>) -> Result<Self> {
        let name = name.into();
        let mut env = Self {
            root: envs_root.join(&name),
            name,
            servers: BTreeMap::new(),
            gateway,
        };
        env.load()?;
        Ok(env)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn servers_root(&self) -> PathBuf {
        self.root.join("servers")
    }

    pub fn fabfile_path(&self) -> PathBuf {
        self.root.join(FABFILE_NAME)
    }

    pub fn gateway(&self) -> &Arc<dyn CloudGateway> {
        &self.gateway
    }

    /// Servers keyed by name
    pub fn servers(&self) -> &BTreeMap<String, Server> {
        &self.servers
    }

    pub fn server(&self, name: &str) -> Option<&Server> {
        self.servers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Re-read every server from disk
    pub fn load(&mut self) -> Result<()> {
        let servers_root = self.servers_root();
        self.servers = list_entries(&servers_root)?
            .into_iter()
            .map(|name| (name.clone(), Server::new(&servers_root, name)))
            .collect();
        debug!(environment = %self.name, servers = self.servers.len(), "Loaded environment");
        Ok(())
    }

    /// Active when every server is; an empty environment counts as active.
    pub fn is_active(&self) -> bool {
        self.servers.values().all(Server::is_active)
    }

    pub fn status(&self) -> EnvironmentStatus {
        if self.is_active() {
            EnvironmentStatus::Active
        } else {
            EnvironmentStatus::NotActive
        }
    }

    /// Add a server with the given boot parameters and persist it.
    pub fn create_server<'a, I>(&mut self, name: &str, attrs: I) -> Result<&Server>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        validate_name(name)?;
        if self.servers.contains_key(name) {
            return Err(CoreError::ServerExists(name.to_string()));
        }

        let mut server = Server::new(&self.servers_root(), name);
        for (key, value) in attrs {
            server.set_boot_parameter(key, value)?;
        }
        server.save()?;
        debug!(environment = %self.name, server = name, "Created server");

        Ok(self.servers.entry(name.to_string()).or_insert(server))
    }

    /// Boot every server that is not already active.
    pub async fn build(&mut self) -> Result<()> {
        self.build_with(BuildPolicy::default()).await
    }

    #[tracing::instrument(skip(self), fields(environment = %self.name))]
    pub async fn build_with(&mut self, policy: BuildPolicy) -> Result<()> {
        let gateway = Arc::clone(&self.gateway);
        let mut first_error: Option<CoreError> = None;

        for server in self.servers.values_mut() {
            if server.is_active() {
                debug!(server = %server.name(), "Already active, skipping boot");
                continue;
            }
            if let Err(e) = server.boot(gateway.as_ref()).await {
                if policy == BuildPolicy::FailFast {
                    return Err(e);
                }
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!(server = %server.name(), error = %e, "Boot failed");
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Refresh every server from the gateway
    pub async fn refresh(&mut self) -> Result<()> {
        let gateway = Arc::clone(&self.gateway);
        for server in self.servers.values_mut() {
            server.refresh(gateway.as_ref()).await?;
        }
        Ok(())
    }

    /// Refresh one server and return it
    pub async fn refresh_server(&mut self, name: &str) -> Result<&Server> {
        let gateway = Arc::clone(&self.gateway);
        let server = self.servers.get_mut(name).ok_or_else(|| {
            CoreError::Lookup(format!(
                "no server named '{}' in environment '{}'",
                name, self.name
            ))
        })?;
        server.refresh(gateway.as_ref()).await?;
        Ok(server)
    }

    /// Poll until every server is active, sleeping the default interval
    /// between passes. There is no deadline.
    pub async fn wait(&mut self, sleeper: &dyn Sleeper) -> Result<()> {
        self.wait_with(&WaitOptions::default(), sleeper).await
    }

    /// Poll until every server is active or `options.deadline` worth of
    /// sleeping has passed. A zero interval is rejected.
    #[tracing::instrument(skip(self, sleeper), fields(environment = %self.name))]
    pub async fn wait_with(&mut self, options: &WaitOptions, sleeper: &dyn Sleeper) -> Result<()> {
        // elapsed time is counted in intervals, so zero would never reach a deadline
        if options.interval.is_zero() {
            return Err(CoreError::ZeroPollInterval);
        }
        let gateway = Arc::clone(&self.gateway);
        let mut pending: Vec<String> = self.servers.keys().cloned().collect();
        let mut waited = Duration::ZERO;

        loop {
            let mut still_pending = Vec::with_capacity(pending.len());
            for name in pending {
                let Some(server) = self.servers.get_mut(&name) else {
                    continue;
                };
                server.refresh(gateway.as_ref()).await?;
                if server.is_active() {
                    info!(server = %name, "Server is active");
                    continue;
                }
                if server.status() == ham_cloud::STATUS_NOT_FOUND {
                    warn!(server = %name, "Server not found by the gateway");
                }
                still_pending.push(name);
            }
            pending = still_pending;

            if pending.is_empty() {
                return Ok(());
            }
            if let Some(deadline) = options.deadline {
                if waited >= deadline {
                    return Err(CoreError::WaitTimeout {
                        waited_secs: waited.as_secs(),
                        pending: pending.join(", "),
                    });
                }
            }

            debug!(pending = pending.len(), interval = ?options.interval, "Waiting for servers");
            sleeper.sleep(options.interval).await;
            waited += options.interval;
        }
    }

    /// Request deletion of every server's instance, whatever its status.
    ///
    /// Every server is attempted; the first error is returned.
    #[tracing::instrument(skip(self), fields(environment = %self.name))]
    pub async fn teardown(&self) -> Result<()> {
        let mut first_error: Option<CoreError> = None;
        for server in self.servers.values() {
            if let Err(e) = server.delete(self.gateway.as_ref()).await {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!(server = %server.name(), error = %e, "Delete failed");
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Remove the environment's directory tree.
    ///
    /// Statuses are refreshed first; any server still active aborts with
    /// `StillActive` and nothing is removed.
    #[tracing::instrument(skip(self), fields(environment = %self.name))]
    pub async fn delete(&mut self) -> Result<()> {
        self.refresh().await?;

        let active: Vec<&str> = self
            .servers
            .values()
            .filter(|s| s.is_active())
            .map(Server::name)
            .collect();
        if !active.is_empty() {
            return Err(CoreError::StillActive {
                environment: self.name.clone(),
                servers: active.join(", "),
            });
        }

        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.servers.clear();
        info!(environment = %self.name, "Deleted environment");
        Ok(())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.status())
    }
}
