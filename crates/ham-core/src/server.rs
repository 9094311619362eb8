//! Server state machine
//!
//! A server moves `Unbuilt` -> `Building` -> `Active` as [`Server::boot`] and
//! [`Server::refresh`] record what the gateway reports. Every mutation is
//! persisted before the call returns.

use crate::error::{CoreError, Result};
use ham_cloud::{BootRequest, CloudGateway, GatewayError, STATUS_ACTIVE};
use ham_config::{Attribute, Record, Value, ValueKind};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SERVER_PREFIX: &str = "20";

const BOOT_SECTION: &str = "boot";

const SERVER_SCHEMA: &[Attribute] = &[
    Attribute::new("image_id", BOOT_SECTION, ValueKind::Str),
    Attribute::new("flavor_id", BOOT_SECTION, ValueKind::Str),
    Attribute::new("disk_config", BOOT_SECTION, ValueKind::Str),
    Attribute::new("server_id", "instance", ValueKind::Str),
    Attribute::new("admin_pass", "instance", ValueKind::Str),
    Attribute::new("ip_address", "instance", ValueKind::Str),
    Attribute::new("status", "cache", ValueKind::Str),
];

/// Lifecycle position derived from `server_id` and `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Never booted
    Unbuilt,
    /// Booted, not yet reported `ACTIVE`
    Building,
    Active,
}

/// One persisted compute instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    name: String,
    root: PathBuf,

    image_id: String,
    flavor_id: String,
    disk_config: String,

    server_id: String,
    admin_pass: String,
    ip_address: String,

    status: String,
}

impl Record for Server {
    fn schema() -> &'static [Attribute] {
        SERVER_SCHEMA
    }

    fn value(&self, name: &str) -> Option<Value> {
        let value = match name {
            "image_id" => &self.image_id,
            "flavor_id" => &self.flavor_id,
            "disk_config" => &self.disk_config,
            "server_id" => &self.server_id,
            "admin_pass" => &self.admin_pass,
            "ip_address" => &self.ip_address,
            "status" => &self.status,
            _ => return None,
        };
        Some(Value::Str(value.clone()))
    }

    fn set_value(&mut self, name: &str, value: Value) -> bool {
        let Value::Str(value) = value else {
            return false;
        };
        let field = match name {
            "image_id" => &mut self.image_id,
            "flavor_id" => &mut self.flavor_id,
            "disk_config" => &mut self.disk_config,
            "server_id" => &mut self.server_id,
            "admin_pass" => &mut self.admin_pass,
            "ip_address" => &mut self.ip_address,
            "status" => &mut self.status,
            _ => return false,
        };
        *field = value;
        true
    }
}

impl Server {
    /// Open the server stored at `<servers_root>/<name>`, loading whatever is
    /// on disk.
    pub fn new(servers_root: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut server = Self {
            root: servers_root.join(&name),
            name,
            image_id: String::new(),
            flavor_id: String::new(),
            disk_config: String::new(),
            server_id: String::new(),
            admin_pass: String::new(),
            ip_address: String::new(),
            status: String::new(),
        };
        server.load();
        server
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("conf.d")
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn flavor_id(&self) -> &str {
        &self.flavor_id
    }

    pub fn disk_config(&self) -> &str {
        &self.disk_config
    }

    /// Remote identifier, empty until the first successful boot
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn admin_pass(&self) -> &str {
        &self.admin_pass
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    /// Last status seen from the gateway
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Reload every attribute from disk. Missing values load as empty.
    pub fn load(&mut self) {
        let conf_dir = self.conf_dir();
        ham_config::load_record(self, &conf_dir);
    }

    pub fn save(&self) -> Result<()> {
        ham_config::save_record(self, &self.conf_dir(), SERVER_PREFIX)?;
        debug!(server = %self.name, "Saved server");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    pub fn state(&self) -> ServerState {
        if self.server_id.is_empty() {
            ServerState::Unbuilt
        } else if self.is_active() {
            ServerState::Active
        } else {
            ServerState::Building
        }
    }

    /// Set a boot parameter (`image_id`, `flavor_id` or `disk_config`).
    ///
    /// Instance and cache attributes belong to the gateway and are rejected.
    pub fn set_boot_parameter(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let is_boot = SERVER_SCHEMA
            .iter()
            .any(|attr| attr.name == name && attr.section == BOOT_SECTION);
        if !is_boot || !self.set_value(name, Value::Str(value.into())) {
            return Err(CoreError::UnknownAttribute(name.to_string()));
        }
        Ok(())
    }

    fn boot_request(&self) -> BootRequest {
        BootRequest::new(&self.name, &self.image_id, &self.flavor_id)
            .with_disk_config(&self.disk_config)
    }

    /// Create the remote instance and record its id, password and status.
    pub async fn boot(&mut self, gateway: &dyn CloudGateway) -> Result<()> {
        if self.is_active() {
            return Err(CoreError::AlreadyActive(self.name.clone()));
        }

        let booted = gateway.boot(&self.boot_request()).await?;
        if booted.id.is_empty() {
            return Err(GatewayError::InvalidResponse(format!(
                "boot of '{}' returned no server id",
                self.name
            ))
            .into());
        }
        self.server_id = booted.id;
        self.admin_pass = booted.admin_pass;
        self.status = booted.status;
        self.save()?;

        info!(server = %self.name, server_id = %self.server_id, status = %self.status, "Booted server");
        Ok(())
    }

    /// Overwrite `ip_address` and `status` from the live instance.
    ///
    /// A vanished instance is recorded as `NOT_FOUND` like any other status.
    pub async fn refresh(&mut self, gateway: &dyn CloudGateway) -> Result<()> {
        let live = gateway.status(&self.server_id).await?;
        self.ip_address = live.ip_address.unwrap_or_default();
        self.status = live.status;
        self.save()?;

        debug!(server = %self.name, status = %self.status, ip = %self.ip_address, "Refreshed server");
        Ok(())
    }

    /// Ask the gateway to delete the instance. Local state is left as is.
    pub async fn delete(&self, gateway: &dyn CloudGateway) -> Result<()> {
        gateway.delete(&self.server_id).await?;
        info!(server = %self.name, server_id = %self.server_id, "Requested server deletion");
        Ok(())
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} id={} ip={}",
            self.name,
            or_dash(&self.status),
            or_dash(&self.server_id),
            or_dash(&self.ip_address)
        )
    }
}
