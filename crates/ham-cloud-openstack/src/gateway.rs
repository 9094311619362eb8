//! OpenStack gateway implementation

use crate::cli::{CreateServerConfig, OpenStackCli};
use crate::error::OpenStackError;
use async_trait::async_trait;
use ham_cloud::{AuthStatus, BootRequest, BootedInstance, CloudGateway, InstanceStatus};

/// OpenStack compute gateway
#[derive(Debug, Clone, Default)]
pub struct OpenStackGateway {
    cli: OpenStackCli,
}

impl OpenStackGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli(cli: OpenStackCli) -> Self {
        Self { cli }
    }

    pub fn cli(&self) -> &OpenStackCli {
        &self.cli
    }
}

#[async_trait]
impl CloudGateway for OpenStackGateway {
    fn name(&self) -> &str {
        "openstack"
    }

    async fn check_auth(&self) -> ham_cloud::Result<AuthStatus> {
        match self.cli.check_auth().await {
            Ok(token) => Ok(AuthStatus::ok(format!(
                "project {} (user {})",
                token.project_id, token.user_id
            ))),
            Err(OpenStackError::CliNotFound) => {
                Ok(AuthStatus::failed("openstack CLI is not installed"))
            }
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn boot(&self, request: &BootRequest) -> ham_cloud::Result<BootedInstance> {
        tracing::info!("Creating server: {}", request.name);

        let config = CreateServerConfig {
            name: request.name.clone(),
            image: request.image_id.clone(),
            flavor: request.flavor_id.clone(),
            disk_config: request.disk_config.clone(),
        };
        let server = self.cli.create_server(&config).await?;

        Ok(BootedInstance {
            id: server.id,
            admin_pass: server.admin_pass.unwrap_or_default(),
            status: server.status,
        })
    }

    async fn status(&self, server_id: &str) -> ham_cloud::Result<InstanceStatus> {
        if server_id.is_empty() {
            return Ok(InstanceStatus::not_found());
        }

        match self.cli.show_server(server_id).await {
            Ok(server) => {
                let ip_address = server.ip_address();
                Ok(InstanceStatus::new(server.status, ip_address))
            }
            Err(OpenStackError::ServerNotFound(_)) => {
                tracing::debug!("Server {} not found", server_id);
                Ok(InstanceStatus::not_found())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, server_id: &str) -> ham_cloud::Result<()> {
        if server_id.is_empty() {
            tracing::debug!("Skipping delete of a server that was never booted");
            return Ok(());
        }

        tracing::info!("Deleting server: {}", server_id);
        self.cli.delete_server(server_id).await?;
        Ok(())
    }
}
