//! ham compute gateway
//!
//! The only seam between ham and a remote compute service. The core state
//! machine talks to a [`CloudGateway`]; concrete gateways live in their own
//! crates.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │      ham-core (Project/Env/Server)   │
//! └──────────────────┬───────────────────┘
//!                    │ boot / status / delete
//! ┌──────────────────▼───────────────────┐
//! │             ham-cloud                │
//! │   trait CloudGateway { ... }         │
//! └──────────────────┬───────────────────┘
//!                    │
//! ┌──────────────────▼───────────────────┐
//! │        ham-cloud-openstack           │
//! │      (openstack CLI wrapper)         │
//! └──────────────────────────────────────┘
//! ```

pub mod error;
pub mod gateway;

pub use error::{GatewayError, Result};
pub use gateway::{
    AuthStatus, BootRequest, BootedInstance, CloudGateway, InstanceStatus, STATUS_ACTIVE,
    STATUS_NOT_FOUND,
};
