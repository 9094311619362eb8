//! ham-core
//!
//! The server lifecycle engine behind `ham`.
//!
//! ```text
//! Project ── envs/<name> ──> Environment ── servers/<name> ──> Server
//!    │                            │                               │
//!    └─ BlueprintRegistry         └─ build / wait / teardown      └─ boot / refresh / delete
//!                                                                     │
//!                                                          CloudGateway (ham-cloud)
//! ```
//!
//! Every mutation of a server is written back to its `conf.d/` directory
//! before the call returns, so an interrupted process leaves the tree as of
//! the last completed gateway call.

pub mod blueprint;
pub mod environment;
pub mod error;
pub mod project;
pub mod server;
pub mod settings;
pub mod templates;
pub mod wait;

pub use blueprint::{
    BootArgs, Blueprint, BlueprintRegistry, DEFAULT_FLAVOR_ID, DEFAULT_IMAGE_ID,
    NamedServersBlueprint,
};
pub use environment::{BuildPolicy, Environment, EnvironmentStatus, FABFILE_NAME, validate_name};
pub use error::{CoreError, Result};
pub use project::{PROJECT_FILE_NAME, Project, WORKON_FILE_NAME};
pub use server::{Server, ServerState};
pub use settings::{DEFAULT_BLUEPRINT, ProjectSettings};
pub use wait::{DEFAULT_POLL_INTERVAL, Sleeper, TokioSleeper, WaitOptions};
