pub mod auth;
pub mod fab;
pub mod lifecycle;
pub mod project;
pub mod status;
