pub mod access;
pub mod health;
pub mod tenant;
pub mod whoami;
