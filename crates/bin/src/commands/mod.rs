pub mod config;
pub mod drivers;
pub mod health;
pub mod serve;
pub mod store;
