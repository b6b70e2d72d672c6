#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod signature;

// The deployed voting program; its accounts report it as their owner.
anchor_lang::declare_id!("8Z52ChpaMPvvnSVjSrQmJirxiqpuNvQSprUebVWXyaCs");

/// Assemble the server: configuration, database and chain connections,
/// request logging, and the API routes.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(config::ChainFairing)
        .attach(logging::LoggerFairing)
        .mount("/", api::routes())
}
