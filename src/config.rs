use std::time::Duration;

use mongodb::Client as MongoClient;
use rocket::futures::TryFutureExt;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::chain::{base58, ChainHandle, Pubkey, RpcChainClient};
use crate::model::mongodb::{ensure_indexes_exist, ensure_proposal_id_counter_exists, Coll};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(with = "base58")]
    program_id: Pubkey,
    rpc_url: String,
    commitment: String,
    confirm_attempts: u32,
    confirm_interval_ms: u64,
}

impl Config {
    /// The voting program every proposal and vote account belongs to.
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// JSON-RPC endpoint of the chain node.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Commitment level for queries and confirmations.
    pub fn commitment(&self) -> &str {
        &self.commitment
    }

    /// How many times to poll for a transaction's confirmation.
    pub fn confirm_attempts(&self) -> u32 {
        self.confirm_attempts
    }

    pub fn confirm_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_interval_ms)
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Voting program is {}", config.program_id());

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Ensure the required indexes and the proposal ID counter exist.
        let counters = Coll::from_db(&db);
        if let Err(e) = ensure_indexes_exist(&db)
            .and_then(|_| ensure_proposal_id_counter_exists(&counters))
            .await
        {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "signedvoting".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// A fairing that builds the chain RPC client from the application config
/// and places a [`ChainHandle`] into managed state. Must be attached after
/// [`ConfigFairing`].
pub struct ChainFairing;

#[rocket::async_trait]
impl Fairing for ChainFairing {
    fn info(&self) -> Info {
        Info {
            name: "Chain RPC",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>().cloned() else {
            error!("Chain client needs the application config");
            return Err(rocket);
        };
        let client = RpcChainClient::new(
            config.rpc_url(),
            config.commitment(),
            config.confirm_attempts(),
            config.confirm_interval(),
        );
        info!("Using chain RPC at {}", config.rpc_url());
        Ok(rocket.manage(ChainHandle::new(client)))
    }
}
