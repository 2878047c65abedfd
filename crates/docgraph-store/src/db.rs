//! Database connection management
//!
//! Turns connection parameters into driver options and a verified handle.

use std::time::Duration;

use bson::doc;
use mongodb::options::{ClientOptions, Tls, TlsOptions};
use mongodb::sync::Client;

use crate::config::{Config, Driver};
use crate::errors::{from_mongo, Result};

pub const MAX_IDLE_TIME: Duration = Duration::from_secs(5);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(15);

/// Driver options for the caller's URI with the pool timeouts and TLS applied
///
/// Timeouts already given in the URI win. A configured certificate enables
/// TLS with that CA file.
///
/// # Errors
///
/// `InvalidInput` for a malformed URI.
pub fn client_options(config: &Config) -> Result<ClientOptions> {
    let mut options =
        ClientOptions::parse(config.uri.expose()).map_err(|e| from_mongo("connect", e))?;

    options.max_idle_time.get_or_insert(MAX_IDLE_TIME);
    options.connect_timeout.get_or_insert(CONNECT_TIMEOUT);
    options
        .server_selection_timeout
        .get_or_insert(SERVER_SELECTION_TIMEOUT);

    if let Some(path) = &config.certificate_path {
        let tls = TlsOptions::builder()
            .ca_file_path(path.clone())
            .allow_invalid_certificates(config.allow_invalid_certificates.then_some(true))
            .build();
        options.tls = Some(Tls::Enabled(tls));
    }
    Ok(options)
}

/// Connect with the configured parameters and verify the server answers
///
/// # Errors
///
/// `Connection` when no server is reachable within the selection timeout;
/// `InvalidInput` for a malformed URI.
pub fn connect(config: &Config) -> Result<Driver> {
    let client =
        Client::with_options(client_options(config)?).map_err(|e| from_mongo("connect", e))?;
    let database = client.database(&config.db_name);

    database
        .run_command(doc! { "ping": 1 }, None)
        .map_err(|e| from_mongo("ping", e))?;

    tracing::info!(database = %config.db_name, "connected to document store");
    Ok(Driver { client, database })
}
