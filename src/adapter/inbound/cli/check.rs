//! `check` command: validate a configuration file.

use std::path::Path;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::cloud::factory::transport_settings;
use crate::infrastructure::config::settings::Config;

/// Load and validate the configuration at `config_path` and print what the
/// gateway would run with.
pub fn execute<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    let config = Config::load(path)?;
    let settings = transport_settings(&config.upstream)?;

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Gateway");
    output::field("Identity", config.gateway.identity());
    output::field("Hostname", &config.gateway.hostname);

    output::section("Upstream");
    output::field("Protocol", settings.protocol);
    match settings.pool_size {
        Some(size) => output::field("Pool size", size),
        None => output::field("Pool size", "n/a"),
    }
    match (&settings.proxy, &config.upstream.proxy) {
        (Some(proxy), _) => output::field("Proxy", proxy),
        (None, Some(_)) => output::warning("Proxy configured but ignored: protocol is not WebSocket"),
        (None, None) => output::field("Proxy", "none"),
    }
    output::field(
        "Op timeout",
        format!("{}s", settings.operation_timeout.as_secs()),
    );

    output::section("Connectivity");
    output::field(
        "Connected probe",
        format!("every {}s", config.connectivity.connected_interval().as_secs()),
    );
    output::field(
        "Offline probe",
        format!("every {}s", config.connectivity.disconnected_interval().as_secs()),
    );
    output::field(
        "Token buffer",
        format!("{}s", config.token.expiry_buffer().as_secs()),
    );

    let pool = &config.connection_pool;
    if pool.close_on_idle_timeout {
        output::field(
            "Idle close",
            format!(
                "after {}s, checked every {}s",
                pool.idle_timeout().as_secs(),
                pool.idle_check_interval().as_secs()
            ),
        );
    } else {
        output::field("Idle close", "disabled");
    }

    output::success("Configuration check complete");
    Ok(())
}
