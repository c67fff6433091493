use clap::Parser;
use minke_dns_application::ports::HostRegistry;
use minke_dns_application::use_cases::DnsServerOptions;
use minke_dns_domain::{CliOverrides, Config};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "minke-dns")]
#[command(version)]
#[command(about = "MinkeBox DNS - local zone, mDNS bridge and upstream router")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting MinkeBox DNS v{}", env!("CARGO_PKG_VERSION"));
    match cli.config.as_deref().map(str::to_string).or_else(Config::get_config_path) {
        Some(path) => info!(path = %path, "Configuration loaded"),
        None => info!("No configuration file found, using defaults"),
    }

    let services = di::DnsServices::new(&config).await?;
    let use_cases = di::UseCases::new(&services, &config);

    apply_local_zone(&config, &use_cases, &services);
    apply_upstreams(&config, &use_cases, &services).await?;

    let shutdown = CancellationToken::new();
    let dns_addr = format!("{}:{}", config.server.bind_address, config.server.dns_port);
    let dns_server = tokio::spawn(server::start_dns_server(
        dns_addr,
        services.handler.clone(),
        config.server.tcp_enabled,
        Duration::from_millis(config.server.udp_retry_backoff_ms),
        shutdown.clone(),
    ));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
        }
        finished = dns_server => {
            match finished {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "DNS server error"),
                Err(e) => error!(error = %e, "DNS server task failed"),
            }
        }
    }

    shutdown.cancel();
    services.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

fn apply_local_zone(config: &Config, use_cases: &di::UseCases, services: &di::DnsServices) {
    if let Err(e) = use_cases.set_domain_name.execute(&config.dns.domain_name) {
        warn!(domain = %config.dns.domain_name, error = %e, "Ignoring invalid domain name");
    }

    if let (Some(hostname), Some(ipv4)) = (&config.dns.hostname, config.dns.host_ipv4) {
        services
            .authoritative
            .set_hostname(hostname, ipv4, config.dns.host_ipv6);
        info!(hostname = %hostname, ipv4 = %ipv4, "Box hostname registered");
    }

    for host in &config.dns.hosts {
        let ipv4 = host.ipv4.to_string();
        let ipv6 = host.ipv6.map(|ip| ip.to_string());
        if let Err(e) = use_cases.register_host.execute(
            &host.local_name,
            host.global_name.as_deref(),
            &ipv4,
            ipv6.as_deref(),
        ) {
            warn!(host = %host.local_name, error = %e, "Skipping host registration");
        }
    }
}

async fn apply_upstreams(
    config: &Config,
    use_cases: &di::UseCases,
    services: &di::DnsServices,
) -> anyhow::Result<()> {
    use_cases
        .set_default_resolver
        .execute(config.dns.primary_resolver(), config.dns.secondary_resolver())
        .await?;

    for spec in &config.dns.servers {
        let options = DnsServerOptions {
            port: spec.port,
            use_address_translation: spec.use_address_translation,
            timeout_ms: spec.timeout_ms,
            priority: spec.priority,
        };
        let address = spec.address.to_string();
        if let Err(e) = use_cases
            .add_dns_server
            .execute(&spec.identity, &address, options)
            .await
        {
            warn!(server = %spec.identity, error = %e, "Skipping DNS server");
        }
    }

    if services.ordering.send(config.dns.server_ordering()).is_err() {
        warn!("Upstream ordering watcher stopped");
    }

    info!(
        upstreams = ?services.router.upstream_identities(),
        strategy = services.router.strategy().as_str(),
        "Upstream resolvers configured"
    );
    Ok(())
}
