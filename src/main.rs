use clap::Parser;
use std::sync::Arc;
use title_ledger_api::utils::{logger, validation::Validate};
use title_ledger_api::{
    ApiServer, AppConfig, HttpLedger, HttpRegistry, LedgerApiError, QueryCorrelator,
    UpdateSubscriber,
};

#[derive(Debug, Parser)]
#[command(name = "title-ledger-api")]
#[command(about = "Title query API and transfer forwarder over a land-title ledger")]
struct Args {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn fail(e: &LedgerApiError) -> ! {
    tracing::error!(
        "{} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("{}", e.user_friendly_message());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let config = match AppConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => Arc::new(config),
        Err(e) => fail(&e),
    };
    tracing::debug!(?config, "Loaded configuration");

    let ledger = match HttpLedger::new(&config.ledger) {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => fail(&e),
    };
    let registry = match HttpRegistry::new(&config.registry) {
        Ok(registry) => Arc::new(registry),
        Err(e) => fail(&e),
    };
    tracing::info!(
        ledger = %ledger.base_url(),
        registry = %config.registry.base_url,
        "Starting title ledger API"
    );

    let subscriber = UpdateSubscriber::new(ledger.clone(), registry).spawn();
    let server = ApiServer::new(config.server.clone(), QueryCorrelator::new(ledger));

    tokio::select! {
        served = server.serve() => {
            if let Err(e) = served {
                fail(&e);
            }
        }
        streamed = subscriber.join() => match streamed {
            Ok(stats) => tracing::info!(?stats, "Subscriber finished"),
            Err(e) => fail(&e),
        },
    }
}
