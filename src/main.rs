use anyhow::Result;
use clap::{Parser, Subcommand};
use dataspace_exchange::config::{ConnectorConfig, StoreConfig};
use dataspace_exchange::exchange::{DescribeOutcome, FetchOutcome, NegotiateOutcome};
use dataspace_exchange::messages::{HttpTransport, RequestDispatcher};
use dataspace_exchange::store::{MemoryStore, ResourceStore, SqliteStore};
use dataspace_exchange::ExchangeService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use url::Url;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dsx", about = "Dataspace exchange connector", version)]
struct Cli {
    /// Path to a connector config file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the caller-facing gateway.
    Serve,
    /// Request a peer's self-description, or one element's description.
    Describe {
        recipient: Url,
        #[arg(long)]
        element_id: Option<Url>,
    },
    /// Negotiate a contract for an artifact. The offer document is read from
    /// the given file.
    Negotiate {
        recipient: Url,
        artifact_id: Url,
        #[arg(long)]
        offer: PathBuf,
    },
    /// Fetch artifact data for an already-described resource.
    Fetch {
        recipient: Url,
        artifact_id: Url,
        #[arg(long)]
        resource_id: Uuid,
        #[arg(long)]
        contract: Option<Url>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = ConnectorConfig::load_or_default(cli.config.as_deref())?;
    let service = Arc::new(build_service(&config).await?);

    match cli.command {
        Command::Serve => {
            dataspace_exchange::gateway::serve(
                service,
                &config.gateway.bind,
                config.gateway.max_body_bytes,
                config.gateway.request_timeout_secs,
            )
            .await
        }
        Command::Describe {
            recipient,
            element_id,
        } => {
            match service.describe(&recipient, element_id.as_ref()).await? {
                DescribeOutcome::SelfDescription { payload } => println!("{payload}"),
                DescribeOutcome::Saved {
                    validation_key,
                    payload,
                } => println!("Validation: {validation_key}\nResponse: {payload}"),
                DescribeOutcome::Rejected(rejection) => println!("{}", rejection.message()),
            }
            Ok(())
        }
        Command::Negotiate {
            recipient,
            artifact_id,
            offer,
        } => {
            let offer_document = tokio::fs::read_to_string(&offer).await?;
            match service
                .negotiate(&recipient, &artifact_id, &offer_document)
                .await?
            {
                NegotiateOutcome::Confirmed { agreement_id } => println!("{agreement_id}"),
                NegotiateOutcome::Rejected(rejection) => println!("{}", rejection.message()),
            }
            Ok(())
        }
        Command::Fetch {
            recipient,
            artifact_id,
            resource_id,
            contract,
        } => {
            match service
                .fetch(&recipient, &artifact_id, contract.as_ref(), resource_id, None)
                .await?
            {
                FetchOutcome::Stored {
                    resource_id,
                    payload,
                } => println!("Saved at: {resource_id}\nResponse: {payload}"),
                FetchOutcome::Rejected(rejection) => println!("{}", rejection.message()),
            }
            Ok(())
        }
    }
}

async fn build_service(config: &ConnectorConfig) -> Result<ExchangeService> {
    let transport = Arc::new(HttpTransport::with_timeout(config.outbound.timeout_secs));
    let dispatcher = Arc::new(RequestDispatcher::new(
        transport,
        config.connector_id.clone(),
        config.model_version.clone(),
    ));
    let store: Arc<dyn ResourceStore> = match &config.store {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Sqlite { path } => Arc::new(SqliteStore::open(path).await?),
    };
    Ok(ExchangeService::new(dispatcher, store))
}
