//! Emberlink CLI - operator console for the disposable artifact engine

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use ember_core::{
    AccessEngine, AccessRequest, CatalogItem, CatalogSnapshot, CodecKey, EngineConfig,
    FixedCatalog, GatewayError, NotificationGateway, RecipientHandle, SecurityPolicy,
    TenantId, TracingAuditSink,
};
use ember_ledger::AccessLedger;

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "Emberlink - disposable, self-burning catalog links")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Walk one artifact through its full lifecycle: issue, serve,
    /// exhaust, burn, regenerate.
    Demo {
        /// View budget for the demo artifact
        #[arg(long, default_value_t = 3)]
        max_views: u32,

        /// Comma-separated recipient handles
        #[arg(long, default_value = "alice,bob,carol")]
        recipients: String,

        /// Ledger path (temporary when omitted)
        #[arg(long)]
        ledger: Option<String>,
    },
    /// Print the default engine configuration
    Config,
}

/// Gateway that prints deliveries to stdout.
struct ConsoleGateway;

#[async_trait]
impl NotificationGateway for ConsoleGateway {
    async fn send(&self, recipient: &RecipientHandle, message: &str) -> Result<(), GatewayError> {
        println!("  -> notify {}: {}", recipient, message);
        Ok(())
    }
}

fn demo_catalog() -> CatalogSnapshot {
    CatalogSnapshot::new(vec![
        CatalogItem { sku: "EMB-001".to_string(), name: "House blend".to_string() },
        CatalogItem { sku: "EMB-002".to_string(), name: "Single origin".to_string() },
    ])
}

async fn run_demo(max_views: u32, recipients: &str, ledger: Option<String>) -> anyhow::Result<()> {
    let ledger = match ledger {
        Some(path) => AccessLedger::open(path)?,
        None => AccessLedger::temporary()?,
    };
    let engine = AccessEngine::new(
        CodecKey::generate(),
        EngineConfig::new(),
        ledger,
        Arc::new(FixedCatalog::new(demo_catalog())),
        Arc::new(ConsoleGateway),
        Arc::new(TracingAuditSink),
    );

    let handles: Vec<RecipientHandle> = recipients
        .split(',')
        .filter(|r| !r.trim().is_empty())
        .map(|r| RecipientHandle::new(r.trim()))
        .collect();
    anyhow::ensure!(!handles.is_empty(), "at least one recipient is required");
    let first = handles[0].clone();

    let policy = SecurityPolicy::new()
        .with_max_views(max_views)
        .with_auto_regenerate(true);

    println!("Issuing artifact ({} views, auto-regenerate)...", max_views);
    let issued = engine
        .create_artifact(TenantId::new(), policy, handles)
        .await?;
    println!("  artifact {}", issued.artifact_id);
    println!("  token    {}", issued.token);

    for i in 1..=u64::from(max_views) + 1 {
        let request =
            AccessRequest::view(issued.token.as_str(), first.clone(), "demo-device", "bucket-demo");
        let response = engine.serve(&request).await?;
        println!("view {}: {:?}", i, response);
    }

    let report = engine.report(issued.artifact_id)?;
    println!(
        "artifact {} is now {} ({} views, {} denied)",
        report.artifact_id, report.status, report.view_count, report.denied_count
    );
    if let Some(successor) = report.regenerated_into {
        let token = engine.mint_token(successor)?;
        println!("successor {} issued, token {}", successor, token);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Demo { max_views, recipients, ledger }) => {
            run_demo(max_views, &recipients, ledger).await?;
        }
        Some(Commands::Config) => {
            println!("{:#?}", EngineConfig::new());
        }
        None => {
            println!("Emberlink v0.1.0 - Use --help for commands");
        }
    }

    Ok(())
}
