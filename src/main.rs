//! HI service command-line client.
//!
//! Run with: `hi-client --config config.yaml --profile ihi-batch ... batch-status <ID>`

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hi_soap_client::identity::ProductType;
use hi_soap_client::{
    ClientSettings, HiClientConfig, HttpChannel, HttpChannelFactory, ProviderOrganisationClient,
    QualifiedId, SearchIhi, SearchIhiBatchAsyncClient, SearchIhiBatchSyncClient, Service,
    SigningCredential, SoapClient, TransportCredential,
};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const VENDOR_QUALIFIER: &str = "http://ns.electronichealth.net.au/id/hi/vendorid/1.0";

/// Command-line client for the Healthcare Identifiers service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML) holding endpoint profiles
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Named endpoint profile from the configuration file
    #[arg(short, long, required_unless_present = "endpoint")]
    profile: Option<String>,

    /// Explicit endpoint URL (overrides profiles)
    #[arg(long, conflicts_with = "profile")]
    endpoint: Option<String>,

    /// Signing certificate (PEM)
    #[arg(long)]
    signing_cert: PathBuf,

    /// Signing private key (PEM, RSA)
    #[arg(long)]
    signing_key: PathBuf,

    /// TLS client certificate (PEM)
    #[arg(long)]
    tls_cert: PathBuf,

    /// TLS client private key (PEM)
    #[arg(long)]
    tls_key: PathBuf,

    /// Extra CA certificate (PEM) to trust for the service endpoint
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Vendor identifier issued by the HI service
    #[arg(long)]
    vendor_id: String,

    #[arg(long, default_value = VENDOR_QUALIFIER)]
    vendor_qualifier: String,

    #[arg(long, default_value = env!("CARGO_PKG_NAME"))]
    product_name: String,

    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    product_version: String,

    #[arg(long, default_value = std::env::consts::OS)]
    platform: String,

    /// Calling user identifier
    #[arg(long)]
    user_id: String,

    /// Qualifier URI for the calling user identifier
    #[arg(long)]
    user_qualifier: String,

    /// HPI-O of the calling organisation
    #[arg(long)]
    hpio: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the provider directory for an organisation
    SearchOrganisation { hpio_number: String },
    /// Run a synchronous IHI batch search from a YAML request file
    BatchSearch { requests: PathBuf },
    /// Submit an asynchronous IHI batch from a YAML request file
    BatchSubmit { requests: PathBuf },
    /// Get the processing status of a submitted batch
    BatchStatus { batch_id: String },
    /// Retrieve the results of a completed batch
    BatchRetrieve { batch_id: String },
    /// Delete a batch from the service
    BatchDelete { batch_id: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting HI client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        HiClientConfig::load(&args.config).context("Failed to load config file")?
    } else {
        info!("Config file not found, using defaults");
        HiClientConfig::default()
    };
    let mut factory = HttpChannelFactory::new(config);
    if let Some(ca_cert) = &args.ca_cert {
        factory = factory
            .with_root_certificate(&read(ca_cert)?)
            .context("Failed to load CA certificate")?;
    }

    let signing = SigningCredential::from_pem(
        &read(&args.signing_cert)?,
        &read(&args.signing_key)?,
    )
    .context("Failed to load signing credential")?;
    let tls = TransportCredential::from_pem(&read(&args.tls_cert)?, &read(&args.tls_key)?)
        .context("Failed to load TLS credential")?;

    info!(
        signing_subject = %signing.info().subject,
        tls_subject = %tls.info().subject,
        "Credentials loaded"
    );

    let settings = ClientSettings {
        product: ProductType {
            organisation: None,
            platform: args.platform.clone(),
            product_name: args.product_name.clone(),
            product_version: args.product_version.clone(),
            vendor: QualifiedId::new(args.vendor_qualifier.clone(), args.vendor_id.clone()),
        },
        user: QualifiedId::new(args.user_qualifier.clone(), args.user_id.clone()),
        hpio: args.hpio.clone().map(QualifiedId::hpio),
        signing: &signing,
        tls: &tls,
    };

    match &args.command {
        Command::SearchOrganisation { hpio_number } => {
            let mut client: ProviderOrganisationClient = connect(&args, settings, &factory)?;
            let organisation = client.search_for_provider_organisation(hpio_number)?;
            println!("{:#?}", organisation);
        }
        Command::BatchSearch { requests } => {
            let requests = load_requests(requests)?;
            let mut client: SearchIhiBatchSyncClient = connect(&args, settings, &factory)?;
            let results = client.search_ihi_batch_sync(&requests)?;
            println!("{:#?}", results);
        }
        Command::BatchSubmit { requests } => {
            let requests = load_requests(requests)?;
            let mut client: SearchIhiBatchAsyncClient = connect(&args, settings, &factory)?;
            let submission = client.submit_search_ihi_batch(&requests)?;
            println!("{}", submission.batch_identifier);
        }
        Command::BatchStatus { batch_id } => {
            let mut client: SearchIhiBatchAsyncClient = connect(&args, settings, &factory)?;
            println!("{:#?}", client.get_search_ihi_batch_status(batch_id)?);
        }
        Command::BatchRetrieve { batch_id } => {
            let mut client: SearchIhiBatchAsyncClient = connect(&args, settings, &factory)?;
            println!("{:#?}", client.retrieve_search_ihi_batch(batch_id)?);
        }
        Command::BatchDelete { batch_id } => {
            let mut client: SearchIhiBatchAsyncClient = connect(&args, settings, &factory)?;
            println!("{:#?}", client.delete_search_ihi_batch(batch_id)?);
        }
    }

    Ok(())
}

/// Build a client from `--endpoint` or `--profile`.
fn connect<'a, S: Service>(
    args: &Args,
    settings: ClientSettings<'a>,
    factory: &HttpChannelFactory,
) -> Result<SoapClient<'a, S, HttpChannel>> {
    let client = match (&args.endpoint, &args.profile) {
        (Some(endpoint), _) => SoapClient::with_address(endpoint, settings, factory)?,
        (None, Some(profile)) => SoapClient::with_profile(profile, settings, factory)?,
        (None, None) => bail!("Either --endpoint or --profile is required"),
    };
    Ok(client)
}

fn load_requests(path: &Path) -> Result<Vec<SearchIhi>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).context("Failed to parse request file")
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
