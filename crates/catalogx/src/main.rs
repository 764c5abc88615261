//! catalogx - Build, check and publish catalog asset-type bundles and assets.

use anyhow::{bail, Context};
use catalogx_bundle::{create_bundle_archive, BundleDescriptor};
use catalogx_client::{
    load_definition, upsert_bundle, upsert_custom_attribute, CatalogClient, ConnectionConfig,
    RestCatalogClient, UpsertMode,
};
use catalogx_flowdoc::FlowDocument;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "catalogx")]
#[command(
    author,
    version,
    about = "Build, validate and publish asset-type bundles and asset instances"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Connection options shared by every command that talks to the catalog.
#[derive(Args)]
struct Connection {
    /// Connection file (YAML) with host, port and username
    #[arg(long, short)]
    auth: PathBuf,

    /// Password for the REST API
    #[arg(long, short, env = "CATALOG_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every class of a bundle has its icons and labels
    ValidateBundle {
        /// Bundle directory containing asset_type_descriptor.xml
        #[arg(long, short)]
        dir: PathBuf,
    },

    /// Regenerate i18n/labels.properties from the descriptor
    GenerateLabels {
        /// Bundle directory containing asset_type_descriptor.xml
        #[arg(long, short)]
        dir: PathBuf,
    },

    /// Validate a bundle and package it as <bundleId>-bundle.zip
    PackageBundle {
        /// Bundle directory containing asset_type_descriptor.xml
        #[arg(long, short)]
        dir: PathBuf,
    },

    /// Validate, package and register a bundle, creating or updating it
    UpsertBundle {
        /// Bundle directory containing asset_type_descriptor.xml
        #[arg(long, short)]
        dir: PathBuf,

        /// Regenerate labels before validating
        #[arg(long, short)]
        generate: bool,

        /// Force creation of the bundle
        #[arg(long, short, conflicts_with = "update")]
        create: bool,

        /// Force update of the bundle
        #[arg(long, short)]
        update: bool,

        #[command(flatten)]
        connection: Connection,
    },

    /// Load asset instances from a flow document
    LoadAssets {
        /// Flow document (XML) with the asset instances
        #[arg(long, short)]
        file: PathBuf,

        #[command(flatten)]
        connection: Connection,
    },

    /// Create or update a custom attribute from a JSON definition
    UpsertAttribute {
        /// Custom attribute definition (JSON)
        #[arg(long, short)]
        file: PathBuf,

        /// Force creation of the attribute
        #[arg(long, short)]
        create: bool,

        #[command(flatten)]
        connection: Connection,
    },
}

impl Connection {
    fn client(&self) -> anyhow::Result<RestCatalogClient> {
        let config = ConnectionConfig::load(&self.auth)
            .with_context(|| format!("Failed to load connection file {:?}", self.auth))?;
        let password = config.resolve_password(self.password.clone())?;
        info!("Connecting to {} as {}", config.base_url(), config.username);
        Ok(RestCatalogClient::new(&config, password)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::ValidateBundle { dir } => {
            let descriptor = load_descriptor(&dir)?;
            require_valid(&descriptor)?;
            info!("Bundle {} is valid", descriptor.bundle_id());
        }

        Commands::GenerateLabels { dir } => {
            let descriptor = load_descriptor(&dir)?;
            let labels = descriptor
                .generate_labels()
                .context("Failed to generate labels")?;
            info!("Generated {} labels at {:?}", labels.len(), descriptor.labels_path());
        }

        Commands::PackageBundle { dir } => {
            let descriptor = load_descriptor(&dir)?;
            require_valid(&descriptor)?;
            let archive = package(&descriptor).await?;
            println!("{}", archive.display());
        }

        Commands::UpsertBundle {
            dir,
            generate,
            create,
            update,
            connection,
        } => {
            let client = connection.client()?;
            let descriptor = load_descriptor(&dir)?;
            if generate {
                descriptor
                    .generate_labels()
                    .context("Failed to generate labels")?;
            }
            require_valid(&descriptor)?;
            let archive = package(&descriptor).await?;

            let mode = if create {
                UpsertMode::Create
            } else if update {
                UpsertMode::Update
            } else {
                UpsertMode::Auto
            };
            let outcome = upsert_bundle(&client, &archive, descriptor.bundle_id(), mode)
                .await
                .with_context(|| format!("Failed to register bundle {}", descriptor.bundle_id()))?;
            info!(
                "Bundle {} successfully {}: {}",
                descriptor.bundle_id(),
                outcome.action,
                outcome.response
            );
        }

        Commands::LoadAssets { file, connection } => {
            let client = connection.client()?;
            let xml = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read flow document {:?}", file))?;
            let flow = FlowDocument::from_xml(&xml)
                .with_context(|| format!("Failed to parse flow document {:?}", file))?;
            info!("Loading {} assets from {:?}", flow.assets().len(), file);

            let response = client
                .create_assets(&flow.serialize_compact()?)
                .await
                .context("Creating assets failed")?;
            info!("Assets created: {}", serde_json::to_string_pretty(&response)?);
        }

        Commands::UpsertAttribute {
            file,
            create,
            connection,
        } => {
            let client = connection.client()?;
            let definition = load_definition(&file)
                .with_context(|| format!("Failed to load attribute definition {:?}", file))?;

            let outcome = upsert_custom_attribute(&client, &definition, create)
                .await
                .context("Custom attribute upsert failed")?;
            info!(
                "Custom attribute successfully {}: {}",
                outcome.action, outcome.response
            );
        }
    }

    Ok(())
}

fn load_descriptor(dir: &Path) -> anyhow::Result<BundleDescriptor> {
    BundleDescriptor::load(dir)
        .with_context(|| format!("Failed to load bundle descriptor from {:?}", dir))
}

/// Fail unless the bundle is complete; issues are logged as they are found.
fn require_valid(descriptor: &BundleDescriptor) -> anyhow::Result<()> {
    let result = descriptor
        .validate(true)
        .with_context(|| format!("Failed to validate bundle {}", descriptor.bundle_id()))?;
    if !result.valid {
        error!(
            "Bundle {} has {} issue(s)",
            descriptor.bundle_id(),
            result.issues.len()
        );
        bail!("Bundle {} is incomplete", descriptor.bundle_id());
    }
    Ok(())
}

async fn package(descriptor: &BundleDescriptor) -> anyhow::Result<PathBuf> {
    let outcome = create_bundle_archive(descriptor).await;
    let archive_path = outcome.archive_path.clone();
    let archive = outcome
        .into_result()
        .with_context(|| format!("Failed to create bundle archive {:?}", archive_path))?;
    info!("The bundle zip file is here: {:?}", archive);
    Ok(archive)
}
