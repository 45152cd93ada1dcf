//! SPA Gateway Server
//!
//! Serves a built single-page app from a local directory behind the edge
//! policy, route table and velvet rope described by a site configuration.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hyper::header::HeaderName;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use spa_gateway::{DeploymentPlan, DirectoryStore, Gateway, GatewayService, ServiceOptions, SiteConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "spa-gateway-server")]
#[command(about = "Locked-down gateway for single-page apps")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the site
    Serve {
        /// Site configuration (.toml or .json)
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Directory holding the built site
        #[arg(short = 'r', long)]
        site_root: PathBuf,

        /// Bind address
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port number
        #[arg(short = 'P', long, default_value = "8080")]
        port: u16,

        /// Take the source IP from the first X-Forwarded-For hop
        #[arg(long)]
        trust_forwarded_for: bool,

        /// Header carrying the caller identity
        #[arg(long)]
        identity_header: Option<String>,
    },

    /// Print the deployment plan as JSON
    Plan {
        /// Site configuration (.toml or .json)
        #[arg(short = 'c', long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match Args::parse().command {
        Command::Plan { config } => {
            let config = SiteConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let plan = DeploymentPlan::build(&config)?;
            println!("{}", plan.to_json()?);
            Ok(())
        }
        Command::Serve {
            config,
            site_root,
            host,
            port,
            trust_forwarded_for,
            identity_header,
        } => {
            let config = SiteConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;

            let identity_header = identity_header
                .map(|h| HeaderName::try_from(h.as_str()))
                .transpose()
                .context("invalid --identity-header")?;
            if trust_forwarded_for {
                warn!("trusting X-Forwarded-For; the fronting proxy must overwrite it");
            }

            let store = DirectoryStore::new(&site_root)?;
            let gateway = Arc::new(Gateway::from_config(&config, store)?);
            let options = Arc::new(ServiceOptions {
                trust_forwarded_for,
                identity_header,
            });

            serve(gateway, options, &host, port).await
        }
    }
}

async fn serve(
    gateway: Arc<Gateway<DirectoryStore>>,
    options: Arc<ServiceOptions>,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", host, port))?;

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let http_server = ConnBuilder::new(TokioExecutor::new());

    info!(root = %gateway.proxy().store().root().display(), "serving site");
    info!("HTTP server running at http://{}", local_addr);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((socket, peer)) => {
                        let service = GatewayService::new(Arc::clone(&gateway), Arc::clone(&options), peer);
                        let http_server = http_server.clone();
                        tokio::spawn(async move {
                            let conn = http_server.serve_connection(TokioIo::new(socket), service);
                            if let Err(e) = conn.await {
                                warn!(%peer, error = %e, "connection error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Server stopped");
    Ok(())
}
