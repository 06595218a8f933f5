use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};

use auth_route_service::config::loader::load_tenants;
use auth_route_service::config::resolver::decode_path;
use auth_route_service::config::DomainResolver;
use auth_route_service::http::request::CF_FORWARDED_URL_HEADER;

#[derive(Parser)]
#[command(name = "tenant-cli")]
#[command(about = "Inspect tenant configuration for the auth route service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a tenant file
    Validate {
        file: PathBuf,
    },
    /// Show the tenant a hostname resolves to (secrets redacted)
    Resolve {
        file: PathBuf,
        host: String,
        /// Also report whether this path skips authentication
        #[arg(short, long)]
        path: Option<String>,
    },
    /// Ask a running gateway whether a session cookie is valid
    Status {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
        /// Tenant hostname the probe is forwarded for
        #[arg(long)]
        host: String,
        /// Raw Cookie header to present
        #[arg(short, long)]
        cookie: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            let tenants = load_tenants(&file)?;
            let enabled = tenants.domains.iter().filter(|d| d.enabled).count();
            println!(
                "{}: OK ({} domains, {} enabled)",
                file.display(),
                tenants.domains.len(),
                enabled
            );
        }
        Commands::Resolve { file, host, path } => {
            let resolver = DomainResolver::new(Some(file));
            let tenant = resolver.resolve(&host)?;
            print!("{}", serde_yaml::to_string(&tenant)?);

            if let Some(path) = path {
                let decoded = decode_path(&path);
                let open = resolver.is_unauthenticated_path(&host, &decoded);
                println!("# {} requires authentication: {}", decoded, !open);
            }
        }
        Commands::Status {
            url,
            host,
            cookie,
        } => {
            let forwarded_url = format!("https://{}/auth/status", host);
            let mut headers = HeaderMap::new();
            headers.insert(CF_FORWARDED_URL_HEADER, HeaderValue::from_str(&forwarded_url)?);
            if let Some(cookie) = cookie {
                headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
            }

            let res = reqwest::Client::new()
                .get(format!("{}/auth/status", url.trim_end_matches('/')))
                .headers(headers)
                .send()
                .await?;
            let status = res.status();
            let body = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: gateway returned status {}", status);
            }
            println!("{}", body);
        }
    }

    Ok(())
}
