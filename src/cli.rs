//! CLI argument definitions for sxg-pack.
//!
//! Uses clap for argument parsing. `pack` runs the packaging pipeline;
//! `serve` exposes the resulting artifacts over HTTP(S).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config;

/// Package a static HTML resource into a Signed HTTP Exchange.
#[derive(Parser, Debug)]
#[command(name = "sxg-pack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the leaf certificate, OCSP response, cert.cbor and .sxg
    #[command(after_help = "EXAMPLES:
    # Package index.html for example.com, serving the cert chain from localhost
    sxg-pack pack --ca-crt ca.crt --ca-key ca.key --html index.html \\
        --sxg-domain example.com --certurl-host localhost

    # Reuse an existing leaf key and certificate
    sxg-pack pack --ca-crt ca.crt --ca-key ca.key --html index.html \\
        --sxg-domain example.com --certurl-host localhost \\
        --sxg-key sxg.key --sxg-crt sxg.crt
")]
    Pack(Box<PackArgs>),

    /// Serve cert.cbor and the signed exchange from the output directory
    Serve(Box<ServeArgs>),
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Root CA certificate (PEM)
    #[arg(long, value_name = "FILE")]
    pub ca_crt: PathBuf,

    /// Root CA private key (PEM)
    #[arg(long, value_name = "FILE")]
    pub ca_key: PathBuf,

    /// Static HTML file to package
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,

    /// SXG domain (DNS SAN/CN), e.g. example.com
    #[arg(long)]
    pub sxg_domain: String,

    /// Host for the certificate URL, e.g. localhost (no scheme)
    #[arg(long)]
    pub certurl_host: String,

    /// Path for cert.cbor under the certificate URL host
    #[arg(long, default_value = config::DEFAULT_CERT_PATH)]
    pub certurl_path: String,

    /// URI packaged in the exchange, default https://<sxg-domain>/
    #[arg(long)]
    pub sxg_uri: Option<String>,

    /// validityUrl embedded in the exchange, default https://<sxg-domain>/resource.validity
    #[arg(long)]
    pub validity_url: Option<String>,

    /// Leaf certificate and OCSP validity window in days
    #[arg(
        long,
        default_value_t = config::DEFAULT_VALIDITY_DAYS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub validity_days: u32,

    /// Existing leaf private key (EC P-256, PEM); skips key generation
    #[arg(long, value_name = "FILE")]
    pub sxg_key: Option<PathBuf>,

    /// Existing leaf certificate (PEM); skips CSR and CA signing
    #[arg(long, value_name = "FILE")]
    pub sxg_crt: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = config::DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,

    /// Output .sxg filename (within the output directory)
    #[arg(long, default_value = config::DEFAULT_OUT_SXG)]
    pub out_sxg: String,

    /// Print the artifact summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory holding cert.cbor and the signed exchange
    #[arg(long, default_value = config::DEFAULT_OUT_DIR)]
    pub dir: PathBuf,

    /// Signed exchange filename within the directory
    #[arg(long, default_value = config::DEFAULT_OUT_SXG)]
    pub sxg: String,

    /// Listen host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Listen port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// TLS certificate chain (PEM); plain HTTP when omitted
    #[arg(long, value_name = "FILE", requires = "tls_key")]
    pub tls_crt: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(long, value_name = "FILE", requires = "tls_crt")]
    pub tls_key: Option<PathBuf>,
}
