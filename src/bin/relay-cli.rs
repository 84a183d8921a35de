use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use reqwest::header::RANGE;

use vr_stream_relay::http::link::stream_path;
use vr_stream_relay::security::{cidr, TokenCodec, Verdict};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator tools for the VR stream relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a signed stream URL offline
    Sign {
        /// Resource identifier
        resource_id: String,
        /// Signing secret (must match the relay's signing.secret)
        #[arg(short, long)]
        secret: String,
        /// Token lifetime in seconds
        #[arg(short, long, default_value_t = 3600)]
        ttl: i64,
        /// Public base URL of the relay
        #[arg(short, long, default_value = "http://localhost:8097")]
        base_url: String,
    },
    /// Check a signed URL's token against a secret
    Verify {
        resource_id: String,
        expiry: i64,
        signature: String,
        #[arg(short, long)]
        secret: String,
    },
    /// Evaluate an address against CIDR ranges
    CheckIp {
        address: IpAddr,
        ranges: Vec<String>,
    },
    /// Fetch a URL and print status and headers
    Probe {
        url: String,
        /// Range header to send, e.g. "bytes=0-1023"
        #[arg(short, long)]
        range: Option<String>,
    },
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign {
            resource_id,
            secret,
            ttl,
            base_url,
        } => {
            let token = TokenCodec::new(secret.as_bytes()).mint(&resource_id, ttl, now_unix());
            println!("{}{}", base_url.trim_end_matches('/'), stream_path(&token));
        }
        Commands::Verify {
            resource_id,
            expiry,
            signature,
            secret,
        } => {
            let verdict = TokenCodec::new(secret.as_bytes()).verify(&resource_id, expiry, &signature, now_unix());
            match verdict {
                Verdict::Valid(_) => println!("valid (expires in {}s)", expiry - now_unix()),
                Verdict::Expired => println!("expired"),
                Verdict::Forged => println!("forged"),
            }
        }
        Commands::CheckIp { address, ranges } => {
            for range in &ranges {
                println!("{:<24} {}", range, cidr::matches(address, range));
            }
            let verdict = if cidr::is_allowed(address, &ranges) { "allowed" } else { "denied" };
            println!("{address}: {verdict}");
        }
        Commands::Probe { url, range } => {
            let client = reqwest::Client::new();
            let mut request = client.get(&url);
            if let Some(range) = range {
                request = request.header(RANGE, range);
            }
            let res = request.send().await?;

            println!("{:?} {}", res.version(), res.status());
            for (name, value) in res.headers() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
        }
    }

    Ok(())
}
