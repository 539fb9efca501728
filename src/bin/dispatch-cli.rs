use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use url::Url;

#[derive(Parser)]
#[command(name = "dispatch-cli")]
#[command(about = "Client CLI for the mail dispatcher", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one email for delivery
    Send {
        /// Message id; a random UUID when omitted
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "Test")]
        subject: String,
        #[arg(long, default_value = "This is a test email.")]
        body: String,
    },
    /// Print the status log
    Log,
    /// Replay the deferred queue once
    Drain,
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = Url::parse(&cli.url)?;
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Send { id, to, subject, body } => {
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            client
                .post(base.join("/send-email")?)
                .json(&json!({ "id": id, "to": to, "subject": subject, "body": body }))
                .send()
                .await?
        }
        Commands::Log => client.get(base.join("/status-log")?).send().await?,
        Commands::Drain => client.post(base.join("/process-queue")?).send().await?,
        Commands::Health => client.get(base.join("/health")?).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: dispatcher returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
