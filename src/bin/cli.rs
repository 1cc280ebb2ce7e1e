use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;

const TOKEN_FILE: &str = ".masjid_token";

#[derive(Parser)]
#[command(name = "masjid-cli")]
#[command(about = "CLI for the Masjid SaaS API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:11111")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Also onboard a mosque (created as pending)
        #[arg(short, long)]
        mosque: Option<String>,
        #[arg(short, long, requires = "mosque")]
        slug: Option<String>,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Me,
    /// Show one tenant by slug
    Tenant {
        slug: String,
    },
    Tenants,
    Finance {
        #[command(subcommand)]
        action: FinanceAction,
    },
    Summary {
        slug: String,
        /// ZIS summary instead of the cash book
        #[arg(long)]
        zis: bool,
    },
    Events {
        slug: String,
    },
    RegisterEvent {
        slug: String,
        #[arg(short = 'i', long)]
        event_id: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: Option<String>,
    },
    Portal {
        slug: String,
    },
    Approve {
        tenant_id: String,
    },
    Suspend {
        tenant_id: String,
    },
    Logout,
}

#[derive(Subcommand)]
enum FinanceAction {
    List {
        slug: String,
    },
    Add {
        slug: String,
        /// income or expense
        #[arg(short = 't', long = "type")]
        kind: String,
        #[arg(short, long)]
        amount: u64,
        #[arg(short, long)]
        category: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<LoginData>,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
}

fn with_token(request: RequestBuilder) -> RequestBuilder {
    match fs::read_to_string(TOKEN_FILE) {
        Ok(token) => request.bearer_auth(token.trim()),
        Err(_) => request,
    }
}

async fn print_response(request: RequestBuilder) -> Result<(), Box<dyn std::error::Error>> {
    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    // Pretty-print the envelope when possible
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => println!("{} {}", status, serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{} {}", status, body),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let api = format!("{}/api", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::Register { name, email, password, mosque, slug } => {
            let mut body = json!({ "name": name, "email": email, "password": password });
            if let Some(mosque) = mosque {
                body["mosque"] = json!({ "name": mosque, "slug": slug });
            }
            print_response(client.post(format!("{}/auth/register", api)).json(&body)).await?;
        }
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/auth/login", api))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: Envelope = res.json().await?;
                match body.data {
                    Some(data) => {
                        fs::write(TOKEN_FILE, data.token)?;
                        println!("Logged in. Token saved to {}", TOKEN_FILE);
                    }
                    None => println!("Login failed: empty response"),
                }
            } else {
                println!("Login failed: {}", res.text().await?);
            }
        }
        Commands::Me => {
            print_response(with_token(client.get(format!("{}/auth/me", api)))).await?;
        }
        Commands::Tenant { slug } => {
            print_response(client.get(format!("{}/tenants/{}", api, slug))).await?;
        }
        Commands::Tenants => {
            print_response(client.get(format!("{}/tenants", api))).await?;
        }
        Commands::Finance { action } => match action {
            FinanceAction::List { slug } => {
                print_response(client.get(format!("{}/{}/finance", api, slug))).await?;
            }
            FinanceAction::Add { slug, kind, amount, category, description } => {
                let body = json!({
                    "type": kind,
                    "amount": amount,
                    "category": category,
                    "description": description
                });
                print_response(client.post(format!("{}/{}/finance", api, slug)).json(&body))
                    .await?;
            }
        },
        Commands::Summary { slug, zis } => {
            let section = if zis { "zis" } else { "finance" };
            print_response(client.get(format!("{}/{}/{}/summary", api, slug, section))).await?;
        }
        Commands::Events { slug } => {
            print_response(client.get(format!("{}/{}/events", api, slug))).await?;
        }
        Commands::RegisterEvent { slug, event_id, name, email } => {
            let body = json!({ "name": name, "email": email });
            let url = format!("{}/{}/events/{}/register", api, slug, event_id);
            print_response(client.post(url).json(&body)).await?;
        }
        Commands::Portal { slug } => {
            print_response(client.get(format!("{}/{}/portal", api, slug))).await?;
        }
        Commands::Approve { tenant_id } => {
            let url = format!("{}/admin/tenants/{}/approve", api, tenant_id);
            print_response(with_token(client.post(url))).await?;
        }
        Commands::Suspend { tenant_id } => {
            let url = format!("{}/admin/tenants/{}/suspend", api, tenant_id);
            print_response(with_token(client.post(url))).await?;
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
    }

    Ok(())
}
