use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use document_service::models::{
    Category, ChangePasswordRequest, DocumentListResponse, DocumentRecord, LoginRequest,
    LoginResponse, PublicDocument, SweepResponse,
};
use prettytable::{Cell, Row, Table};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = ".session";

#[derive(Parser)]
#[command(name = "documents")]
#[command(about = "Manage uploaded documents on the document service", long_about = None)]
struct Cli {
    #[arg(long, env = "DOCUMENT_API_URL", default_value = "http://localhost:3000", help = "Server base URL")]
    api: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Log in as the admin")]
    Login {
        #[arg(short, long, default_value = "admin", help = "Admin username")]
        username: String,

        #[arg(short, long, help = "Password")]
        password: String,
    },

    #[command(about = "End the current admin session")]
    Logout,

    #[command(about = "Change the admin password")]
    Passwd {
        #[arg(short, long, help = "New password (at least 6 characters)")]
        new_password: String,
    },

    #[command(about = "Upload a document")]
    Upload {
        #[arg(short, long, help = "Path to the file")]
        file: PathBuf,

        #[arg(short, long, help = "Category: public or eulogy")]
        category: Category,
    },

    #[command(about = "List documents (admin view)")]
    List {
        #[arg(short, long, help = "Only show this category")]
        category: Option<Category>,
    },

    #[command(about = "List public documents as visitors see them")]
    Public,

    #[command(about = "Delete a document")]
    Delete {
        #[arg(long, help = "Document ID")]
        id: String,
    },

    #[command(about = "Remove expired and orphaned documents now")]
    Sweep,
}

#[derive(Debug, Serialize, Deserialize)]
struct Session {
    api: String,
    token: String,
}

impl Session {
    fn save(&self) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(SESSION_FILE, json)?;
        Ok(())
    }

    fn load() -> Option<Self> {
        if Path::new(SESSION_FILE).exists() {
            let data = fs::read_to_string(SESSION_FILE).ok()?;
            serde_json::from_str(&data).ok()
        } else {
            None
        }
    }

    fn clear() -> Result<()> {
        if Path::new(SESSION_FILE).exists() {
            fs::remove_file(SESSION_FILE)?;
        }
        Ok(())
    }

    fn require() -> Result<Self> {
        match Self::load() {
            Some(session) => Ok(session),
            None => bail!("Not logged in. Run `login` first."),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_command(cli.api, cli.command).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_command(api: String, command: Commands) -> Result<()> {
    let client = reqwest::Client::new();

    match command {
        Commands::Login { username, password } => login(&client, api, username, password).await,
        Commands::Logout => logout(&client).await,
        Commands::Passwd { new_password } => change_password(&client, new_password).await,
        Commands::Upload { file, category } => upload(&client, &file, category).await,
        Commands::List { category } => list(&client, category).await,
        Commands::Public => list_public(&client, &api).await,
        Commands::Delete { id } => delete(&client, &id).await,
        Commands::Sweep => sweep(&client).await,
    }
}

async fn ensure_success(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    bail!("Failed to {} ({}): {}", action, status, error_text)
}

async fn login(client: &reqwest::Client, api: String, username: String, password: String) -> Result<()> {
    let response = client
        .post(format!("{}/admin/login", api))
        .json(&LoginRequest { username, password })
        .send()
        .await
        .context("Failed to reach server")?;
    let result: LoginResponse = ensure_success(response, "log in").await?.json().await?;

    Session {
        api,
        token: result.token,
    }
    .save()
    .context("Failed to save session")?;

    println!("✅ Logged in");
    if result.must_change_password {
        println!("⚠️  You are using the default password. Change it with `passwd`.");
    }
    Ok(())
}

async fn logout(client: &reqwest::Client) -> Result<()> {
    if let Some(session) = Session::load() {
        // The server forgets sessions on restart, so a failure here is fine.
        let _ = client
            .post(format!("{}/admin/logout", session.api))
            .bearer_auth(&session.token)
            .send()
            .await;
    }
    Session::clear()?;
    println!("👋 Logged out");
    Ok(())
}

async fn change_password(client: &reqwest::Client, new_password: String) -> Result<()> {
    let session = Session::require()?;
    let response = client
        .post(format!("{}/admin/password", session.api))
        .bearer_auth(&session.token)
        .json(&ChangePasswordRequest {
            confirm_password: new_password.clone(),
            new_password,
        })
        .send()
        .await?;
    ensure_success(response, "change password").await?;

    println!("✅ Password changed");
    Ok(())
}

async fn upload(client: &reqwest::Client, file: &Path, category: Category) -> Result<()> {
    let session = Session::require()?;
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string();

    let form = Form::new()
        .text("category", category.to_string())
        .part("document", Part::bytes(bytes).file_name(file_name));

    let response = client
        .post(format!("{}/admin/documents", session.api))
        .bearer_auth(&session.token)
        .multipart(form)
        .send()
        .await?;
    let record: DocumentRecord = ensure_success(response, "upload document").await?.json().await?;

    println!("✅ Document uploaded");
    println!("   Name: {}", record.original_name);
    println!("   Category: {}", record.category);
    println!("   ID: {}", record.id);
    if let Some(expires_at) = record.expires_at {
        println!(
            "   Expires: {}",
            expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z")
        );
    }
    Ok(())
}

async fn list(client: &reqwest::Client, category: Option<Category>) -> Result<()> {
    let session = Session::require()?;
    let mut request = client
        .get(format!("{}/admin/documents", session.api))
        .bearer_auth(&session.token);
    if let Some(category) = category {
        request = request.query(&[("category", category.to_string())]);
    }

    let result: DocumentListResponse = ensure_success(request.send().await?, "list documents")
        .await?
        .json()
        .await?;

    if result.documents.is_empty() {
        println!("📭 No documents found.");
        return Ok(());
    }

    println!("\n📋 Documents ({})\n", result.documents.len());

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Category"),
        Cell::new("Uploaded"),
        Cell::new("Expires"),
    ]));

    for record in result.documents {
        let expires = record
            .expires_at
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(Row::new(vec![
            Cell::new(&record.id),
            Cell::new(&record.original_name),
            Cell::new(&record.category.to_string()),
            Cell::new(&record.uploaded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(&expires),
        ]));
    }

    table.printstd();
    println!();
    Ok(())
}

async fn list_public(client: &reqwest::Client, api: &str) -> Result<()> {
    let response = client.get(format!("{}/api/public-docs", api)).send().await?;
    let documents: Vec<PublicDocument> = ensure_success(response, "list public documents")
        .await?
        .json()
        .await?;

    if documents.is_empty() {
        println!("📭 No public documents.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("Name"), Cell::new("Uploaded"), Cell::new("URL")]));
    for document in documents {
        table.add_row(Row::new(vec![
            Cell::new(&document.original_name),
            Cell::new(&document.upload_date.with_timezone(&Local).format("%Y-%m-%d").to_string()),
            Cell::new(&format!("{}{}", api, document.url)),
        ]));
    }

    table.printstd();
    Ok(())
}

async fn delete(client: &reqwest::Client, id: &str) -> Result<()> {
    let session = Session::require()?;
    let response = client
        .delete(format!("{}/admin/documents/{}", session.api, id))
        .bearer_auth(&session.token)
        .send()
        .await?;
    ensure_success(response, "delete document").await?;

    println!("🗑️  Document {} deleted", id);
    Ok(())
}

async fn sweep(client: &reqwest::Client) -> Result<()> {
    let session = Session::require()?;
    let response = client
        .post(format!("{}/admin/sweep", session.api))
        .bearer_auth(&session.token)
        .send()
        .await?;
    let result: SweepResponse = ensure_success(response, "run sweep").await?.json().await?;

    println!("🧹 Sweep finished");
    println!("   Expired documents removed: {}", result.expired_removed);
    println!("   Orphaned files removed: {}", result.orphans_removed);
    Ok(())
}
