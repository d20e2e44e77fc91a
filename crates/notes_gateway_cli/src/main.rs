//! Command-line driver for the notes gateway.
//!
//! # Responsibility
//! - Load configuration from the environment and initialize logging.
//! - Run one gateway operation and print its result as JSON.
//! - Map gateway failures to a JSON error body and a non-zero exit code.

use clap::{Parser, Subcommand};
use notes_gateway_core::{
    init_logging, CallerIdentity, FormFields, GatewayConfig, GatewayError, NotesGateway, Note,
    User,
};
use serde::Serialize;
use serde_json::json;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "notes-gateway", version, about = "Notes aggregation gateway")]
struct Cli {
    /// Session identity of the caller.
    #[arg(long, global = true, default_value = "")]
    user: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the caller's notes and their owners.
    Load {
        /// Backend discriminator; unknown values use the default backend.
        #[arg(long)]
        lang: Option<String>,
        #[arg(long, default_value_t = false)]
        skip_users: bool,
    },
    /// Create or upsert a note.
    Create {
        #[arg(long, default_value = "")]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long = "type")]
        backend: Option<String>,
    },
    /// Delete a note.
    Delete {
        #[arg(long)]
        id: Option<String>,
        #[arg(long = "type")]
        backend: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadOutput {
    notes: Vec<Note>,
    elapsed: f64,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    users: Option<Vec<User>>,
    /// Set when the users fetch failed; the notes above are still valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    users_error: Option<serde_json::Value>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("logging init failed: {err}");
        return ExitCode::from(2);
    }
    let gateway = match NotesGateway::connect_lazy(&config) {
        Ok(gateway) => gateway,
        Err(err) => {
            log::error!("event=startup module=cli status=error error={err}");
            eprintln!("backend setup failed: {err}");
            return ExitCode::from(2);
        }
    };

    let caller = CallerIdentity::new(cli.user);
    let result = match cli.command {
        Commands::Load { lang, skip_users } => {
            run_load(&gateway, &caller, lang.as_deref(), skip_users).await
        }
        Commands::Create {
            id,
            title,
            content,
            backend,
        } => {
            let mut form = FormFields::new()
                .with("id", id)
                .with("title", title)
                .with("content", content);
            if let Some(backend) = backend {
                form.insert("type", backend);
            }
            gateway
                .create_note(&caller, &form)
                .await
                .map(|outcome| json!(outcome))
        }
        Commands::Delete { id, backend } => {
            let mut form = FormFields::new();
            if let Some(id) = id {
                form.insert("id", id);
            }
            if let Some(backend) = backend {
                form.insert("type", backend);
            }
            gateway
                .delete_note(&caller, &form)
                .await
                .map(|outcome| json!(outcome))
        }
    };

    match result {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", error_body(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run_load(
    gateway: &NotesGateway,
    caller: &CallerIdentity,
    lang: Option<&str>,
    skip_users: bool,
) -> Result<serde_json::Value, GatewayError> {
    let page = gateway.load_notes(caller, lang).await?;
    let users = if skip_users {
        None
    } else {
        Some(page.users.resolve().await)
    };
    Ok(load_body(page.notes, page.elapsed_ms, page.count, users))
}

/// A users failure is reported next to the notes, never instead of them.
fn load_body(
    notes: Vec<Note>,
    elapsed_ms: f64,
    count: usize,
    users: Option<Result<Vec<User>, GatewayError>>,
) -> serde_json::Value {
    let (users, users_error) = match users {
        None => (None, None),
        Some(Ok(users)) => (Some(users), None),
        Some(Err(err)) => (None, Some(error_body(&err))),
    };
    json!(LoadOutput {
        notes,
        elapsed: elapsed_ms,
        count,
        users,
        users_error,
    })
}

fn error_body(err: &GatewayError) -> serde_json::Value {
    let mut body = json!({
        "status": err.status_code(),
        "message": err.public_message(),
    });
    if let Some(errors) = err.field_errors() {
        body["errors"] = json!(errors);
    }
    body
}
