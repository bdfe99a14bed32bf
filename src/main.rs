//! `sniffout`: command-line access to the SniffOut dashboard API.
//!
//! Credentials live in the OS keychain, so a `login` in one invocation is
//! picked up by later `get`/`post`/... invocations. Every command prints the
//! `{success, data, error}` envelope as JSON and exits non-zero on failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use sniffout_client::api::auth::DEFAULT_SERVICE_NAME;
use sniffout_client::{
    session, with_query, ApiClient, ApiRequest, ApiResult, ClientConfig, KeychainStore,
    MultipartBody,
};

#[derive(Parser, Debug)]
#[command(name = "sniffout", version, about = "SniffOut dashboard API client")]
struct Args {
    /// Keychain service the session tokens are stored under
    #[arg(long, default_value = DEFAULT_SERVICE_NAME)]
    keychain_service: String,

    /// Override the API base URL (otherwise SNIFFOUT_API_URL / VITE_API_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session tokens
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session tokens
    Logout,
    /// GET a path, e.g. `subadmin/notifications/`
    Get {
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
        /// Send without the access token
        #[arg(long)]
        public: bool,
    },
    /// POST a JSON body
    Post { path: String, body: String },
    /// PUT a JSON body
    Put { path: String, body: String },
    /// DELETE a path
    Delete { path: String },
    /// Multipart upload
    Upload {
        path: String,
        /// File part as name=path (repeatable)
        #[arg(long = "file", value_parser = parse_key_value)]
        files: Vec<(String, String)>,
        /// Text field as name=value (repeatable)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Execute one command. Returns whether the API reported success.
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    log::debug!("Using API base URL {}", config.base_url);

    let store = Arc::new(KeychainStore::new(args.keychain_service));
    let client = ApiClient::new(config, store);

    let result: ApiResult = match args.command {
        Command::Login { email, password } => session::login(&client, &email, &password).await?,
        Command::Logout => {
            session::sign_out(&client)?;
            println!("Signed out");
            return Ok(true);
        }
        Command::Get {
            path,
            query,
            public,
        } => {
            let path = with_query(&path, &query);
            if public {
                let request = ApiRequest::new(reqwest::Method::GET, path).without_auth();
                client.send(request).await?
            } else {
                client.get(&path).await?
            }
        }
        Command::Post { path, body } => {
            let body: Value = serde_json::from_str(&body)?;
            client.post(&path, &body).await?
        }
        Command::Put { path, body } => {
            let body: Value = serde_json::from_str(&body)?;
            client.put(&path, &body).await?
        }
        Command::Delete { path } => client.delete(&path).await?,
        Command::Upload {
            path,
            files,
            fields,
        } => {
            let form = build_form(&files, &fields).await?;
            client.post_file(&path, form).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

async fn build_form(
    files: &[(String, String)],
    fields: &[(String, String)],
) -> Result<MultipartBody, std::io::Error> {
    let mut form = MultipartBody::new();
    for (name, value) in fields {
        form = form.text(name.clone(), value.clone());
    }
    for (name, file) in files {
        let file_path = PathBuf::from(file);
        let bytes = tokio::fs::read(&file_path).await?;
        form = form.file(name.clone(), bytes, file_name_of(&file_path), None);
    }
    Ok(form)
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
