// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use pos_core::gate::{self, GateState, HistoryNavigator};
use pos_core::models::{ListEnvelope, ListQuery};
use pos_core::resources::ResourceClient;
use pos_core::tokens::{FileTokenStore, TokenStore};
use pos_core::{ClientConfig, HttpClient, Method, SessionQuery, auth, routes};

mod cli;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Everything a command needs, wired from config.
struct App {
    tokens: Arc<dyn TokenStore>,
    client: Arc<HttpClient>,
    session: Arc<SessionQuery>,
}

impl App {
    fn new(config: &ClientConfig) -> Result<Self> {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::open(&config.token_file));
        let client = Arc::new(HttpClient::from_config(config, Arc::clone(&tokens))?);
        let session = Arc::new(SessionQuery::with_ttl(
            Arc::clone(&client),
            config.session_ttl_ms,
        ));
        Ok(Self {
            tokens,
            client,
            session,
        })
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(path) = args.token_file {
        config.token_file = path;
    }
    tracing::debug!(
        api_url = %config.api_url,
        token_file = %config.token_file.display(),
        "configured"
    );

    if let Commands::Version = args.command {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let app = App::new(&config)?;

    match args.command {
        Commands::Version => {}
        Commands::Login { email, password } => {
            let user = auth::login(&app.client, &app.session, &email, &password).await?;
            match user {
                Some(user) => println!("Welcome back, {}!", user.name),
                None => println!("Welcome back!"),
            }
        }
        Commands::Logout => {
            let nav = HistoryNavigator::default();
            auth::logout(app.tokens.as_ref(), &app.session, &nav);
            println!("signed out -> {}", nav.current().unwrap_or_default());
        }
        Commands::Whoami => {
            let user = app.session.current_user().await?;
            let role = user.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
            println!("{} <{}> id={} role={}", user.name, user.email, user.id, role);
        }
        Commands::Home => {
            println!("{}", auth::home_route(app.tokens.as_ref()));
        }
        Commands::Check { route } => {
            let requirement = routes::requirement_for(&route)
                .ok_or_else(|| Error::Custom(format!("unknown route: {route}")))?;
            if requirement == routes::Requirement::Public {
                if route.trim_end_matches('/').is_empty() {
                    let target = auth::home_route(app.tokens.as_ref());
                    println!("{route}: public -> {target}");
                } else {
                    println!("{route}: public");
                }
                return Ok(());
            }
            let nav = Arc::new(HistoryNavigator::default());
            let state = gate::guard_page(
                &requirement,
                Arc::clone(&app.tokens),
                Arc::clone(&app.session),
                nav.clone(),
            )
            .await;
            print_gate(&route, state, nav.current());
        }
        Commands::Nav => {
            let role = match app.session.current_user().await {
                Ok(user) => user.role,
                Err(e) => {
                    tracing::debug!(error = %e, "no session, showing unrestricted items");
                    None
                }
            };
            for item in routes::visible_navigation(role) {
                println!("{:<16} {}", item.label, item.href);
            }
        }
        Commands::List {
            resource,
            page,
            limit,
            search,
        } => {
            let resources = ResourceClient::new(Arc::clone(&app.client));
            let query = ListQuery {
                page,
                limit,
                search,
            };
            let list: ListEnvelope<serde_json::Value> = resources.list(resource, &query).await?;
            for item in &list.data {
                println!("{}", serde_json::to_string(item)?);
            }
            if let Some(p) = list.pagination {
                println!(
                    "page {}/{} ({} total)",
                    p.page.unwrap_or(page),
                    p.total_pages.unwrap_or(1),
                    p.total.unwrap_or(list.data.len() as u64)
                );
            }
        }
        Commands::Get { path, query } => {
            let response = app
                .client
                .request(Method::GET, &path, None, Some(query.as_slice()))
                .await?;
            if !response.is_success() {
                tracing::warn!(status = %response.status, "request failed");
            }
            println!("{}", response.text());
        }
    }

    Ok(())
}

fn print_gate(route: &str, state: GateState, redirect: Option<String>) {
    let label = match state {
        GateState::Pending => "pending",
        GateState::Authenticated => "authenticated",
        GateState::Authorized => "authorized",
        GateState::Unauthorized => "unauthorized",
        GateState::Unauthenticated => "unauthenticated",
    };
    match redirect {
        Some(target) if !state.renders_children() => println!("{route}: {label} -> {target}"),
        _ => println!("{route}: {label}"),
    }
}
