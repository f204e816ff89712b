use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pos_core::resources::Resource;

#[derive(Parser, Debug)]
#[command(name = "pos", version, about = "POS01 dashboard client")]
pub struct Cli {
    /// API base URL.
    #[arg(long, global = true, env = "POS_API_URL")]
    pub api_url: Option<String>,

    /// Token file (defaults to the user data directory).
    #[arg(long, global = true, env = "POS_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI version.
    Version,

    /// Sign in and store the token pair.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "POS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored tokens.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Where the home page sends you.
    Home,

    /// Evaluate a page's gates and print the outcome.
    Check {
        /// Dashboard route, e.g. `/admin/users`.
        route: String,
    },

    /// Show the sidebar entries visible to the signed-in user.
    Nav,

    /// List a resource collection.
    List {
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
    },

    /// GET an API path and print the body.
    Get {
        /// Path relative to the base URL, e.g. `/api/v1/analytics`.
        path: String,
        /// Query parameter as `key=value`; repeatable.
        #[arg(long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
}

fn parse_resource(s: &str) -> Result<Resource, String> {
    s.parse()
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{s}`"))
}
