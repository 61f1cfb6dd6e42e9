use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{call, serve, tools};

#[derive(Parser, Debug)]
#[command(name = "infinity", version, about = "MCP adapter for the Infinity REST API")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "infinity.yaml")]
    pub config: PathBuf,

    /// Infinity base address, e.g. https://app.startinfinity.com
    #[arg(long, global = true, env = "INFINITY_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Bearer credential for the Infinity API.
    #[arg(
        long,
        global = true,
        alias = "apiKey",
        env = "INFINITY_API_KEY",
        hide_env_values = true
    )]
    pub api_key: Option<String>,

    /// Value sent in the X-API-Version header.
    #[arg(long, global = true, env = "INFINITY_API_VERSION")]
    pub api_version: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, env = "INFINITY_API_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Log filter when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server.
    Serve {
        /// Transport (stdio or http). Overrides the config file.
        #[arg(long)]
        transport: Option<String>,

        /// HTTP host. Overrides the config file.
        #[arg(long)]
        host: Option<String>,

        /// HTTP port. Overrides the config file.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the tool catalog.
    Tools {
        /// Include each tool's input schema.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },

    /// Invoke one tool and print its envelope.
    Call {
        /// Tool name, e.g. infinity_list_workspaces
        tool: String,

        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level);

    match cli.cmd {
        Command::Serve {
            transport,
            host,
            port,
        } => {
            let overrides = serve::ServeOverrides {
                transport,
                host,
                port,
            };
            serve::execute(&cli.global, overrides).await?;
        }
        Command::Tools { verbose } => tools::list(verbose)?,
        Command::Call { tool, args } => {
            if !call::execute(&cli.global, &tool, &args).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_api_key_accepts_camel_case_alias() {
        let cli = Cli::try_parse_from(["infinity", "tools", "--apiKey", "k-123"]).unwrap();
        assert_eq!(cli.global.api_key.as_deref(), Some("k-123"));
    }

    #[test]
    fn test_call_defaults_to_empty_arguments() {
        let cli = Cli::try_parse_from(["infinity", "call", "infinity_ping"]).unwrap();
        match cli.cmd {
            Command::Call { tool, args } => {
                assert_eq!(tool, "infinity_ping");
                assert_eq!(args, "{}");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_serve_overrides_parse() {
        let cli = Cli::try_parse_from([
            "infinity",
            "serve",
            "--transport",
            "http",
            "--port",
            "8123",
            "--base-url",
            "https://h.example",
        ])
        .unwrap();

        assert_eq!(cli.global.base_url.as_deref(), Some("https://h.example"));
        match cli.cmd {
            Command::Serve {
                transport, port, ..
            } => {
                assert_eq!(transport.as_deref(), Some("http"));
                assert_eq!(port, Some(8123));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
