use anyhow::{Context, Result};
use clap::Parser;
use qiniu_transport::commands::{self, UploadRequest, parse_key_value};
use qiniu_transport::{Config, HttpClient};
use std::path::PathBuf;

/// qiniu-transport - storage API transport
///
/// Issue a GET against a storage endpoint, or upload files as a
/// multipart form.
///
/// If the QINIU_UPTOKEN environment variable is set, it is sent as the
/// upload token.
///
/// Examples:
///   qiniu-transport get http://rs.example.com/stat -p key=abc
///   qiniu-transport upload http://up.example.com -f key=x.png --file file=./x.png
#[derive(Parser, Debug)]
#[command(author, version = env!("QINIU_TRANSPORT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Connection timeout in seconds (also via QINIU_CONNECTION_TIMEOUT)
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Reconnect attempts on connect failures (also via QINIU_CONNECTION_RETRIES)
    #[arg(long, value_name = "N", global = true)]
    retries: Option<usize>,

    /// Idle connections kept per host (also via QINIU_CONNECTION_POOL)
    #[arg(long, value_name = "N", global = true)]
    pool: Option<usize>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// GET a URL and print the JSON result
    Get(GetArgs),

    /// POST fields and files as multipart/form-data
    Upload(UploadArgs),
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    #[arg(value_name = "URL")]
    pub url: String,

    /// Query parameter, repeatable
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Upload token for the Authorization header
    #[arg(long, env = "QINIU_UPTOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    #[arg(value_name = "URL")]
    pub url: String,

    /// Form field, repeatable
    #[arg(short = 'f', long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,

    /// File part, repeatable
    #[arg(long = "file", value_name = "KEY=PATH", value_parser = parse_key_value)]
    pub files: Vec<(String, String)>,

    /// Upload token for the Authorization header
    #[arg(long, env = "QINIU_UPTOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(timeout) = self.timeout {
            config.connection_timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.connection_retries = retries;
        }
        if let Some(pool) = self.pool {
            config.connection_pool = pool;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let client = HttpClient::new(cli.config()?);

    match cli.command {
        Commands::Get(args) => {
            let result = commands::get(&client, &args.url, &args.params, args.token.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Upload(args) => {
            let request = UploadRequest {
                url: args.url,
                fields: args.fields,
                files: args
                    .files
                    .into_iter()
                    .map(|(key, path)| (key, PathBuf::from(path)))
                    .collect(),
                token: args.token,
            };
            // Only the upload path needs a runtime.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            let body = runtime.block_on(commands::upload(&client, request))?;
            println!("{}", body);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_get_parsing() {
        let cli = Cli::try_parse_from([
            "qiniu-transport",
            "get",
            "http://rs.example.com/stat",
            "-p",
            "key=abc",
            "--param",
            "x=1=2",
        ])
        .unwrap();
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.url, "http://rs.example.com/stat");
                assert_eq!(
                    args.params,
                    vec![
                        ("key".to_string(), "abc".to_string()),
                        ("x".to_string(), "1=2".to_string())
                    ]
                );
            }
            _ => panic!("Expected Get command"),
        }
    }

    #[test]
    fn test_cli_upload_parsing() {
        let cli = Cli::try_parse_from([
            "qiniu-transport",
            "upload",
            "http://up.example.com",
            "-f",
            "key=x.png",
            "--file",
            "file=/tmp/x.png",
            "--token",
            "t",
        ])
        .unwrap();
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.fields, vec![("key".to_string(), "x.png".to_string())]);
                assert_eq!(
                    args.files,
                    vec![("file".to_string(), "/tmp/x.png".to_string())]
                );
                assert_eq!(args.token.as_deref(), Some("t"));
            }
            _ => panic!("Expected Upload command"),
        }
    }

    #[test]
    fn test_cli_global_overrides() {
        let cli = Cli::try_parse_from([
            "qiniu-transport",
            "get",
            "http://rs.example.com",
            "--timeout",
            "5",
            "--retries",
            "0",
        ])
        .unwrap();
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.retries, Some(0));
        assert_eq!(cli.pool, None);
    }

    #[test]
    fn test_cli_rejects_malformed_pair() {
        let result = Cli::try_parse_from(["qiniu-transport", "get", "http://x", "-p", "novalue"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["qiniu-transport", "http://x"]);
        assert!(result.is_err());
    }
}
