//! CLI argument definitions using clap derive.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dtsym - Dynatrace symbol processing for CI pipelines
///
/// Keeps the Dynatrace symbolication client installed and current, links
/// the LLDB framework it needs, and processes or uploads mobile
/// debug-symbol files.
#[derive(Parser, Debug)]
#[command(name = "dtsym")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process and upload a symbol file
    Upload(UploadArgs),

    /// Resolve the symbolication client and print its path
    Client(ClientArgs),
}

/// Connection settings shared by all commands
#[derive(Args, Debug)]
pub struct ClientArgs {
    /// API endpoint of the Dynatrace environment
    #[arg(long, env = "DTSYM_SERVER")]
    pub server: String,

    /// API token for the environment
    #[arg(long, env = "DTSYM_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Deprecated: path to a pre-installed symbolication client
    #[arg(long, env = "DTSYM_CLIENT_PATH")]
    pub client_path: Option<PathBuf>,
}

/// Target OS of the symbol file
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    Ios,
    Android,
}

impl TargetOs {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

/// Arguments for the upload command
#[derive(Args, Debug)]
#[command(disable_version_flag = true)]
pub struct UploadArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Application ID from the Dynatrace WebUI
    #[arg(long, env = "DTSYM_APP_ID")]
    pub app_id: String,

    /// CFBundleIdentifier (iOS) / package name (Android) of the app
    #[arg(long, env = "DTSYM_BUNDLE_ID")]
    pub bundle_id: String,

    /// Target OS of the symbol file
    #[arg(long, value_enum, env = "DTSYM_OS")]
    pub os: TargetOs,

    /// CFBundleVersion (iOS) / versionCode (Android)
    #[arg(long, env = "DTSYM_VERSION")]
    pub version: String,

    /// CFBundleShortVersionString (iOS) / versionName (Android)
    #[arg(long, env = "DTSYM_VERSION_STR")]
    pub version_str: String,

    /// Path of the dSYM archive (iOS) or mapping file (Android)
    #[arg(long, env = "DTSYM_SYMBOLS_FILE")]
    pub symbols_file: PathBuf,

    /// Zip oversized symbol files before upload (Android)
    #[arg(long)]
    pub auto_zip: bool,

    /// Custom LLDB framework to link beside the client (iOS)
    #[arg(long, env = "DTSYM_LLDB_PATH")]
    pub lldb_path: Option<PathBuf>,

    /// Skip linking the LLDB framework (iOS)
    #[arg(long)]
    pub no_lldb_link: bool,

    /// Decode the symbol file locally instead of uploading
    #[arg(long)]
    pub decode: bool,

    /// Enable verbose client logging
    #[arg(long)]
    pub debug_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_parses_required_flags() {
        let cli = Cli::try_parse_from([
            "dtsym",
            "upload",
            "--server",
            "https://example.live.dynatrace.com",
            "--api-token",
            "token",
            "--app-id",
            "abcdefg",
            "--bundle-id",
            "com.example.app",
            "--os",
            "android",
            "--version",
            "456",
            "--version-str",
            "1.2.3",
            "--symbols-file",
            "mapping.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.os, TargetOs::Android);
                assert_eq!(args.symbols_file, PathBuf::from("mapping.txt"));
                assert!(!args.auto_zip);
            }
            other => panic!("expected upload, got {other:?}"),
        }
    }

    #[test]
    fn client_subcommand_accepts_the_deprecated_path() {
        let cli = Cli::try_parse_from([
            "dtsym",
            "client",
            "--server",
            "https://example.live.dynatrace.com",
            "--api-token",
            "token",
            "--client-path",
            "custom/Client",
        ])
        .unwrap();

        match cli.command {
            Commands::Client(args) => {
                assert_eq!(args.client_path, Some(PathBuf::from("custom/Client")));
            }
            other => panic!("expected client, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_flags_fail_parsing() {
        let result = Cli::try_parse_from(["dtsym", "upload", "--os", "ios"]);
        assert!(result.is_err());
    }
}
