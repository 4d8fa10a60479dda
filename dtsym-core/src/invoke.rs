//! Invocation of the symbolication client binary.
//!
//! The client takes an action flag followed by `key=value` arguments. The
//! argument list is passed as an argv array; nothing is routed through a
//! shell, so values need no quoting and cannot be reinterpreted.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{DtsymError, DtsymResult};

// ============================================================================
// Invocation
// ============================================================================

/// What the client should do with the symbol file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    /// Process and upload the symbol file.
    Upload,
    /// Decode the symbol file locally.
    Decode,
}

impl fmt::Display for ClientAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Decode => write!(f, "decode"),
        }
    }
}

/// A fully specified client run.
#[derive(Debug, Clone)]
pub struct ClientInvocation {
    pub action: ClientAction,
    pub app_id: String,
    pub api_token: String,
    pub os: String,
    pub bundle_id: String,
    pub version_str: String,
    pub version: String,
    pub symbols_file: PathBuf,
    pub server: String,
    pub debug_mode: bool,
}

impl ClientInvocation {
    /// Builds the argv array for the client binary.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-{}", self.action),
            format!("appid={}", self.app_id),
            format!("apitoken={}", self.api_token),
            format!("os={}", self.os),
            format!("bundleId={}", self.bundle_id),
            format!("versionStr={}", self.version_str),
            format!("version={}", self.version),
            format!("symbolsfile={}", self.symbols_file.display()),
            format!("server={}", self.server),
        ];
        if self.debug_mode {
            args.push("DTXLogLevel=ALL".to_string());
            args.push("-verbose".to_string());
        }
        // Skip the client's already-uploaded check; re-runs are cheap and
        // erroring on an existing file would fail the pipeline.
        args.push("forced=1".to_string());
        args
    }

    /// Renders the argv for logging, with the token value blanked.
    fn display_args(&self) -> String {
        self.to_args()
            .iter()
            .map(|arg| {
                if arg.starts_with("apitoken=") {
                    "apitoken=-----".to_string()
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs the client binary and maps a non-zero exit to an error carrying
/// its stderr.
///
/// # Errors
///
/// Returns an error if the binary cannot be launched or exits non-zero.
pub async fn run_client(
    client_path: &Path,
    invocation: &ClientInvocation,
) -> DtsymResult<()> {
    info!(
        "Invoking {} {}",
        client_path.display(),
        invocation.display_args()
    );

    let output = Command::new(client_path)
        .args(invocation.to_args())
        .output()
        .await
        .map_err(|source| DtsymError::ClientSpawn {
            command: client_path.display().to_string(),
            source,
        })?;

    if output.status.success() {
        debug!("Client finished successfully");
        Ok(())
    } else {
        Err(DtsymError::ClientFailed {
            command: client_path.display().to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> ClientInvocation {
        ClientInvocation {
            action: ClientAction::Upload,
            app_id: "abcdefg".to_string(),
            api_token: "secret-token".to_string(),
            os: "ios".to_string(),
            bundle_id: "com.example.app".to_string(),
            version_str: "1.2.3".to_string(),
            version: "456".to_string(),
            symbols_file: PathBuf::from("build/App.app.dSYM"),
            server: "https://example.live.dynatrace.com".to_string(),
            debug_mode: false,
        }
    }

    #[test]
    fn args_carry_every_parameter_in_order() {
        let args = invocation().to_args();
        assert_eq!(
            args,
            vec![
                "-upload",
                "appid=abcdefg",
                "apitoken=secret-token",
                "os=ios",
                "bundleId=com.example.app",
                "versionStr=1.2.3",
                "version=456",
                "symbolsfile=build/App.app.dSYM",
                "server=https://example.live.dynatrace.com",
                "forced=1",
            ]
        );
    }

    #[test]
    fn args_contain_no_shell_quoting() {
        for arg in invocation().to_args() {
            assert!(!arg.contains('"'), "unexpected quote in {arg}");
            assert!(!arg.contains('\''), "unexpected quote in {arg}");
        }
    }

    #[test]
    fn decode_action_switches_the_flag() {
        let mut inv = invocation();
        inv.action = ClientAction::Decode;
        assert_eq!(inv.to_args()[0], "-decode");
    }

    #[test]
    fn debug_mode_appends_verbose_logging() {
        let mut inv = invocation();
        inv.debug_mode = true;
        let args = inv.to_args();
        assert!(args.contains(&"DTXLogLevel=ALL".to_string()));
        assert!(args.contains(&"-verbose".to_string()));
        assert_eq!(args.last().unwrap(), "forced=1");
    }

    #[test]
    fn logged_command_line_redacts_the_token() {
        let rendered = invocation().display_args();
        assert!(rendered.contains("apitoken=-----"));
        assert!(!rendered.contains("secret-token"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let err = run_client(Path::new("does/not/exist"), &invocation())
            .await
            .unwrap_err();
        assert!(matches!(err, DtsymError::ClientSpawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("fake-client");
        std::fs::write(&script, "#!/bin/sh\necho 'symbol file rejected' >&2\nexit 3\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = run_client(&script, &invocation()).await.unwrap_err();
        match err {
            DtsymError::ClientFailed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "symbol file rejected");
            }
            other => panic!("expected ClientFailed, got {other:?}"),
        }
    }
}
