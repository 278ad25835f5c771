//! CLI argument definitions for the kubeact binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Args, Parser, Subcommand};
use kubeact_core::config::KubeactConfig;
use std::path::PathBuf;

/// kubeact: confirmed, cancellable actions against cluster workloads.
#[derive(Parser, Debug)]
#[command(name = "kubeact", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Restart a Deployment, StatefulSet or DaemonSet from its JSON manifest.
    Restart(RestartArgs),
}

#[derive(Args, Debug)]
pub struct RestartArgs {
    /// Workload manifest (JSON) to restart.
    pub manifest: PathBuf,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Grace window before the restart is applied, in milliseconds.
    #[arg(long = "grace-ms")]
    pub grace_ms: Option<u64>,

    /// Cancel the restart after this many milliseconds.
    #[arg(long = "cancel-after-ms")]
    pub cancel_after_ms: Option<u64>,

    /// Location to return to after a cancel or a failure.
    #[arg(long = "location", default_value = "/")]
    pub location: String,

    /// Write the applied manifest here instead of stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > KUBEACT_CONFIG env var > ~/.kubeact/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("KUBEACT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config: &KubeactConfig) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config.general.log_level.clone())
    }
}

impl RestartArgs {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut KubeactConfig) {
        if let Some(ms) = self.grace_ms {
            config.scheduler.grace_period_ms = ms;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".kubeact").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".kubeact").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restart_args(args: &CliArgs) -> &RestartArgs {
        match &args.command {
            Command::Restart(r) => r,
        }
    }

    #[test]
    fn test_parse_restart_defaults() {
        let args = CliArgs::try_parse_from(["kubeact", "restart", "web.json"]).unwrap();
        let restart = restart_args(&args);
        assert_eq!(restart.manifest, PathBuf::from("web.json"));
        assert!(!restart.yes);
        assert_eq!(restart.location, "/");
        assert!(restart.grace_ms.is_none());
        assert!(restart.output.is_none());
    }

    #[test]
    fn test_parse_restart_flags() {
        let args = CliArgs::try_parse_from([
            "kubeact",
            "restart",
            "web.json",
            "--yes",
            "--grace-ms",
            "250",
            "--cancel-after-ms",
            "100",
            "--location",
            "/c/main/deployments",
            "-o",
            "out.json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let restart = restart_args(&args);
        assert!(restart.yes);
        assert_eq!(restart.grace_ms, Some(250));
        assert_eq!(restart.cancel_after_ms, Some(100));
        assert_eq!(restart.location, "/c/main/deployments");
        assert_eq!(restart.output, Some(PathBuf::from("out.json")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_manifest_is_required() {
        assert!(CliArgs::try_parse_from(["kubeact", "restart"]).is_err());
    }

    #[test]
    fn test_config_flag_wins() {
        let args =
            CliArgs::try_parse_from(["kubeact", "-c", "/tmp/k.toml", "restart", "a.json"]).unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/k.toml"));
    }

    #[test]
    fn test_log_level_precedence() {
        let mut config = KubeactConfig::default();
        config.general.log_level = "warn".to_string();

        let args = CliArgs::try_parse_from(["kubeact", "restart", "a.json"]).unwrap();
        assert_eq!(args.resolve_log_level(&config), "warn");

        let args =
            CliArgs::try_parse_from(["kubeact", "restart", "a.json", "-l", "trace"]).unwrap();
        assert_eq!(args.resolve_log_level(&config), "trace");
    }

    #[test]
    fn test_grace_override() {
        let mut config = KubeactConfig::default();
        let args =
            CliArgs::try_parse_from(["kubeact", "restart", "a.json", "--grace-ms", "0"]).unwrap();
        restart_args(&args).apply_overrides(&mut config);
        assert_eq!(config.scheduler.grace_period_ms, 0);

        let mut config = KubeactConfig::default();
        let args = CliArgs::try_parse_from(["kubeact", "restart", "a.json"]).unwrap();
        restart_args(&args).apply_overrides(&mut config);
        assert_eq!(config.scheduler.grace_period_ms, 5_000);
    }
}
