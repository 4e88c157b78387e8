use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use ks_core::{Classifier, ConfigStore, KubeConfig};
use ks_fs::{resolve_kubeconfig_path, FsConfigStore};
use ks_nav::{context_rows, Navigator};
use ks_providers::{default_classifier, default_namespace_provider};

#[derive(Parser)]
#[command(
    name = "kubeswitch",
    version,
    about = "Switch Kubernetes contexts and namespaces"
)]
struct Cli {
    /// Kubeconfig to use instead of $KUBECONFIG or ~/.kube/config.
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,
    /// Append a log of this run to the given file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List contexts with category, cluster, user and namespace.
    List,
    /// Print the current context and its namespace.
    Current,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), cli.verbose)?;

    let path = resolve_kubeconfig_path(cli.kubeconfig.as_deref())?;
    let store = FsConfigStore::new();
    let config = load_config(&store, &path)?;

    match cli.command {
        None => {
            let navigator = Navigator::new(
                config,
                path,
                default_classifier(),
                default_namespace_provider(),
            );
            let reason = ks_tui::run(navigator, &store)?;
            log::info!("done: {reason:?}");
            Ok(())
        }
        Some(Command::List) => {
            print!("{}", format_context_list(&config, default_classifier().as_ref()));
            Ok(())
        }
        Some(Command::Current) => {
            println!("{}", format_current(&config)?);
            Ok(())
        }
    }
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

// The terminal belongs to the UI, so logs only go to a file the user asked for.
fn init_logging(log_file: Option<&Path>, verbose: u8) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    WriteLogger::init(log_level(verbose), log_config, file)
        .context("failed to initialize logger")?;
    log::info!("kubeswitch {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn load_config(store: &dyn ConfigStore, path: &Path) -> Result<KubeConfig> {
    let config = store
        .load(path)
        .with_context(|| format!("failed to load kubeconfig from {}", path.display()))?;
    log::info!("loaded {}", path.display());
    Ok(config)
}

fn format_context_list(config: &KubeConfig, classifier: &dyn Classifier) -> String {
    let mut out = String::new();
    for row in context_rows(config, classifier) {
        let Some(entry) = config.context(&row.name) else {
            continue;
        };
        let marker = if config.is_current(&row.name) { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker}\t{}\t{}\t{}\t{}\t{}",
            row.name,
            row.category,
            entry.cluster,
            entry.user,
            entry.namespace_or_default()
        );
    }
    out
}

fn format_current(config: &KubeConfig) -> Result<String> {
    let entry = config
        .context(&config.current_context)
        .ok_or_else(|| anyhow!("current-context is not set"))?;
    Ok(format!(
        "{}\t{}",
        config.current_context,
        entry.namespace_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ks_core::{ContextEntry, NamedContext};
    use ks_providers::KeywordClassifier;
    use tempfile::TempDir;

    fn config() -> KubeConfig {
        let named = |name: &str, namespace: Option<&str>| NamedContext {
            name: name.into(),
            context: ContextEntry {
                cluster: format!("{name}-cluster"),
                user: "ops".into(),
                namespace: namespace.map(Into::into),
                ..ContextEntry::default()
            },
            ..NamedContext::default()
        };
        KubeConfig {
            contexts: vec![named("stg-b", None), named("dev-a", Some("monitoring"))],
            current_context: "dev-a".into(),
            ..KubeConfig::default()
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kubeswitch",
            "list",
            "--kubeconfig",
            "/tmp/config",
            "-vv",
        ])
        .expect("parse");
        assert!(matches!(cli.command, Some(Command::List)));
        assert_eq!(cli.kubeconfig, Some(PathBuf::from("/tmp/config")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(log_level(cli.verbose), LevelFilter::Trace);
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["kubeswitch"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(log_level(cli.verbose), LevelFilter::Info);
    }

    #[test]
    fn list_is_sorted_and_marks_current() {
        let listing = format_context_list(&config(), &KeywordClassifier::new());
        assert_eq!(
            listing,
            "*\tdev-a\tdevelopment\tdev-a-cluster\tops\tmonitoring\n \
             \tstg-b\tstaging\tstg-b-cluster\tops\tdefault\n"
        );
    }

    #[test]
    fn current_requires_a_current_context() {
        assert_eq!(format_current(&config()).expect("current"), "dev-a\tmonitoring");
        let mut unset = config();
        unset.current_context.clear();
        assert!(format_current(&unset).is_err());
    }

    #[test]
    fn missing_kubeconfig_names_the_path() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("config");
        let err = load_config(&FsConfigStore::new(), &path).unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
