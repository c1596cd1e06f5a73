use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use vicloud_report::bind::{bind, Topology};
use vicloud_report::config::Config;
use vicloud_report::error::emit_all;
use vicloud_report::graph::{self, RenderContext};
use vicloud_report::report;
use vicloud_report::resource::{self, RecordFilter, RecordStream};

/// Reports over dumped cloud inventory
#[derive(Parser, Debug)]
#[command(name = "vicloud-report", version = vicloud_report::VERSION, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    report: Report,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

/// Which records a report reads
#[derive(Args, Debug)]
struct Scope {
    /// Only read records of these profiles (repeatable, comma separated)
    #[arg(long, value_delimiter = ',')]
    profile: Vec<String>,

    /// Only read records of these regions (repeatable, comma separated)
    #[arg(long, value_delimiter = ',')]
    region: Vec<String>,

    /// Dump directory or file to read
    root: PathBuf,
}

impl Scope {
    fn filter(&self, config: &Config) -> RecordFilter {
        RecordFilter::new(
            config.effective_profiles(&self.profile),
            config.effective_regions(&self.region),
        )
    }
}

#[derive(Subcommand, Debug)]
enum Report {
    /// Load balancer topology as a Graphviz digraph
    Elb {
        #[command(flatten)]
        scope: Scope,

        /// Draw instances even when no load balancer reaches them
        #[arg(long)]
        show_all_hosts: bool,

        /// Supplemental DNS document `{result: [{name, type, content}]}`
        #[arg(long)]
        dns_source: Vec<PathBuf>,
    },

    /// VPC, subnet and instance nesting as a Graphviz graph
    Network {
        #[command(flatten)]
        scope: Scope,
    },

    /// Raw identifier references between dumped resources
    Refs {
        #[command(flatten)]
        scope: Scope,
    },

    /// Network ACL tables followed by security group tables
    Security {
        #[command(flatten)]
        scope: Scope,
    },

    /// Interface and subnet address inventory
    Ipaddrs {
        #[command(flatten)]
        scope: Scope,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// `RUST_LOG` overrides `--log-level` when set
fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    if matches!(level, LogLevel::Off) {
        return Ok(None);
    }

    let (writer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {:?}", path))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("vicloud-report {} started with log level: {:?}", vicloud_report::VERSION, level);
    if let Some(path) = log_file {
        tracing::info!("Log file: {:?}", path);
    }

    Ok(Some(guard))
}

/// Load, bind, render. Warnings are surfaced once the output is built.
fn bound_report<F>(scope: &Scope, config: &Config, dns_sources: &[PathBuf], render: F) -> Result<String>
where
    F: FnOnce(&Topology<'_>) -> String,
{
    let filter = scope.filter(config);
    let (inventory, mut warnings) = resource::load(&scope.root, &filter, dns_sources)
        .with_context(|| format!("cannot load {:?}", scope.root))?;

    let topology = bind(&inventory);
    let output = render(&topology);

    warnings.extend_from_slice(topology.warnings());
    emit_all(&warnings);
    Ok(output)
}

fn run(report: Report, config: &Config) -> Result<String> {
    match report {
        Report::Elb {
            scope,
            show_all_hosts,
            dns_source,
        } => {
            let dns_sources = config.effective_dns_sources(&dns_source);
            let show_all_hosts = config.effective_show_all_hosts(show_all_hosts);
            bound_report(&scope, config, &dns_sources, |topology| {
                graph::elb::render(&RenderContext {
                    topology,
                    show_all_hosts,
                })
            })
        }
        Report::Network { scope } => bound_report(&scope, config, &[], |topology| {
            graph::network::render(&RenderContext {
                topology,
                show_all_hosts: false,
            })
        }),
        Report::Refs { scope } => {
            let stream = RecordStream::open(&scope.root, scope.filter(config))
                .with_context(|| format!("cannot read {:?}", scope.root))?;
            let mut warnings = Vec::new();
            let output = graph::refs::render(stream, &mut warnings)?;
            emit_all(&warnings);
            Ok(output)
        }
        Report::Security { scope } => bound_report(&scope, config, &[], |topology| {
            let mut out = report::acl::render(topology);
            out.push_str(&report::security::render(topology));
            out
        }),
        Report::Ipaddrs { scope } => bound_report(&scope, config, &[], report::ipaddrs::render),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = setup_logging(cli.log_level, cli.log_file.as_deref())?;

    let config = Config::load();
    tracing::debug!("config: {:?}", config);

    let output = run(cli.report, &config)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_split_on_commas() {
        let cli = Cli::try_parse_from([
            "vicloud-report",
            "security",
            "--profile",
            "prod,stage",
            "--profile",
            "dev",
            "dump",
        ])
        .unwrap();
        let Report::Security { scope } = cli.report else {
            panic!("wrong subcommand");
        };
        assert_eq!(scope.profile, vec!["prod", "stage", "dev"]);
        assert_eq!(scope.root, PathBuf::from("dump"));
    }

    #[test]
    fn test_elb_flags() {
        let cli = Cli::try_parse_from([
            "vicloud-report",
            "--log-level",
            "info",
            "elb",
            "--show-all-hosts",
            "--dns-source",
            "zone.yaml",
            "dump",
        ])
        .unwrap();
        assert!(matches!(cli.log_level, LogLevel::Info));
        let Report::Elb {
            show_all_hosts,
            dns_source,
            ..
        } = cli.report
        else {
            panic!("wrong subcommand");
        };
        assert!(show_all_hosts);
        assert_eq!(dns_source, vec![PathBuf::from("zone.yaml")]);
    }

    #[test]
    fn test_root_is_required() {
        assert!(Cli::try_parse_from(["vicloud-report", "ipaddrs"]).is_err());
    }
}
