use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use provis_config::SiteConfig;
use provis_engine::{dry_run_registry, ChainPolicy, EngineOptions, Orchestrator, RetryPolicy};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Command::new("provis")
        .version(provis_engine::VERSION)
        .about("Reconciles a declarative site definition against a remote platform")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("plan")
                .about("Dry-run a site definition and print the resulting plan")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .required(true)
                        .help("Path to the site definition JSON file"),
                )
                .arg(
                    Arg::new("max-attempts")
                        .long("max-attempts")
                        .default_value("3")
                        .value_parser(value_parser!(u32))
                        .help("Retry attempt bound per node"),
                )
                .arg(
                    Arg::new("abort-on-failure")
                        .long("abort-on-failure")
                        .action(ArgAction::SetTrue)
                        .help("Abort a sequential chain once one sibling fails"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("plan", args)) => {
            let path = args.get_one::<String>("config").unwrap();
            let max_attempts = *args.get_one::<u32>("max-attempts").unwrap();
            let chain_policy = if args.get_flag("abort-on-failure") {
                ChainPolicy::AbortOnFailure
            } else {
                ChainPolicy::ContinueOnFailure
            };

            let site = SiteConfig::from_path(path)
                .with_context(|| format!("loading site definition from {path}"))?;

            let options = EngineOptions::default()
                .with_retry(RetryPolicy::new(max_attempts))
                .with_chain_policy(chain_policy);
            let report = Orchestrator::new(options)
                .run(&site, &dry_run_registry())
                .await?;

            println!("{report}");
            std::process::exit(i32::from(!report.succeeded()));
        }
        _ => unreachable!("subcommand required"),
    }
}
