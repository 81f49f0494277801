use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use compliance_core::{
    resolve_layout, AnalyticsEvent, ComplianceConfig, Deferred, Identity, MenuInputs,
    MenuReconciler, ReconcilePhase, RouteDecision,
};
use compliance_model::{ComplianceRole, SharedReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn identity_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("role")
                .long("role")
                .value_parser(value_parser!(ComplianceRole))
                .help("Compliance role: scientist or lab-manager"),
        )
        .arg(
            Arg::new("orcid")
                .long("orcid")
                .help("ORCID iD of a confirmed linked account"),
        )
        .arg(
            Arg::new("admin")
                .long("admin")
                .action(ArgAction::SetTrue)
                .help("User has the compliance admin scope"),
        )
}

fn cli() -> Command {
    Command::new("compliance")
        .version(compliance_core::VERSION)
        .about("Inspect compliance routing, menus and analytics events")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML or YAML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand_required(true)
        .subcommand(identity_args(
            Command::new("route")
                .about("Resolve the layout redirect for a path")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .required(true)
                        .help("Requested app path, e.g. /app/compliance/reports"),
                ),
        ))
        .subcommand(identity_args(
            Command::new("menu")
                .about("Reconcile the navigation menu and print it as JSON")
                .arg(
                    Arg::new("exists")
                        .long("exists")
                        .action(ArgAction::SetTrue)
                        .help("Scientist exists in the data source"),
                )
                .arg(
                    Arg::new("shared")
                        .long("shared")
                        .action(ArgAction::Append)
                        .help("Report shared with the user, as ORCID or ORCID=Name"),
                ),
        ))
        .subcommand(
            Command::new("events")
                .about("List analytics events")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("check-config").about("Validate and print the effective configuration"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<ComplianceConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => ComplianceConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ComplianceConfig::default()),
    }
}

fn identity_from(args: &ArgMatches) -> Identity {
    Identity::new(
        args.get_flag("admin"),
        args.get_one::<String>("orcid").map(String::as_str),
        args.get_one::<ComplianceRole>("role").copied(),
    )
}

fn parse_shared(raw: &str) -> Result<SharedReport> {
    let (orcid, name) = match raw.split_once('=') {
        Some((orcid, name)) => (orcid.trim(), Some(name.trim())),
        None => (raw.trim(), None),
    };
    if orcid.is_empty() {
        bail!("shared report {raw:?} has no ORCID");
    }
    let report = SharedReport::new(format!("owner-{orcid}"), Some(orcid));
    Ok(match name.filter(|n| !n.is_empty()) {
        Some(name) => report.with_owner_name(name),
        None => report,
    })
}

fn route(config: &ComplianceConfig, args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("path")
        .context("--path is required")?;
    let identity = identity_from(args);

    match resolve_layout(config.base(), path, &identity) {
        RouteDecision::Stay => println!("stay {path}"),
        RouteDecision::Redirect(destination) => {
            println!("redirect {}", destination.path(config.base()));
        }
    }
    Ok(())
}

async fn menu(config: &ComplianceConfig, args: &ArgMatches) -> Result<()> {
    let identity = identity_from(args);
    let exists = args.get_flag("exists") && identity.orcid.is_some();
    let shared = args
        .get_many::<String>("shared")
        .into_iter()
        .flatten()
        .map(|raw| parse_shared(raw))
        .collect::<Result<Vec<_>>>()?;

    let reconciler = MenuReconciler::new(config);
    let mut updates = reconciler.subscribe();
    reconciler
        .submit(MenuInputs::new(
            identity,
            Deferred::ready(exists),
            Deferred::ready(shared),
        ))
        .context("menu reconciler already unmounted")?;

    let snapshot = updates
        .wait_for(|s| s.phase != ReconcilePhase::Resolving)
        .await
        .context("menu reconciler stopped before committing")?
        .clone();

    let output = serde_json::json!({
        "phase": snapshot.phase,
        "key": snapshot.key,
        "generation": snapshot.generation,
        "menu": snapshot.menu.as_ref(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn events(args: &ArgMatches) -> Result<()> {
    if args.get_flag("json") {
        let listed: Vec<_> = AnalyticsEvent::all()
            .map(|e| serde_json::json!({"name": e.name(), "description": e.description()}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
    } else {
        for event in AnalyticsEvent::all() {
            println!("{:<48} {}", event.name(), event.description());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let config = load_config(&matches)?;
    tracing::debug!(base = config.base(), "configuration loaded");

    match matches.subcommand() {
        Some(("route", args)) => route(&config, args),
        Some(("menu", args)) => menu(&config, args).await,
        Some(("events", args)) => events(args),
        Some(("check-config", _)) => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    }
}
