use bbrf::cli::{build_cli, parse_company_invocation, CompanyInvocation};
use bbrf::commands;
use bbrf::Config;
use clap::ArgMatches;
use log::LevelFilter;
use std::path::PathBuf;
use std::process;

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    // Options may also follow the company name, so parse that part up front
    let company = match matches.subcommand() {
        Some(("login", _)) | Some(("companies", _)) | None => None,
        Some((company, sub)) => {
            let args: Vec<String> = sub
                .get_many::<String>("")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();

            match parse_company_invocation(company, args) {
                Ok(invocation) => Some((company.to_string(), invocation)),
                Err(e) => e.exit(),
            }
        }
    };

    let verbose = matches.get_flag("verbose")
        || company.as_ref().is_some_and(|(_, invocation)| invocation.verbose);

    // Initialize logger based on verbose flag
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(&matches, company).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(
    matches: &ArgMatches,
    company: Option<(String, CompanyInvocation)>,
) -> anyhow::Result<()> {
    let config_arg = company
        .as_ref()
        .and_then(|(_, invocation)| invocation.config.as_ref())
        .or_else(|| matches.get_one::<String>("config"));
    let config_path = match config_arg {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };
    let config = Config::load_or_default(&config_path)?;

    if let Some((company, invocation)) = company {
        let client = commands::connect(&config)?;
        return commands::run_company_command(
            &client,
            &config.scope_filter,
            &company,
            invocation.command,
        )
        .await;
    }

    match matches.subcommand() {
        Some(("login", sub)) => {
            commands::login(
                &config_path,
                config,
                sub.get_one::<String>("api").map(String::as_str),
                sub.get_one::<String>("username").map(String::as_str),
            )
            .await
        }
        Some(("companies", _)) => {
            let client = commands::connect(&config)?;
            commands::list_companies(&client).await
        }
        _ => unreachable!("subcommand_required"),
    }
}
