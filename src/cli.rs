//! Command line definition.
//!
//! The top level takes `login`, `companies` or a company name; everything
//! after the company name is parsed by [`company_cli`].

use crate::scope::ScopeKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

/// Per-invocation scope filter switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterFlags {
    /// `Some(true)` for `--filter`, `Some(false)` for `--no-filter`
    pub filter: Option<bool>,
    pub allow_out_of_scope: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAction {
    Add(Vec<String>),
    Remove(Vec<String>),
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyCommand {
    AddCompany,
    AddScope {
        kind: ScopeKind,
        input: Vec<String>,
    },
    RemoveScope {
        kind: ScopeKind,
        input: Vec<String>,
        flags: FilterFlags,
    },
    ShowScope(ScopeKind),
    AddDomains {
        input: Vec<String>,
        flags: FilterFlags,
    },
    RemoveDomains {
        input: Vec<String>,
    },
    Domains,
    Count,
    Show {
        query: String,
        count_only: bool,
    },
    Ip(ItemAction),
    Asn(ItemAction),
}

pub fn build_cli() -> Command {
    Command::new("bbrf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Client for the BBRF reconnaissance data server")
        .override_usage("bbrf [OPTIONS] <login|companies|COMPANY> [ARGS]...")
        .after_help("Run `bbrf <COMPANY> help` for the per-company commands.")
        .arg(config_arg())
        .arg(verbose_arg())
        .subcommand_required(true)
        .allow_external_subcommands(true)
        .external_subcommand_value_parser(value_parser!(String))
        .subcommand(
            Command::new("login")
                .about("Login to a BBRF server and save the token")
                .arg(
                    Arg::new("api")
                        .long("api")
                        .value_name("URL")
                        .help("API server URL, prompted for when missing"),
                )
                .arg(
                    Arg::new("username")
                        .short('u')
                        .long("username")
                        .help("Username, prompted for when missing"),
                ),
        )
        .subcommand(Command::new("companies").about("List all companies"))
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Configuration file (default: ~/.bbrf/config.json, .yaml also accepted)")
        .global(true)
}

fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .help("Enable verbose logging, including every scope decision")
        .action(ArgAction::SetTrue)
        .global(true)
}

fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("INPUT")
        .help("Values, `-` for stdin, or @file / file.txt")
        .required(true)
        .num_args(1..)
}

fn filter_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("filter")
            .long("filter")
            .help("Check input against the company scope before submitting")
            .action(ArgAction::SetTrue)
            .conflicts_with("no-filter"),
    )
    .arg(
        Arg::new("no-filter")
            .long("no-filter")
            .help("Submit input without checking the company scope")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("allow-out-of-scope")
            .long("allow-out-of-scope")
            .help("Accept every value even when filtering is active")
            .action(ArgAction::SetTrue),
    )
}

fn item_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .subcommand_required(true)
        .subcommand(Command::new("add").arg(input_arg()))
        .subcommand(Command::new("remove").arg(input_arg()))
        .subcommand(Command::new("list"))
}

/// Commands available after `bbrf <COMPANY>`. `--config` and `--verbose`
/// are accepted here too, anywhere after the company name.
pub fn company_cli(company: &str) -> Command {
    Command::new("company")
        .bin_name(format!("bbrf {company}"))
        .no_binary_name(true)
        .arg(config_arg())
        .arg(verbose_arg())
        .subcommand_required(true)
        .subcommand(Command::new("add-company").about("Add a new company"))
        .subcommand(
            Command::new("inscope")
                .about("Add in-scope rules")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("outscope")
                .about("Add out-of-scope rules")
                .arg(input_arg()),
        )
        .subcommand(filter_args(
            Command::new("remove-inscope")
                .about("Remove in-scope rules")
                .arg(input_arg()),
        ))
        .subcommand(filter_args(
            Command::new("remove-outscope")
                .about("Remove out-of-scope rules")
                .arg(input_arg()),
        ))
        .subcommand(
            Command::new("scope").about("Show scope rules").arg(
                Arg::new("type")
                    .required(true)
                    .value_parser(["in", "out"]),
            ),
        )
        .subcommand(
            Command::new("domain")
                .about("Add or remove subdomains")
                .subcommand_required(true)
                .subcommand(filter_args(Command::new("add").arg(input_arg())))
                .subcommand(Command::new("remove").arg(input_arg())),
        )
        .subcommand(Command::new("domains").about("List all subdomains"))
        .subcommand(Command::new("count").about("Count subdomains"))
        .subcommand(
            Command::new("show")
                .about("Show matching subdomains")
                .arg(Arg::new("query").required(true))
                .arg(
                    Arg::new("mode")
                        .value_parser(["count"])
                        .help("`count` to only print the number of matches"),
                ),
        )
        .subcommand(item_command("ip", "Manage IPs"))
        .subcommand(item_command("asn", "Manage ASNs"))
}

fn input_values(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("input")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn filter_flags(matches: &ArgMatches) -> FilterFlags {
    let filter = if matches.get_flag("filter") {
        Some(true)
    } else if matches.get_flag("no-filter") {
        Some(false)
    } else {
        None
    };

    FilterFlags {
        filter,
        allow_out_of_scope: matches.get_flag("allow-out-of-scope"),
    }
}

fn item_action(matches: &ArgMatches) -> ItemAction {
    match matches.subcommand() {
        Some(("add", m)) => ItemAction::Add(input_values(m)),
        Some(("remove", m)) => ItemAction::Remove(input_values(m)),
        _ => ItemAction::List,
    }
}

fn scope_kind(value: &str) -> ScopeKind {
    if value == "out" {
        ScopeKind::Out
    } else {
        ScopeKind::In
    }
}

/// A company command together with the global options given after the
/// company name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInvocation {
    pub command: CompanyCommand,
    pub verbose: bool,
    pub config: Option<String>,
}

/// Parse the arguments following the company name.
pub fn parse_company_command<I, S>(company: &str, args: I) -> Result<CompanyCommand, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString> + Clone,
{
    parse_company_invocation(company, args).map(|invocation| invocation.command)
}

/// Like [`parse_company_command`], also returning `--verbose` / `--config`.
pub fn parse_company_invocation<I, S>(
    company: &str,
    args: I,
) -> Result<CompanyInvocation, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<std::ffi::OsString> + Clone,
{
    let matches = company_cli(company).try_get_matches_from(args)?;

    let command = match matches.subcommand() {
        Some(("add-company", _)) => CompanyCommand::AddCompany,
        Some(("inscope", m)) => CompanyCommand::AddScope {
            kind: ScopeKind::In,
            input: input_values(m),
        },
        Some(("outscope", m)) => CompanyCommand::AddScope {
            kind: ScopeKind::Out,
            input: input_values(m),
        },
        Some(("remove-inscope", m)) => CompanyCommand::RemoveScope {
            kind: ScopeKind::In,
            input: input_values(m),
            flags: filter_flags(m),
        },
        Some(("remove-outscope", m)) => CompanyCommand::RemoveScope {
            kind: ScopeKind::Out,
            input: input_values(m),
            flags: filter_flags(m),
        },
        Some(("scope", m)) => {
            let kind = m.get_one::<String>("type").map(String::as_str).unwrap_or("in");
            CompanyCommand::ShowScope(scope_kind(kind))
        }
        Some(("domain", m)) => match m.subcommand() {
            Some(("add", add)) => CompanyCommand::AddDomains {
                input: input_values(add),
                flags: filter_flags(add),
            },
            Some(("remove", remove)) => CompanyCommand::RemoveDomains {
                input: input_values(remove),
            },
            _ => unreachable!("subcommand_required"),
        },
        Some(("domains", _)) => CompanyCommand::Domains,
        Some(("count", _)) => CompanyCommand::Count,
        Some(("show", m)) => CompanyCommand::Show {
            query: m.get_one::<String>("query").cloned().unwrap_or_default(),
            count_only: m.get_one::<String>("mode").is_some(),
        },
        Some(("ip", m)) => CompanyCommand::Ip(item_action(m)),
        Some(("asn", m)) => CompanyCommand::Asn(item_action(m)),
        _ => unreachable!("subcommand_required"),
    };

    Ok(CompanyInvocation {
        command,
        verbose: matches.get_flag("verbose"),
        config: matches.get_one::<String>("config").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CompanyCommand {
        parse_company_command("acme", args.iter().copied()).unwrap()
    }

    #[test]
    fn test_cli_definitions_are_valid() {
        build_cli().debug_assert();
        company_cli("acme").debug_assert();
    }

    #[test]
    fn test_top_level_company_is_external() {
        let matches = build_cli()
            .try_get_matches_from(["bbrf", "-v", "acme", "domain", "add", "a.com"])
            .unwrap();
        assert!(matches.get_flag("verbose"));

        let (company, sub) = matches.subcommand().unwrap();
        assert_eq!(company, "acme");
        let rest: Vec<&String> = sub.get_many::<String>("").unwrap().collect();
        assert_eq!(rest, ["domain", "add", "a.com"]);
    }

    #[test]
    fn test_domain_add_with_flags() {
        assert_eq!(
            parse(&["domain", "add", "a.com", "b.com:1.2.3.4", "--allow-out-of-scope"]),
            CompanyCommand::AddDomains {
                input: vec!["a.com".to_string(), "b.com:1.2.3.4".to_string()],
                flags: FilterFlags {
                    filter: None,
                    allow_out_of_scope: true,
                },
            }
        );

        assert_eq!(
            parse(&["domain", "add", "--no-filter", "-"]),
            CompanyCommand::AddDomains {
                input: vec!["-".to_string()],
                flags: FilterFlags {
                    filter: Some(false),
                    allow_out_of_scope: false,
                },
            }
        );
    }

    #[test]
    fn test_global_options_after_company() {
        let invocation = parse_company_invocation(
            "acme",
            ["domain", "add", "a.com", "-v", "--config", "x.yaml"],
        )
        .unwrap();
        assert!(invocation.verbose);
        assert_eq!(invocation.config.as_deref(), Some("x.yaml"));
        assert_eq!(
            invocation.command,
            CompanyCommand::AddDomains {
                input: vec!["a.com".to_string()],
                flags: FilterFlags::default(),
            }
        );

        let plain = parse_company_invocation("acme", ["-c", "y.json", "count"]).unwrap();
        assert!(!plain.verbose);
        assert_eq!(plain.config.as_deref(), Some("y.json"));
        assert_eq!(plain.command, CompanyCommand::Count);
    }

    #[test]
    fn test_filter_and_no_filter_conflict() {
        let result = parse_company_command(
            "acme",
            ["domain", "add", "--filter", "--no-filter", "a.com"],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_scope_commands() {
        assert_eq!(
            parse(&["inscope", "*.a.com *.b.com"]),
            CompanyCommand::AddScope {
                kind: ScopeKind::In,
                input: vec!["*.a.com *.b.com".to_string()],
            }
        );
        assert_eq!(parse(&["scope", "out"]), CompanyCommand::ShowScope(ScopeKind::Out));
        assert!(parse_company_command("acme", ["scope", "sideways"]).is_err());

        match parse(&["remove-outscope", "@out.txt", "--filter"]) {
            CompanyCommand::RemoveScope { kind, input, flags } => {
                assert_eq!(kind, ScopeKind::Out);
                assert_eq!(input, vec!["@out.txt"]);
                assert_eq!(flags.filter, Some(true));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_show_and_items() {
        assert_eq!(
            parse(&["show", "www.acme.com", "count"]),
            CompanyCommand::Show {
                query: "www.acme.com".to_string(),
                count_only: true,
            }
        );
        assert_eq!(
            parse(&["ip", "add", "1.2.3.4"]),
            CompanyCommand::Ip(ItemAction::Add(vec!["1.2.3.4".to_string()]))
        );
        assert_eq!(parse(&["asn", "list"]), CompanyCommand::Asn(ItemAction::List));
        assert_eq!(parse(&["count"]), CompanyCommand::Count);
        assert!(parse_company_command("acme", ["ip"]).is_err());
        assert!(parse_company_command("acme", ["bogus"]).is_err());
    }
}
