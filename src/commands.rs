use crate::cli::{CompanyCommand, FilterFlags, ItemAction};
use crate::client::{self, ApiClient, ApiResponse};
use crate::config::{Config, FilterTarget, ScopeFilterSettings};
use crate::input::{filter_batch, InputSource};
use crate::scope::{ScopeContext, ScopeKind};
use crate::token::TokenInfo;
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use std::path::Path;

/// JSON body for every submission endpoint: `{"company": ..., key: value}`
pub fn submission_body(company: &str, key: &str, value: &str) -> Value {
    let mut body = json!({ "company": company });
    body[key] = Value::String(value.to_string());
    body
}

fn print_response(response: &ApiResponse) -> Result<()> {
    println!("{}", response.body.trim_end());
    if !response.is_success() {
        bail!("Server returned status {}", response.status);
    }
    Ok(())
}

fn read_input(input: &[String]) -> Result<String> {
    let source = InputSource::from_args(input)?;
    log::debug!("Reading input from {source:?}");
    Ok(source.read()?)
}

/// Run `raw` through the scope filter when it applies to `target`.
///
/// Returns `None` when input was given but nothing passed.
async fn apply_scope_filter(
    client: &ApiClient,
    settings: &ScopeFilterSettings,
    target: FilterTarget,
    flags: FilterFlags,
    company: &str,
    raw: String,
) -> Option<String> {
    if !settings.is_active(target, flags.filter) {
        log::debug!("Scope filtering disabled for {target:?}");
        return Some(raw);
    }

    // Pass-through mode never needs the rules
    let ctx = if flags.allow_out_of_scope {
        ScopeContext::empty(company)
    } else {
        client.load_scope_context(company).await
    };

    let result = filter_batch(&raw, &ctx, flags.allow_out_of_scope);
    for (token, decision) in &result.rejected {
        log::debug!("Rejected {token}: {}", decision.reason);
    }
    log::info!(
        "{}/{} entries passed scope filtering for {company}",
        result.accepted_count,
        result.total_count
    );

    if result.is_filtered_out() {
        None
    } else {
        Some(result.joined())
    }
}

async fn submit(client: &ApiClient, path: &str, body: Value) -> Result<()> {
    let response = client.post(path, &body).await?;
    print_response(&response)
}

async fn run_items(
    client: &ApiClient,
    company: &str,
    action: ItemAction,
    (add_path, remove_path, list_path, key): (&str, &str, &str, &str),
) -> Result<()> {
    match action {
        ItemAction::Add(input) => {
            let raw = read_input(&input)?;
            submit(client, add_path, submission_body(company, key, &raw)).await
        }
        ItemAction::Remove(input) => {
            let raw = read_input(&input)?;
            submit(client, remove_path, submission_body(company, key, &raw)).await
        }
        ItemAction::List => {
            let response = client.get(list_path, &[("company", company)]).await?;
            print_response(&response)
        }
    }
}

/// Execute one command for `company`.
pub async fn run_company_command(
    client: &ApiClient,
    settings: &ScopeFilterSettings,
    company: &str,
    command: CompanyCommand,
) -> Result<()> {
    match command {
        CompanyCommand::AddCompany => {
            submit(client, "/api/company", json!({ "company": company })).await
        }
        CompanyCommand::AddScope { kind, input } => {
            let raw = read_input(&input)?;
            let path = match kind {
                ScopeKind::In => "/api/scope/in",
                ScopeKind::Out => "/api/scope/out",
            };
            submit(client, path, submission_body(company, "domains", &raw)).await
        }
        CompanyCommand::RemoveScope { kind, input, flags } => {
            let raw = read_input(&input)?;
            let Some(value) = apply_scope_filter(
                client,
                settings,
                FilterTarget::ScopeRemoval,
                flags,
                company,
                raw,
            )
            .await
            else {
                eprintln!("No rules passed scope filtering, nothing removed");
                return Ok(());
            };

            let mut body = submission_body(company, "domains", &value);
            body["type"] = Value::String(kind.as_str().to_string());
            submit(client, "/api/scope/remove", body).await
        }
        CompanyCommand::ShowScope(kind) => {
            let response = client
                .get(
                    "/api/scope/show",
                    &[("company", company), ("type", kind.as_str())],
                )
                .await?;
            print_response(&response)
        }
        CompanyCommand::AddDomains { input, flags } => {
            let raw = read_input(&input)?;
            let Some(value) = apply_scope_filter(
                client,
                settings,
                FilterTarget::DomainAdd,
                flags,
                company,
                raw,
            )
            .await
            else {
                eprintln!("No domains passed scope filtering, nothing submitted");
                return Ok(());
            };

            submit(
                client,
                "/api/domains/add",
                submission_body(company, "domains", &value),
            )
            .await
        }
        CompanyCommand::RemoveDomains { input } => {
            let raw = read_input(&input)?;
            submit(
                client,
                "/api/domains/remove",
                submission_body(company, "domains", &raw),
            )
            .await
        }
        CompanyCommand::Domains => {
            let response = client.get("/api/domains", &[("company", company)]).await?;
            print_response(&response)
        }
        CompanyCommand::Count => {
            let response = client
                .get("/api/domains/count", &[("company", company)])
                .await?;
            print_response(&response)
        }
        CompanyCommand::Show { query, count_only } => {
            let count = if count_only { "true" } else { "false" };
            let response = client
                .get(
                    "/api/domains/show",
                    &[("company", company), ("q", query.as_str()), ("count", count)],
                )
                .await?;
            print_response(&response)
        }
        CompanyCommand::Ip(action) => {
            run_items(
                client,
                company,
                action,
                ("/api/ip", "/api/ip/remove", "/api/ip/list", "ips"),
            )
            .await
        }
        CompanyCommand::Asn(action) => {
            run_items(
                client,
                company,
                action,
                ("/api/asn/add", "/api/asn/remove", "/api/asn/list", "asns"),
            )
            .await
        }
    }
}

pub async fn list_companies(client: &ApiClient) -> Result<()> {
    let companies = client
        .companies()
        .await
        .context("Failed to parse company list")?;
    for company in companies {
        println!("{company}");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Interactive login; the token is stored in the configuration file.
pub async fn login(
    config_path: &Path,
    mut config: Config,
    api: Option<&str>,
    username: Option<&str>,
) -> Result<()> {
    let api = match api {
        Some(api) => api.to_string(),
        None => prompt("API Server URL (e.g., https://localhost:8443): ")?,
    };
    let api: String = api.chars().filter(|c| !c.is_whitespace()).collect();
    let username = match username {
        Some(username) => username.trim().to_string(),
        None => prompt("Username: ")?,
    };
    let password = prompt("Password: ")?;

    let token = client::login(&api, &username, &password).await?;

    config.token = token;
    config.api = api;
    config
        .to_file(config_path)
        .with_context(|| format!("Failed to save token to {}", config_path.display()))?;

    println!("Login successful and token saved.");
    match TokenInfo::parse(&config.token) {
        Ok(info) => {
            if let Some(secs) = info.remaining_secs() {
                println!("Token valid for {}h{:02}m", secs / 3600, (secs % 3600) / 60);
            }
        }
        Err(e) => log::debug!("Token is not an inspectable JWT: {e}"),
    }
    Ok(())
}

/// Build a client from the stored configuration, warning about stale tokens.
pub fn connect(config: &Config) -> Result<ApiClient> {
    if !config.is_logged_in() {
        bail!("Not logged in, run `bbrf login` first");
    }

    match TokenInfo::parse(&config.token) {
        Ok(info) if info.is_expired() => {
            log::warn!("Stored token has expired, run `bbrf login` to refresh it");
        }
        Ok(_) => {}
        Err(e) => log::debug!("Could not inspect stored token: {e}"),
    }

    Ok(ApiClient::new(&config.api, &config.token)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_body() {
        let body = submission_body("acme", "domains", "a.com\nb.com:1.2.3.4");
        assert_eq!(
            body,
            json!({ "company": "acme", "domains": "a.com\nb.com:1.2.3.4" })
        );

        let ips = submission_body("acme", "ips", "1.2.3.4");
        assert_eq!(ips["ips"], "1.2.3.4");
    }

    #[test]
    fn test_connect_requires_login() {
        assert!(connect(&Config::default()).is_err());

        let config = Config {
            token: "a.b.c".to_string(),
            api: "https://localhost:8443".to_string(),
            ..Config::default()
        };
        assert!(connect(&config).is_ok());
    }

    #[test]
    fn test_print_response_status() {
        let ok = ApiResponse {
            status: 200,
            body: "{}".to_string(),
        };
        assert!(print_response(&ok).is_ok());

        let denied = ApiResponse {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert!(print_response(&denied).is_err());
    }

    #[tokio::test]
    async fn test_filter_skipped_when_inactive() {
        let client = ApiClient::new("http://127.0.0.1:1", "token").unwrap();
        let settings = ScopeFilterSettings::default();

        let raw = "anything.org".to_string();
        let value = apply_scope_filter(
            &client,
            &settings,
            FilterTarget::ScopeRemoval,
            FilterFlags::default(),
            "acme",
            raw.clone(),
        )
        .await;
        assert_eq!(value, Some(raw));
    }

    #[tokio::test]
    async fn test_filter_pass_through_rejoins_tokens() {
        let client = ApiClient::new("http://127.0.0.1:1", "token").unwrap();
        let flags = FilterFlags {
            filter: Some(true),
            allow_out_of_scope: true,
        };

        let value = apply_scope_filter(
            &client,
            &ScopeFilterSettings::default(),
            FilterTarget::DomainAdd,
            flags,
            "acme",
            "a.com b.com:1.2.3.4\n".to_string(),
        )
        .await;
        assert_eq!(value.as_deref(), Some("a.com\nb.com:1.2.3.4"));
    }

    #[tokio::test]
    async fn test_filter_empty_input_is_not_filtered_out() {
        let client = ApiClient::new("http://127.0.0.1:1", "token").unwrap();
        let value = apply_scope_filter(
            &client,
            &ScopeFilterSettings::default(),
            FilterTarget::DomainAdd,
            FilterFlags::default(),
            "acme",
            "   ".to_string(),
        )
        .await;
        assert_eq!(value.as_deref(), Some(""));
    }
}
