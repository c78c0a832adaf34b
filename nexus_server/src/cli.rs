use std::env::VarError;

use crate::config::ServerConfig;

const README: &str = include_str!("./cli-help.txt");

/// Settings read from the environment, and whether their values may be shown on the console.
const SETTINGS: [(&str, bool); 19] = [
    ("RUST_LOG", false),
    ("NEXUS_HOST", false),
    ("NEXUS_PORT", false),
    ("NEXUS_DATABASE_URL", false),
    ("NEXUS_DB_MAX_CONNECTIONS", false),
    ("NEXUS_OIDC_ISSUER", false),
    ("NEXUS_AZUREAD_TENANT_ID", false),
    ("NEXUS_CLIENT_ID", false),
    ("NEXUS_CLIENT_SECRET", true),
    ("NEXUS_REDIRECT_URL", false),
    ("NEXUS_FRONTEND_URL", false),
    ("NEXUS_SCOPES", false),
    ("NEXUS_CORS_ORIGIN", false),
    ("NEXUS_CREDENTIAL_SOURCE", false),
    ("NEXUS_SECURE_COOKIES", false),
    ("NEXUS_UPLOADS_DIR", false),
    ("NEXUS_PROFILE_URL", false),
    ("NEXUS_REQUEST_TIMEOUT", false),
    ("NEXUS_TOKEN_LEEWAY", false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    /// Resolve the configuration, report it, and exit without starting the server.
    CheckConfig,
    Help,
}

impl Command {
    /// The first argument after the program name picks the command. Anything unrecognised asks for help.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        match args.into_iter().nth(1).as_deref() {
            None => Command::Serve,
            Some("--check-config") | Some("check") => Command::CheckConfig,
            Some(_) => Command::Help,
        }
    }
}

/// Handles any command other than [`Command::Serve`]. Returns the exit code when the process should stop here.
pub fn handle_command_line_args() -> Option<i32> {
    match Command::from_args(std::env::args()) {
        Command::Serve => None,
        Command::Help => {
            println!("\n{README}\n");
            print_settings(|name| std::env::var(name));
            Some(0)
        },
        Command::CheckConfig => {
            print_settings(|name| std::env::var(name));
            match ServerConfig::try_from_env() {
                Ok(config) => {
                    println!("\n{}", config_summary(&config));
                    Some(0)
                },
                Err(e) => {
                    eprintln!("\n{e}");
                    Some(1)
                },
            }
        },
    }
}

fn print_settings<F: Fn(&str) -> Result<String, VarError>>(lookup: F) {
    println!("Current environment values:");
    for (name, value) in describe_settings(lookup) {
        println!("  {name:<35} {value}");
    }
}

/// Describes each setting for display. Secret values are reported as set or not set, never shown.
pub fn describe_settings<F: Fn(&str) -> Result<String, VarError>>(lookup: F) -> Vec<(&'static str, String)> {
    SETTINGS
        .iter()
        .map(|&(name, secret)| {
            let value = match lookup(name) {
                Ok(_) if secret => "Set (hidden)".to_string(),
                Ok(s) => s,
                Err(VarError::NotPresent) => "Not set".to_string(),
                Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
            };
            (name, value)
        })
        .collect()
}

/// The settings the server would run with, after defaults have been applied.
pub fn config_summary(config: &ServerConfig) -> String {
    let options = &config.options;
    [
        format!("Listening on       {}:{}", config.host, config.port),
        format!("Database           {} ({} connections)", config.database_url, config.db_max_connections),
        format!("Issuer             {}", config.auth.issuer),
        format!("Client id          {}", config.auth.client_id),
        format!("Redirect URL       {}", config.auth.redirect_url),
        format!("Frontend URL       {}", config.auth.frontend_url),
        format!("Scopes             {}", config.auth.scopes.join(" ")),
        format!("CORS origin        {}", config.cors_origin),
        format!("Credential source  {:?}", options.credential_source),
        format!("Secure cookies     {}", options.secure_cookies),
        format!("Uploads            {}", options.uploads_dir.display()),
        format!("Store timeout      {}s", options.request_timeout.as_secs()),
        format!("Token leeway       {}s", config.auth.token_leeway),
    ]
    .join("\n")
}
