//! `briefgate` - CLI for gated account intelligence briefs
//!
//! This binary wires the library's access, ledger and agent layers to the
//! command line and prints results to stdout.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::debug;

use briefgate::brief::{Brief, PerplexityClient, MODULES};
use briefgate::cli::{
    AdminArgs, AdminCommand, Cli, Command, ConfigCommand, ContactCommand, LoginCommand,
    RequestAccessCommand, RunCommand,
};
use briefgate::session::{self, OwnerCredentials};
use briefgate::storage::keys;
use briefgate::webhook::{self, ContactMessage, SignupRequest, WebhookOutcome};
use briefgate::{
    init_logging, pdf, prune_cache, AccessGate, AgentRunner, Clock, Config, Error, Ledger,
    Storage,
};

/// Loaded configuration plus the handles every command needs.
#[derive(Debug)]
struct App {
    config: Config,
    store: Storage,
    clock: Clock,
}

impl App {
    fn open(config: Config) -> anyhow::Result<Self> {
        let clock = Clock::system(config.timezone()?);
        let path = config.database_path();
        let store = Storage::open(&path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Ok(Self {
            config,
            store,
            clock,
        })
    }

    fn ledger(&self) -> Ledger<'_> {
        Ledger::new(
            &self.store,
            &self.clock,
            self.config.app.default_free_credits,
            self.config.app.history_limit,
        )
    }

    fn gate(&self) -> AccessGate<'_> {
        AccessGate::new(&self.store, &self.clock)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(cli.config, config_cmd),
        other => other,
    };

    let config = Config::load_from(cli.config)?;
    let app = App::open(config)?;

    match command {
        Command::RequestAccess(cmd) => handle_request_access(&app, cmd).await,
        Command::Login(cmd) => handle_login(&app, &cmd),
        Command::Logout => handle_logout(&app),
        Command::Status(cmd) => handle_status(&app, cmd.json),
        Command::Run(cmd) => handle_run(&app, &cmd).await,
        Command::History(cmd) => handle_history(&app, cmd.json),
        Command::Contact(cmd) => handle_contact(&app, cmd).await,
        Command::Admin(args) => handle_admin(&app, &args),
        // Handled before the database is opened.
        Command::Config(_) => Ok(()),
    }
}

fn report_webhook(outcome: &WebhookOutcome, success: &str) -> anyhow::Result<()> {
    if outcome.is_success() {
        println!("{success}");
        return Ok(());
    }
    match outcome.status {
        Some(status) => bail!("webhook returned {status}: {}", outcome.body),
        None => bail!("webhook request failed: {}", outcome.body),
    }
}

async fn handle_request_access(app: &App, cmd: RequestAccessCommand) -> anyhow::Result<()> {
    let request = SignupRequest {
        first_name: cmd.first_name.trim().to_string(),
        last_name: cmd.last_name.trim().to_string(),
        email: cmd.email.trim().to_string(),
        company: cmd.company.trim().to_string(),
        title: cmd.title.trim().to_string(),
        linkedin: cmd.linkedin.trim().to_string(),
        reason: cmd.reason.trim().to_string(),
        submitted_at: app.clock.stamp(),
    };
    request.validate()?;

    let url = app.config.secrets.signup_webhook_url()?;
    let outcome = webhook::post_json(url, &request, app.config.webhook_timeout()).await?;
    report_webhook(
        &outcome,
        "Request sent. You will receive an access code by email once approved.",
    )
}

fn handle_login(app: &App, cmd: &LoginCommand) -> anyhow::Result<()> {
    let owner = OwnerCredentials::from_secrets(&app.config.secrets);
    if owner.is_none() {
        debug!("Owner credentials not configured, bypass login disabled");
    }

    let ledger = app.ledger();
    let session = session::login(
        &app.store,
        &app.gate(),
        &ledger,
        owner.as_ref(),
        &cmd.email,
        &cmd.code,
        app.clock.stamp(),
    )?;
    let credits = ledger
        .lookup(&session.email)?
        .map_or(0, |user| user.credits);

    println!("Logged in as {} ({})", session.email, session.tier);
    if session.is_admin {
        println!("Admin tools available: briefgate admin --help");
    }
    println!("Credits remaining: {credits}");
    Ok(())
}

fn handle_logout(app: &App) -> anyhow::Result<()> {
    if session::logout(&app.store)? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn handle_status(app: &App, json: bool) -> anyhow::Result<()> {
    let current = match session::require(&app.store, &app.clock) {
        Ok(session) => Some(session),
        Err(Error::NotLoggedIn | Error::CodeExpired { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let user = match &current {
        Some(s) => app.ledger().lookup(&s.email)?,
        None => None,
    };
    let week_id = app.clock.week_id();
    let stats = app.store.stats()?;

    if json {
        let status = serde_json::json!({
            "logged_in": current.is_some(),
            "session": current,
            "credits": user.as_ref().map(|u| u.credits),
            "week_id": week_id,
            "database_path": app.store.path(),
            "storage": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{} status", app.config.app.name);
    println!("----------------");
    match (&current, &user) {
        (Some(s), user) => {
            println!("User:          {}", s.email);
            println!("Tier:          {}", s.tier);
            println!("Admin:         {}", if s.is_admin { "yes" } else { "no" });
            println!(
                "Credits:       {}",
                user.as_ref().map_or(0, |u| u.credits)
            );
        }
        (None, _) => println!("User:          not logged in"),
    }
    println!("Week:          {week_id}");
    println!("Database:      {}", app.store.path().display());
    println!(
        "Records:       {} ({} users, {} codes, {} cached briefs)",
        stats.total_records,
        stats.in_namespace(keys::USER),
        stats.in_namespace(keys::CODE),
        stats.in_namespace(keys::CACHE)
    );
    Ok(())
}

fn pdf_target(requested: &Path, company: &str) -> PathBuf {
    if requested.is_dir() {
        requested.join(pdf::pdf_file_name(company))
    } else {
        requested.to_path_buf()
    }
}

fn print_brief(brief: &Brief) {
    println!("{}", pdf::TITLE);
    println!("Company: {}", brief.company);
    println!("Persona: {}", brief.persona);
    println!("Generated: {}", brief.generated_at);
    println!("Search recency: {}", brief.search_recency);

    for (key, title) in MODULES {
        println!();
        println!("## {title}");
        let Some(module) = brief.module(key) else {
            println!("(no content)");
            continue;
        };
        if let Some(confidence) = module.confidence {
            println!("Confidence: {confidence}");
        }
        for bullet in &module.bullets {
            println!("- {bullet}");
        }
        if !module.evidence.is_empty() {
            println!("Evidence:");
            for evidence in &module.evidence {
                let date = if evidence.date.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", evidence.date)
                };
                println!("  * {} ({}){date}", evidence.title, evidence.url);
            }
        }
    }
}

async fn handle_run(app: &App, cmd: &RunCommand) -> anyhow::Result<()> {
    let current = session::require(&app.store, &app.clock)?;
    let model = cmd.model.as_deref().unwrap_or(&app.config.api.model);
    let provider = PerplexityClient::from_config(&app.config)?;
    let runner = AgentRunner::new(&provider, app.ledger(), &app.store, &app.clock);

    let outcome = runner.run(&current.email, &cmd.inputs(), model).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_brief(&outcome.brief);
        println!();
        if outcome.cache_hit {
            println!("Served from this week's cache.");
        }
        println!("Credits remaining: {}", outcome.credits_remaining);
    }

    if let Some(requested) = &cmd.pdf {
        let target = pdf_target(requested, &cmd.company);
        pdf::write(&outcome.brief, &target)
            .with_context(|| format!("writing {}", target.display()))?;
        eprintln!("Wrote {}", target.display());
    }

    if outcome.credits_remaining == 0 && !cmd.json {
        println!("You are out of credits. Use `briefgate contact` to request more.");
    }
    Ok(())
}

fn handle_history(app: &App, json: bool) -> anyhow::Result<()> {
    let current = session::require(&app.store, &app.clock)?;
    let history = app.ledger().history(&current.email)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        println!("No briefs yet.");
        return Ok(());
    }
    for entry in &history {
        println!(
            "{}  {} / {}  model={}  credits after={}",
            entry.ran_at.format("%Y-%m-%d %H:%M"),
            entry.company,
            entry.persona,
            entry.model,
            entry.credits_remaining_after
        );
    }
    Ok(())
}

async fn handle_contact(app: &App, cmd: ContactCommand) -> anyhow::Result<()> {
    let email = match cmd.email {
        Some(email) => email.trim().to_string(),
        None => session::current(&app.store)?
            .map(|s| s.email)
            .unwrap_or_default(),
    };
    let message = ContactMessage {
        email,
        message: cmd.message.trim().to_string(),
        submitted_at: app.clock.stamp(),
    };
    message.validate()?;

    let url = app.config.secrets.contact_webhook_url()?;
    let outcome = webhook::post_json(url, &message, app.config.webhook_timeout()).await?;
    report_webhook(&outcome, "Message sent to the owner.")
}

fn handle_admin(app: &App, args: &AdminArgs) -> anyhow::Result<()> {
    let current = session::require(&app.store, &app.clock)?;
    session::unlock_admin(&current, &app.config.secrets, &args.password)?;
    let gate = app.gate();

    match &args.action {
        AdminCommand::Seed => {
            let report = gate.seed_demo_codes()?;
            println!(
                "Seeded {} codes for {} (expires {})",
                report.created, report.week_id, report.expires_at
            );
        }
        AdminCommand::Issue { email, tier } => {
            let record = gate.issue_code(email, (*tier).into())?;
            println!("{}", record.code);
            println!("  email:   {}", record.email);
            println!("  tier:    {}", record.tier);
            println!("  expires: {}", record.expires_at.to_rfc3339());
        }
        AdminCommand::Bind { code, email } => {
            let record = gate.bind_code(code, email)?;
            println!("Bound {} to {}", record.code, record.email);
        }
        AdminCommand::SetCredits { email, credits } => {
            let user = app.ledger().set_credits(email, i64::from(*credits))?;
            println!("{} now has {} credits", user.email, user.credits);
        }
        AdminCommand::Lookup { email } => match app.ledger().lookup(email)? {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => println!("No user {email}"),
        },
        AdminCommand::PruneCache => {
            let removed = prune_cache(&app.store, &app.clock)?;
            println!("Removed {removed} stale cache entries");
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                let unset = || "(unset)".to_string();
                let secret = |value: &Option<String>| value.clone().unwrap_or_else(unset);
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[App]");
                println!("  Name:               {}", config.app.name);
                println!("  Timezone:           {}", config.app.timezone);
                println!("  Free credits:       {}", config.app.default_free_credits);
                println!("  History limit:      {}", config.app.history_limit);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Api]");
                println!("  Endpoint:           {}", config.api.endpoint);
                println!("  Model:              {}", config.api.model);
                println!("  Timeout (secs):     {}", config.api.timeout_secs);
                println!("  Max tokens:         {}", config.api.max_tokens);
                println!("  Search recency:     {}", config.api.search_recency);
                println!();
                println!("[Webhooks]");
                println!("  Timeout (secs):     {}", config.webhooks.timeout_secs);
                println!();
                println!("[Secrets]");
                println!("  Signup webhook:     {}", secret(&config.secrets.signup_webhook_url));
                println!("  Contact webhook:    {}", secret(&config.secrets.contact_webhook_url));
                println!("  Owner email:        {}", secret(&config.secrets.owner_email));
                println!("  Owner access code:  {}", secret(&config.secrets.owner_access_code));
                println!("  Admin password:     {}", secret(&config.secrets.admin_password));
                println!("  API key:            {}", secret(&config.secrets.api_key));
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
