//! Command-line interface for briefgate.
//!
//! Each form of the gated app is a subcommand of the `briefgate` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AdminArgs, AdminCommand, ConfigCommand, ContactCommand, HistoryCommand, LoginCommand,
    RequestAccessCommand, RunCommand, StatusCommand, TierArg,
};

/// briefgate - Gated, proof-first account intelligence briefs
///
/// Log in with a weekly access code, spend credits to generate a cited
/// account brief, and export it as a one-page PDF.
#[derive(Debug, Parser)]
#[command(name = "briefgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask the owner for an access code
    RequestAccess(RequestAccessCommand),

    /// Log in with an email and access code
    Login(LoginCommand),

    /// Log out
    Logout,

    /// Show the session and credit balance
    Status(StatusCommand),

    /// Generate an account brief (costs one credit)
    Run(RunCommand),

    /// Show your recent briefs
    History(HistoryCommand),

    /// Send a message to the owner
    Contact(ContactCommand),

    /// Owner tools
    Admin(AdminArgs),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "briefgate");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let quiet = Cli::try_parse_from(["briefgate", "-q", "logout"]).unwrap();
        assert_eq!(quiet.verbosity(), Verbosity::Quiet);

        let normal = Cli::try_parse_from(["briefgate", "logout"]).unwrap();
        assert_eq!(normal.verbosity(), Verbosity::Normal);

        let trace = Cli::try_parse_from(["briefgate", "logout", "-vv"]).unwrap();
        assert_eq!(trace.verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from([
            "briefgate",
            "login",
            "--email",
            "ada@example.com",
            "--code",
            "REC-2026W02-7H3Q9A",
        ])
        .unwrap();
        match cli.command {
            Command::Login(cmd) => {
                assert_eq!(cmd.email, "ada@example.com");
                assert_eq!(cmd.code, "REC-2026W02-7H3Q9A");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_with_options() {
        let cli = Cli::try_parse_from([
            "briefgate",
            "run",
            "--company",
            "Acme",
            "--website",
            "https://acme.test",
            "--persona",
            "CIO",
            "--value-prop",
            "Savings",
            "--model",
            "sonar-pro",
            "--pdf",
            "out",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.model.as_deref(), Some("sonar-pro"));
                assert_eq!(cmd.pdf, Some(PathBuf::from("out")));
                assert!(cmd.json);
                assert!(cmd.initiative.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_run_requires_core_inputs() {
        let result = Cli::try_parse_from(["briefgate", "run", "--company", "Acme"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_request_access() {
        let cli = Cli::try_parse_from([
            "briefgate",
            "request-access",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--email",
            "ada@example.com",
            "--company",
            "Engines",
            "--title",
            "Recruiter",
            "--linkedin",
            "https://linkedin.com/in/ada",
            "--reason",
            "Evaluating",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::RequestAccess(_)));
    }

    #[test]
    fn test_parse_admin_set_credits() {
        let cli = Cli::try_parse_from([
            "briefgate",
            "admin",
            "--password",
            "secret",
            "set-credits",
            "--email",
            "ada@example.com",
            "--credits",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Admin(args) => {
                assert_eq!(args.password, "secret");
                assert!(matches!(
                    args.action,
                    AdminCommand::SetCredits { credits: 10, .. }
                ));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_admin_set_credits_range() {
        let result = Cli::try_parse_from([
            "briefgate",
            "admin",
            "--password",
            "secret",
            "set-credits",
            "--email",
            "ada@example.com",
            "--credits",
            "1000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_admin_issue_tier() {
        let cli = Cli::try_parse_from([
            "briefgate",
            "admin",
            "--password",
            "secret",
            "issue",
            "--email",
            "ada@example.com",
            "--tier",
            "vip",
        ])
        .unwrap();
        match cli.command {
            Command::Admin(args) => assert!(matches!(
                args.action,
                AdminCommand::Issue {
                    tier: TierArg::Vip,
                    ..
                }
            )),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_show_json() {
        let cli = Cli::try_parse_from(["briefgate", "config", "show", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_parse_contact() {
        let cli =
            Cli::try_parse_from(["briefgate", "contact", "--message", "More credits please"])
                .unwrap();
        match cli.command {
            Command::Contact(cmd) => {
                assert_eq!(cmd.message, "More credits please");
                assert!(cmd.email.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["briefgate", "status", "--config", "/tmp/b.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/b.toml")));
    }
}
