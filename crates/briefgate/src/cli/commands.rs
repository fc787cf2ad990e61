//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::brief::AccountInputs;
use crate::records::Tier;

/// Request-access form.
#[derive(Debug, Args)]
pub struct RequestAccessCommand {
    /// First name
    #[arg(long)]
    pub first_name: String,

    /// Last name
    #[arg(long)]
    pub last_name: String,

    /// Work email
    #[arg(long)]
    pub email: String,

    /// Company
    #[arg(long)]
    pub company: String,

    /// Job title
    #[arg(long)]
    pub title: String,

    /// `LinkedIn` profile URL
    #[arg(long)]
    pub linkedin: String,

    /// Why you want access
    #[arg(long)]
    pub reason: String,
}

/// Login arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Email the access code was issued to
    #[arg(short, long)]
    pub email: String,

    /// Weekly access code
    #[arg(long)]
    pub code: String,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Agent run arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Company name
    #[arg(long)]
    pub company: String,

    /// Company website
    #[arg(long)]
    pub website: String,

    /// Target persona (e.g. CIO)
    #[arg(long)]
    pub persona: String,

    /// Your value proposition
    #[arg(long)]
    pub value_prop: String,

    /// Initiative to focus on
    #[arg(long, default_value = "")]
    pub initiative: String,

    /// Region or business unit
    #[arg(long, default_value = "")]
    pub region: String,

    /// Competitor(s)
    #[arg(long, default_value = "")]
    pub competitor: String,

    /// Model to use (defaults to `api.model`)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Write a PDF to this file or directory
    #[arg(long, value_name = "PATH")]
    pub pdf: Option<PathBuf>,

    /// Output the brief as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl RunCommand {
    /// The account inputs from the flags.
    #[must_use]
    pub fn inputs(&self) -> AccountInputs {
        AccountInputs {
            company: self.company.clone(),
            website: self.website.clone(),
            persona: self.persona.clone(),
            value_prop: self.value_prop.clone(),
            initiative: self.initiative.clone(),
            region: self.region.clone(),
            competitor: self.competitor.clone(),
        }
    }
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Contact-owner form.
#[derive(Debug, Args)]
pub struct ContactCommand {
    /// Message to the owner
    #[arg(short, long)]
    pub message: String,

    /// Reply-to email (defaults to the logged-in email)
    #[arg(short, long)]
    pub email: Option<String>,
}

/// Admin tools. Require an owner session and the admin password.
#[derive(Debug, Args)]
pub struct AdminArgs {
    /// Admin password
    #[arg(long, env = "BRIEFGATE_ADMIN_UNLOCK", hide_env_values = true)]
    pub password: String,

    /// The admin action
    #[command(subcommand)]
    pub action: AdminCommand,
}

/// Admin actions.
#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Load this week's demo codes
    Seed,

    /// Issue a new code for the current week
    Issue {
        /// Email to bind the code to
        #[arg(short, long)]
        email: String,

        /// Access tier
        #[arg(short, long, value_enum, default_value = "general")]
        tier: TierArg,
    },

    /// Bind an existing unbound code to an email
    Bind {
        /// The code
        #[arg(long)]
        code: String,

        /// Email to bind it to
        #[arg(short, long)]
        email: String,
    },

    /// Set a user's credit balance
    SetCredits {
        /// The user's email
        #[arg(short, long)]
        email: String,

        /// New balance
        #[arg(long, value_parser = clap::value_parser!(u16).range(0..=999))]
        credits: u16,
    },

    /// Show a user record
    Lookup {
        /// The user's email
        #[arg(short, long)]
        email: String,
    },

    /// Drop cached briefs from earlier weeks
    PruneCache,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Tier argument for issued codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    /// Recruiters and hiring managers
    Recruiter,
    /// Everyone else
    General,
    /// High-priority contacts
    Vip,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Recruiter => Self::Recruiter,
            TierArg::General => Self::General,
            TierArg::Vip => Self::Vip,
        }
    }
}
