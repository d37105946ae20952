use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use fbauth::{
    LONG_VERSION, commands,
    config::CredentialSet,
    logging,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "fbauth")]
#[command(about = "Firebase Auth admin tool - inspect users and manage custom claims")]
#[command(version = LONG_VERSION)]
struct Cli {
    /// Project to use (defaults to the first service account in ~/.fbauth/config.json)
    #[arg(long, global = true, env = "FBAUTH_PROJECT", value_name = "PROJECT_ID")]
    project: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    #[command(subcommand)]
    Users(UsersCommand),

    /// List the configured service accounts
    Projects,

    /// Run diagnostics on the local fbauth setup
    Doctor,

    /// Show version and build commit
    Version,
}

#[derive(Subcommand)]
enum UsersCommand {
    /// Get a user by uid or email
    ///
    /// Arguments shaped like a uid (28 letters or digits) are looked up by
    /// uid first, then by email if no such uid exists.
    #[command(alias = "user")]
    Get {
        #[arg(value_name = "UID|EMAIL")]
        uid_or_email: String,
    },

    /// List users with an email address in the current project
    List,

    /// Replace a user's custom claims
    #[command(alias = "setclaims")]
    SetClaims {
        #[arg(value_name = "UID")]
        uid: String,

        /// Claims as a JSON object, e.g. '{"admin":true}'. Replaces all existing claims.
        #[arg(value_name = "JSON")]
        json: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);
    let mut out = anstream::stdout();

    match cli.command {
        Commands::Version => commands::version(&mut out),
        Commands::Doctor => commands::doctor(&Paths::new()?, &ui),
        Commands::Projects => {
            let credentials = CredentialSet::load(&Paths::new()?)?;
            let selected = credentials.select(cli.project.as_deref())?;
            commands::projects(&credentials, selected, &ui, &mut out)
        }
        Commands::Users(command) => {
            let credentials = CredentialSet::load(&Paths::new()?)?;
            let selected = credentials.select(cli.project.as_deref())?;
            let client = commands::connect(selected, &ui)?;

            match command {
                UsersCommand::Get { uid_or_email } => {
                    commands::get_user(&client, &uid_or_email, &mut out)
                }
                UsersCommand::List => commands::list_users(&client, &ui, &mut out),
                UsersCommand::SetClaims { uid, json } => {
                    commands::set_claims(&client, &uid, &json, &mut out)
                }
            }
        }
    }
}
