use crate::demo::{run_demo, DemoArgs};
use crate::server;
use campus_nest::auth::{Principal, Role, SessionIssuer};
use campus_nest::config::AppConfig;
use campus_nest::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Campus Nest",
    about = "Run the Campus Nest student accommodation marketplace API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a listing through review, verification, booking, and feedback
    Demo(DemoArgs),
    /// Issue a session token signed with the configured secret
    Token(TokenArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct TokenArgs {
    /// User identifier placed in the token subject
    #[arg(long)]
    pub(crate) user: String,
    /// Role granted by the token (user, admin, executive)
    #[arg(long, value_parser = parse_role, default_value = "user")]
    pub(crate) role: Role,
    /// Display name; defaults to the user identifier
    #[arg(long)]
    pub(crate) name: Option<String>,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw).ok_or_else(|| format!("unknown role '{raw}' (expected user, admin, or executive)"))
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Token(args) => issue_token(args),
    }
}

fn issue_token(args: TokenArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let name = args.name.unwrap_or_else(|| args.user.clone());
    let principal = Principal::new(args.user, args.role, name);
    let token = SessionIssuer::new(&config.session).issue(&principal)?;
    println!("{token}");
    Ok(())
}
