pub mod client;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const CMD_BOOTSTRAP: &str = "bootstrap";
pub const CMD_GOOGLE: &str = "google";
pub const CMD_CHALLENGE: &str = "challenge";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_STATUS: &str = "status";

pub const ARG_LOCATION: &str = "location";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("wallet-session")
        .about("Wallet login and session lifecycle client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_BOOTSTRAP)
                .about("Promote persisted or redirected tokens into the session")
                .arg(
                    Arg::new(ARG_LOCATION)
                        .long(ARG_LOCATION)
                        .help("Page URL the OAuth redirect landed on, with its query string")
                        .value_parser(clap::value_parser!(url::Url)),
                ),
        )
        .subcommand(Command::new(CMD_GOOGLE).about("Fetch the Google consent URL"))
        .subcommand(Command::new(CMD_CHALLENGE).about("Fetch a wallet sign-in challenge"))
        .subcommand(
            Command::new(CMD_LOGOUT).about("Invalidate the session and purge local state"),
        )
        .subcommand(Command::new(CMD_STATUS).about("Show the session restored from cookies"));

    let command = client::with_args(command);
    logging::with_args(command)
}
