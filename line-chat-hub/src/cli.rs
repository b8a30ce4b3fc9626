use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat hub, accepting TCP connections.
    Serve(ServeArgs),
    /// Connect to a hub and chat from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address to bind. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:7410")]
    pub listen: SocketAddr,

    /// Milliseconds to wait before closing a connection whose login was rejected.
    #[arg(long, default_value_t = 500)]
    pub grace_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Login name to claim on the hub.
    #[arg(long)]
    pub login: String,

    /// Address of the hub to connect to.
    #[arg(long, default_value = "127.0.0.1:7410")]
    pub server: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults_match_original_port_and_grace() {
        let cli = Cli::try_parse_from(["line_chat_hub", "serve"]).expect("parse serve");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.listen.port(), 7410);
        assert_eq!(args.grace_ms, 500);
    }

    #[test]
    fn client_requires_login() {
        assert!(Cli::try_parse_from(["line_chat_hub", "client"]).is_err());

        let cli = Cli::try_parse_from(["line_chat_hub", "client", "--login", "alice"])
            .expect("parse client");
        let Command::Client(args) = cli.command else {
            panic!("expected client command");
        };
        assert_eq!(args.login, "alice");
    }
}
