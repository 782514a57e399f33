use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tcpline::network::looks_like_ip;
use tcpline::{ConnectionConfig, Result, ServerConfig, StreamError};

/// Command-line arguments for tcpline
#[derive(Parser, Debug)]
#[command(name = "tcpline")]
#[command(version)]
#[command(about = "Line-oriented TCP echo server and interactive client", long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) output
    #[arg(short = 'e', long, global = true)]
    pub verbose: bool,

    /// Log file to append to (defaults to <tmp>/tcpline/tcpline.log)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acknowledge every line received from any number of clients
    Server(EndpointArgs),
    /// Send lines typed on stdin and print the replies
    Client(EndpointArgs),
}

#[derive(Args, Debug)]
pub struct EndpointArgs {
    /// Port number (1024 or above)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host name or address
    #[arg(short = 'n', long)]
    pub host: Option<String>,

    /// Port number and/or IP address, in any order
    pub targets: Vec<String>,

    /// Client read timeout in milliseconds
    #[arg(long, default_value_t = 500)]
    pub read_timeout_ms: u64,

    /// Client write timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub write_timeout_ms: u64,

    /// Server receive timeout in milliseconds
    #[arg(long, default_value_t = 1500)]
    pub receive_timeout_ms: u64,

    /// Line terminator: a single character, or \n / \r
    #[arg(long, default_value = "\\n", value_parser = parse_terminator)]
    pub terminator: u8,
}

impl EndpointArgs {
    /// `--port`, else the last positional that is not an IP address
    pub fn port(&self) -> Result<u16> {
        if let Some(port) = self.port {
            return Ok(port);
        }
        match self.targets.iter().rev().find(|target| !looks_like_ip(target)) {
            Some(target) => target.parse().map_err(|_| {
                StreamError::Configuration(format!("\"{target}\" is neither a port nor an IP address"))
            }),
            None => Err(StreamError::Configuration("Please specify a port number".to_string())),
        }
    }

    /// `--host`, else the last positional that is an IP address
    pub fn host(&self) -> Option<String> {
        self.host.clone().or_else(|| {
            self.targets
                .iter()
                .rev()
                .find(|target| looks_like_ip(target))
                .cloned()
        })
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default()
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
            .with_write_timeout(Duration::from_millis(self.write_timeout_ms))
            .with_terminator(self.terminator)
    }

    pub fn server_config(&self, host: String, port: u16) -> ServerConfig {
        ServerConfig::new(host, port)
            .with_receive_timeout(Duration::from_millis(self.receive_timeout_ms))
            .with_terminator(self.terminator)
    }
}

fn parse_terminator(value: &str) -> std::result::Result<u8, String> {
    match value {
        "\\n" => Ok(b'\n'),
        "\\r" => Ok(b'\r'),
        _ if value.len() == 1 => Ok(value.as_bytes()[0]),
        _ => Err(format!("expected a single byte, \\n or \\r, got \"{value}\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(args: &[&str]) -> EndpointArgs {
        let mut argv = vec!["tcpline", "client"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Client(endpoint) => endpoint,
            Command::Server(_) => unreachable!("parsed a client command"),
        }
    }

    #[test]
    fn test_positionals_in_any_order() {
        let args = endpoint(&["5555", "192.168.1.7"]);
        assert_eq!(args.port().unwrap(), 5555);
        assert_eq!(args.host().as_deref(), Some("192.168.1.7"));

        let args = endpoint(&["::1", "6000"]);
        assert_eq!(args.port().unwrap(), 6000);
        assert_eq!(args.host().as_deref(), Some("::1"));
    }

    #[test]
    fn test_flags_take_precedence() {
        let args = endpoint(&["-p", "7000", "-n", "localhost", "5555", "10.0.0.1"]);
        assert_eq!(args.port().unwrap(), 7000);
        assert_eq!(args.host().as_deref(), Some("localhost"));
    }

    #[test]
    fn test_missing_or_bad_port() {
        assert!(matches!(
            endpoint(&["127.0.0.1"]).port(),
            Err(StreamError::Configuration(_))
        ));
        assert!(matches!(
            endpoint(&["not-a-port"]).port(),
            Err(StreamError::Configuration(_))
        ));
        assert_eq!(endpoint(&["5555"]).host(), None);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["tcpline", "server", "5555", "-e", "--log-file", "/tmp/x.log"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/x.log")));
        assert!(matches!(cli.command, Command::Server(_)));
    }

    #[test]
    fn test_configs_from_args() {
        let args = endpoint(&["5555", "--read-timeout-ms", "50", "--terminator", ";"]);
        let config = args.connection_config();
        assert_eq!(config.read_timeout, Duration::from_millis(50));
        assert_eq!(config.write_timeout, Duration::from_millis(1000));
        assert_eq!(config.terminator, b';');

        let server = args.server_config("127.0.0.1".to_string(), 5555);
        assert_eq!(server.receive_timeout, Duration::from_millis(1500));
        assert_eq!(server.terminator, b';');
    }

    #[test]
    fn test_parse_terminator() {
        assert_eq!(parse_terminator("\\n"), Ok(b'\n'));
        assert_eq!(parse_terminator("\\r"), Ok(b'\r'));
        assert_eq!(parse_terminator("|"), Ok(b'|'));
        assert!(parse_terminator("ab").is_err());
    }
}
