mod cli;

use clap::Parser;
use cli::{Cli, Command, EndpointArgs};
use color_eyre::eyre::{Result, WrapErr};
use tcpline::network::default_host;
use tcpline::{Acceptor, Driver, StreamError, TcpConnection, logging};
use tokio::io::{BufReader, stdin, stdout};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    let guard = logging::init(cli.verbose, &log_path).wrap_err("Failed to set up logging")?;

    info!(version = env!("CARGO_PKG_VERSION"), "tcpline");
    info!(path = %log_path.display(), "Using log file");

    let outcome = match &cli.command {
        Command::Server(args) => run_server(args).await,
        Command::Client(args) => run_client(args).await,
    };

    if let Err(report) = outcome {
        error!(error = %report, "Fatal error, exiting");
        drop(guard);
        eprintln!("Error: {report:?}");
        // The stdin reader may still be parked on a blocking read
        std::process::exit(1);
    }
    Ok(())
}

async fn run_server(args: &EndpointArgs) -> Result<()> {
    let port = args.port()?;
    let host = args.host().unwrap_or_else(default_host);
    info!(host = %host, port, "Starting line echo server");

    let acceptor = Acceptor::bind(args.server_config(host, port))
        .await
        .wrap_err("Failed to start line echo server")?;
    acceptor.run().await.wrap_err("Line echo server stopped")
}

async fn run_client(args: &EndpointArgs) -> Result<()> {
    let port = args.port()?;
    let host = args
        .host()
        .ok_or_else(|| StreamError::Configuration("Please specify a host name to connect to".to_string()))?;
    info!(host = %host, port, "Starting line client");

    let config = args.connection_config();
    let terminator = config.terminator;
    let mut connection = TcpConnection::with_config(host, port, config)?;
    connection.connect().await.wrap_err("Failed to connect")?;

    info!("Enter message to send");
    Driver::new(connection, terminator)
        .run(BufReader::new(stdin()), stdout())
        .await
        .wrap_err("Connection lost")
}
