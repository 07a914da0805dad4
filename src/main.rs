//! search-indexer CLI entry point

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use search_indexer::cli::USAGE;
use search_indexer::{
    Cli, IndexerConfig, NamespaceSource, Operation, OutputFormat, Pipeline,
    RawNamespaceRecord, ResolverClient, SqliteStore, UsernamePolicy,
};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            print!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
    };

    let Some(operation) = cli.operation() else {
        print!("{}", USAGE);
        return ExitCode::SUCCESS;
    };

    match run(&cli, operation) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run(cli: &Cli, operation: Operation) -> search_indexer::Result<String> {
    let config = IndexerConfig::load_from(&cli.config)?;
    init_logging(&config, cli.verbose);

    let policy = UsernamePolicy::from_config(&config.username)?;

    // Fetch before touching the store so a resolver failure cannot follow a flush.
    let source = match operation {
        Operation::RebuildNamespace | Operation::FullRefresh if cli.from_resolver => {
            NamespaceSource::Records(fetch_from_resolver(&config)?)
        }
        _ => NamespaceSource::Snapshot,
    };

    let store = SqliteStore::open(&config.store.path)?;
    let report = Pipeline::new(&store, &config.state, policy).run(operation, source)?;

    match cli.format {
        OutputFormat::Text => Ok(report.to_string()),
        OutputFormat::Json => report.to_json(),
    }
}

fn fetch_from_resolver(config: &IndexerConfig) -> search_indexer::Result<Vec<RawNamespaceRecord>> {
    let client = ResolverClient::from_config(&config.resolver)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(client.fetch_namespace())
}

fn init_logging(config: &IndexerConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
