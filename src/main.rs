use relaysuite::blobstore::DiskBlobStore;
use relaysuite::client::FileClient;
use relaysuite::config::{Config, Mode};
use relaysuite::filter::ContentFilter;
use relaysuite::forbidden;
use relaysuite::logger::{FileLogger, Logger, MultiLogger, StderrLogger};
use relaysuite::protocol::FileServerHandler;
use relaysuite::proxy::{BinaryProxyHandler, HttpProxyHandler};
use relaysuite::repl;
use relaysuite::server::Server;
use std::sync::Arc;

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::parse(&argv) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let logger = build_logger(&config.log_dir);

    match config.mode {
        Mode::Server { port } => {
            let store = Arc::new(DiskBlobStore::new("."));
            let handler = FileServerHandler::new(store, logger);
            run_server(port, handler);
        }
        Mode::Proxy { port } => {
            let handler = BinaryProxyHandler::new(logger);
            run_server(port, handler);
        }
        Mode::HttpProxy { port } => {
            let words = forbidden::load_words(&config.forbidden_words_path).unwrap_or_else(|e| {
                eprintln!("warning: {e}; starting with an empty forbidden-word list");
                Vec::new()
            });
            let filter = Arc::new(ContentFilter::new(words));
            let handler = HttpProxyHandler::new(filter, logger);
            run_server(port, handler);
        }
        Mode::Client { host, port, proxy } => {
            let mut client = match proxy {
                Some((proxy_host, proxy_port)) => {
                    FileClient::connect_via_proxy(&host, port, &proxy_host, proxy_port)
                }
                None => FileClient::connect(&host, port),
            }
            .unwrap_or_else(|e| {
                eprintln!("could not connect: {e}");
                std::process::exit(1);
            });
            let stdin = std::io::stdin();
            repl::run(&mut client, stdin.lock());
        }
    }
}

fn build_logger(log_dir: &std::path::Path) -> Arc<dyn Logger> {
    match FileLogger::new(log_dir) {
        Ok(file_logger) => Arc::new(MultiLogger::new(vec![
            Arc::new(StderrLogger),
            Arc::new(file_logger),
        ])),
        Err(e) => {
            eprintln!("warning: could not open log directory {log_dir:?}: {e}; logging to stderr only");
            Arc::new(StderrLogger)
        }
    }
}

fn run_server<H: relaysuite::server::RequestHandler>(port: u16, handler: H) -> ! {
    match Server::bind(port, handler) {
        Ok(server) => server.run(),
        Err(e) => {
            eprintln!("failed to bind port {port}: {e}");
            std::process::exit(1);
        }
    }
}
