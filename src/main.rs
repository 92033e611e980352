use clap::{Arg, ArgAction, Command};
use frontdoor::config::{ConfigLoader, ConfigOverrides};
use frontdoor::fallback::RenderHandler;
use frontdoor::network::ServerAddresses;
use frontdoor::render::{NotFoundRenderer, UpstreamRenderer};
use frontdoor::server::{self, ListenHost, ServerOptions, SERVER_SIGNATURE};
use frontdoor::tls::TlsConfig;
use frontdoor::{logger, shutdown, BasePath};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn cli() -> Command {
    Command::new(PKG_NAME)
        .version(PKG_VERSION)
        .about(PKG_DESCRIPTION)
        .arg(
            Arg::new("dir")
                .short('d')
                .long("dir")
                .value_name("DIR")
                .default_value(".")
                .help("Directory holding the build output and frontdoor.json"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .default_value("4321")
                .help("Port to listen on (0 picks a free port)"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Interface to listen on: a host name, \"true\" for all interfaces, \"false\" for localhost"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a configuration file (defaults to frontdoor.json in --dir)"),
        )
        .arg(
            Arg::new("base")
                .long("base")
                .value_name("PATH")
                .help("URL prefix the site is mounted under"),
        )
        .arg(
            Arg::new("assets")
                .long("assets")
                .value_name("NAME")
                .help("Build asset directory served with immutable caching"),
        )
        .arg(
            Arg::new("trailing-slash")
                .long("trailing-slash")
                .value_name("POLICY")
                .help("Trailing slash policy: never, ignore or always (unknown values mean ignore)"),
        )
        .arg(
            Arg::new("upstream")
                .short('u')
                .long("upstream")
                .value_name("URL")
                .env("FRONTDOOR_UPSTREAM")
                .help("Rendering process that answers requests no static file matches"),
        )
        .arg(
            Arg::new("ssl-cert")
                .long("ssl-cert")
                .value_name("FILE")
                .env("SERVER_CERT_PATH")
                .help("Path to the PEM certificate chain"),
        )
        .arg(
            Arg::new("ssl-key")
                .long("ssl-key")
                .value_name("FILE")
                .env("SERVER_KEY_PATH")
                .help("Path to the PEM private key"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .help("Number of worker threads"),
        )
        .arg(
            Arg::new("no-request-logging")
                .short('L')
                .long("no-request-logging")
                .action(ArgAction::SetTrue)
                .help("Do not log HTTP requests"),
        )
        .arg(
            Arg::new("no-timestamps")
                .long("no-timestamps")
                .action(ArgAction::SetTrue)
                .help("Do not prefix log lines with timestamps"),
        )
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let matches = cli().get_matches();

    logger::init_logger(
        !matches.get_flag("no-request-logging"),
        !matches.get_flag("no-timestamps"),
    );
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let app_logger = logger::get_logger();
    app_logger.starting(PKG_NAME, PKG_VERSION);

    let serve_dir = matches
        .get_one::<String>("dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    if !serve_dir.is_dir() {
        app_logger.error(&format!("Unknown path: {}", serve_dir.display()));
        exit(1);
    }

    let config_loader = ConfigLoader::new(serve_dir);
    let custom_config = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut configuration = match config_loader.load_configuration(custom_config) {
        Ok(config) => config,
        Err(e) => {
            app_logger.error(&format!("Configuration error: {}", e));
            exit(1);
        }
    };

    // CLI values override the configuration file
    let arg = |name: &str| matches.get_one::<String>(name).cloned();
    configuration.apply_overrides(ConfigOverrides {
        base: arg("base"),
        assets: arg("assets"),
        trailing_slash: arg("trailing-slash"),
        host: arg("host"),
        upstream: arg("upstream"),
    });
    if let Err(e) = config_loader.validate_config(&configuration) {
        app_logger.error(&format!("Configuration error: {}", e));
        exit(1);
    }

    let tls = TlsConfig::from_paths(
        matches.get_one::<String>("ssl-cert").map(Path::new),
        matches.get_one::<String>("ssl-key").map(Path::new),
    );

    let renderer: Arc<dyn RenderHandler> = match configuration.upstream {
        Some(ref upstream) => {
            app_logger.info(&format!("Rendering requests through {}", upstream));
            Arc::new(UpstreamRenderer::new(upstream))
        }
        None => {
            app_logger.warn("No upstream renderer configured; unmatched requests get 404");
            Arc::new(NotFoundRenderer)
        }
    };

    let options = ServerOptions {
        client_dir: config_loader.client_dir(&configuration),
        host: ListenHost::from_config(configuration.host.as_deref()),
        port: matches.get_one::<u16>("port").copied().unwrap_or(4321),
        base: BasePath::new(&configuration.base),
        assets: configuration.assets.clone(),
        trailing_slash: configuration.trailing_slash,
        tls,
        workers: matches.get_one::<usize>("workers").copied(),
    };

    app_logger.info(&format!(
        "Serving {} under {} (trailing slash: {})",
        options.client_dir.display(),
        options.base,
        options.trailing_slash
    ));

    let running = match server::start(options, renderer).await {
        Ok(running) => running,
        Err(e) => {
            app_logger.error(&e.to_string());
            exit(1);
        }
    };

    let addresses = ServerAddresses::new(running.host(), running.port(), running.is_tls());
    app_logger.listening(SERVER_SIGNATURE, &addresses);

    if let Err(e) = shutdown::watch_signals(running.stopper()) {
        app_logger.error(&format!("Failed to setup signal handling: {}", e));
    }

    match running.closed().await {
        Ok(()) => {
            app_logger.closed();
            Ok(())
        }
        Err(e) => {
            app_logger.error(&e.to_string());
            exit(1);
        }
    }
}
