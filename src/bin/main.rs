use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use procman_sheriff::bus::InboundMessage;
use procman_sheriff::cli::Cli;
use procman_sheriff::config::load_config_file;
use procman_sheriff::logging::Logging;
use procman_sheriff::sheriff::Sheriff;

fn main() -> ExitCode {
    if let Err(e) = Logging::try_init() {
        eprintln!("failed to initialize logging: {e}");
    }

    let cli = Cli::parse_args();
    let mut sheriff = Sheriff::new();

    let (outbound_publisher, outbound_consumer) = procman_sheriff::bus::outbound_channel();
    sheriff.set_orders_transport(Box::new(outbound_publisher));

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = install_shutdown_handler(shutdown.clone()) {
        error!("could not install signal handler: {e}");
    }

    if let Some(config_file) = cli.config_file() {
        match load_config_file(config_file) {
            Ok(config) => {
                if let Err(e) = sheriff.load_config(&config, false) {
                    error!("failed to load config: {e}");
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                error!("failed to read config file: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(script_name) = cli.script_name() {
        let errors = sheriff.execute_script(script_name);
        if !errors.is_empty() {
            error!("unable to execute script {script_name}:\n  {}", errors.join("\n  "));
            return ExitCode::FAILURE;
        }
    }

    let (_publisher, consumer) = procman_sheriff::bus::inbound_channel();
    info!(identity = sheriff.identity(), "sheriff started");
    while !shutdown.load(Ordering::Relaxed) {
        for message in consumer.drain() {
            match message {
                InboundMessage::Info(frame) => sheriff.receive_info(frame),
                InboundMessage::Orders(frame) => sheriff.receive_orders(frame),
            }
        }
        sheriff.tick();
        for frame in outbound_consumer.drain() {
            debug!(host = %frame.host, "orders frame ready for transport");
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("sheriff shutting down");
    ExitCode::SUCCESS
}

fn install_shutdown_handler(shutdown: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
}
