use std::{error::Error, sync::Arc};

use tracing::{error, info};

use iot_device_client::{
    cli::parse_args,
    config::{environment_snapshot, load_config},
    constants::DeploymentMode,
    feature::{NotificationSink, control_channel},
    features::build_features,
    logging::{init_fallback_logging, init_logging},
    orchestrator::{Orchestrator, Strictness, SystemProcess},
    resources::{ConnectionManager, SharedResourceManager},
    signals::SignalBridge,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    let env = environment_snapshot();
    let mode = DeploymentMode::from_build();

    let config = match load_config(args.config_file.as_deref(), &args.to_cli_args(), &env, mode) {
        Ok(config) => config,
        Err(err) => {
            init_fallback_logging();
            error!("Failed to initialize configuration: {err}");
            return Ok(());
        }
    };

    let logging = init_logging(&config.log)?;
    info!(
        "Starting iot-device-client ({} mode, log level {})",
        config.mode.as_str(),
        config.log.level.as_ref()
    );

    // Must happen before any thread is spawned.
    let bridge = SignalBridge::install()?;
    let (control, receiver) = control_channel();

    let resources: Arc<dyn SharedResourceManager> = Arc::new(ConnectionManager::new());
    if let Err(err) = resources.initialize(&config) {
        error!("*** FATAL ERROR: Failed to initialize shared resources: {err} ***");
        logging.flush();
        std::process::abort();
    }

    let orchestrator = Orchestrator::new(
        Strictness::from_build(),
        Arc::new(SystemProcess::new(logging.clone())),
    );

    let notifier: Arc<dyn NotificationSink> = Arc::new(control.clone());
    for handle in build_features(&config, Arc::clone(&resources), notifier)? {
        orchestrator.register(handle)?;
    }

    bridge.spawn(resources, control)?;

    orchestrator.start_all();
    orchestrator.run(receiver);

    info!("iot-device-client exiting");
    logging.flush();
    Ok(())
}
