use color_eyre::{eyre::eyre, Result};
use std::process::Command;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tricorder::features::{Nmcli, WifiSettings};
use tricorder::input::{ChannelDevice, ChannelFeed, InputAdapters, PointerAdapter, PointerSignal};
use tricorder::navigation::DeviceAction;
use tricorder::{FrameLoopHandle, FrameSettings, Kiosk, KioskCommand, KioskConfig};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = KioskConfig::load().map_err(|e| eyre!("Failed to load config: {}", e))?;
    info!("Starting kiosk with config: {:?}", config);

    let mut kiosk = Kiosk::new(&config);
    let radio_on = Nmcli.radio_enabled().unwrap_or_else(|e| {
        warn!("Could not read WiFi radio state: {}", e);
        false
    });
    kiosk.register_handler(Box::new(WifiSettings::new(Arc::new(Nmcli), radio_on)));

    let adapters = setup_adapters(&config)?;
    let cancel = CancellationToken::new();
    let (handle, mut commands) = FrameLoopHandle::spawn(
        kiosk,
        adapters,
        Some(FrameSettings::from_config(&config)),
        cancel.clone(),
    )
    .map_err(|e| eyre!("Failed to spawn frame loop: {}", e))?;

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_cancel.cancel();
            }
            Err(e) => error!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    let mut restart = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(KioskCommand::Quit) => {
                    info!("Quit requested by the kiosk");
                    break;
                }
                Some(KioskCommand::Device(DeviceAction::RestartApp)) => {
                    info!("Application restart requested");
                    restart = true;
                    break;
                }
                Some(KioskCommand::Device(action)) => run_device_action(action).await,
                Some(other) => debug!("Host command {:?} needs no host action", other),
                None => {
                    warn!("Frame loop closed its command channel");
                    break;
                }
            },
        }
    }

    handle.shutdown();
    handle
        .join()
        .await
        .map_err(|e| eyre!("Frame loop failed: {}", e))?;
    info!("Kiosk stopped");

    if restart {
        // The service manager restarts us on this code
        std::process::exit(3);
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn setup_adapters(config: &KioskConfig) -> Result<InputAdapters> {
    let mut adapters = InputAdapters::new(config.adapter_retry());

    #[cfg(feature = "gpio")]
    {
        use tricorder::input::hardware::GpioShuttle;
        use tricorder::input::ShuttleAdapter;

        let lines = config.shuttle_lines();
        match GpioShuttle::open(&lines) {
            Ok(device) => adapters.register(Box::new(ShuttleAdapter::new(device, lines))),
            Err(e) => warn!("Shuttle unavailable, continuing without it: {}", e),
        }
    }

    #[cfg(feature = "gamepad")]
    {
        use tricorder::input::hardware::GamepadStick;
        use tricorder::input::StickAdapter;

        let remap = config
            .stick_remap()
            .map_err(|e| eyre!("Invalid stick remap: {}", e))?;
        match GamepadStick::open() {
            Ok(device) => adapters.register(Box::new(StickAdapter::new(device, remap))),
            Err(e) => warn!("Stick unavailable, continuing without it: {}", e),
        }
    }

    // Console pointer so the kiosk is usable from a terminal
    let (device, feed) = ChannelDevice::new("console-pointer");
    adapters.register(Box::new(PointerAdapter::new(device)));
    tokio::spawn(run_console_pointer(feed));

    Ok(adapters)
}

// a/s/d click left/middle/right, upper case holds the button
async fn run_console_pointer(feed: ChannelFeed<PointerSignal>) {
    info!("Console pointer ready: a/s/d click, A/S/D long press");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console input closed");
                return;
            }
            Err(e) => {
                warn!("Console input failed: {}", e);
                return;
            }
        };
        for key in line.chars() {
            let button = match key.to_ascii_lowercase() {
                'a' => 1,
                's' => 2,
                'd' => 3,
                other => {
                    debug!("Console key '{}' ignored", other);
                    continue;
                }
            };
            let hold = if key.is_ascii_uppercase() { 800 } else { 40 };
            if !send_pointer(&feed, button, true) {
                return;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(hold)).await;
            if !send_pointer(&feed, button, false) {
                return;
            }
        }
    }
}

fn send_pointer(feed: &ChannelFeed<PointerSignal>, button: u8, pressed: bool) -> bool {
    feed.send(PointerSignal {
        button,
        pressed,
        timestamp: chrono::Local::now(),
    })
}

async fn run_device_action(action: DeviceAction) {
    let verb = match action {
        DeviceAction::Reboot => "reboot",
        DeviceAction::Shutdown => "poweroff",
        DeviceAction::RestartApp => return,
    };
    warn!("Executing systemctl {}", verb);
    let result = tokio::task::spawn_blocking(move || Command::new("systemctl").arg(verb).status()).await;
    match result {
        Ok(Ok(status)) if status.success() => info!("systemctl {} accepted", verb),
        Ok(Ok(status)) => error!("systemctl {} exited with {}", verb, status),
        Ok(Err(e)) => error!("Failed to run systemctl {}: {}", verb, e),
        Err(e) => error!("systemctl {} task failed: {}", verb, e),
    }
}
