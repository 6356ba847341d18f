//! Echoruler - ultrasonic 3D ruler over GPIO edge timing
//!
//! Entry point: loads the configuration, wires the timing engine to the
//! GPIO edge source, drives the trigger lines and prints measurements
//! until interrupted.

#[cfg(not(target_os = "linux"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("echoruler requires the Linux GPIO character device")
}

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    app::run()
}

#[cfg(target_os = "linux")]
mod app {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use tracing::{info, warn};

    use echoruler::config::AppConfig;
    use echoruler::gpio::{GpioEdgeSource, TriggerPulser};
    use echoruler::sonar::distance::DistanceConverter;
    use echoruler::sonar::listener::EdgeListener;
    use echoruler::{Measurement, StatsStore, TimingEngine};

    /// Capacity of the measurement hand-off queue between the
    /// consumption thread and the main loop
    const RESULT_QUEUE_SIZE: usize = 32;

    struct Options {
        config_path: Option<PathBuf>,
        chip: Option<String>,
        no_trigger: bool,
        write_config: bool,
    }

    pub fn run() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("echoruler=info".parse().unwrap()),
            )
            .init();

        let args: Vec<String> = std::env::args().collect();
        let mut options = Options {
            config_path: None,
            chip: None,
            no_trigger: false,
            write_config: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--help" | "-h" => {
                    print_help();
                    return Ok(());
                }
                "--version" | "-v" => {
                    println!("echoruler {}", echoruler::VERSION);
                    return Ok(());
                }
                "--config" | "-c" => {
                    if i + 1 >= args.len() {
                        eprintln!("Error: --config requires a path");
                        return Ok(());
                    }
                    options.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                    continue;
                }
                "--chip" => {
                    if i + 1 >= args.len() {
                        eprintln!("Error: --chip requires a device path");
                        return Ok(());
                    }
                    options.chip = Some(args[i + 1].clone());
                    i += 2;
                    continue;
                }
                "--no-trigger" => {
                    options.no_trigger = true;
                }
                "--write-config" => {
                    options.write_config = true;
                }
                arg => {
                    eprintln!("Unknown argument: {}", arg);
                    print_help();
                    return Ok(());
                }
            }
            i += 1;
        }

        let mut config = match &options.config_path {
            Some(path) => AppConfig::load_from(path),
            None => AppConfig::load(),
        };
        if let Some(chip) = options.chip {
            config.chip = chip;
        }

        if options.write_config {
            let path = options
                .config_path
                .unwrap_or_else(AppConfig::path);
            config.save(&path)?;
            println!("Config written to {}", path.display());
            return Ok(());
        }

        anyhow::ensure!(
            !config.channels.is_empty(),
            "no channels configured; nothing to measure"
        );

        println!("echoruler {} - chip {}", echoruler::VERSION, config.chip);
        for channel in &config.channels {
            println!(
                "  {:<8} line {:>3}  baseline {:>5.1}cm",
                channel.name, channel.channel, channel.baseline_cm
            );
        }
        println!();

        // Measurements are handed from the consumption thread to this
        // thread through a bounded queue; the engine callback never blocks.
        let (result_tx, results) = crossbeam_channel::bounded::<Measurement>(RESULT_QUEUE_SIZE);

        let converter = DistanceConverter::new(config.calibration_us_per_cm);
        let engine = TimingEngine::new(config.channels.clone(), converter, move |measurement| {
            if result_tx.try_send(measurement).is_err() {
                warn!("result queue full, measurement dropped");
            }
        })?;

        let source = GpioEdgeSource::open(&config.chip, &config.echo_lines())
            .with_context(|| format!("opening edge source on {}", config.chip))?;

        let mut listener = EdgeListener::new(
            source,
            engine,
            Duration::from_millis(config.poll_timeout_ms),
        );
        listener.start();

        let mut pulser = if options.no_trigger || config.trigger_lines.is_empty() {
            info!("trigger disabled, listening passively");
            None
        } else {
            Some(
                TriggerPulser::with_timing(
                    &config.chip,
                    &config.trigger_lines,
                    Duration::from_micros(config.trigger_pulse_us),
                    Duration::from_millis(config.trigger_spacing_ms),
                )
                .with_context(|| format!("opening trigger lines on {}", config.chip))?,
            )
        };

        let running = Arc::new(AtomicBool::new(true));
        let r = Arc::clone(&running);
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .ok();

        println!("Measuring. Press Ctrl+C to stop.");
        println!();

        let mut stats = StatsStore::new();
        while running.load(Ordering::SeqCst) {
            if let Some(pulser) = pulser.as_mut() {
                if let Err(e) = pulser.pulse_cycle() {
                    warn!(error = %e, "trigger cycle failed");
                    thread::sleep(Duration::from_millis(config.trigger_spacing_ms));
                }
            } else {
                thread::sleep(Duration::from_millis(config.poll_timeout_ms));
            }

            while let Ok(measurement) = results.try_recv() {
                print_measurement(&measurement);
                stats.record(&measurement);
            }
        }

        println!();
        println!("Stopping...");
        listener.stop();

        // Pick up anything emitted between the last drain and the join
        while let Ok(measurement) = results.try_recv() {
            print_measurement(&measurement);
            stats.record(&measurement);
        }

        print_summary(&stats, &listener);
        println!("Done.");
        Ok(())
    }

    fn print_measurement(measurement: &Measurement) {
        println!(
            "{:<8} dist_avg={:>6.1}cm  size={:>6.1}cm",
            measurement.name, measurement.distance_avg_cm, measurement.dimension_cm
        );
    }

    fn print_summary(stats: &StatsStore, listener: &EdgeListener<GpioEdgeSource>) {
        println!();
        println!("Summary ({} measurements):", stats.total_measurements());
        for (channel, s) in stats.channels() {
            println!(
                "  {:<8} line {:>3}: {:>4} measurements, size min {:.1}cm / avg {:.1}cm / max {:.1}cm",
                s.name, channel, s.count, s.min_cm, s.avg_cm, s.max_cm
            );
        }
        if let Some(engine) = listener.engine() {
            let anomalies = engine.anomalies();
            if anomalies.stray_edges + anomalies.invalid_intervals + anomalies.unknown_channels > 0
            {
                println!(
                    "  anomalies: {} stray edges, {} invalid intervals, {} unknown channels",
                    anomalies.stray_edges, anomalies.invalid_intervals, anomalies.unknown_channels
                );
            }
        }
    }

    fn print_help() {
        println!("Usage: echoruler [OPTIONS]");
        println!();
        println!("Options:");
        println!("  -c, --config PATH   Use config file at PATH");
        println!("      --chip PATH     Override the gpiochip device path");
        println!("      --no-trigger    Do not drive trigger lines, only listen");
        println!("      --write-config  Write the effective config to disk and exit");
        println!("  -v, --version       Show version");
        println!("  -h, --help          Show this help");
        println!();
        println!("Examples:");
        println!("  echoruler --chip /dev/gpiochip0");
        println!("  echoruler -c ./bench.json --no-trigger");
    }
}
