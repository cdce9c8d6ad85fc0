use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;

use orbtrack::config::{TrackerConfig, DEFAULT_OBSERVER};
use orbtrack::pass::predict_passes;
use orbtrack::projector::ObserverLocation;
use orbtrack::snapshot::{snapshot, SnapshotRequest, TrackCache};
use orbtrack::source::{AcquiredTle, CelestrakSource, FileSource, TleProvider, TleSource};
use orbtrack::tle::parse_records;

const PASS_SCAN_STEP_SECS: i64 = 30;

#[derive(Parser, Debug)]
#[command(name = "orbtrack")]
#[command(author, about, long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct Args {
    /// Satellite name as it appears in the listing
    #[arg(short, long)]
    satellite: Option<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read the listing from a file instead of CelesTrak
    #[arg(long, value_name = "FILE", conflicts_with = "offline")]
    tle_file: Option<PathBuf>,

    /// Skip the network and use the built-in ISS elements
    #[arg(long)]
    offline: bool,

    /// Observer as LAT,LON[,ALT_KM]
    #[arg(short, long, value_parser = parse_observer, allow_hyphen_values = true)]
    observer: Option<ObserverLocation>,

    /// Omit look angles
    #[arg(long, conflicts_with = "observer")]
    no_observer: bool,

    /// Instant to compute for (RFC 3339), defaults to now
    #[arg(long, value_parser = parse_instant)]
    at: Option<DateTime<Utc>>,

    /// Predict passes over the observer for this many hours
    #[arg(long, value_name = "HOURS")]
    passes: Option<u32>,

    /// Refresh every SECS seconds instead of printing once
    #[arg(long, value_name = "SECS")]
    watch: Option<u64>,

    /// Stop watching after this many refreshes
    #[arg(long, requires = "watch")]
    count: Option<u64>,

    /// List satellite names in the listing and exit
    #[arg(long)]
    list: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&args.log_level)
    ).init();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(name) = &args.satellite {
        config.satellite_name = name.clone();
    }
    if let Some(observer) = args.observer {
        config.observer = Some(observer);
    }
    config.validate().context("Invalid configuration")?;
    log::debug!("tracking {} on the {} model", config.satellite_name, config.earth_model.label());

    if args.offline {
        if args.list {
            bail!("--list needs a listing; drop --offline");
        }
        return run_with(&args, &config, None::<FileSource>);
    }
    match &args.tle_file {
        Some(path) => run_with(&args, &config, Some(FileSource(path.clone()))),
        None => run_with(
            &args,
            &config,
            Some(CelestrakSource::new(config.source_url.clone(), config.fetch_timeout())),
        ),
    }
}

fn run_with<S: TleSource>(args: &Args, config: &TrackerConfig, source: Option<S>) -> Result<()> {
    if args.list {
        let source = source.context("No listing source")?;
        let text = source.fetch_text().with_context(|| format!("Failed to fetch {}", source.describe()))?;
        for record in parse_records(&text) {
            println!("{}", record.name);
        }
        return Ok(());
    }

    let observer = if args.no_observer {
        None
    } else {
        Some(config.observer.unwrap_or(DEFAULT_OBSERVER))
    };

    let mut provider = source.map(|s| {
        TleProvider::new(s, config.satellite_name.clone(), config.tle_ttl()).with_checksum(config.checksum)
    });
    let mut cache = TrackCache::new(config.cache_bucket());
    let mut refreshes = 0u64;

    loop {
        let now = args.at.unwrap_or_else(Utc::now);
        let acquired = match provider.as_mut() {
            Some(p) => p.current(now),
            None => AcquiredTle::fallback(),
        };
        let elements = acquired
            .elements(config.checksum)
            .with_context(|| format!("Unusable elements for {}", acquired.record.name))?;

        let req = SnapshotRequest {
            at: now,
            window: config.track_window(),
            model: config.earth_model,
            observer,
            origin: acquired.origin,
        };
        let mut snap = snapshot(&elements, &req, Some(&mut cache));

        if let (Some(hours), Some(observer)) = (args.passes, observer.as_ref()) {
            snap.passes = predict_passes(
                &elements,
                observer,
                now,
                Duration::hours(hours as i64),
                Duration::seconds(PASS_SCAN_STEP_SECS),
                config.earth_model,
            );
            log::info!("{} passes in the next {} h", snap.passes.len(), hours);
        }

        let json = if args.pretty {
            serde_json::to_string_pretty(&snap)?
        } else {
            serde_json::to_string(&snap)?
        };
        println!("{}", json);

        refreshes += 1;
        let Some(secs) = args.watch else { break };
        if args.count.is_some_and(|n| refreshes >= n) {
            break;
        }
        std::thread::sleep(std::time::Duration::from_secs(secs));
    }
    Ok(())
}

fn parse_observer(s: &str) -> Result<ObserverLocation, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<Result<_, _>>()?;
    let (latitude, longitude, altitude_km) = match parts.as_slice() {
        [lat, lon] => (*lat, *lon, 0.0),
        [lat, lon, alt] => (*lat, *lon, *alt),
        _ => return Err("expected LAT,LON or LAT,LON,ALT_KM".into()),
    };
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("({}, {}) is off the globe", latitude, longitude));
    }
    Ok(ObserverLocation::new(latitude, longitude, altitude_km))
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_argument() {
        assert_eq!(parse_observer("52.2297,21.0122,0.1").unwrap(), ObserverLocation::new(52.2297, 21.0122, 0.1));
        assert_eq!(parse_observer("-33.9, 151.2").unwrap(), ObserverLocation::new(-33.9, 151.2, 0.0));
        assert!(parse_observer("52.2").is_err());
        assert!(parse_observer("91,0").is_err());
        assert!(parse_observer("north,east").is_err());
    }

    #[test]
    fn instant_argument() {
        let t = parse_instant("2024-01-17T15:05:04+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-17T13:05:04+00:00");
        assert!(parse_instant("yesterday").is_err());
    }

    #[test]
    fn args_are_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
