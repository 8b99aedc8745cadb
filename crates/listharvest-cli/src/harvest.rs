//! `run` command handler.
//!
//! Coordinates are harvested one after another through a single
//! [`Harvester`], so the request throttle spans the whole run. A coordinate
//! that exhausts its retries is logged and skipped; the run carries on with
//! the next one and reports the failure through the exit code.

use listharvest_core::{AppConfig, Coordinate};
use listharvest_scraper::{
    EndpointProfile, FileSink, HarvestPolicy, HarvestReport, Harvester, ScraperError,
    SessionEnd, StopSignal, Throttle, VendorListClient,
};

use crate::RunArgs;

/// Exit code for configuration, setup, and I/O failures.
pub(crate) const EXIT_FATAL: u8 = 3;

/// How a `run` invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunStatus {
    /// Every coordinate was harvested until its listing ran out.
    Completed,
    /// There was nothing to harvest.
    NoCoordinates,
    /// At least one coordinate ran out of retries.
    PartialFailure,
    /// A shutdown signal interrupted the run.
    Stopped,
}

impl RunStatus {
    pub(crate) fn exit_code(self) -> u8 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::NoCoordinates => 2,
            RunStatus::PartialFailure => 4,
            RunStatus::Stopped => 130,
        }
    }
}

/// Running tally over all coordinates of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pages_written: u64,
    pub requests: u64,
    pub stopped: bool,
}

impl RunSummary {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn record_report(&mut self, report: &HarvestReport) {
        self.pages_written += u64::from(report.pages_written);
        self.requests += u64::from(report.attempts);
        match report.end {
            SessionEnd::Exhausted => self.completed += 1,
            SessionEnd::Stopped => self.stopped = true,
        }
    }

    pub(crate) fn record_exhausted_retries(&mut self, pages_written: u32, attempts: u32) {
        self.failed += 1;
        self.pages_written += u64::from(pages_written);
        self.requests += u64::from(attempts);
    }

    /// Share of coordinates harvested to exhaustion, as a percentage.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    pub(crate) fn status(&self) -> RunStatus {
        if self.stopped {
            RunStatus::Stopped
        } else if self.failed > 0 {
            RunStatus::PartialFailure
        } else if self.total == 0 {
            RunStatus::NoCoordinates
        } else {
            RunStatus::Completed
        }
    }
}

/// Folds command-line flags over the environment-derived configuration.
pub(crate) fn apply_overrides(config: &AppConfig, args: &RunArgs) -> AppConfig {
    let mut config = config.clone();
    if let Some(profile) = &args.profile {
        config.profile.clone_from(profile);
    }
    if let Some(path) = &args.coordinates {
        config.coordinates_path.clone_from(path);
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(url) = &args.base_url {
        config.base_url = Some(url.clone());
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retries = Some(max_retries);
    }
    if args.no_resume {
        config.resume = false;
    }
    config
}

/// Resolves the configured profile name, applying any base URL override.
///
/// # Errors
///
/// Returns an error if no built-in profile has that name.
pub(crate) fn resolve_profile(config: &AppConfig) -> anyhow::Result<EndpointProfile> {
    let profile = EndpointProfile::by_name(&config.profile).ok_or_else(|| {
        let known: Vec<String> = EndpointProfile::builtin()
            .into_iter()
            .map(|p| p.name)
            .collect();
        anyhow::anyhow!(
            "unknown profile '{}'; expected one of: {}",
            config.profile,
            known.join(", ")
        )
    })?;
    Ok(match &config.base_url {
        Some(url) => profile.with_base_url(url),
        None => profile,
    })
}

/// Coordinates for this run: the `--lat/--lng` pair if given, otherwise the
/// coordinates file.
///
/// # Errors
///
/// Returns an error if the pair is out of range or the file cannot be read.
pub(crate) fn resolve_coordinates(
    config: &AppConfig,
    args: &RunArgs,
) -> anyhow::Result<Vec<Coordinate>> {
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        let coordinate = Coordinate::new(lat, lng)
            .ok_or_else(|| anyhow::anyhow!("coordinate ({lat}, {lng}) is out of range"))?;
        return Ok(vec![coordinate]);
    }
    Ok(listharvest_core::load_coordinates(&config.coordinates_path)?)
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error for setup failures (unknown profile, unreadable
/// coordinates file, unusable output directory) and for page failures that
/// retrying cannot fix. Coordinates that exhaust their retries are counted in
/// the returned status instead.
pub(crate) async fn run_harvest(
    config: &AppConfig,
    args: &RunArgs,
    stop: StopSignal,
) -> anyhow::Result<RunStatus> {
    let config = apply_overrides(config, args);
    let profile = resolve_profile(&config)?;
    let coordinates = resolve_coordinates(&config, args)?;

    if coordinates.is_empty() {
        tracing::warn!(
            path = %config.coordinates_path.display(),
            "no coordinates to harvest"
        );
        return Ok(RunStatus::NoCoordinates);
    }

    tracing::info!(
        profile = %profile.name,
        coordinates = coordinates.len(),
        output_dir = %config.output_dir.display(),
        max_retries = ?config.max_retries,
        resume = config.resume,
        "starting harvest"
    );

    let client = VendorListClient::new(
        profile,
        config.request_timeout_secs,
        config.rotate_user_agent,
    )
    .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

    if args.dry_run {
        print_plan(&client, &coordinates)?;
        return Ok(RunStatus::Completed);
    }

    let mut harvester = Harvester::new(
        client,
        FileSink::new(&config.output_dir),
        Throttle::from_config(&config),
        HarvestPolicy::from_config(&config),
        stop.clone(),
    );
    harvester.prepare().await?;

    let mut summary = RunSummary::new(coordinates.len());
    for (idx, coordinate) in coordinates.iter().enumerate() {
        if stop.is_stopped() {
            summary.stopped = true;
            break;
        }
        tracing::info!(
            "processing coordinate {}/{}: {coordinate}",
            idx + 1,
            coordinates.len()
        );

        match harvester.run_coordinate(*coordinate).await {
            Ok(report) => summary.record_report(&report),
            Err(ScraperError::RetriesExhausted {
                attempts,
                pages_written,
                last_error,
                ..
            }) => {
                tracing::error!(
                    coordinate = %coordinate,
                    attempts,
                    error = %last_error,
                    "giving up on coordinate; continuing with the next one"
                );
                summary.record_exhausted_retries(pages_written, attempts);
            }
            Err(e) => return Err(e.into()),
        }

        if summary.stopped {
            break;
        }
    }

    log_summary(&summary);
    Ok(summary.status())
}

fn print_plan(client: &VendorListClient, coordinates: &[Coordinate]) -> anyhow::Result<()> {
    let profile = client.profile();
    println!(
        "[dry-run] profile {} would harvest {} coordinate(s) starting at page {}:",
        profile.name,
        coordinates.len(),
        profile.start_page
    );
    for coordinate in coordinates {
        let url = client.page_url(*coordinate, profile.start_page)?;
        println!("  {coordinate} -> {url}");
    }
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    tracing::info!(
        total = summary.total,
        completed = summary.completed,
        failed = summary.failed,
        pages_written = summary.pages_written,
        requests = summary.requests,
        stopped = summary.stopped,
        "harvest finished; success rate {:.1}%",
        summary.success_rate()
    );
}

#[cfg(test)]
#[path = "harvest_test.rs"]
mod tests;
