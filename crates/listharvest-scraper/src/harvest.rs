//! The paginated harvesting loop.
//!
//! For one coordinate the loop requests pages in order, persists every
//! non-empty page, and stops at the first page whose results list is empty.
//! A failed page is retried in place after a back-off; the page index only
//! advances once the page's artifact is on disk, so the artifacts of a
//! coordinate always form a contiguous run starting at the profile's first
//! page.

use std::time::Duration;

use listharvest_core::{AppConfig, Coordinate};

use crate::client::VendorListClient;
use crate::error::ScraperError;
use crate::rate_limit::{is_retriable, BackoffPolicy, Throttle};
use crate::sink::PageSink;
use crate::stop::StopSignal;

/// Retry and resume behaviour of the harvest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestPolicy {
    pub backoff: BackoffPolicy,
    /// Retries allowed per page after its first failed attempt. `None` never
    /// gives up.
    pub max_retries: Option<u32>,
    /// Start after the last page already on disk instead of at the first page.
    pub resume: bool,
}

impl HarvestPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            backoff: BackoffPolicy::from_config(config),
            max_retries: config.max_retries,
            resume: config.resume,
        }
    }
}

/// Why a coordinate's session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The endpoint returned an empty results list.
    Exhausted,
    /// A stop was requested before the endpoint was exhausted.
    Stopped,
}

/// Summary of one coordinate's session.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestReport {
    pub coordinate: Coordinate,
    /// Page index the session started at (after resuming).
    pub first_page: u32,
    /// Artifacts written during this session.
    pub pages_written: u32,
    /// Artifacts on disk for this coordinate, including resumed ones.
    pub total_pages: u32,
    /// Requests sent.
    pub attempts: u32,
    /// Requests or writes that failed and were retried.
    pub failures: u32,
    pub end: SessionEnd,
}

/// Per-coordinate run state.
struct HarvestSession {
    coordinate: Coordinate,
    start_page: u32,
    first_page: u32,
    page: u32,
    pages_written: u32,
    attempts: u32,
    failures: u32,
    consecutive_failures: u32,
    backoff: Duration,
}

impl HarvestSession {
    fn new(coordinate: Coordinate, start_page: u32, first_page: u32) -> Self {
        Self {
            coordinate,
            start_page,
            first_page,
            page: first_page,
            pages_written: 0,
            attempts: 0,
            failures: 0,
            consecutive_failures: 0,
            backoff: Duration::ZERO,
        }
    }

    fn persisted(&mut self) {
        self.pages_written += 1;
        self.page = self.page.saturating_add(1);
        self.consecutive_failures = 0;
        self.backoff = Duration::ZERO;
    }

    fn total_pages(&self) -> u32 {
        self.page - self.start_page
    }

    fn finish(self, end: SessionEnd) -> HarvestReport {
        let total_pages = self.total_pages();
        HarvestReport {
            coordinate: self.coordinate,
            first_page: self.first_page,
            pages_written: self.pages_written,
            total_pages,
            attempts: self.attempts,
            failures: self.failures,
            end,
        }
    }
}

/// Drives pagination for one coordinate at a time.
///
/// The throttle is shared across coordinates, so consecutive coordinates are
/// spaced out like consecutive pages.
pub struct Harvester<S> {
    client: VendorListClient,
    sink: S,
    throttle: Throttle,
    policy: HarvestPolicy,
    stop: StopSignal,
}

impl<S: PageSink> Harvester<S> {
    #[must_use]
    pub fn new(
        client: VendorListClient,
        sink: S,
        throttle: Throttle,
        policy: HarvestPolicy,
        stop: StopSignal,
    ) -> Self {
        Self {
            client,
            sink,
            throttle,
            policy,
            stop,
        }
    }

    #[must_use]
    pub fn client(&self) -> &VendorListClient {
        &self.client
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Prepares the sink. Call once before the first coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Persist`] if the output location cannot be created.
    pub async fn prepare(&self) -> Result<(), ScraperError> {
        self.sink.prepare().await
    }

    /// First page index at or after `start_page` with no artifact on disk.
    async fn first_missing_page(&self, coordinate: Coordinate, start_page: u32) -> u32 {
        let mut page = start_page;
        while self.sink.has_page(coordinate, page).await {
            page = page.saturating_add(1);
        }
        page
    }

    /// Harvests every page for `coordinate` until the endpoint is exhausted,
    /// a stop is requested, or a page runs out of retries.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RetriesExhausted`]: one page failed more than
    ///   `max_retries` times in a row. Pages written before it stay on disk.
    /// - [`ScraperError::InvalidEndpoint`]: the profile cannot produce a URL.
    pub async fn run_coordinate(
        &mut self,
        coordinate: Coordinate,
    ) -> Result<HarvestReport, ScraperError> {
        let start_page = self.client.profile().start_page;
        let first_page = if self.policy.resume {
            self.first_missing_page(coordinate, start_page).await
        } else {
            start_page
        };
        if first_page > start_page {
            tracing::info!(
                lat = coordinate.lat,
                lng = coordinate.lng,
                existing_pages = first_page - start_page,
                resume_page = first_page,
                "resuming after pages already on disk"
            );
        }

        let mut session = HarvestSession::new(coordinate, start_page, first_page);

        loop {
            if self.stop.is_stopped() {
                return Ok(stopped(session));
            }

            let delay = if session.consecutive_failures > 0 {
                session.backoff
            } else {
                self.throttle.next_delay()
            };
            if !delay.is_zero() {
                tracing::info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "waiting before next request"
                );
                if !self.stop.sleep(delay).await {
                    return Ok(stopped(session));
                }
            }

            let page = session.page;
            session.attempts += 1;
            self.throttle.mark();
            tracing::info!(
                lat = coordinate.lat,
                lng = coordinate.lng,
                page,
                attempt = session.consecutive_failures + 1,
                "fetching page"
            );

            let outcome = match self.client.fetch_page(coordinate, page).await {
                Ok(result) if result.is_exhausted() => {
                    tracing::info!(page, "results list is empty; pagination finished");
                    let report = session.finish(SessionEnd::Exhausted);
                    log_summary(&report);
                    return Ok(report);
                }
                Ok(result) => self
                    .sink
                    .write_page(coordinate, page, &result.body)
                    .await
                    .map(|path| (path, result.result_count)),
                Err(err) => Err(err),
            };

            match outcome {
                Ok((path, results)) => {
                    tracing::info!(page, results, path = %path.display(), "page persisted");
                    session.persisted();
                }
                Err(err) => self.record_failure(&mut session, err)?,
            }
        }
    }

    /// Counts a failed attempt and schedules the back-off, or gives up.
    fn record_failure(
        &self,
        session: &mut HarvestSession,
        err: ScraperError,
    ) -> Result<(), ScraperError> {
        session.failures += 1;
        session.consecutive_failures += 1;

        if !is_retriable(&err) {
            tracing::error!(page = session.page, error = %err, "non-retriable harvest error");
            return Err(err);
        }

        if let Some(max_retries) = self.policy.max_retries {
            if session.consecutive_failures > max_retries {
                tracing::error!(
                    lat = session.coordinate.lat,
                    lng = session.coordinate.lng,
                    page = session.page,
                    attempts = session.consecutive_failures,
                    pages_written = session.pages_written,
                    error = %err,
                    "retry ceiling reached; abandoning coordinate"
                );
                return Err(ScraperError::RetriesExhausted {
                    lat: session.coordinate.lat,
                    lng: session.coordinate.lng,
                    page: session.page,
                    attempts: session.consecutive_failures,
                    pages_written: session.pages_written,
                    last_error: Box::new(err),
                });
            }
        }

        let mut delay = self.policy.backoff.delay_for(session.consecutive_failures);
        if let ScraperError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = &err
        {
            delay = delay.max(Duration::from_secs(*secs));
        }
        tracing::warn!(
            page = session.page,
            attempt = session.consecutive_failures,
            max_retries = ?self.policy.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "page attempt failed; backing off before retrying the same page"
        );
        session.backoff = delay;
        Ok(())
    }
}

fn stopped(session: HarvestSession) -> HarvestReport {
    tracing::warn!(page = session.page, "stop requested; ending session early");
    let report = session.finish(SessionEnd::Stopped);
    log_summary(&report);
    report
}

fn log_summary(report: &HarvestReport) {
    tracing::info!(
        lat = report.coordinate.lat,
        lng = report.coordinate.lng,
        pages_written = report.pages_written,
        total_pages = report.total_pages,
        attempts = report.attempts,
        failures = report.failures,
        end = ?report.end,
        "finished coordinate {}: total pages {}",
        report.coordinate,
        report.total_pages
    );
}
