//! Inter-request pacing for one retrieval session.
//!
//! The [`Pacer`] enforces a minimum delay between consecutive requests of the
//! same [`RequestClass`]: a short gap between metadata lookups and a longer gap
//! between full downloads. The article host blocks clients that request too
//! quickly, so the delay is applied uniformly to every request after the first
//! of its class, including the last one in a batch.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pmc_retriever::pacing::{Pacer, PacingPolicy, RequestClass};
//!
//! # async fn example() {
//! let mut pacer = Pacer::new(PacingPolicy {
//!     metadata_delay: Duration::from_secs(1),
//!     download_delay: Duration::from_secs(3),
//! });
//!
//! // First download proceeds immediately
//! pacer.wait(RequestClass::Download).await;
//!
//! // Second download waits until 3 seconds have passed since the first
//! pacer.wait(RequestClass::Download).await;
//! # }
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Warning threshold for cumulative pacing delay in one session (5 minutes).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(300);

/// Kind of request being paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Cheap metadata lookup (efetch descriptor).
    Metadata,
    /// Full-document retrieval (one whole cascade).
    Download,
}

/// Minimum gaps between requests of each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub metadata_delay: Duration,
    pub download_delay: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            metadata_delay: Duration::from_secs(1),
            download_delay: Duration::from_secs(3),
        }
    }
}

impl PacingPolicy {
    /// A policy with no delays (tests, local mirrors).
    #[must_use]
    pub fn none() -> Self {
        Self {
            metadata_delay: Duration::ZERO,
            download_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn delay_for(&self, class: RequestClass) -> Duration {
        match class {
            RequestClass::Metadata => self.metadata_delay,
            RequestClass::Download => self.download_delay,
        }
    }
}

/// Pacing clock owned by exactly one session.
///
/// Takes `&mut self` so a session's clock cannot be driven from two places at
/// once; independent sessions each own their own `Pacer`.
#[derive(Debug)]
pub struct Pacer {
    policy: PacingPolicy,
    last_metadata: Option<Instant>,
    last_download: Option<Instant>,
    cumulative_delay: Duration,
}

impl Pacer {
    #[must_use]
    #[instrument(skip_all, fields(
        metadata_delay_ms = policy.metadata_delay.as_millis(),
        download_delay_ms = policy.download_delay.as_millis()
    ))]
    pub fn new(policy: PacingPolicy) -> Self {
        debug!("creating pacer");
        Self {
            policy,
            last_metadata: None,
            last_download: None,
            cumulative_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn policy(&self) -> PacingPolicy {
        self.policy
    }

    /// Total time this pacer has slept.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        self.cumulative_delay
    }

    /// Waits until the class's minimum gap has elapsed, then stamps the clock.
    ///
    /// The first request of each class proceeds immediately. Callers whose
    /// paced operation spans several requests follow up with
    /// [`mark_done`](Self::mark_done) so the gap is measured from its end.
    #[instrument(skip(self))]
    pub async fn wait(&mut self, class: RequestClass) {
        let min_gap = self.policy.delay_for(class);
        let slot = match class {
            RequestClass::Metadata => &mut self.last_metadata,
            RequestClass::Download => &mut self.last_download,
        };

        let mut slept = Duration::ZERO;
        if let Some(last) = *slot {
            let elapsed = last.elapsed();
            if elapsed < min_gap {
                slept = min_gap.saturating_sub(elapsed);
                debug!(delay_ms = slept.as_millis(), "applying pacing delay");
                tokio::time::sleep(slept).await;
            }
        } else {
            debug!("first request of class - no delay");
        }
        *slot = Some(Instant::now());

        if slept > Duration::ZERO {
            self.cumulative_delay += slept;
            if self.cumulative_delay >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                && self.cumulative_delay - slept < CUMULATIVE_DELAY_WARNING_THRESHOLD
            {
                warn!(
                    cumulative_delay_secs = self.cumulative_delay.as_secs(),
                    "session has spent over five minutes in pacing delays"
                );
            }
        }
    }

    /// Restamps the class clock when a paced operation finishes.
    ///
    /// The next [`wait`](Self::wait) of this class then sleeps the full gap
    /// regardless of how long the operation itself ran.
    pub fn mark_done(&mut self, class: RequestClass) {
        let slot = match class {
            RequestClass::Metadata => &mut self.last_metadata,
            RequestClass::Download => &mut self.last_download,
        };
        *slot = Some(Instant::now());
    }
}
