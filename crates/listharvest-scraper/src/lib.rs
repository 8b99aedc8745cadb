pub mod client;
pub mod error;
pub mod harvest;
pub mod profile;
pub mod rate_limit;
pub mod results;
pub mod sink;
pub mod stop;

pub use client::{PageResult, VendorListClient};
pub use error::ScraperError;
pub use harvest::{HarvestPolicy, HarvestReport, Harvester, SessionEnd};
pub use profile::{EndpointProfile, PageRequest};
pub use rate_limit::{BackoffPolicy, Throttle};
pub use sink::{artifact_name, FileSink, PageSink};
pub use stop::{stop_channel, StopHandle, StopSignal};
