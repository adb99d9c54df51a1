//! Value types shared across the timeline components.
//!
//! Everything here is a plain value constructed and discarded within a single
//! analysis run.

mod clock;
mod coincidence;
mod reference;

pub use clock::{sort_events, ChannelId, ClockSample, ClockScale, Event};
pub use coincidence::Coincidence;
pub use reference::{RankedStartTime, ReferenceCandidate, ResolvedStartTime};
