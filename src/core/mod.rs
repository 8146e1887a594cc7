// Core algorithm exports
pub mod availability;
pub mod committer;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod pairs;
pub mod pool;

pub use availability::date_ranges_overlap;
pub use committer::PairingCommitter;
pub use error::MatchError;
pub use evaluator::{evaluate, first_shared_slot, is_compatible};
pub use matcher::Matcher;
pub use pairs::list_pairs;
pub use pool::CandidatePool;
