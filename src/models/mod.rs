pub mod core;
pub mod matching;
pub mod stats;

pub use self::core::{
    MasterGym, MasterGymUpdate, NewMasterGym, PendingMatch, ReviewStatus, SourceGym, SourceOrg,
};
pub use matching::{MatchValues, RankedMatch};
pub use stats::{SourceSyncStats, SyncRunStats};
