mod assessment;
mod contract;
mod directory;
mod document;
mod ledger;
mod money;
mod period;
mod proration;
mod rate;
mod resident;
mod space;
mod tenant;
mod validation;

pub use assessment::*;
pub use contract::*;
pub use directory::*;
pub use document::*;
pub use ledger::*;
pub use money::*;
pub use period::*;
pub use proration::*;
pub use rate::*;
pub use resident::*;
pub use space::*;
pub use tenant::*;
pub use validation::{Validate, ValidationError};
