pub mod context;
pub mod hlc;
pub mod identity;
pub mod ingest;
pub mod merge;
pub mod model;
pub mod person_resolve;
pub mod sanitize;
pub mod store;
pub mod time;
pub mod utils;
pub mod views;

pub use utils::{EmptyRes, Result};

pub mod prelude {
    pub use std::collections::{HashMap, HashSet};

    pub use crate::context::UnifyContext;
    pub use crate::hlc::Hlc;
    pub use crate::model::*;
    pub use crate::time::Timestamp;
    pub use crate::utils::*;
}
