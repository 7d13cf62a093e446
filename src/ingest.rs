//! Ingestion boundary (SPEC_FULL.md "Ingestion boundary"). These are the
//! concrete adapters spec.md §1 calls "external collaborators"; the crate
//! includes reference implementations of the traits because §6 specifies
//! their exact join/mapping behavior, but no CLI wraps them (out of scope).

pub mod calls;
pub mod email;
pub mod imessage;

use crate::context::UnifyContext;
use crate::hlc::Hlc;
use crate::model::Event;
use crate::Result;

/// One raw source producing events for a single counterparty. Implementations
/// are best-effort per row (§7 `MalformedRow`): a row that fails to parse is
/// logged and skipped, never aborting the whole ingestion.
pub trait EventSource {
    fn ingest(&self, ctx: &UnifyContext, person_did: &str, hlc: &mut Hlc) -> Result<Vec<Event>>;
}

pub use calls::CallDbSource;
pub use email::EmlSource;
pub use imessage::ChatDbSource;
