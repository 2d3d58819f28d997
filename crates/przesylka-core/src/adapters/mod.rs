//! Courier client adapters.
//!
//! One module per courier. Each adapter owns its session mirror, shapes
//! requests for that courier's mobile API and maps transport outcomes onto
//! the shared [`ClientError`](crate::error::ClientError) taxonomy.

mod dhl;
mod dpd;
mod inpost;
mod pocztex;

pub use dhl::DhlAdapter;
pub use dpd::DpdAdapter;
pub use inpost::InpostAdapter;
pub use pocztex::PocztexAdapter;
