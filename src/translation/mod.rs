//! Translatable catalog entities
//!
//! Write path: [`normalizer`] reduces a JSON or form payload to a
//! [`CanonicalRequest`], [`validator`] checks it, and [`writer`] fans the
//! result out to the entity row, its relations and one translation row per
//! language inside a single store transaction.

pub mod canonical;
pub mod coerce;
pub mod listing;
pub mod normalizer;
pub mod representation;
pub mod schema;
pub mod store;
pub mod validator;
pub mod writer;

pub use canonical::{CanonicalRequest, RawPayload};
pub use listing::{page_from_params, ListQuery};
pub use normalizer::Normalizer;
pub use representation::{represent, OutputShape, RelatedRecords};
pub use schema::{EntityKind, EntitySchema};
pub use store::{TranslatableStore, TranslatableTx};
pub use validator::{ValidatedRequest, Validator, WriteMode};
