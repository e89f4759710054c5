pub mod embedded;
pub mod restricted;
pub mod traits;
pub mod unpaywall;

pub use embedded::EmbeddedLocationResolver;
pub use restricted::RestrictedAccessResolver;
pub use traits::{Candidate, DocumentResolver, Provenance, ProviderError, ResolvedReference};
pub use unpaywall::UnpaywallResolver;
