pub mod client;
pub mod error;
pub mod extract;
pub mod result;
pub mod sitemap;
pub mod suggest;
pub mod validate;

pub use client::{HttpSiteClient, SiteClient};
pub use error::ScanError;
pub use extract::LinkExtractor;
pub use result::{BreakReason, LinkVerdict, ProbeOutcome, Suggestion};
pub use sitemap::{SitemapCache, SitemapIndex};
pub use suggest::{DiceCoefficient, Similarity, SuggestionEngine};
pub use validate::LinkValidator;
