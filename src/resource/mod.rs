//! Resource resolution
//!
//! Turns the configured explicit resources and resource-group selectors into the
//! concrete list of resources queried on a scrape. Nothing here is cached; groups
//! are re-listed on every scrape.
//!
//! - [`resolver`] - group listing plus include/exclude filtering

mod resolver;

pub use resolver::{
    leaf_name, passes_filters, strip_subscription, ResolvedResource, ResourceResolver,
};
