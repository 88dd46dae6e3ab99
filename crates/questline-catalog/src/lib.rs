// HTTP client for the external event catalog.
//
// The catalog is a collaborator, not part of this system: we scrape its
// announcement list and per-event pages, and read each event's schedule
// from its iCalendar feed. Any transport or parse failure surfaces as
// `SourceUnavailable`; retrying is the caller's decision.

mod client;
mod parse;

pub use client::CatalogClient;
