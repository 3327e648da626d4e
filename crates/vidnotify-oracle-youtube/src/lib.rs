// # YouTube Status Oracles
//
// Two independent ways to answer "is this upload visible to everyone right
// now?":
//
// - `DataApiOracle`: structured query against the YouTube Data API v3
//   (`videos?part=status,snippet`). Authoritative for privacy, but an
//   upcoming premiere may already report `public`.
// - `WatchPageOracle`: fetches the public watch page and looks for
//   well-known markers in the embedded player response. Needs no key, and
//   sees premieres, but is a heuristic.
//
// `vidnotify_core::CombinedOracle` merges both.
//
// ## Trust Level: Untrusted (Status Oracle)
//
// - One HTTP request per `check`, no retries, no caching
// - Total: every failure degrades to `VisibilityStatus::Unknown`
// - The API key never appears in logs or error messages

pub mod data_api;
pub mod watch_page;

pub use data_api::{DataApiOracle, status_from_response};
pub use watch_page::{WatchPageOracle, classify_watch_page};
