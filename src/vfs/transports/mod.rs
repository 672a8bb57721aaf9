/*!
 * VFS Transports
 * Storage backends a mountpoint can be bound to
 */

pub mod applications;
pub mod http;
pub mod localstorage;
pub mod web;

pub use applications::{application_entry, ApplicationsTransport};
pub use http::HttpTransport;
pub use localstorage::{JsonFileStore, KeyValueStore, LocalStorageTransport, MemoryStore};
pub use web::{WebTransport, WEB_PATTERN};
