//! Plane access layer.
//!
//! # Components
//!
//! - [`PlaneReader`]: Format-agnostic access to the planes of an indexed container
//! - [`PlaneService`]: Owns a source and its reader, serves planes through the cache
//! - [`PlaneCache`]: LRU cache for decoded planes with size-based eviction
//! - [`plane_to_image`]: Turns a decoded plane into a grayscale image for PNG export

mod cache;
mod export;
mod reader;
mod service;

pub use cache::{PlaneCache, PlaneCacheKey, DEFAULT_PLANE_CACHE_CAPACITY};
pub use export::{encode_png, plane_to_image, save_png};
pub use reader::PlaneReader;
pub use service::{PlaneResponse, PlaneService};
