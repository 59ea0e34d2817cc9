// src/links/mod.rs
// =============================================================================
// Everything about a single reference string, independent of any download:
//
// - entities: HTML entity decoding ("&amp;" -> "&")
// - resolve: reference + base -> absolute URL
// - classify: response content type + reference -> local file extension
//
// All of these are pure functions.
// =============================================================================

mod classify;
mod entities;
mod resolve;

pub use classify::{extension_for, mime_extension};
pub use entities::decode_entities;
pub use resolve::{is_fetchable, origin, resolve};
