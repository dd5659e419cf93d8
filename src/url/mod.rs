//! URL handling for deduplication
//!
//! Post URLs are reduced to a canonical key so that the same article reached
//! through different spellings of its link is stored once.

mod normalize;

pub use normalize::{canonicalize_url, normalize_url};
