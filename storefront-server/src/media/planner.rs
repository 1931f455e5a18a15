//! Deletion planning
//!
//! Pure set arithmetic over the gallery as it was before the request:
//! `targets = additional - kept - freshly uploaded`.

use std::collections::HashSet;

use shared::models::ProductImage;

use super::keep_list::ValidKeepIds;

/// Additional images of the product that the request does not keep.
///
/// The main image is never a target, and neither is any row whose URL was
/// uploaded by this same request.
pub fn plan_deletions(
    existing: &[ProductImage],
    valid_keep: &ValidKeepIds,
    fresh_urls: &[String],
) -> Vec<ProductImage> {
    let fresh: HashSet<&str> = fresh_urls.iter().map(String::as_str).collect();
    existing
        .iter()
        .filter(|img| !img.is_main)
        .filter(|img| !valid_keep.contains(img.id))
        .filter(|img| !fresh.contains(img.image_url.as_str()))
        .cloned()
        .collect()
}
