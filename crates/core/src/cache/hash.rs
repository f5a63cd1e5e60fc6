//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Separates the name, description and image-link fields.
const FIELD_SEPARATOR: &[u8] = b"\x1f";
/// Separates individual image links.
const LINK_SEPARATOR: &[u8] = b"\x1e";

/// Compute the fingerprint of an item identity.
///
/// SHA-256 over `name ␟ description ␟ link₀ ␞ link₁ …`, hex encoded.
/// Image link order is significant.
pub fn compute_fingerprint(item_name: &str, item_description: &str, image_links: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(item_name.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    hasher.update(item_description.as_bytes());
    hasher.update(FIELD_SEPARATOR);
    for (i, link) in image_links.iter().enumerate() {
        if i > 0 {
            hasher.update(LINK_SEPARATOR);
        }
        hasher.update(link.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fingerprint_stability() {
        let a = compute_fingerprint("Vase", "Blue ceramic vase", &links(&["https://img/1.jpg"]));
        let b = compute_fingerprint("Vase", "Blue ceramic vase", &links(&["https://img/1.jpg"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_empty_links() {
        let omitted = compute_fingerprint("Vase", "Blue ceramic vase", &Vec::new());
        let empty = compute_fingerprint("Vase", "Blue ceramic vase", &[]);
        assert_eq!(omitted, empty);
    }

    #[test]
    fn test_fingerprint_each_field_matters() {
        let base = compute_fingerprint("Vase", "Blue ceramic vase", &links(&["a"]));
        assert_ne!(base, compute_fingerprint("Vases", "Blue ceramic vase", &links(&["a"])));
        assert_ne!(base, compute_fingerprint("Vase", "Red ceramic vase", &links(&["a"])));
        assert_ne!(base, compute_fingerprint("Vase", "Blue ceramic vase", &links(&["b"])));
        assert_ne!(base, compute_fingerprint("Vase", "Blue ceramic vase", &[]));
    }

    #[test]
    fn test_fingerprint_link_order() {
        let ab = compute_fingerprint("Lamp", "Brass", &links(&["a", "b"]));
        let ba = compute_fingerprint("Lamp", "Brass", &links(&["b", "a"]));
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let left = compute_fingerprint("a|b", "c", &[]);
        let right = compute_fingerprint("a", "b|c", &[]);
        assert_ne!(left, right);

        let one_link = compute_fingerprint("x", "y", &links(&["p,q"]));
        let two_links = compute_fingerprint("x", "y", &links(&["p", "q"]));
        assert_ne!(one_link, two_links);
    }

    #[test]
    fn test_fingerprint_format() {
        let hash = compute_fingerprint("Vase", "Blue ceramic vase", &[]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
