//! Identify-by-nearest-encoding.
//!
//! Linear scan over the active gallery, Euclidean distance, threshold
//! compare. Confidence is `1 - distance`, matching the convention of the
//! upstream embedding model.

/// One active stored encoding.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub user_id: u64,
    pub encoding: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Best distance within tolerance.
    Match { user_id: u64, confidence: f64 },
    /// A nearest entry exists but is outside tolerance.
    UnknownPerson { confidence: f64 },
    /// No active encodings stored; the comparison never ran.
    EmptyGallery,
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Compare `query` against every gallery entry and pick the single
/// nearest one. Ties break first-seen-wins: the strict `<` below keeps
/// the earlier entry when two distances are equal.
pub fn identify(query: &[f64], gallery: &[GalleryEntry], tolerance: f64) -> MatchOutcome {
    if gallery.is_empty() {
        return MatchOutcome::EmptyGallery;
    }

    let mut best_distance = f64::INFINITY;
    let mut best_user = 0u64;

    for entry in gallery {
        let distance = euclidean_distance(query, &entry.encoding);
        if distance < best_distance {
            best_distance = distance;
            best_user = entry.user_id;
        }
    }

    let confidence = 1.0 - best_distance;
    if best_distance <= tolerance {
        MatchOutcome::Match {
            user_id: best_user,
            confidence,
        }
    } else {
        MatchOutcome::UnknownPerson { confidence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: u64, encoding: &[f64]) -> GalleryEntry {
        GalleryEntry {
            user_id,
            encoding: encoding.to_vec(),
        }
    }

    #[test]
    fn empty_gallery_never_matches() {
        assert_eq!(identify(&[0.0, 0.0], &[], 0.6), MatchOutcome::EmptyGallery);
    }

    #[test]
    fn exact_match_has_distance_zero() {
        let gallery = vec![entry(1, &[0.5, -0.25, 1.0])];
        match identify(&[0.5, -0.25, 1.0], &gallery, 0.6) {
            MatchOutcome::Match { user_id, confidence } => {
                assert_eq!(user_id, 1);
                assert!((confidence - 1.0).abs() < 1e-12);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn nearest_entry_wins_within_tolerance() {
        // Users A [0,0] and B [10,10]; query [0.1,0.1] lands on A with
        // confidence 1 - sqrt(0.02) ~= 0.859.
        let gallery = vec![entry(1, &[0.0, 0.0]), entry(2, &[10.0, 10.0])];
        match identify(&[0.1, 0.1], &gallery, 0.6) {
            MatchOutcome::Match { user_id, confidence } => {
                assert_eq!(user_id, 1);
                assert!((confidence - 0.859).abs() < 1e-3, "confidence {confidence}");
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn outside_tolerance_is_unknown_person() {
        let gallery = vec![entry(1, &[0.0, 0.0])];
        match identify(&[1.0, 1.0], &gallery, 0.6) {
            MatchOutcome::UnknownPerson { confidence } => {
                // distance sqrt(2) ~= 1.414 -> confidence goes negative
                assert!(confidence < 0.0);
            }
            other => panic!("expected unknown person, got {other:?}"),
        }
    }

    #[test]
    fn ties_break_toward_the_first_entry() {
        let gallery = vec![entry(5, &[1.0, 0.0]), entry(9, &[-1.0, 0.0])];
        // Query is equidistant from both entries.
        match identify(&[0.0, 0.0], &gallery, 2.0) {
            MatchOutcome::Match { user_id, .. } => assert_eq!(user_id, 5),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn boundary_distance_still_matches() {
        // distance exactly equal to tolerance is a match (<=)
        let gallery = vec![entry(3, &[0.0])];
        match identify(&[0.6], &gallery, 0.6) {
            MatchOutcome::Match { user_id, .. } => assert_eq!(user_id, 3),
            other => panic!("expected match, got {other:?}"),
        }
    }
}
