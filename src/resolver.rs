//! Chooses the one keyword that drives the product search for an image.
//!
//! Selection is deterministic: among dishes that carry at least one
//! non-blank keyword, the highest-confidence dish wins; dishes without a
//! confidence rank below any that have one, and ties go to the dish that
//! arrived first. The winner's first non-blank keyword, trimmed, is used.

use std::cmp::Ordering;

use crate::error::{KhojError, Result};
use crate::models::{Detections, DishDetection};

/// The dish and keyword picked from a set of detections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedKeyword<'a> {
    pub dish: &'a str,
    pub keyword: &'a str,
}

pub fn resolve_keyword(detections: &Detections) -> Result<ResolvedKeyword<'_>> {
    if detections.is_empty() {
        return Err(KhojError::NoDishesDetected);
    }

    let mut best: Option<(&DishDetection, &str)> = None;
    for dish in detections {
        let Some(keyword) = first_keyword(dish) else {
            continue;
        };
        let replace = match best {
            None => true,
            // Strictly greater keeps the earliest dish on ties.
            Some((current, _)) => {
                compare_confidence(dish.confidence, current.confidence) == Ordering::Greater
            }
        };
        if replace {
            best = Some((dish, keyword));
        }
    }

    best.map(|(dish, keyword)| ResolvedKeyword {
        dish: &dish.name,
        keyword,
    })
    .ok_or(KhojError::NoSearchableKeyword {
        dishes: detections.len(),
    })
}

fn first_keyword(dish: &DishDetection) -> Option<&str> {
    dish.keywords
        .iter()
        .map(|k| k.trim())
        .find(|k| !k.is_empty())
}

fn compare_confidence(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish(name: &str, keywords: &[&str], confidence: Option<f64>) -> DishDetection {
        DishDetection {
            name: name.to_string(),
            recipe: String::new(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            confidence,
        }
    }

    fn detections(dishes: Vec<DishDetection>) -> Detections {
        dishes.into_iter().collect()
    }

    #[test]
    fn test_single_dish_first_keyword() {
        let d = detections(vec![dish("Pizza", &["cheese", "tomato"], None)]);
        let r = resolve_keyword(&d).unwrap();
        assert_eq!(r.dish, "Pizza");
        assert_eq!(r.keyword, "cheese");
    }

    #[test]
    fn test_empty_detections_fail() {
        let err = resolve_keyword(&Detections::new()).unwrap_err();
        assert!(matches!(err, KhojError::NoDishesDetected));
    }

    #[test]
    fn test_keywordless_detections_fail() {
        let d = detections(vec![
            dish("Soup", &[], Some(0.9)),
            dish("Bread", &["  ", ""], None),
        ]);
        let err = resolve_keyword(&d).unwrap_err();
        assert!(matches!(err, KhojError::NoSearchableKeyword { dishes: 2 }));
    }

    #[test]
    fn test_skips_keywordless_dish() {
        let d = detections(vec![
            dish("Soup", &[], Some(0.99)),
            dish("Dal Makhani", &["split red lentils ", "ghee"], Some(0.4)),
        ]);
        let r = resolve_keyword(&d).unwrap();
        assert_eq!(r.dish, "Dal Makhani");
        assert_eq!(r.keyword, "split red lentils");
    }

    #[test]
    fn test_highest_confidence_wins() {
        let d = detections(vec![
            dish("Pizza", &["cheese"], Some(0.3)),
            dish("Burger", &["bun"], Some(0.8)),
            dish("Salad", &["lettuce"], None),
        ]);
        assert_eq!(resolve_keyword(&d).unwrap().keyword, "bun");
    }

    #[test]
    fn test_ties_go_to_first_arrival() {
        let d = detections(vec![
            dish("Pizza", &["cheese"], None),
            dish("Burger", &["bun"], None),
        ]);
        assert_eq!(resolve_keyword(&d).unwrap().dish, "Pizza");

        let d = detections(vec![
            dish("Pizza", &["cheese"], Some(0.5)),
            dish("Burger", &["bun"], Some(0.5)),
        ]);
        assert_eq!(resolve_keyword(&d).unwrap().dish, "Pizza");
    }

    #[test]
    fn test_keyword_is_drawn_from_response() {
        let d = detections(vec![
            dish("A", &["x", "y"], Some(0.1)),
            dish("B", &["z"], Some(0.2)),
        ]);
        let r = resolve_keyword(&d).unwrap();
        let all: Vec<&str> = d.iter().flat_map(|d| d.keywords.iter()).map(|k| k.as_str()).collect();
        assert!(all.contains(&r.keyword));
    }

    #[test]
    fn test_stable_across_calls() {
        let d = detections(vec![
            dish("Idli", &["rice"], None),
            dish("Dosa", &["urad dal"], None),
            dish("Vada", &["lentils"], None),
        ]);
        let first = resolve_keyword(&d).unwrap();
        for _ in 0..20 {
            assert_eq!(resolve_keyword(&d).unwrap(), first);
        }
    }
}
