//! Property checks for the fuzzy identity relation.

use opening_admittance::workflows::admittance::identity::similarity_ratio;
use opening_admittance::workflows::admittance::{Person, SimilarityMatcher};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    "[a-z]{2,8}( [a-z]{2,8}){0,3}"
}

fn email() -> impl Strategy<Value = String> {
    "[a-z.]{0,10}@[a-z]{3,8}\\.(com|con|no)"
}

fn person() -> impl Strategy<Value = Person> {
    (name(), email()).prop_map(|(name, email)| Person::new(name, email))
}

fn threshold() -> impl Strategy<Value = f64> {
    (50u32..=100).prop_map(|percent| f64::from(percent) / 100.0)
}

proptest! {
    #[test]
    fn similarity_is_symmetric(a in person(), b in person(), threshold in threshold()) {
        let matcher = SimilarityMatcher::new(threshold);
        prop_assert_eq!(matcher.similar(&a, &b), matcher.similar(&b, &a));
    }

    #[test]
    fn person_with_an_email_is_similar_to_itself(a in person()) {
        prop_assert!(SimilarityMatcher::default().similar(&a, &a.clone()));
    }

    #[test]
    fn ratio_is_bounded_and_symmetric(a in "[a-z ]{0,16}", b in "[a-z ]{0,16}") {
        let forward = similarity_ratio(&a, &b);
        prop_assert!((0.0..=1.0).contains(&forward));
        prop_assert_eq!(forward, similarity_ratio(&b, &a));
    }

    #[test]
    fn name_similarity_ignores_token_order(first in "[a-z]{2,8}", last in "[a-z]{2,8}") {
        let a = Person::new(format!("{first} {last}"), "");
        let b = Person::new(format!("{last} {first}"), "");
        prop_assert!(SimilarityMatcher::default().similar(&a, &b));
    }
}
