use crate::models::{Environment, EvaluationContext, PercentageRollout, VariantOption};

use super::hash::deterministic_hash;

/// Salt shared by rollout (when unpinned) and variant bucketing.
/// Changes with every version bump, reshuffling buckets.
pub fn version_salt(key: &str, version: i64, env: Environment) -> String {
    format!("{}:{}:{}", key, version, env)
}

/// Percentage gate. Stable per subject for a fixed key, version, env and salt.
pub fn passes_rollout(
    rollout: &PercentageRollout,
    key: &str,
    version: i64,
    env: Environment,
    context: &EvaluationContext,
) -> bool {
    if rollout.percentage <= 0.0 {
        return false;
    }

    let salt = match &rollout.salt {
        Some(salt) => salt.clone(),
        None => version_salt(key, version, env),
    };
    let r = deterministic_hash(&format!("{}:{}", salt, context.subject_id())) * 100.0;

    r <= rollout.percentage
}

/// Weighted, deterministic variant choice.
///
/// Walks the cumulative normalized weights in list order and returns the
/// first variant whose share reaches the subject's hash. The last variant is
/// returned when the walk runs out, which covers rounding drift and
/// all-zero weights. `None` only for an empty slice.
pub fn pick_variant<'a>(
    variants: &'a [VariantOption],
    salt_base: &str,
    context: &EvaluationContext,
) -> Option<&'a VariantOption> {
    let last = variants.last()?;

    let total: f64 = variants.iter().map(VariantOption::effective_weight).sum();
    if total <= 0.0 || !total.is_finite() {
        return Some(last);
    }

    let r = deterministic_hash(&format!("{}:{}", salt_base, context.subject_id()));
    let mut cumulative = 0.0;
    for variant in variants {
        cumulative += variant.effective_weight() / total;
        if r <= cumulative {
            return Some(variant);
        }
    }

    Some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rollout(percentage: f64) -> PercentageRollout {
        PercentageRollout {
            percentage,
            salt: None,
        }
    }

    fn variant(key: &str, weight: Option<f64>) -> VariantOption {
        VariantOption {
            key: key.to_string(),
            weight,
            value: None,
        }
    }

    fn subject(id: &str) -> EvaluationContext {
        EvaluationContext::new().with("userId", id)
    }

    #[test]
    fn test_full_and_empty_rollout() {
        for i in 0..500 {
            let ctx = subject(&format!("user-{}", i));
            assert!(passes_rollout(&rollout(100.0), "f", 1, Environment::Prod, &ctx));
            assert!(!passes_rollout(&rollout(0.0), "f", 1, Environment::Prod, &ctx));
        }
    }

    #[test]
    fn test_rollout_splits_subjects() {
        let passed = (0..2000)
            .filter(|i| {
                passes_rollout(
                    &rollout(50.0),
                    "new-ui",
                    1,
                    Environment::Prod,
                    &subject(&format!("user-{}", i)),
                )
            })
            .count();
        assert!((850..=1150).contains(&passed), "passed = {}", passed);
    }

    #[test]
    fn test_pinned_salt_survives_version_bump() {
        let pinned = PercentageRollout {
            percentage: 50.0,
            salt: Some("pinned".to_string()),
        };
        for i in 0..200 {
            let ctx = subject(&format!("user-{}", i));
            assert_eq!(
                passes_rollout(&pinned, "f", 1, Environment::Dev, &ctx),
                passes_rollout(&pinned, "f", 9, Environment::Dev, &ctx)
            );
        }
    }

    #[test]
    fn test_version_bump_reshuffles_unpinned_buckets() {
        let changed = (0..500)
            .filter(|i| {
                let ctx = subject(&format!("user-{}", i));
                passes_rollout(&rollout(50.0), "f", 1, Environment::Dev, &ctx)
                    != passes_rollout(&rollout(50.0), "f", 2, Environment::Dev, &ctx)
            })
            .count();
        assert!(changed > 0);
    }

    #[test]
    fn test_anonymous_subjects_share_a_bucket() {
        let a = passes_rollout(&rollout(50.0), "f", 1, Environment::Dev, &EvaluationContext::new());
        let b = passes_rollout(
            &rollout(50.0),
            "f",
            1,
            Environment::Dev,
            &EvaluationContext::new().with("userId", "anon"),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_pick_variant_single_and_empty() {
        let only = vec![variant("solo", None)];
        assert_eq!(pick_variant(&only, "s", &subject("u1")).unwrap().key, "solo");
        assert!(pick_variant(&[], "s", &subject("u1")).is_none());
    }

    #[test]
    fn test_pick_variant_all_zero_weights_falls_back_to_last() {
        let variants = vec![variant("a", Some(0.0)), variant("b", Some(0.0))];
        for i in 0..50 {
            let chosen = pick_variant(&variants, "s", &subject(&format!("u{}", i))).unwrap();
            assert_eq!(chosen.key, "b");
        }
    }

    #[test]
    fn test_pick_variant_zero_weight_never_chosen_before_others() {
        let variants = vec![variant("never", Some(0.0)), variant("always", None)];
        for i in 0..200 {
            let chosen = pick_variant(&variants, "s", &subject(&format!("u{}", i))).unwrap();
            assert_eq!(chosen.key, "always");
        }
    }

    #[test]
    fn test_pick_variant_respects_weights() {
        let variants = vec![variant("heavy", Some(3.0)), variant("light", Some(1.0))];
        let heavy = (0..4000)
            .filter(|i| {
                pick_variant(&variants, "checkout:1:prod", &subject(&format!("u{}", i)))
                    .unwrap()
                    .key
                    == "heavy"
            })
            .count();
        assert!((2800..=3200).contains(&heavy), "heavy = {}", heavy);
    }

    proptest! {
        #[test]
        fn rollout_is_pure(id in "[a-z0-9]{1,16}", pct in 0.0f64..=100.0, version in 1i64..1000) {
            let ctx = subject(&id);
            let r = rollout(pct);
            prop_assert_eq!(
                passes_rollout(&r, "k", version, Environment::Staging, &ctx),
                passes_rollout(&r, "k", version, Environment::Staging, &ctx)
            );
        }

        #[test]
        fn pick_variant_returns_an_input(
            weights in proptest::collection::vec(proptest::option::of(0.0f64..10.0), 1..8),
            id in "[a-z0-9]{1,16}",
        ) {
            let variants: Vec<VariantOption> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| variant(&format!("v{}", i), *w))
                .collect();
            let chosen = pick_variant(&variants, "salt", &subject(&id));
            prop_assert!(chosen.is_some());
            prop_assert!(variants.iter().any(|v| v.key == chosen.unwrap().key));
        }
    }
}
