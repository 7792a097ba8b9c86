//! Merge engine — folds a validated fact delta into the knowledge record.
//!
//! Field-level last-writer-wins: every accepted value overwrites the prior
//! one, and rejected values leave the prior one untouched. The merge never
//! fails; invalid candidates are simply skipped.

use carbot_core::{ChangeSet, FactDelta, KnowledgeRecord, TrackedField, MAX_VALUE_LEN};
use tracing::trace;

/// Fold `delta` into `current`, returning the updated record and the set of
/// fields whose stored value actually changed.
///
/// Fields are visited in canonical order. Per field: absent, null,
/// non-string, and empty candidates are skipped; enum-typed fields are
/// trimmed and lower-cased before the allowlist check, so a padded
/// `" BUY "` still matches and is stored normalized; survivors are
/// truncated to [`MAX_VALUE_LEN`] characters and trimmed. A value
/// identical to the stored one is kept but not reported as a change.
pub fn merge(current: &KnowledgeRecord, delta: &FactDelta) -> (KnowledgeRecord, ChangeSet) {
    let mut updated = current.clone();
    let mut changes = ChangeSet::new();

    for field in TrackedField::ALL {
        let Some(candidate) = delta.get(field) else {
            continue;
        };
        let Some(text) = candidate.as_str() else {
            trace!(field = %field, "Skipping non-string candidate");
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }

        let normalized = match field.allowed_values() {
            Some(allowed) => {
                let lowered = text.trim().to_lowercase();
                if !allowed.contains(&lowered.as_str()) {
                    trace!(field = %field, value = %lowered, "Rejecting value outside allowlist");
                    continue;
                }
                lowered
            }
            None => text.to_string(),
        };

        let truncated: String = normalized.chars().take(MAX_VALUE_LEN).collect();
        let value = truncated.trim();
        if value.is_empty() {
            continue;
        }

        if current.get(field) != Some(value) {
            changes.insert(field, value);
        }
        updated.set(field, value);
    }

    (updated, changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta(value: serde_json::Value) -> FactDelta {
        FactDelta::from_value(value).unwrap()
    }

    #[test]
    fn accepts_new_facts() {
        let current = KnowledgeRecord::new();
        let (updated, changes) =
            merge(&current, &delta(json!({"intent": "buy", "budget": "20000"})));

        assert_eq!(updated.get(TrackedField::Intent), Some("buy"));
        assert_eq!(updated.get(TrackedField::Budget), Some("20000"));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn overwrites_prior_value() {
        let mut current = KnowledgeRecord::new();
        current.set(TrackedField::Budget, "15000");

        let (updated, changes) = merge(&current, &delta(json!({"budget": "22000"})));
        assert_eq!(updated.get(TrackedField::Budget), Some("22000"));
        assert_eq!(changes.get(TrackedField::Budget), Some("22000"));
    }

    #[test]
    fn identical_value_is_not_a_change() {
        let mut current = KnowledgeRecord::new();
        current.set(TrackedField::Make, "Honda");

        let (updated, changes) = merge(&current, &delta(json!({"make": "Honda"})));
        assert_eq!(updated.get(TrackedField::Make), Some("Honda"));
        assert!(changes.is_empty());
    }

    #[test]
    fn enum_values_are_normalized_to_lowercase() {
        let (updated, changes) = merge(&KnowledgeRecord::new(), &delta(json!({"intent": "BUY"})));
        assert_eq!(updated.get(TrackedField::Intent), Some("buy"));
        assert_eq!(changes.get(TrackedField::Intent), Some("buy"));
    }

    #[test]
    fn enum_values_are_trimmed_before_allowlist_check() {
        let (updated, _) = merge(&KnowledgeRecord::new(), &delta(json!({"tradeIn": " YES "})));
        assert_eq!(updated.get(TrackedField::TradeIn), Some("yes"));
    }

    #[test]
    fn enum_values_outside_allowlist_are_rejected() {
        let mut current = KnowledgeRecord::new();
        current.set(TrackedField::Intent, "buy");

        let (updated, changes) = merge(&current, &delta(json!({"intent": "maybe"})));
        assert_eq!(updated.get(TrackedField::Intent), Some("buy"));
        assert!(changes.is_empty());
    }

    #[test]
    fn null_and_non_string_candidates_are_skipped() {
        let (updated, changes) = merge(
            &KnowledgeRecord::new(),
            &delta(json!({"budget": null, "year": 2019, "make": ["Honda"]})),
        );
        assert!(updated.is_empty());
        assert!(changes.is_empty());
    }

    #[test]
    fn empty_string_candidates_are_skipped() {
        let (updated, _) = merge(&KnowledgeRecord::new(), &delta(json!({"model": "  "})));
        assert!(updated.is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let (updated, changes) = merge(
            &KnowledgeRecord::new(),
            &delta(json!({"favoriteColor": "red", "intent": "sell"})),
        );
        assert_eq!(updated.len(), 1);
        assert_eq!(updated.get(TrackedField::Intent), Some("sell"));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn long_values_are_truncated_and_trimmed() {
        let long = format!("{}   ", "v".repeat(100));
        let (updated, _) = merge(&KnowledgeRecord::new(), &delta(json!({"location": long})));
        assert_eq!(updated.get(TrackedField::Location).unwrap().len(), MAX_VALUE_LEN);
    }

    #[test]
    fn rejected_field_does_not_block_others() {
        let (updated, changes) = merge(
            &KnowledgeRecord::new(),
            &delta(json!({"intent": "trade", "budget": "9000"})),
        );
        assert_eq!(updated.get(TrackedField::Intent), None);
        assert_eq!(updated.get(TrackedField::Budget), Some("9000"));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let d = delta(json!({"intent": "buy", "carType": "SUV"}));
        let (once, first_changes) = merge(&KnowledgeRecord::new(), &d);
        let (twice, second_changes) = merge(&once, &d);

        assert_eq!(once, twice);
        assert_eq!(first_changes.len(), 2);
        assert!(second_changes.is_empty());
    }
}
