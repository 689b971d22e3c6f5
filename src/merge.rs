// Identity reconciliation across uploaded sources

use crate::parser::RawRecord;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// SOURCE ROLES
// ============================================================================

/// How one uploaded source participates in identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceRole {
    /// Records carry their own `Id` column and are keyed by it directly.
    IdBearing,

    /// Records have no usable `Id`; they attach to an existing entity
    /// through the name+email composite key, or mint a fresh identity.
    Lookup,
}

/// The observed upload convention: every file but the last carries IDs,
/// the final file is lookup-only.
///
/// Callers with a different layout pass their own role list instead.
pub fn default_roles(count: usize) -> Vec<SourceRole> {
    (0..count)
        .map(|i| {
            if i + 1 == count {
                SourceRole::Lookup
            } else {
                SourceRole::IdBearing
            }
        })
        .collect()
}

// ============================================================================
// MERGED ENTITIES
// ============================================================================

/// One resolved identity with the union of every field observed for it
/// across all sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedEntity {
    /// Carried from an ID-bearing record, or freshly minted.
    pub id: String,
    pub record: RawRecord,
}

/// Composite natural key for records without an explicit identifier.
/// Absent name or email participates as the empty string.
fn composite_key(record: &RawRecord) -> String {
    format!(
        "{}-{}",
        record.name.as_deref().unwrap_or(""),
        record.email.as_deref().unwrap_or("")
    )
}

fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

/// Merge per-source record sequences into one deduplicated entity set.
///
/// ID-bearing sources fold first, in order: records sharing an ID collapse
/// into a single entity with later fields winning on overlap, and every
/// record indexes its name+email pair so lookup-only records can find it.
/// Lookup-only records then either land on the entity their composite key
/// points at or mint a brand-new identity.
///
/// The output is in assembly order, so results are deterministic for a
/// given input ordering.
pub fn merge_sources(sources: &[(SourceRole, Vec<RawRecord>)]) -> Vec<MergedEntity> {
    let mut order: Vec<String> = Vec::new();
    let mut entities: HashMap<String, RawRecord> = HashMap::new();
    let mut id_lookup: HashMap<String, String> = HashMap::new();

    for (_, records) in sources.iter().filter(|(r, _)| *r == SourceRole::IdBearing) {
        for record in records {
            let id = match &record.id {
                Some(id) => id.clone(),
                // An ID-bearing row that arrives without an Id still
                // becomes its own entity rather than colliding with others.
                None => mint_id(),
            };

            id_lookup.insert(composite_key(record), id.clone());

            match entities.entry(id.clone()) {
                Entry::Occupied(mut entry) => entry.get_mut().absorb(record),
                Entry::Vacant(entry) => {
                    order.push(id.clone());
                    let mut fresh = record.clone();
                    fresh.id = Some(id);
                    entry.insert(fresh);
                }
            }
        }
    }

    for (_, records) in sources.iter().filter(|(r, _)| *r == SourceRole::Lookup) {
        for record in records {
            match id_lookup.get(&composite_key(record)) {
                Some(id) => {
                    if let Some(existing) = entities.get_mut(id) {
                        existing.absorb(record);
                    }
                }
                None => {
                    let id = mint_id();
                    let mut fresh = record.clone();
                    fresh.id = Some(id.clone());
                    order.push(id.clone());
                    entities.insert(id, fresh);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| entities.remove(&id).map(|record| MergedEntity { id, record }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_record(id: &str, name: &str, email: &str) -> RawRecord {
        RawRecord {
            id: Some(id.into()),
            name: Some(name.into()),
            email: Some(email.into()),
            ..RawRecord::default()
        }
    }

    fn lookup_record(name: &str, email: &str) -> RawRecord {
        RawRecord {
            name: Some(name.into()),
            email: Some(email.into()),
            ..RawRecord::default()
        }
    }

    #[test]
    fn default_roles_follow_the_last_file_lookup_convention() {
        assert_eq!(
            default_roles(3),
            vec![SourceRole::IdBearing, SourceRole::IdBearing, SourceRole::Lookup]
        );
        assert_eq!(default_roles(1), vec![SourceRole::Lookup]);
        assert!(default_roles(0).is_empty());
    }

    #[test]
    fn shared_id_collapses_to_one_entity_last_write_wins() {
        let mut first = id_record("1", "Alice", "a@x.com");
        first.credit_card = Some("4111".into());
        let mut second = id_record("1", "Alice A.", "a@x.com");
        second.state = Some("TX".into());

        let merged = merge_sources(&[
            (SourceRole::IdBearing, vec![first]),
            (SourceRole::IdBearing, vec![second]),
        ]);

        assert_eq!(merged.len(), 1, "same ID must not duplicate");
        let entity = &merged[0];
        assert_eq!(entity.id, "1");
        assert_eq!(entity.record.name.as_deref(), Some("Alice A."));
        assert_eq!(entity.record.credit_card.as_deref(), Some("4111"));
        assert_eq!(entity.record.state.as_deref(), Some("TX"));
    }

    #[test]
    fn lookup_record_attaches_by_name_and_email() {
        let mut extra = lookup_record("Alice", "a@x.com");
        extra.address = Some("1 Main St".into());

        let merged = merge_sources(&[
            (SourceRole::IdBearing, vec![id_record("1", "Alice", "a@x.com")]),
            (SourceRole::IdBearing, vec![]),
            (SourceRole::Lookup, vec![extra]),
        ]);

        assert_eq!(merged.len(), 1, "matched lookup rows must not mint");
        let entity = &merged[0];
        assert_eq!(entity.id, "1");
        assert_eq!(entity.record.name.as_deref(), Some("Alice"));
        assert_eq!(entity.record.email.as_deref(), Some("a@x.com"));
        assert_eq!(entity.record.address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn unmatched_lookup_record_mints_a_fresh_id() {
        let merged = merge_sources(&[
            (SourceRole::IdBearing, vec![id_record("1", "Alice", "a@x.com")]),
            (SourceRole::Lookup, vec![lookup_record("Bob", "b@x.com")]),
        ]);

        assert_eq!(merged.len(), 2);
        let minted = &merged[1];
        assert!(!minted.id.is_empty());
        assert_ne!(minted.id, "1");
        assert_eq!(minted.record.name.as_deref(), Some("Bob"));
        assert_eq!(
            minted.record.id.as_deref(),
            Some(minted.id.as_str()),
            "minted ID lands on the record too"
        );
    }

    #[test]
    fn minted_ids_are_unique_across_entities() {
        let merged = merge_sources(&[(
            SourceRole::Lookup,
            vec![lookup_record("Bob", "b@x.com"), lookup_record("Carol", "c@x.com")],
        )]);

        assert_eq!(merged.len(), 2);
        assert_ne!(merged[0].id, merged[1].id);
    }

    #[test]
    fn empty_name_and_email_still_match_composite_key() {
        let anonymous = RawRecord {
            id: Some("9".into()),
            ..RawRecord::default()
        };
        let extra = RawRecord {
            address: Some("2 Side St".into()),
            ..RawRecord::default()
        };

        let merged = merge_sources(&[
            (SourceRole::IdBearing, vec![anonymous]),
            (SourceRole::Lookup, vec![extra]),
        ]);

        assert_eq!(merged.len(), 1, "empty composite keys still compare equal");
        assert_eq!(merged[0].id, "9");
        assert_eq!(merged[0].record.address.as_deref(), Some("2 Side St"));
    }

    #[test]
    fn id_bearing_record_without_id_gets_minted_identity() {
        let merged = merge_sources(&[(
            SourceRole::IdBearing,
            vec![lookup_record("Dana", "d@x.com"), lookup_record("Eve", "e@x.com")],
        )]);

        assert_eq!(merged.len(), 2, "rows without an Id must not collapse together");
        assert!(!merged[0].id.is_empty());
        assert_ne!(merged[0].id, merged[1].id);
    }

    #[test]
    fn output_preserves_assembly_order() {
        let merged = merge_sources(&[
            (
                SourceRole::IdBearing,
                vec![
                    id_record("b", "Bob", "b@x.com"),
                    id_record("a", "Alice", "a@x.com"),
                ],
            ),
            (SourceRole::Lookup, vec![lookup_record("Zoe", "z@x.com")]),
        ]);

        let names: Vec<_> = merged
            .iter()
            .map(|e| e.record.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["Bob", "Alice", "Zoe"]);
    }
}
