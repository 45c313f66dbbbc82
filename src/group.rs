//! Grouping of publication records into named buckets.
//!
//! A configurable entry field (e.g. `tags = {ml, nlp}`) splits the flat
//! publication list into buckets; entries without a value land in a reserved
//! untagged bucket when a label for it is configured.

use indexmap::IndexMap;

use crate::processor::PublicationRecord;

/// Bucket label to ordered records, in first-occurrence order.
pub type GroupingIndex = IndexMap<String, Vec<PublicationRecord>>;

/// Splits a comma-separated field value into trimmed tags.
///
/// An empty value yields no tags. Pieces are not deduplicated and empty
/// pieces are kept, so `"a,,a"` yields `["a", "", "a"]`.
pub fn parse_tags(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(|tag| tag.trim().to_string()).collect()
}

/// Buckets records by the tags found in the `split_by` field.
///
/// With no split field configured, grouping is skipped and the map is empty.
/// Buckets are created in first-occurrence order over the records; a record
/// appears once per tag occurrence (duplicate tags yield duplicate
/// membership). Records without tags go to the `untagged` bucket, which is
/// inserted last once all records are seen; with no untagged label they
/// appear in no bucket.
pub fn group_records(
    records: &[PublicationRecord],
    split_by: Option<&str>,
    untagged: Option<&str>,
) -> GroupingIndex {
    let mut lists = GroupingIndex::new();
    let Some(split_by) = split_by else {
        return lists;
    };

    let mut untagged_records: Vec<PublicationRecord> = Vec::new();
    for record in records {
        let tags = record
            .field(split_by)
            .map(parse_tags)
            .unwrap_or_default();
        if tags.is_empty() {
            if untagged.is_some() {
                untagged_records.push(record.clone());
            }
            continue;
        }
        for tag in tags {
            lists.entry(tag).or_default().push(record.clone());
        }
    }

    if let Some(label) = untagged {
        if !untagged_records.is_empty() {
            lists.insert(label.to_string(), untagged_records);
        }
    }

    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, tags: Option<&str>) -> PublicationRecord {
        let mut fields = IndexMap::new();
        if let Some(tags) = tags {
            fields.insert("tags".to_string(), tags.to_string());
        }
        PublicationRecord {
            key: key.to_string(),
            year: None,
            text: format!("{} citation", key),
            bibtex: String::new(),
            pdf: None,
            slides: None,
            poster: None,
            fields,
        }
    }

    fn keys(records: &[PublicationRecord]) -> Vec<&str> {
        records.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_parse_tags_trims_pieces() {
        assert_eq!(parse_tags("ml, nlp ,  vision"), vec!["ml", "nlp", "vision"]);
    }

    #[test]
    fn test_parse_tags_empty_value() {
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_parse_tags_keeps_empty_pieces_and_duplicates() {
        assert_eq!(parse_tags("a,,a"), vec!["a", "", "a"]);
    }

    #[test]
    fn test_grouping_example_from_overview() {
        // Given: A tagged "ml,nlp", B untagged, C tagged "ml"
        let records = vec![
            record("A", Some("ml,nlp")),
            record("B", Some("")),
            record("C", Some("ml")),
        ];

        // When: we group with an untagged label
        let lists = group_records(&records, Some("tags"), Some("Other"));

        // Then: buckets are {"ml": [A, C], "nlp": [A], "Other": [B]}
        assert_eq!(
            lists.keys().collect::<Vec<_>>(),
            vec!["ml", "nlp", "Other"]
        );
        assert_eq!(keys(&lists["ml"]), vec!["A", "C"]);
        assert_eq!(keys(&lists["nlp"]), vec!["A"]);
        assert_eq!(keys(&lists["Other"]), vec!["B"]);
    }

    #[test]
    fn test_no_split_field_skips_grouping() {
        let records = vec![record("A", Some("ml")), record("B", None)];
        let lists = group_records(&records, None, Some("Other"));
        assert!(lists.is_empty());
    }

    #[test]
    fn test_untagged_without_label_appears_nowhere() {
        let records = vec![record("A", Some("ml")), record("B", None)];
        let lists = group_records(&records, Some("tags"), None);
        assert_eq!(lists.keys().collect::<Vec<_>>(), vec!["ml"]);
    }

    #[test]
    fn test_missing_field_counts_as_untagged() {
        let records = vec![record("A", None)];
        let lists = group_records(&records, Some("tags"), Some("Other"));
        assert_eq!(keys(&lists["Other"]), vec!["A"]);
    }

    #[test]
    fn test_duplicate_tag_yields_duplicate_membership() {
        // A tag listed twice in one entry puts the record in the bucket twice
        let records = vec![record("A", Some("ml, ml"))];
        let lists = group_records(&records, Some("tags"), None);
        assert_eq!(keys(&lists["ml"]), vec!["A", "A"]);
    }

    #[test]
    fn test_bucket_order_is_first_occurrence() {
        let records = vec![
            record("A", Some("zeta")),
            record("B", Some("alpha")),
            record("C", Some("zeta, beta")),
        ];
        let lists = group_records(&records, Some("tags"), None);
        assert_eq!(
            lists.keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "beta"]
        );
    }

    #[test]
    fn test_untagged_bucket_is_inserted_last() {
        let records = vec![
            record("A", None),
            record("B", Some("ml")),
            record("C", Some("nlp")),
        ];
        let lists = group_records(&records, Some("tags"), Some("Other"));
        assert_eq!(
            lists.keys().collect::<Vec<_>>(),
            vec!["ml", "nlp", "Other"]
        );
    }

    #[test]
    fn test_untagged_label_colliding_with_tag_replaces_contents_in_place() {
        // The colliding bucket keeps its position but holds the untagged
        // records afterwards
        let records = vec![
            record("A", Some("Other")),
            record("B", Some("ml")),
            record("C", None),
        ];
        let lists = group_records(&records, Some("tags"), Some("Other"));
        assert_eq!(lists.keys().collect::<Vec<_>>(), vec!["Other", "ml"]);
        assert_eq!(keys(&lists["Other"]), vec!["C"]);
    }

    #[test]
    fn test_membership_counts_sum_at_least_flat_length() {
        let records = vec![
            record("A", Some("ml,nlp")),
            record("B", Some("ml")),
            record("C", None),
        ];
        let lists = group_records(&records, Some("tags"), Some("Other"));
        let total: usize = lists.values().map(Vec::len).sum();
        assert!(total >= records.len());
        assert_eq!(total, 4);
    }
}
