use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Result of splitting a `key=value,key=value` string. Segments without
/// exactly one `=` are collected for logging instead of aborting the parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPairs {
    pub pairs: Vec<(String, String)>,
    pub skipped: Vec<String>,
}

pub fn parse_pairs(input: &str) -> ParsedPairs {
    let mut parsed = ParsedPairs::default();
    for segment in input.split(',') {
        let parts: Vec<&str> = segment.split('=').collect();
        if parts.len() != 2 {
            parsed.skipped.push(segment.to_string());
            continue;
        }
        parsed
            .pairs
            .push((parts[0].to_string(), parts[1].to_string()));
    }
    parsed
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TagEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinitionEntry {
    pub attribute_name: String,
    pub attribute_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaEntry {
    pub attribute_name: String,
    pub key_type: String,
}

pub fn tag_entries(parsed: &ParsedPairs) -> Vec<TagEntry> {
    parsed
        .pairs
        .iter()
        .map(|(key, value)| TagEntry {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

pub fn attribute_definition_entries(parsed: &ParsedPairs) -> Vec<AttributeDefinitionEntry> {
    parsed
        .pairs
        .iter()
        .map(|(name, attribute_type)| AttributeDefinitionEntry {
            attribute_name: name.clone(),
            attribute_type: attribute_type.clone(),
        })
        .collect()
}

pub fn key_schema_entries(parsed: &ParsedPairs) -> Vec<KeySchemaEntry> {
    parsed
        .pairs
        .iter()
        .map(|(name, key_type)| KeySchemaEntry {
            attribute_name: name.clone(),
            key_type: key_type.clone(),
        })
        .collect()
}

/// Flat key/value mapping for queue tagging.
pub fn queue_tag_map(parsed: &ParsedPairs) -> BTreeMap<String, String> {
    parsed
        .pairs
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Returns the first configured required tag that is absent from the parsed
/// keys. Required tags are supplied at startup, never baked into the crate.
pub fn missing_required_tag<'a>(
    required_tags: &'a [String],
    parsed: &ParsedPairs,
) -> Option<&'a str> {
    required_tags
        .iter()
        .find(|required| !parsed.pairs.iter().any(|(key, _)| key == *required))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_in_input_order() {
        let parsed = parse_pairs("env=prod,owner=data-platform,costcenter=1234");
        assert_eq!(
            parsed.pairs,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("owner".to_string(), "data-platform".to_string()),
                ("costcenter".to_string(), "1234".to_string()),
            ]
        );
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn skips_segments_without_exactly_one_separator() {
        let parsed = parse_pairs("env=prod,malformed,owner=ops,a=b=c");
        assert_eq!(
            parsed.pairs,
            vec![
                ("env".to_string(), "prod".to_string()),
                ("owner".to_string(), "ops".to_string()),
            ]
        );
        assert_eq!(parsed.skipped, vec!["malformed", "a=b=c"]);
    }

    #[test]
    fn empty_input_parses_to_one_skipped_segment() {
        let parsed = parse_pairs("");
        assert!(parsed.pairs.is_empty());
        assert_eq!(parsed.skipped, vec![""]);
    }

    #[test]
    fn tag_entries_serialize_with_cloudformation_field_names() {
        let parsed = parse_pairs("env=prod");
        let serialized =
            serde_json::to_value(tag_entries(&parsed)).expect("entries should serialize");
        assert_eq!(
            serialized,
            serde_json::json!([{"Key": "env", "Value": "prod"}])
        );
    }

    #[test]
    fn dynamodb_entries_serialize_with_expected_field_names() {
        let parsed = parse_pairs("pk=S,sk=N");
        let schema = serde_json::to_value(attribute_definition_entries(&parsed))
            .expect("schema should serialize");
        assert_eq!(
            schema,
            serde_json::json!([
                {"AttributeName": "pk", "AttributeType": "S"},
                {"AttributeName": "sk", "AttributeType": "N"},
            ])
        );

        let parsed = parse_pairs("pk=HASH");
        let keys =
            serde_json::to_value(key_schema_entries(&parsed)).expect("keys should serialize");
        assert_eq!(keys, serde_json::json!([{"AttributeName": "pk", "KeyType": "HASH"}]));
    }

    #[test]
    fn queue_tag_map_collects_all_pairs() {
        let parsed = parse_pairs("env=prod,owner=ops");
        let tags = queue_tag_map(&parsed);
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(tags.get("owner").map(String::as_str), Some("ops"));
    }

    #[test]
    fn reports_first_missing_required_tag() {
        let required = vec!["env".to_string(), "owner".to_string()];
        let parsed = parse_pairs("env=prod");
        assert_eq!(missing_required_tag(&required, &parsed), Some("owner"));
    }

    #[test]
    fn no_missing_tag_when_all_required_present() {
        let required = vec!["env".to_string(), "owner".to_string()];
        let parsed = parse_pairs("owner=ops,env=prod,extra=1");
        assert_eq!(missing_required_tag(&required, &parsed), None);
    }
}
