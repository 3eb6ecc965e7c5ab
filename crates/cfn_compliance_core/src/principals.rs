/// Placeholder token substituted with the account id in kms-style principal
/// lists.
pub const ACCOUNT_ID_PLACEHOLDER: &str = "{accountid}";

/// Normalizes a principal list into a comma-joined string: a literal `*`
/// entry becomes the account id, and duplicates are dropped while preserving
/// first-seen order.
pub fn flatten_principals(account_id: &str, principals: &[String]) -> String {
    let mut normalized: Vec<String> = Vec::new();
    for principal in principals {
        let entry = if principal == "*" {
            account_id.to_string()
        } else {
            principal.clone()
        };
        if !normalized.contains(&entry) {
            normalized.push(entry);
        }
    }
    normalized.join(",")
}

/// Substitutes the `{accountid}` placeholder in each entry and returns the
/// list unjoined. KMS policy documents consume this as a JSON array.
pub fn kms_principals(account_id: &str, principals: &[String]) -> Vec<String> {
    principals
        .iter()
        .map(|principal| principal.replace(ACCOUNT_ID_PLACEHOLDER, account_id))
        .collect()
}
