use std::collections::HashSet;

use url::Url;

use crate::types::RangeBounds;

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Values that occur more than once, each reported once in first-repeat order.
/// Comparison is case-sensitive.
pub fn repeated_values(values: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for value in values {
        if !seen.insert(value.as_str()) && !repeated.contains(&value.as_str()) {
            repeated.push(value.as_str());
        }
    }
    repeated
}

/// Problems with an add/remove pair of choice option lists.
pub fn choice_option_change_issues(added: &[String], removed: &[String]) -> Vec<String> {
    let mut issues = Vec::new();
    if !repeated_values(added).is_empty() {
        issues.push("Repeated values in added options".to_string());
    }
    if !repeated_values(removed).is_empty() {
        issues.push("Repeated values in removed options".to_string());
    }
    let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();
    if added.iter().any(|option| removed_set.contains(option.as_str())) {
        issues.push("Same option can't be added and removed".to_string());
    }
    issues
}

/// Text ranges bound the answer length, so both sides are non-negative.
pub fn text_range_issues(range: &RangeBounds) -> Vec<String> {
    let mut issues = Vec::new();
    if range.min.is_some_and(|min| min < 0) {
        issues.push("Min value must be positive".to_string());
    }
    if range.max.is_some_and(|max| max < 0) {
        issues.push("Max value must be positive".to_string());
    }
    if !range.is_ordered() {
        issues.push("Min value must be less than or equal to max value".to_string());
    }
    issues
}

/// Checkbox ranges count how many options may be selected.
pub fn checkbox_range_issues(range: &RangeBounds) -> Vec<String> {
    let mut issues = Vec::new();
    if range.min.is_some_and(|min| min < 0) {
        issues.push("Min selective options must be positive".to_string());
    }
    if range.max.is_some_and(|max| max < 0) {
        issues.push("Max selective options must be positive".to_string());
    }
    if !range.is_ordered() {
        issues.push("Min selective options must be less than or equal to max".to_string());
    }
    issues
}

/// Checkbox bounds may not exceed the number of options available.
pub fn selective_range_issues(range: &RangeBounds, option_count: usize) -> Vec<String> {
    let count = i64::try_from(option_count).unwrap_or(i64::MAX);
    let mut issues = Vec::new();
    if range.min.is_some_and(|min| min > count) {
        issues.push("Min selective options must be less than list of options".to_string());
    }
    if range.max.is_some_and(|max| max > count) {
        issues.push("Max selective options must be less than list of options".to_string());
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://docs.google.com/spreadsheets/d/abc"));
        assert!(!is_valid_url("not-a-url"));
    }

    #[test]
    fn repeats_are_case_sensitive() {
        assert_eq!(repeated_values(&strings(&["4", "4", "5", "4"])), vec!["4"]);
        assert!(repeated_values(&strings(&["Yes", "yes"])).is_empty());
    }

    #[test]
    fn option_changes_must_not_overlap() {
        let issues = choice_option_change_issues(&strings(&["a", "b"]), &strings(&["b"]));
        assert_eq!(issues, vec!["Same option can't be added and removed"]);
        assert!(choice_option_change_issues(&strings(&["a"]), &strings(&["c"])).is_empty());
    }

    #[test]
    fn checkbox_bounds_checked_against_option_count() {
        let range = RangeBounds::new(Some(1), Some(4));
        assert!(checkbox_range_issues(&range).is_empty());
        assert_eq!(
            selective_range_issues(&range, 3),
            vec!["Max selective options must be less than list of options"]
        );
        assert!(selective_range_issues(&range, 4).is_empty());
    }

    #[test]
    fn text_range_rejects_negative_and_inverted_bounds() {
        let issues = text_range_issues(&RangeBounds::new(Some(-1), Some(-2)));
        assert_eq!(issues.len(), 3);
        assert!(text_range_issues(&RangeBounds::new(None, Some(10))).is_empty());
    }
}
