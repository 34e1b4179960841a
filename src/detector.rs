use crate::cache::AlertedSites;
use crate::model::SiteStatus;

const OFFLINE_MARKER: &str = "offline";

/// True when the status text contains "offline", ignoring case.
/// Rows without a status are never offline.
pub fn is_offline(status: &SiteStatus) -> bool {
    status
        .status_text
        .as_deref()
        .map(|text| text.to_lowercase().contains(OFFLINE_MARKER))
        .unwrap_or(false)
}

/// Sites reported offline that are not yet in `already_alerted`, in source order.
pub fn detect_new_offline(statuses: &[SiteStatus], already_alerted: &AlertedSites) -> Vec<String> {
    statuses
        .iter()
        .filter(|s| is_offline(s))
        .filter(|s| !already_alerted.contains(&s.site))
        .map(|s| s.site.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Vec<SiteStatus> {
        vec![
            SiteStatus::new("A", "Online"),
            SiteStatus::new("B", "Offline"),
            SiteStatus::new("C", "OFFLINE - timeout"),
        ]
    }

    fn alerted(sites: &[&str]) -> AlertedSites {
        sites.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_cache_reports_all_offline_in_order() {
        assert_eq!(detect_new_offline(&snapshot(), &alerted(&[])), vec!["B", "C"]);
    }

    #[test]
    fn already_alerted_sites_are_suppressed() {
        assert_eq!(detect_new_offline(&snapshot(), &alerted(&["B"])), vec!["C"]);
        assert!(detect_new_offline(&snapshot(), &alerted(&["B", "C"])).is_empty());
    }

    #[test]
    fn missing_status_is_not_offline() {
        let rows = vec![
            SiteStatus::without_status("X"),
            SiteStatus::new("Y", ""),
            SiteStatus::new("Z", "went offline"),
        ];
        assert_eq!(detect_new_offline(&rows, &alerted(&[])), vec!["Z"]);
    }

    #[test]
    fn detection_does_not_mutate_inputs() {
        let rows = snapshot();
        let cache = alerted(&["B"]);
        let first = detect_new_offline(&rows, &cache);
        let second = detect_new_offline(&rows, &cache);
        assert_eq!(first, second);
        assert_eq!(rows, snapshot());
        assert_eq!(cache, alerted(&["B"]));
    }

    #[test]
    fn duplicate_rows_pass_through() {
        let rows = vec![SiteStatus::new("B", "offline"), SiteStatus::new("B", "offline")];
        assert_eq!(detect_new_offline(&rows, &alerted(&[])), vec!["B", "B"]);
    }
}
