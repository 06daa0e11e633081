//! License aggregation and status evaluation
//!
//! Pure functions over fetched key pack records: filtering, summation,
//! the optional per-group breakdown and the final plugin state.

use std::collections::BTreeMap;

use crate::models::{
    AggregateResult, CheckConfig, CheckReport, DetailGroup, KeyPackFilter, LicenseKeyPackRecord,
    ServiceState,
};

/// Sum the license columns of every record selected by the filter
pub fn aggregate(records: &[LicenseKeyPackRecord], filter: &KeyPackFilter) -> AggregateResult {
    records
        .iter()
        .filter(|record| filter.matches(record))
        .fold(AggregateResult::default(), |mut acc, record| {
            acc.total_licenses += i64::from(record.total_licenses);
            acc.issued_licenses += i64::from(record.issued_licenses);
            acc.available_licenses += i64::from(record.available_licenses);
            acc.matched_packs += 1;
            acc
        })
}

/// Group selected records by product version and model, sorted by group name
pub fn detail_groups(records: &[LicenseKeyPackRecord], filter: &KeyPackFilter) -> Vec<DetailGroup> {
    let mut groups: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for record in records.iter().filter(|record| filter.matches(record)) {
        let name = format!("{}, {}", record.product_version, record.type_and_model);
        let entry = groups.entry(name).or_default();
        entry.0 += i64::from(record.issued_licenses);
        entry.1 += i64::from(record.total_licenses);
    }

    groups
        .into_iter()
        .map(|(name, (issued, total))| DetailGroup {
            name,
            issued_licenses: issued,
            total_licenses: total,
            usage_percent: ceil_percent(issued, total),
        })
        .collect()
}

/// Issued share of total as a percentage rounded to two decimals
///
/// Midpoints round half away from zero (3.125 -> 3.13), not to even.
pub fn usage_percent(issued: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let percent = issued as f64 / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Issued share of total as a whole percentage, rounded up
pub fn ceil_percent(issued: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let scaled = i128::from(issued) * 100;
    let total = i128::from(total);
    let quotient = scaled / total + i128::from(scaled % total > 0);
    i64::try_from(quotient).unwrap_or(i64::MAX)
}

/// Evaluate fetched records against the configured filter and thresholds
pub fn evaluate(config: &CheckConfig, records: &[LicenseKeyPackRecord]) -> CheckReport {
    let totals = aggregate(records, &config.filter);
    let free = totals.free_licenses();

    // Nothing licensed and nothing issued: there is no pool to exhaust
    let status = if totals.is_empty() {
        ServiceState::Ok
    } else {
        config.thresholds.evaluate(free)
    };

    log::debug!(
        "{} of {} key packs matched: total={} issued={} available={} free={}",
        totals.matched_packs,
        records.len(),
        totals.total_licenses,
        totals.issued_licenses,
        totals.available_licenses,
        free
    );

    let groups = config
        .detailed
        .then(|| detail_groups(records, &config.filter));

    CheckReport {
        status,
        exit_code: status.exit_code(),
        computer_name: config.computer_name.clone(),
        free_licenses: free,
        total_licenses: totals.total_licenses,
        issued_licenses: totals.issued_licenses,
        usage_percent: usage_percent(totals.issued_licenses, totals.total_licenses),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuerySettings;
    use crate::models::{KeyPackType, ProductVersionId, RecordSource, Thresholds};

    fn pack(
        key_pack_type: u32,
        product_version_id: u32,
        total: u32,
        issued: u32,
        version: &str,
        model: &str,
    ) -> LicenseKeyPackRecord {
        LicenseKeyPackRecord {
            key_pack_type,
            product_version_id,
            product_version: version.to_string(),
            type_and_model: model.to_string(),
            total_licenses: total,
            issued_licenses: issued,
            available_licenses: total.saturating_sub(issued),
        }
    }

    fn config(warning: i64, critical: i64, detailed: bool) -> CheckConfig {
        CheckConfig {
            thresholds: Thresholds::new(warning, critical).unwrap(),
            filter: KeyPackFilter::default(),
            computer_name: "LICSRV01".to_string(),
            detailed,
            json_output: false,
            verbosity: 0,
            source: RecordSource::Host,
            query: QuerySettings::default(),
        }
    }

    #[test]
    fn test_aggregate_matches_manual_sum() {
        let records = vec![
            pack(2, 5, 10, 8, "Windows Server 2012", "RDS Per Device CAL"),
            pack(1, 5, 20, 4, "Windows Server 2012", "RDS Per Device CAL"),
            pack(2, 6, 50, 25, "Windows Server 2016", "RDS Per Device CAL"),
            pack(4, 6, 7, 7, "Windows Server 2016", "RDS Per User CAL"),
        ];
        let filter = KeyPackFilter {
            key_pack_types: [KeyPackType::Volume, KeyPackType::Retail].into_iter().collect(),
            product_versions: [ProductVersionId::WindowsServer2012].into_iter().collect(),
        };

        let result = aggregate(&records, &filter);

        let expected: Vec<_> = records
            .iter()
            .filter(|r| [1, 2].contains(&r.key_pack_type) && r.product_version_id == 5)
            .collect();
        assert_eq!(result.matched_packs, expected.len());
        assert_eq!(
            result.total_licenses,
            expected.iter().map(|r| i64::from(r.total_licenses)).sum::<i64>()
        );
        assert_eq!(result.issued_licenses, 12);
        assert_eq!(result.free_licenses(), 18);
    }

    #[test]
    fn test_free_count_ignores_available_column() {
        let mut record = pack(2, 5, 10, 8, "v", "m");
        record.available_licenses = 9;

        let result = aggregate(&[record], &KeyPackFilter::default());
        assert_eq!(result.available_licenses, 9);
        assert_eq!(result.free_licenses(), 2);
    }

    #[test]
    fn test_usage_percent_rounds_to_two_decimals() {
        assert_eq!(usage_percent(8, 10), 80.0);
        assert_eq!(usage_percent(2, 3), 66.67);
        assert_eq!(usage_percent(1, 8), 12.5);
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(3, 0), 0.0);
    }

    #[test]
    fn test_ceil_percent() {
        assert_eq!(ceil_percent(5, 10), 50);
        assert_eq!(ceil_percent(1, 3), 34);
        assert_eq!(ceil_percent(0, 7), 0);
        assert_eq!(ceil_percent(3, 0), 0);
        assert_eq!(ceil_percent(12, 10), 120);
        assert_eq!(ceil_percent(i64::MAX, i64::MAX), 100);
        assert_eq!(ceil_percent(i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn test_sums_of_maximum_counts_do_not_overflow() {
        let records = vec![
            pack(2, 5, u32::MAX, u32::MAX, "v", "m"),
            pack(2, 5, u32::MAX, u32::MAX, "v", "m"),
        ];

        let result = aggregate(&records, &KeyPackFilter::default());
        assert_eq!(result.total_licenses, 2 * i64::from(u32::MAX));
        assert_eq!(result.free_licenses(), 0);

        let groups = detail_groups(&records, &KeyPackFilter::default());
        assert_eq!(groups[0].usage_percent, 100);
    }

    #[test]
    fn test_detail_groups_merge_and_sort() {
        let records = vec![
            pack(2, 6, 5, 2, "Windows Server 2016", "RDS Per Device CAL"),
            pack(2, 5, 5, 3, "Windows Server 2012", "RDS Per Device CAL"),
            pack(2, 5, 5, 2, "Windows Server 2012", "RDS Per Device CAL"),
        ];

        let groups = detail_groups(&records, &KeyPackFilter::default());

        assert_eq!(
            groups,
            vec![
                DetailGroup {
                    name: "Windows Server 2012, RDS Per Device CAL".to_string(),
                    issued_licenses: 5,
                    total_licenses: 10,
                    usage_percent: 50,
                },
                DetailGroup {
                    name: "Windows Server 2016, RDS Per Device CAL".to_string(),
                    issued_licenses: 2,
                    total_licenses: 5,
                    usage_percent: 40,
                },
            ]
        );
    }

    #[test]
    fn test_detail_groups_respect_filter() {
        let records = vec![
            pack(2, 5, 5, 3, "Windows Server 2012", "RDS Per Device CAL"),
            pack(4, 5, 5, 5, "Windows Server 2012", "RDS Per Device CAL"),
        ];
        let filter = KeyPackFilter {
            key_pack_types: [KeyPackType::Volume].into_iter().collect(),
            ..KeyPackFilter::default()
        };

        let groups = detail_groups(&records, &filter);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].issued_licenses, 3);
        assert_eq!(groups[0].total_licenses, 5);
    }

    #[test]
    fn test_evaluate_critical_example() {
        let records = vec![pack(2, 5, 10, 8, "v", "m")];

        let report = evaluate(&config(5, 1, false), &records);
        assert_eq!(report.status, ServiceState::Critical);
        assert_eq!(report.exit_code, 2);
        assert_eq!(report.free_licenses, 2);
        assert_eq!(report.usage_percent, 80.0);
        assert!(report.groups.is_none());
    }

    #[test]
    fn test_evaluate_ok_example() {
        let records = vec![pack(2, 5, 10, 8, "v", "m")];

        let report = evaluate(&config(1, 0, true), &records);
        assert_eq!(report.status, ServiceState::Ok);
        assert_eq!(report.exit_code, 0);
        assert_eq!(report.groups.map(|g| g.len()), Some(1));
    }

    #[test]
    fn test_evaluate_zero_total_is_ok_regardless_of_thresholds() {
        let report = evaluate(&config(5, 1, false), &[]);
        assert_eq!(report.status, ServiceState::Ok);
        assert_eq!(report.total_licenses, 0);
        assert_eq!(report.usage_percent, 0.0);
    }

    #[test]
    fn test_evaluate_issued_without_total_applies_thresholds() {
        let records = vec![pack(2, 5, 0, 3, "v", "m")];

        let report = evaluate(&config(5, 1, false), &records);
        assert_eq!(report.status, ServiceState::Critical);
        assert_eq!(report.free_licenses, -3);
        assert_eq!(report.usage_percent, 0.0);
    }

    #[test]
    fn test_evaluate_matched_packs_without_licenses_is_ok() {
        let records = vec![pack(2, 5, 0, 0, "v", "m")];

        let report = evaluate(&config(5, 1, false), &records);
        assert_eq!(report.status, ServiceState::Ok);
        assert!(report.has_no_licenses());
    }
}
