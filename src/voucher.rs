// src/voucher.rs

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::PayrollError;
use crate::models::{wire, PayrollRecord};

/// Optional metadata sent along with a voucher request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherFilter {
    #[serde(with = "wire::date_option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "wire::date_option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vessel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /payroll/voucher`. Never constructed with an empty id set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRequest {
    payroll_ids: Vec<String>,
    #[serde(flatten)]
    filter: VoucherFilter,
}

impl VoucherRequest {
    pub fn new(payroll_ids: Vec<String>, filter: VoucherFilter) -> Result<Self, PayrollError> {
        if payroll_ids.is_empty() {
            return Err(PayrollError::EmptySelection);
        }
        Ok(Self {
            payroll_ids,
            filter,
        })
    }

    /// Uses every record that has a backend id; unsaved records are skipped.
    pub fn from_records(
        records: &[PayrollRecord],
        filter: VoucherFilter,
    ) -> Result<Self, PayrollError> {
        let ids: Vec<String> = records.iter().filter_map(|r| r.id.clone()).collect();
        if ids.len() < records.len() {
            debug!(
                "Skipping {} payroll records without an id for the voucher",
                records.len() - ids.len()
            );
        }
        Self::new(ids, filter)
    }

    pub fn payroll_ids(&self) -> &[String] {
        &self.payroll_ids
    }

    pub fn filter(&self) -> &VoucherFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_selection_is_rejected() {
        assert!(matches!(
            VoucherRequest::new(Vec::new(), VoucherFilter::default()),
            Err(PayrollError::EmptySelection)
        ));

        let unsaved = vec![PayrollRecord::default()];
        assert!(matches!(
            VoucherRequest::from_records(&unsaved, VoucherFilter::default()),
            Err(PayrollError::EmptySelection)
        ));
    }

    #[test]
    fn body_has_only_the_keys_that_are_set() {
        let request = VoucherRequest::new(vec!["p1".into(), "p2".into()], VoucherFilter::default()).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"payrollIds": ["p1", "p2"]})
        );

        let filter = VoucherFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            vessel: Some("v1".into()),
            employee: None,
            description: Some("January first half".into()),
        };
        let request = VoucherRequest::new(vec!["p1".into()], filter).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "payrollIds": ["p1"],
                "startDate": "2024-01-01",
                "endDate": "2024-01-15",
                "vessel": "v1",
                "description": "January first half"
            })
        );
    }

    #[test]
    fn from_records_keeps_order_and_skips_unsaved() {
        let records = vec![
            PayrollRecord {
                id: Some("b".into()),
                ..Default::default()
            },
            PayrollRecord::default(),
            PayrollRecord {
                id: Some("a".into()),
                ..Default::default()
            },
        ];
        let request = VoucherRequest::from_records(&records, VoucherFilter::default()).unwrap();
        assert_eq!(request.payroll_ids(), ["b".to_string(), "a".to_string()]);
    }
}
