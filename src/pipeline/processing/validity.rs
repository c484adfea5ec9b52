use crate::domain::{Field, UsageRecord, ValidUsage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-valued truth: comparisons that touch a null are `Unknown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    /// Only a definite `True` selects a record
    pub fn is_true(self) -> bool {
        self == Truth::True
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }
}

pub fn equals<T: PartialEq>(a: Option<&T>, b: Option<&T>) -> Truth {
    match (a, b) {
        (Some(a), Some(b)) => Truth::from(a == b),
        _ => Truth::Unknown,
    }
}

pub fn flag_is(flag: Option<bool>, expected: bool) -> Truth {
    flag.map_or(Truth::Unknown, |f| Truth::from(f == expected))
}

/// The owning org matches, or the project is shared across orgs
fn access_granted(r: &UsageRecord) -> Truth {
    equals(r.project_owner.as_ref(), r.user_org.as_ref()).or(flag_is(r.project_multi, true))
}

fn access_denied(r: &UsageRecord) -> Truth {
    equals(r.project_owner.as_ref(), r.user_org.as_ref())
        .not()
        .and(flag_is(r.project_multi, false))
}

/// `(owner == org OR multi) AND every required field present`
pub fn is_valid(r: &UsageRecord) -> Truth {
    let all_present = Field::REQUIRED.iter().all(|f| !r.is_null(*f));
    access_granted(r).and(Truth::from(all_present))
}

/// `(owner != org AND NOT multi) OR any required field null`
pub fn is_invalid(r: &UsageRecord) -> Truth {
    let any_null = Field::REQUIRED.iter().any(|f| r.is_null(*f));
    access_denied(r).or(Truth::from(any_null))
}

/// Why a record was routed to the diagnostics partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingField(Field),
    AccessDenied,
    /// Neither predicate held; kept for diagnostics instead of being dropped
    Indeterminate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField(field) => write!(f, "missing_{field}"),
            RejectReason::AccessDenied => f.write_str("access_denied"),
            RejectReason::Indeterminate => f.write_str("indeterminate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid(ValidUsage),
    Invalid(Vec<RejectReason>),
}

/// Evaluate both predicates and route the record to exactly one partition.
pub fn classify(record: &UsageRecord) -> Verdict {
    let valid = is_valid(record).is_true();
    let invalid = is_invalid(record).is_true();

    match (valid, invalid) {
        (true, false) => match ValidUsage::try_from(record) {
            Ok(usage) => Verdict::Valid(usage),
            Err(_) => Verdict::Invalid(reasons(record)),
        },
        (false, true) => Verdict::Invalid(reasons(record)),
        // unreachable while the predicates stay complementary
        _ => Verdict::Invalid(vec![RejectReason::Indeterminate]),
    }
}

fn reasons(record: &UsageRecord) -> Vec<RejectReason> {
    let mut reasons: Vec<RejectReason> = record
        .missing_required()
        .into_iter()
        .map(RejectReason::MissingField)
        .collect();
    if access_denied(record).is_true() {
        reasons.push(RejectReason::AccessDenied);
    }
    if reasons.is_empty() {
        reasons.push(RejectReason::Indeterminate);
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(owner: Option<i64>, org: Option<i64>, multi: Option<bool>) -> UsageRecord {
        UsageRecord {
            user_id: Some(1),
            project_id: Some(10),
            metric_name: Some("documents_viewed".to_string()),
            metrics_value: Some(12),
            day: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            user_org: org,
            user_region: Some("US".to_string()),
            user_title: Some("Paralegal".to_string()),
            user_age: Some(30),
            project_owner: owner,
            project_multi: multi,
            project_purpose: Some("review".to_string()),
        }
    }

    #[test]
    fn kleene_tables() {
        use Truth::*;
        assert_eq!(Unknown.and(False), False);
        assert_eq!(Unknown.and(True), Unknown);
        assert_eq!(Unknown.or(True), True);
        assert_eq!(Unknown.or(False), Unknown);
        assert_eq!(Unknown.not(), Unknown);
        assert_eq!(equals(Some(&1), None), Unknown);
        assert_eq!(flag_is(None, false), Unknown);
    }

    #[test]
    fn same_org_passes_regardless_of_multi() {
        let verdict = classify(&record(Some(5), Some(5), Some(false)));
        assert!(matches!(verdict, Verdict::Valid(_)));
    }

    #[test]
    fn shared_project_passes_for_other_org() {
        let verdict = classify(&record(Some(5), Some(7), Some(true)));
        assert!(matches!(verdict, Verdict::Valid(_)));
    }

    #[test]
    fn other_org_on_private_project_is_denied() {
        let verdict = classify(&record(Some(5), Some(7), Some(false)));
        assert_eq!(verdict, Verdict::Invalid(vec![RejectReason::AccessDenied]));
    }

    #[test]
    fn missing_metric_name_is_invalid() {
        let mut r = record(Some(5), Some(5), Some(false));
        r.metric_name = None;
        assert_eq!(
            classify(&r),
            Verdict::Invalid(vec![RejectReason::MissingField(Field::MetricName)])
        );
    }

    #[test]
    fn null_access_fields_land_in_invalid_only() {
        // multi=true would grant access, but the null org still fails the presence check
        let r = record(Some(5), None, Some(true));
        assert_eq!(is_valid(&r), Truth::False);
        assert_eq!(is_invalid(&r), Truth::True);
        assert_eq!(
            classify(&r),
            Verdict::Invalid(vec![RejectReason::MissingField(Field::UserOrg)])
        );

        let r = record(None, Some(5), None);
        assert_eq!(
            classify(&r),
            Verdict::Invalid(vec![
                RejectReason::MissingField(Field::ProjectOwner),
                RejectReason::MissingField(Field::ProjectMulti),
            ])
        );
    }

    #[test]
    fn every_access_combination_lands_in_exactly_one_partition() {
        let ints = [None, Some(5), Some(7)];
        let flags = [None, Some(true), Some(false)];
        for owner in ints {
            for org in ints {
                for multi in flags {
                    let r = record(owner, org, multi);
                    let v = is_valid(&r).is_true();
                    let i = is_invalid(&r).is_true();
                    assert!(v ^ i, "owner={owner:?} org={org:?} multi={multi:?}");
                    assert_ne!(
                        classify(&r),
                        Verdict::Invalid(vec![RejectReason::Indeterminate])
                    );
                }
            }
        }
    }

    #[test]
    fn reasons_display_as_labels() {
        assert_eq!(RejectReason::MissingField(Field::UserId).to_string(), "missing_user_id");
        assert_eq!(RejectReason::AccessDenied.to_string(), "access_denied");
    }
}
