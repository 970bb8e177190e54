//! Takeover classification
//!
//! Combines the three signals gathered for a subdomain (its CNAME, the
//! fingerprint probe of a cataloged service, and the registration status of
//! the CNAME's apex) into a single [`Verdict`]. Hijackability is derived from
//! the verdict, so a result can never carry a status without a matching
//! hijackable flag.

use std::fmt;
use std::future::Future;

use tracing::debug;

use crate::domain_utils;
use crate::fingerprint::{FingerprintCatalog, FingerprintEntry};

/// Rendered in the `cname` column when a subdomain has no CNAME record
pub const CNAME_NOT_FOUND: &str = "cname not found";

/// Outcome of a CNAME query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CnameLookup {
    Found(String),
    Absent,
}

impl CnameLookup {
    pub fn target(&self) -> Option<&str> {
        match self {
            CnameLookup::Found(target) => Some(target),
            CnameLookup::Absent => None,
        }
    }
}

impl fmt::Display for CnameLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CnameLookup::Found(target) => write!(f, "{}", target),
            CnameLookup::Absent => write!(f, "{}", CNAME_NOT_FOUND),
        }
    }
}

/// Binary registration verdict as seen by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Registered,
    Unregistered,
}

/// Final per-subdomain verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No CNAME record, nothing to take over
    Skipped,
    /// CNAME apex is registered (or owned by the subdomain itself)
    Registered,
    /// CNAME apex is not registered to anyone
    Unregistered,
    /// CNAME points at a cataloged service whose unclaimed-endpoint fingerprint matched
    ServiceMatch { service: String },
}

impl Verdict {
    pub fn is_hijackable(&self) -> bool {
        matches!(self, Verdict::Unregistered | Verdict::ServiceMatch { .. })
    }

    /// Value written to the `cname_registered` column
    pub fn registration_label(&self) -> &'static str {
        match self {
            Verdict::Skipped => "Skipped",
            Verdict::Registered => "Yes",
            Verdict::Unregistered => "No",
            Verdict::ServiceMatch { .. } => "Service",
        }
    }

    /// Value written to the `hijackable` column
    pub fn hijackable_label(&self) -> &'static str {
        if self.is_hijackable() {
            "Yes"
        } else {
            "No"
        }
    }
}

impl From<RegistrationStatus> for Verdict {
    fn from(status: RegistrationStatus) -> Self {
        match status {
            RegistrationStatus::Registered => Verdict::Registered,
            RegistrationStatus::Unregistered => Verdict::Unregistered,
        }
    }
}

/// Classification of one subdomain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub subdomain: String,
    pub cname: CnameLookup,
    pub verdict: Verdict,
    /// Whether the registration oracle was consulted to reach the verdict
    pub oracle_queried: bool,
}

impl ClassificationResult {
    pub fn is_hijackable(&self) -> bool {
        self.verdict.is_hijackable()
    }
}

/// Network-backed signals consulted by [`classify`]
pub trait TakeoverSignals {
    /// Probe `cname` and report whether the response carries one of `entry`'s fingerprints
    fn fingerprint_matches(
        &self,
        cname: &str,
        entry: &FingerprintEntry,
    ) -> impl Future<Output = bool> + Send;

    /// Registration status of an apex domain
    fn registration_status(&self, apex: &str) -> impl Future<Output = RegistrationStatus> + Send;
}

/// Classify a subdomain from its CNAME lookup.
///
/// Steps, first match wins:
/// 1. no CNAME -> `Skipped`
/// 2. CNAME apex equals the subdomain's apex -> `Registered` (oracle not queried)
/// 3. CNAME apex is a cataloged service and its fingerprint matches -> `ServiceMatch`
/// 4. otherwise the oracle decides `Registered` / `Unregistered`
///
/// A service whose fingerprint does not match falls through to step 4.
pub async fn classify<S: TakeoverSignals>(
    subdomain: &str,
    lookup: CnameLookup,
    catalog: &FingerprintCatalog,
    signals: &S,
) -> ClassificationResult {
    let Some(target) = lookup.target().map(str::to_string) else {
        return ClassificationResult {
            subdomain: subdomain.to_string(),
            cname: lookup,
            verdict: Verdict::Skipped,
            oracle_queried: false,
        };
    };

    let cname_apex = domain_utils::extract_apex(&target);

    if domain_utils::same_apex(&target, subdomain) {
        debug!("{} -> {} stays within {}, not querying registry", subdomain, target, cname_apex);
        return ClassificationResult {
            subdomain: subdomain.to_string(),
            cname: lookup,
            verdict: Verdict::Registered,
            oracle_queried: false,
        };
    }

    if let Some(entry) = catalog.match_service(&cname_apex) {
        if signals.fingerprint_matches(&target, entry).await {
            debug!("{} -> {} matched {} fingerprint", subdomain, target, entry.service);
            return ClassificationResult {
                subdomain: subdomain.to_string(),
                cname: lookup,
                verdict: Verdict::ServiceMatch {
                    service: entry.service.clone(),
                },
                oracle_queried: false,
            };
        }
        debug!("{} -> {} is {} but no fingerprint matched, asking registry", subdomain, target, entry.service);
    }

    let status = signals.registration_status(&cname_apex).await;

    ClassificationResult {
        subdomain: subdomain.to_string(),
        cname: lookup,
        verdict: status.into(),
        oracle_queried: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubSignals {
        fingerprint: bool,
        status: RegistrationStatus,
        probes: AtomicUsize,
        queried: Mutex<Vec<String>>,
    }

    impl StubSignals {
        fn new(fingerprint: bool, status: RegistrationStatus) -> Self {
            Self {
                fingerprint,
                status,
                probes: AtomicUsize::new(0),
                queried: Mutex::new(Vec::new()),
            }
        }

        fn oracle_calls(&self) -> Vec<String> {
            self.queried.lock().unwrap().clone()
        }
    }

    impl TakeoverSignals for StubSignals {
        async fn fingerprint_matches(&self, _cname: &str, _entry: &FingerprintEntry) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.fingerprint
        }

        async fn registration_status(&self, apex: &str) -> RegistrationStatus {
            self.queried.lock().unwrap().push(apex.to_string());
            self.status
        }
    }

    fn catalog() -> FingerprintCatalog {
        FingerprintCatalog::new(vec![FingerprintEntry {
            service: "shopify".to_string(),
            fingerprint: vec!["Sorry, this shop is currently unavailable.".to_string()],
        }])
    }

    fn found(target: &str) -> CnameLookup {
        CnameLookup::Found(target.to_string())
    }

    #[tokio::test]
    async fn test_absent_cname_is_skipped() {
        let signals = StubSignals::new(true, RegistrationStatus::Unregistered);
        let result = classify("b.example.com", CnameLookup::Absent, &catalog(), &signals).await;

        assert_eq!(result.verdict, Verdict::Skipped);
        assert!(!result.is_hijackable());
        assert!(!result.oracle_queried);
        assert!(signals.oracle_calls().is_empty());
        assert_eq!(signals.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_same_apex_never_queries_oracle() {
        let signals = StubSignals::new(false, RegistrationStatus::Unregistered);
        let result = classify("x.example.com", found("y.example.com"), &catalog(), &signals).await;

        assert_eq!(result.verdict, Verdict::Registered);
        assert_eq!(result.verdict.registration_label(), "Yes");
        assert_eq!(result.verdict.hijackable_label(), "No");
        assert!(signals.oracle_calls().is_empty());
    }

    #[tokio::test]
    async fn test_service_fingerprint_match() {
        let signals = StubSignals::new(true, RegistrationStatus::Registered);
        let result = classify("a.example.com", found("shop.shopify.com"), &catalog(), &signals).await;

        assert_eq!(
            result.verdict,
            Verdict::ServiceMatch {
                service: "shopify".to_string()
            }
        );
        assert!(result.is_hijackable());
        assert_eq!(result.verdict.registration_label(), "Service");
        assert!(signals.oracle_calls().is_empty());
    }

    #[tokio::test]
    async fn test_service_without_fingerprint_falls_through_to_oracle() {
        let signals = StubSignals::new(false, RegistrationStatus::Registered);
        let result = classify("a.example.com", found("shop.shopify.com"), &catalog(), &signals).await;

        assert_eq!(signals.probes.load(Ordering::SeqCst), 1);
        assert_eq!(signals.oracle_calls(), vec!["shopify.com".to_string()]);
        assert_eq!(result.verdict, Verdict::Registered);
        assert!(result.oracle_queried);
        assert!(!result.is_hijackable());
    }

    #[tokio::test]
    async fn test_unknown_service_unregistered_is_hijackable() {
        let signals = StubSignals::new(false, RegistrationStatus::Unregistered);
        let result = classify("c.example.com", found("old.abandoned-domain.net"), &catalog(), &signals).await;

        assert_eq!(signals.probes.load(Ordering::SeqCst), 0);
        assert_eq!(signals.oracle_calls(), vec!["abandoned-domain.net".to_string()]);
        assert_eq!(result.verdict, Verdict::Unregistered);
        assert_eq!(result.verdict.registration_label(), "No");
        assert_eq!(result.verdict.hijackable_label(), "Yes");
    }

    #[tokio::test]
    async fn test_unknown_service_registered_is_not_hijackable() {
        let signals = StubSignals::new(false, RegistrationStatus::Registered);
        let result = classify("c.example.com", found("cdn.provider.net"), &catalog(), &signals).await;

        assert_eq!(result.verdict, Verdict::Registered);
        assert!(!result.is_hijackable());
    }

    #[test]
    fn test_hijackable_iff_unregistered_or_service() {
        let verdicts = [
            Verdict::Skipped,
            Verdict::Registered,
            Verdict::Unregistered,
            Verdict::ServiceMatch {
                service: "s".to_string(),
            },
        ];
        let hijackable: Vec<bool> = verdicts.iter().map(Verdict::is_hijackable).collect();
        assert_eq!(hijackable, vec![false, false, true, true]);
    }

    #[test]
    fn test_cname_display() {
        assert_eq!(CnameLookup::Absent.to_string(), "cname not found");
        assert_eq!(found("shop.shopify.com").to_string(), "shop.shopify.com");
    }
}
