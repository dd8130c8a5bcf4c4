//! Broker and claim identity of a candidate pod.

use core::error::Error;

use error_stack::Report;
use error_stack::ResultExt;

use crate::k8s::Candidate;

/// Default label carrying the broker id.
pub const BROKER_ID_LABEL: &str = "kafka_broker_id";

/// Reasons a candidate cannot be identified as a broker with a volume.
#[derive(Debug, derive_more::Display)]
pub enum IdentityError {
    #[display("no {label} label")]
    MissingLabel { label: String },
    #[display("label {label} has non-integer value {value:?}")]
    InvalidFormat { label: String, value: String },
    #[display("cannot find a PersistentVolumeClaim volume")]
    NoClaimVolume,
}

impl Error for IdentityError {}

/// Parse the broker id from the candidate's `label` label.
///
/// # Errors
///
/// - [`IdentityError::MissingLabel`] if the label is absent
/// - [`IdentityError::InvalidFormat`] if the value is not a non-negative integer
pub fn extract_broker_id(
    candidate: &Candidate,
    label: &str,
) -> Result<u64, Report<IdentityError>> {
    let value = candidate.labels.get(label).ok_or_else(|| {
        Report::new(IdentityError::MissingLabel {
            label: label.to_string(),
        })
    })?;

    value
        .parse::<u64>()
        .change_context_lazy(|| IdentityError::InvalidFormat {
            label: label.to_string(),
            value: value.clone(),
        })
}

/// Claim name of the first claim-backed volume the candidate declares.
///
/// # Errors
///
/// - [`IdentityError::NoClaimVolume`] if no volume is backed by a claim
pub fn extract_claim_name(candidate: &Candidate) -> Result<&str, Report<IdentityError>> {
    candidate
        .claims
        .first()
        .map(|binding| binding.claim_name.as_str())
        .ok_or_else(|| Report::new(IdentityError::NoClaimVolume))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::k8s::ClaimBinding;

    fn labelled(value: Option<&str>) -> Candidate {
        let labels = value
            .map(|v| BTreeMap::from([(BROKER_ID_LABEL.to_string(), v.to_string())]))
            .unwrap_or_default();
        Candidate {
            pod_name: "broker".to_string(),
            namespace: "test-ns".to_string(),
            labels,
            ..Default::default()
        }
    }

    fn binding(volume_name: &str, claim_name: &str) -> ClaimBinding {
        ClaimBinding {
            volume_name: volume_name.to_string(),
            claim_name: claim_name.to_string(),
        }
    }

    #[test]
    fn broker_id_parses() {
        assert_eq!(
            extract_broker_id(&labelled(Some("101")), BROKER_ID_LABEL).unwrap(),
            101
        );
        assert_eq!(
            extract_broker_id(&labelled(Some("0")), BROKER_ID_LABEL).unwrap(),
            0
        );
    }

    #[test]
    fn broker_id_missing_label() {
        let err = extract_broker_id(&labelled(None), BROKER_ID_LABEL).unwrap_err();
        assert!(matches!(
            err.current_context(),
            IdentityError::MissingLabel { label } if label == BROKER_ID_LABEL
        ));
    }

    #[test]
    fn broker_id_beyond_32_bits() {
        assert_eq!(
            extract_broker_id(&labelled(Some("4294967296")), BROKER_ID_LABEL).unwrap(),
            4_294_967_296
        );
    }

    #[test]
    fn broker_id_invalid_format() {
        for value in ["not-int", "", "-3", "1.5", " 7"] {
            let err = extract_broker_id(&labelled(Some(value)), BROKER_ID_LABEL).unwrap_err();
            assert!(
                matches!(
                    err.current_context(),
                    IdentityError::InvalidFormat { value: v, .. } if v == value
                ),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn broker_id_custom_label() {
        let mut candidate = labelled(Some("101"));
        candidate.labels.insert("broker".to_string(), "7".to_string());

        assert_eq!(extract_broker_id(&candidate, "broker").unwrap(), 7);
    }

    #[test]
    fn claim_name_first_declared_wins() {
        let candidate = Candidate {
            claims: vec![binding("data", "data-claim"), binding("logs", "logs-claim")],
            ..Default::default()
        };

        assert_eq!(extract_claim_name(&candidate).unwrap(), "data-claim");
    }

    #[test]
    fn claim_name_requires_claim_volume() {
        let err = extract_claim_name(&Candidate::default()).unwrap_err();
        assert!(matches!(err.current_context(), IdentityError::NoClaimVolume));
    }
}
