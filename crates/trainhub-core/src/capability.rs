//! Role-derived capability sets.
//!
//! A session computes its `CapabilitySet` once at login and every operation
//! is gated against it, instead of comparing role strings at each call site.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::Role;

/// An action a session may be allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewStructure,
    ManageStructure,
    UploadContent,
    ManageQuestions,
    ManageAssessments,
    TakeAssessments,
    TrackProgress,
    ViewCertificates,
    VerifyCertificates,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::ViewStructure,
        Capability::ManageStructure,
        Capability::UploadContent,
        Capability::ManageQuestions,
        Capability::ManageAssessments,
        Capability::TakeAssessments,
        Capability::TrackProgress,
        Capability::ViewCertificates,
        Capability::VerifyCertificates,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::ViewStructure => "view programs",
            Capability::ManageStructure => "manage programs",
            Capability::UploadContent => "upload content",
            Capability::ManageQuestions => "manage questions",
            Capability::ManageAssessments => "manage assessments",
            Capability::TakeAssessments => "take assessments",
            Capability::TrackProgress => "track progress",
            Capability::ViewCertificates => "view certificates",
            Capability::VerifyCertificates => "verify certificates",
        };
        f.write_str(s)
    }
}

/// The set of allowed actions for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Anonymous sessions may only verify certificates.
    pub fn anonymous() -> Self {
        Self([Capability::VerifyCertificates].into_iter().collect())
    }

    pub fn for_role(role: Role) -> Self {
        use Capability::*;
        let caps: &[Capability] = match role {
            Role::Admin => &Capability::ALL,
            Role::Instructor => &[
                ViewStructure,
                ManageStructure,
                UploadContent,
                ManageQuestions,
                ManageAssessments,
                ViewCertificates,
                VerifyCertificates,
            ],
            Role::Learner => &[
                ViewStructure,
                TakeAssessments,
                TrackProgress,
                ViewCertificates,
                VerifyCertificates,
            ],
        };
        Self(caps.iter().copied().collect())
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Gate an operation.
    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied(format!("not allowed to {capability}")))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_everything() {
        let caps = CapabilitySet::for_role(Role::Admin);
        assert!(Capability::ALL.iter().all(|c| caps.allows(*c)));
    }

    #[test]
    fn learner_cannot_author() {
        let caps = CapabilitySet::for_role(Role::Learner);
        assert!(caps.allows(Capability::TakeAssessments));
        assert!(caps.allows(Capability::TrackProgress));
        assert!(!caps.allows(Capability::ManageQuestions));
        let err = caps.require(Capability::ManageStructure).unwrap_err();
        assert!(err.to_string().contains("manage programs"));
    }

    #[test]
    fn instructor_authors_but_does_not_take() {
        let caps = CapabilitySet::for_role(Role::Instructor);
        assert!(caps.allows(Capability::ManageAssessments));
        assert!(caps.allows(Capability::UploadContent));
        assert!(!caps.allows(Capability::TakeAssessments));
    }

    #[test]
    fn anonymous_only_verifies() {
        let caps = CapabilitySet::anonymous();
        assert_eq!(caps.iter().collect::<Vec<_>>(), vec![Capability::VerifyCertificates]);
    }
}
