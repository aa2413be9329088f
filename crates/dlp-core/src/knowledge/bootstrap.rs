//! Bundled Malaysian DLP content: topic entries for retrieval plus the static
//! guideline and legal-reference lists served to the UI.

use super::store::{KnowledgeBase, KnowledgeError};
use serde::Serialize;

/// Topic entries in declaration order (this order drives context assembly).
pub const DLP_RULES: &[(&str, &str)] = &[
    (
        "definition",
        "Defect Liability Period (DLP) in Malaysia is **24 months** from the date of Vacant Possession + keys handover. Developer must repair all defects FREE of charge (Housing Development Act 1966, Schedule H/I).",
    ),
    (
        "duration",
        "24 months from the date stated in Schedule G/H of the Sale & Purchase Agreement.",
    ),
    (
        "covered",
        "Cracks, leaks, peeling paint, faulty wiring/plumbing, doors, windows, roof, flooring etc. due to poor workmanship.",
    ),
    (
        "not covered",
        "Normal wear and tear, damage by owner, acts of God.",
    ),
    (
        "claim process",
        "1. Report in writing + photos to developer\n2. Developer must rectify within 30 days\n3. If not fixed → file at Tribunal Penuntut Pembeli Rumah (max RM50,000, fee RM10 only).",
    ),
    (
        "tribunal",
        "Can file even after DLP ends, as long as within 12 months after expiry.",
    ),
    (
        "latent defects",
        "Hidden defects → can sue in court within 3 years from date of discovery.",
    ),
    (
        "references",
        "• Housing Development Act 1966\n• Strata Titles Act 1985\n• Strata Management Act 2013",
    ),
];

/// A titled block of static content (guideline or statute summary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceRecord {
    pub title: &'static str,
    pub content: &'static str,
}

pub const DLP_GUIDELINES: &[ReferenceRecord] = &[
    ReferenceRecord {
        title: "DLP Duration",
        content: "The Defect Liability Period lasts 24 months from the date of vacant possession. This is a statutory right for all homebuyers in Malaysia.",
    },
    ReferenceRecord {
        title: "What is Covered",
        content: "Structural defects, water leaks, electrical faults, cracks in walls, poor finishing work, and other visible defects are covered during the DLP period.",
    },
    ReferenceRecord {
        title: "Reporting Process",
        content: "Report all defects to the developer in writing with photographs and detailed descriptions. Keep copies of all communications.",
    },
    ReferenceRecord {
        title: "Developer Obligations",
        content: "The developer must acknowledge defect reports within 14 days and complete repairs within 30 days or a reasonable timeframe.",
    },
    ReferenceRecord {
        title: "What is Not Covered",
        content: "Normal wear and tear, damage due to user negligence, modifications made by the homeowner, and defects not reported during DLP.",
    },
    ReferenceRecord {
        title: "Post-DLP Claims",
        content: "For latent (hidden) defects discovered after DLP, you may claim through Housing Tribunal or court within 3 years of discovery.",
    },
    ReferenceRecord {
        title: "Housing Tribunal",
        content: "File a complaint with the Housing Tribunal if the developer fails to fix defects. Maximum claim: RM50,000. Filing fee: RM10.",
    },
    ReferenceRecord {
        title: "Documentation",
        content: "Keep all proof of defects, communications with developer, inspection reports, and repair costs for evidence if escalation is needed.",
    },
    ReferenceRecord {
        title: "Legal Rights",
        content: "You have the right to free repairs, compensation for delays, and legal recourse if the developer breaches DLP obligations.",
    },
    ReferenceRecord {
        title: "Special Cases",
        content: "For strata properties (condos), refer to the Strata Titles Act. Common area defects are managed by the Joint Management Body (JMB) or Management Corporation (MC).",
    },
];

pub const LEGAL_REFERENCES: &[ReferenceRecord] = &[
    ReferenceRecord {
        title: "Housing Development (Control and Licensing) Act 1966 (HDA)",
        content: "The primary legislation governing defect liability periods in Malaysia. Requires developers to maintain properties for 24 months from vacant possession.",
    },
    ReferenceRecord {
        title: "Strata Titles Act 1985",
        content: "Governs parcel ownership in strata properties. Includes provisions for DLP in stratified buildings and responsibilities of the Joint Management Body.",
    },
    ReferenceRecord {
        title: "Strata Management Act 2013",
        content: "Replaced the Management Corporation Act. Governs management and maintenance of strata properties, including defect rectification.",
    },
    ReferenceRecord {
        title: "Limitation Act 1953",
        content: "Specifies the time limits for bringing legal action. Latent defects can be claimed within 3 years of discovery.",
    },
];

pub fn guidelines() -> &'static [ReferenceRecord] {
    DLP_GUIDELINES
}

pub fn legal_references() -> &'static [ReferenceRecord] {
    LEGAL_REFERENCES
}

impl KnowledgeBase {
    /// The bundled DLP topic set.
    pub fn dlp_default() -> Result<Self, KnowledgeError> {
        Self::new(DLP_RULES.iter().copied())
    }
}
