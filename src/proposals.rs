//! Registry of gated proposals.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub id: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
}

const PROPOSALS: &[Proposal] = &[Proposal {
    id: "adb",
    title: "American Board of Dermatology",
    subtitle: "Patient Simulation Training System",
}];

#[must_use]
pub fn get(id: &str) -> Option<&'static Proposal> {
    PROPOSALS.iter().find(|proposal| proposal.id == id)
}
