use std::collections::HashMap;

use super::stroke::Signature;

/// In-progress signature drawings, one per proposal.
///
/// Owned by whoever drives the drawing surface and handed to the submission
/// code explicitly; drafts for different proposals never interact.
#[derive(Debug, Default)]
pub struct DraftStore {
    drafts: HashMap<u32, Signature>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The draft for a proposal, created empty on first use.
    pub fn draft_mut(&mut self, proposal_id: u32) -> &mut Signature {
        self.drafts.entry(proposal_id).or_default()
    }

    pub fn draft(&self, proposal_id: u32) -> Option<&Signature> {
        self.drafts.get(&proposal_id)
    }

    /// Whether anything has been drawn for the proposal.
    pub fn has_signature(&self, proposal_id: u32) -> bool {
        self.draft(proposal_id)
            .map(|draft| !draft.is_empty())
            .unwrap_or(false)
    }

    /// Discard a draft, e.g. when the vote dialog closes.
    pub fn discard(&mut self, proposal_id: u32) {
        self.drafts.remove(&proposal_id);
    }
}
