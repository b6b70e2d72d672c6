use rocket::serde::json::serde_json;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::digest::{sha256, ProposalContentDigest};

pub const NAME_MIN_CHARS: usize = 6;
pub const NAME_MAX_CHARS: usize = 64;
pub const MIN_CHOICES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalValidationError {
    #[error("proposal name must be {} to {} characters, got {0}", NAME_MIN_CHARS, NAME_MAX_CHARS)]
    NameLength(usize),
    #[error("a proposal needs at least {} choices, got {0}", MIN_CHOICES)]
    TooFewChoices(usize),
    #[error("choice {0} is blank")]
    BlankChoice(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("proposal content digest {actual} does not match the on-chain digest {expected}")]
    SignatureMismatch {
        expected: ProposalContentDigest,
        actual: ProposalContentDigest,
    },
}

/// Outcome of comparing a proposal's current fields against its anchored digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityStatus {
    Intact,
    Tampered,
}

/// The hashed fields of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContent {
    pub name: String,
    /// Absent descriptions hash as the empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub choices: Vec<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProposalContent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<Option<String>>,
        choices: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into().unwrap_or_default(),
            choices,
        }
    }

    /// Check the creation rules: name length in characters, and at least two
    /// non-blank choices.
    pub fn validate(&self) -> Result<(), ProposalValidationError> {
        let name_chars = self.name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_chars) {
            return Err(ProposalValidationError::NameLength(name_chars));
        }
        if self.choices.len() < MIN_CHOICES {
            return Err(ProposalValidationError::TooFewChoices(self.choices.len()));
        }
        if let Some(blank) = self.choices.iter().position(|c| c.trim().is_empty()) {
            return Err(ProposalValidationError::BlankChoice(blank));
        }
        Ok(())
    }

    /// `SHA256(name || description || json(choices))`, with no separators.
    pub fn digest(&self) -> ProposalContentDigest {
        // Serialising a list of strings cannot fail.
        let choices = serde_json::to_string(&self.choices).unwrap_or_default();
        ProposalContentDigest::from_bytes(sha256(&[
            self.name.as_bytes(),
            self.description.as_bytes(),
            choices.as_bytes(),
        ]))
    }

    /// Recompute the digest from the current fields and compare it with the
    /// digest anchored on chain.
    pub fn check_integrity(&self, on_chain: &ProposalContentDigest) -> Result<(), IntegrityError> {
        let actual = self.digest();
        if actual == *on_chain {
            Ok(())
        } else {
            Err(IntegrityError::SignatureMismatch {
                expected: *on_chain,
                actual,
            })
        }
    }

    pub fn integrity_status(&self, on_chain: &ProposalContentDigest) -> IntegrityStatus {
        match self.check_integrity(on_chain) {
            Ok(()) => IntegrityStatus::Intact,
            Err(e) => {
                warn!("{e}");
                IntegrityStatus::Tampered
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_DIGEST: &str =
        "ffdd8ab12d038a9f9ad209b6ee86c9479cc0303f2e21dd86cd071fa8fabc3d9d";

    #[test]
    fn known_digest() {
        let content = ProposalContent::example();
        assert_eq!(content.digest().to_hex(), EXAMPLE_DIGEST);
        // Stable across calls.
        assert_eq!(content.digest(), content.digest());
    }

    #[test]
    fn every_field_changes_the_digest() {
        let base = ProposalContent::example();

        let mut renamed = base.clone();
        renamed.name.push('!');
        let mut described = base.clone();
        described.description = "Amended".to_string();
        let mut reordered = base.clone();
        reordered.choices.reverse();

        for changed in [renamed, described, reordered] {
            assert_ne!(changed.digest(), base.digest());
        }
    }

    #[test]
    fn editing_description_is_tampering() {
        let anchored = ProposalContent::example().digest();

        let mut edited = ProposalContent::example();
        edited.description = "Amended".to_string();
        assert_eq!(
            edited.digest().to_hex(),
            "537d79730917fb2cf8003c85cd7dbe7bcd401dc08259bbf238ee961b6e9d7718"
        );
        assert_eq!(
            edited.check_integrity(&anchored),
            Err(IntegrityError::SignatureMismatch {
                expected: anchored,
                actual: edited.digest(),
            })
        );
        assert_eq!(edited.integrity_status(&anchored), IntegrityStatus::Tampered);
        assert_eq!(
            ProposalContent::example().integrity_status(&anchored),
            IntegrityStatus::Intact
        );
    }

    #[test]
    fn validation() {
        assert_eq!(ProposalContent::example().validate(), Ok(()));

        let short = ProposalContent::new("Short", None, vec!["a".into(), "b".into()]);
        assert_eq!(short.validate(), Err(ProposalValidationError::NameLength(5)));

        let long = ProposalContent::new("x".repeat(65), None, vec!["a".into(), "b".into()]);
        assert_eq!(long.validate(), Err(ProposalValidationError::NameLength(65)));

        let one = ProposalContent::new("Single choice", None, vec!["a".into()]);
        assert_eq!(one.validate(), Err(ProposalValidationError::TooFewChoices(1)));

        let blank = ProposalContent::new("Blank choice", None, vec!["a".into(), "  ".into()]);
        assert_eq!(blank.validate(), Err(ProposalValidationError::BlankChoice(1)));
    }

    #[test]
    fn missing_or_null_description_is_empty() {
        let missing: ProposalContent =
            serde_json::from_str(r#"{"name":"Adopt Policy X","choices":["Yes","No"]}"#).unwrap();
        let null: ProposalContent = serde_json::from_str(
            r#"{"name":"Adopt Policy X","description":null,"choices":["Yes","No"]}"#,
        )
        .unwrap();
        assert_eq!(missing, ProposalContent::example());
        assert_eq!(null, ProposalContent::example());
        assert_eq!(
            serde_json::to_string(&IntegrityStatus::Tampered).unwrap(),
            "\"TAMPERED\""
        );
    }
}
