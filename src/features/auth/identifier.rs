use regex::Regex;
use std::sync::LazyLock;

/// Shape an identifier must have to be treated as an email address.
pub const EMAIL_SHAPE: &str = r"^\S+@\S+\.\S+$";

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_SHAPE).ok());

#[must_use]
pub fn is_email_shaped(input: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(input))
}

/// A login identifier as submitted, classified once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Handle(String),
}

impl Identifier {
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        if is_email_shaped(raw) {
            Self::Email(raw.to_string())
        } else {
            Self::Handle(raw.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(value) | Self::Handle(value) => value,
        }
    }

    #[must_use]
    pub const fn is_email(&self) -> bool {
        matches!(self, Self::Email(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shaped_inputs_classify_as_email() {
        for input in ["a@b.com", "nova@deep.sea.org", "x@y.z", "first.last+tag@mail.co"] {
            assert_eq!(
                Identifier::classify(input),
                Identifier::Email(input.to_string()),
                "{input}"
            );
        }
    }

    #[test]
    fn everything_else_classifies_as_handle() {
        for input in [
            "nova",
            "nova@home",
            "@b.com",
            "a@.com",
            "a@b.",
            "a b@c.com",
            "a@b.com ",
            "",
        ] {
            assert_eq!(
                Identifier::classify(input),
                Identifier::Handle(input.to_string()),
                "{input:?}"
            );
        }
    }

    #[test]
    fn classification_keeps_raw_text() {
        let identifier = Identifier::classify("Nova");
        assert_eq!(identifier.as_str(), "Nova");
        assert!(!identifier.is_email());
        assert!(Identifier::classify("a@b.com").is_email());
    }
}
