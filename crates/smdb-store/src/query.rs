use smdb_core::StoreError;

/// Key-matching rule parsed from the `OP=value` mini-language:
/// `SW=` starts-with, `EW=` ends-with, `EQ=` equals, `CT=` contains.
/// Operators are case-sensitive; the operand is trimmed before comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRule {
    StartsWith(String),
    EndsWith(String),
    Equals(String),
    Contains(String),
}

impl QueryRule {
    /// Parse a rule string. A malformed rule is misuse, not a transient
    /// condition, and fails loudly.
    pub fn parse(rule: &str) -> Result<Self, StoreError> {
        let Some((op, operand)) = rule.split_once('=') else {
            return Err(StoreError::InvalidRule {
                reason: "missing `=` delimiter".to_string(),
            });
        };

        let op = op.trim();
        let operand = operand.trim();
        if op.is_empty() || operand.is_empty() {
            return Err(StoreError::InvalidRule {
                reason: "empty operator or operand".to_string(),
            });
        }

        match op {
            "SW" => Ok(Self::StartsWith(operand.to_string())),
            "EW" => Ok(Self::EndsWith(operand.to_string())),
            "EQ" => Ok(Self::Equals(operand.to_string())),
            "CT" => Ok(Self::Contains(operand.to_string())),
            other => Err(StoreError::InvalidRule {
                reason: format!("unknown operator {other:?}"),
            }),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::StartsWith(prefix) => key.starts_with(prefix),
            Self::EndsWith(suffix) => key.ends_with(suffix),
            Self::Equals(exact) => key == exact,
            Self::Contains(substring) => key.contains(substring),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_operators() {
        assert_eq!(
            QueryRule::parse("SW=pre").expect("parse"),
            QueryRule::StartsWith("pre".to_string())
        );
        assert_eq!(
            QueryRule::parse("EW=suf").expect("parse"),
            QueryRule::EndsWith("suf".to_string())
        );
        assert_eq!(
            QueryRule::parse("EQ=exact").expect("parse"),
            QueryRule::Equals("exact".to_string())
        );
        assert_eq!(
            QueryRule::parse("CT=part").expect("parse"),
            QueryRule::Contains("part".to_string())
        );
    }

    #[test]
    fn trims_the_operand() {
        assert_eq!(
            QueryRule::parse("EQ=  foo  ").expect("parse"),
            QueryRule::Equals("foo".to_string())
        );
    }

    #[test]
    fn operand_may_contain_further_equals_signs() {
        assert_eq!(
            QueryRule::parse("CT=a=b").expect("parse"),
            QueryRule::Contains("a=b".to_string())
        );
    }

    #[test]
    fn rejects_malformed_rules() {
        for rule in ["bad-rule", "EQ=", "=foo", "eq=foo", "XX=foo", ""] {
            let err = QueryRule::parse(rule).expect_err(rule);
            assert!(matches!(err, StoreError::InvalidRule { .. }), "{rule:?}");
        }
    }

    #[test]
    fn matching_follows_the_operator() {
        assert!(QueryRule::parse("SW=foo").expect("parse").matches("foobar"));
        assert!(QueryRule::parse("EW=foo").expect("parse").matches("barfoo"));
        assert!(QueryRule::parse("EQ=foo").expect("parse").matches("foo"));
        assert!(!QueryRule::parse("EQ=foo").expect("parse").matches("foobar"));
        assert!(QueryRule::parse("CT=foo").expect("parse").matches("barfoobaz"));
    }
}
