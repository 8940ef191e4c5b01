use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const NUMBER_LEN: usize = 10;

/// Belgian enterprise number (ondernemingsnummer) in canonical, digits-only form.
///
/// Accepts any of the usual renderings: `0403.200.393`, `0403 200 393`,
/// `BE 0403-200-393`. Anything else is rejected before it can reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyNumber(String);

impl CompanyNumber {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let body = match trimmed.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("BE") => &trimmed[2..],
            _ => trimmed,
        };

        let mut digits = String::with_capacity(NUMBER_LEN);
        for c in body.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else if !(c.is_whitespace() || matches!(c, '.' | '-' | '/')) {
                return Err(Error::Validation(format!(
                    "invalid character '{}' in company number '{}'",
                    c, input
                )));
            }
        }

        if digits.len() != NUMBER_LEN {
            return Err(Error::Validation(format!(
                "company number '{}' must contain {} digits, found {}",
                input,
                NUMBER_LEN,
                digits.len()
            )));
        }
        if !digits.starts_with('0') && !digits.starts_with('1') {
            return Err(Error::Validation(format!(
                "company number '{}' must start with 0 or 1",
                input
            )));
        }
        if !checksum_matches(&digits) {
            return Err(Error::Validation(format!(
                "company number '{}' fails the modulo 97 check",
                input
            )));
        }

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dotted rendering used on registry pages, e.g. `0403.200.393`.
    pub fn formatted(&self) -> String {
        format!("{}.{}.{}", &self.0[..4], &self.0[4..7], &self.0[7..])
    }
}

fn checksum_matches(digits: &str) -> bool {
    let (base, check) = digits.split_at(8);
    match (base.parse::<u64>(), check.parse::<u64>()) {
        (Ok(base), Ok(check)) => 97 - base % 97 == check,
        _ => false,
    }
}

impl FromStr for CompanyNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CompanyNumber {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CompanyNumber> for String {
    fn from(number: CompanyNumber) -> Self {
        number.0
    }
}

impl fmt::Display for CompanyNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
