use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Per {
    Second,
    Minute,
    Hour,
    Day,
}

impl Per {
    fn seconds(self) -> u64 {
        match self {
            Per::Second => 1,
            Per::Minute => 60,
            Per::Hour => 60 * 60,
            Per::Day => 24 * 60 * 60,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Per::Second => "second",
            Per::Minute => "minute",
            Per::Hour => "hour",
            Per::Day => "day",
        }
    }
}

impl FromStr for Per {
    type Err = RuleParseError;

    fn from_str(unit: &str) -> Result<Self, Self::Err> {
        let unit = unit.to_ascii_lowercase();
        match unit.strip_suffix('s').unwrap_or(&unit) {
            "second" => Ok(Per::Second),
            "minute" => Ok(Per::Minute),
            "hour" => Ok(Per::Hour),
            "day" => Ok(Per::Day),
            _ => Err(RuleParseError::UnknownUnit(unit.clone())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("expected `<count> per [<amount>] <unit>`, got `{0}`")]
    Malformed(String),
    #[error("unknown time unit `{0}`")]
    UnknownUnit(String),
    #[error("rate limit counts and windows must be positive")]
    Zero,
    #[error("no rate limit rules given")]
    Empty,
}

/// At most `count` requests per `amount` × `per`, e.g. `50 per 1 hour`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitRule {
    pub count: u32,
    pub amount: u32,
    pub per: Per,
}

impl LimitRule {
    pub const fn new(count: u32, amount: u32, per: Per) -> Self {
        Self { count, amount, per }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.per.seconds() * u64::from(self.amount))
    }

    /// Parses a `;`-separated list of rules such as `200 per day; 50 per hour`.
    /// A list with no rules is an error; limiting is switched off elsewhere.
    pub fn parse_list(rules: &str) -> Result<Vec<Self>, RuleParseError> {
        let rules = rules
            .split(';')
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Self>, _>>()?;

        if rules.is_empty() {
            return Err(RuleParseError::Empty);
        }
        Ok(rules)
    }
}

impl FromStr for LimitRule {
    type Err = RuleParseError;

    /// Accepts `30 per minute`, `50 per 2 hours` and `30/minute`.
    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        let malformed = || RuleParseError::Malformed(rule.to_owned());

        let (count, period) = match rule.split_once('/') {
            Some((count, period)) => (count.trim(), period.trim()),
            None => {
                let mut parts = rule.trim().splitn(3, char::is_whitespace);
                let count = parts.next().ok_or_else(malformed)?;
                if !parts.next().map_or(false, |word| word.eq_ignore_ascii_case("per")) {
                    return Err(malformed());
                }
                (count, parts.next().ok_or_else(malformed)?.trim())
            }
        };

        let count: u32 = count.parse().map_err(|_| malformed())?;
        let (amount, per) = match period.split_once(char::is_whitespace) {
            Some((amount, unit)) => (
                amount.parse::<u32>().map_err(|_| malformed())?,
                unit.trim().parse::<Per>()?,
            ),
            None => (1, period.parse::<Per>()?),
        };

        if count == 0 || amount == 0 {
            return Err(RuleParseError::Zero);
        }
        Ok(Self::new(count, amount, per))
    }
}

impl fmt::Display for LimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {} {}", self.count, self.amount, self.per.name())
    }
}
