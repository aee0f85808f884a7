use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{all_consuming, map, map_res, opt};
use nom::multi::separated_list1;
use nom::sequence::{preceded, tuple};
use nom::IResult;
use std::cmp::{Ord, Ordering, PartialOrd};
use std::fmt;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use self::VersionIdentifier::{Alphanumeric, Numeric};

/// Version strings longer than this are rejected before parsing.
pub const MAX_LENGTH: usize = 256;

#[derive(Eq, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Vec<VersionIdentifier>,
    pub build: Vec<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Version {
        Version {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
            build: Vec::new(),
        }
    }

    /// Parse an exact SemVer 2.0 version: no prefix, no surrounding
    /// whitespace, no leading zeros in numeric parts.
    pub fn parse_strict(s: &str) -> Option<Version> {
        if s.len() > MAX_LENGTH {
            return None;
        }
        match all_consuming(strict_version)(s) {
            Ok((_, v)) => Some(v),
            Err(_) => None,
        }
    }

    /// Parse the lenient grammar old registry documents were published
    /// with: `v`/`=` prefixes, surrounding whitespace, leading zeros, and
    /// prerelease tags glued to the patch number (`1.2.3beta`).
    pub fn parse_loose(s: &str) -> Option<Version> {
        if s.len() > MAX_LENGTH {
            return None;
        }
        match all_consuming(loose_version)(s.trim()) {
            Ok((_, v)) => Some(v),
            Err(_) => None,
        }
    }

    pub fn has_pre(&self) -> bool {
        !self.prerelease.is_empty()
    }

    pub fn as_string(&self) -> String {
        let mut s = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if !self.prerelease.is_empty() {
            s.push('-');
            s.push_str(
                &self
                    .prerelease
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join("."),
            );
        }
        if !self.build.is_empty() {
            s.push('+');
            s.push_str(&self.build.join("."));
        }
        s
    }
}

/// The validity predicate the guard uses for version keys and dist-tags.
pub fn is_valid_version(s: &str, strict: bool) -> bool {
    if strict {
        Version::parse_strict(s).is_some()
    } else {
        Version::parse_loose(s).is_some()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Version) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

// Build metadata takes no part in precedence, so it stays out of the hash.
impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.prerelease.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Version) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Version) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.has_pre(), other.has_pre()) {
                (false, true) => Ordering::Greater,
                (true, false) => Ordering::Less,
                _ => self.prerelease.cmp(&other.prerelease),
            })
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum VersionIdentifier {
    Numeric(u64),
    Alphanumeric(String),
}

impl Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Numeric(ref n) => write!(f, "{}", n),
            Alphanumeric(ref s) => write!(f, "{}", s),
        }
    }
}

impl PartialOrd for VersionIdentifier {
    fn partial_cmp(&self, other: &VersionIdentifier) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionIdentifier {
    fn cmp(&self, other: &VersionIdentifier) -> Ordering {
        match (self, other) {
            (&Numeric(_), &Alphanumeric(_)) => Ordering::Less,
            (&Alphanumeric(_), &Numeric(_)) => Ordering::Greater,
            (&Numeric(ref a), &Numeric(ref b)) => a.cmp(b),
            (&Alphanumeric(ref a), &Alphanumeric(ref b)) => a.cmp(b),
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    // 0-9, A-Z, a-z and '-'
    c.is_ascii_alphanumeric() || c == '-'
}

fn to_u64(s: &str, strict: bool) -> Result<u64, ()> {
    if strict && s.len() > 1 && s.starts_with('0') {
        return Err(());
    }
    u64::from_str(s).map_err(|_| ())
}

fn convert_version_identifier(s: &str, strict: bool) -> Result<VersionIdentifier, ()> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        to_u64(s, strict).map(Numeric)
    } else {
        Ok(Alphanumeric(s.to_string()))
    }
}

fn strict_nat(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| to_u64(s, true))(input)
}

fn loose_nat(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| to_u64(s, false))(input)
}

fn strict_triple(input: &str) -> IResult<&str, (u64, u64, u64)> {
    let (input, (major, _, minor, _, patch)) =
        tuple((strict_nat, char('.'), strict_nat, char('.'), strict_nat))(input)?;
    Ok((input, (major, minor, patch)))
}

fn loose_triple(input: &str) -> IResult<&str, (u64, u64, u64)> {
    let (input, (major, _, minor, _, patch)) =
        tuple((loose_nat, char('.'), loose_nat, char('.'), loose_nat))(input)?;
    Ok((input, (major, minor, patch)))
}

fn strict_id(input: &str) -> IResult<&str, VersionIdentifier> {
    map_res(take_while1(is_identifier_char), |s: &str| {
        convert_version_identifier(s, true)
    })(input)
}

fn loose_id(input: &str) -> IResult<&str, VersionIdentifier> {
    map_res(take_while1(is_identifier_char), |s: &str| {
        convert_version_identifier(s, false)
    })(input)
}

fn build_id(input: &str) -> IResult<&str, String> {
    map(take_while1(is_identifier_char), |s: &str| s.to_string())(input)
}

fn strict_prerelease(input: &str) -> IResult<&str, Vec<VersionIdentifier>> {
    preceded(char('-'), separated_list1(char('.'), strict_id))(input)
}

// The hyphen is optional here: `1.2.3beta` was accepted for years.
fn loose_prerelease(input: &str) -> IResult<&str, Vec<VersionIdentifier>> {
    preceded(opt(char('-')), separated_list1(char('.'), loose_id))(input)
}

fn build_metadata(input: &str) -> IResult<&str, Vec<String>> {
    preceded(char('+'), separated_list1(char('.'), build_id))(input)
}

fn strict_version(input: &str) -> IResult<&str, Version> {
    let (input, (major, minor, patch)) = strict_triple(input)?;
    let (input, prerelease) = opt(strict_prerelease)(input)?;
    let (input, build) = opt(build_metadata)(input)?;
    Ok((
        input,
        Version {
            major,
            minor,
            patch,
            prerelease: prerelease.unwrap_or_default(),
            build: build.unwrap_or_default(),
        },
    ))
}

fn loose_version(input: &str) -> IResult<&str, Version> {
    let (input, _) = take_while(|c: char| c == 'v' || c == '=' || c.is_whitespace())(input)?;
    let (input, (major, minor, patch)) = loose_triple(input)?;
    let (input, prerelease) = opt(loose_prerelease)(input)?;
    let (input, build) = opt(build_metadata)(input)?;
    Ok((
        input,
        Version {
            major,
            minor,
            patch,
            prerelease: prerelease.unwrap_or_default(),
            build: build.unwrap_or_default(),
        },
    ))
}
