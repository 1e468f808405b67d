//! Implicit tag resolution.
//!
//! A plain scalar with no explicit tag gets its tag from an ordered rule
//! table keyed by the scalar's first character. YAML 1.1 and 1.2 differ in
//! what they recognize (`yes`/`no` booleans, leading-zero octals and
//! sexagesimals are 1.1 only), so both rule sets are compiled and the
//! active one follows the version of the document being processed.

use regex::Regex;
use std::collections::HashMap;
use yarrow_common::YamlVersion;

pub const DEFAULT_SCALAR_TAG: &str = "tag:yaml.org,2002:str";
pub const DEFAULT_SEQUENCE_TAG: &str = "tag:yaml.org,2002:seq";
pub const DEFAULT_MAPPING_TAG: &str = "tag:yaml.org,2002:map";

/// One implicit-resolution rule: the versions it applies to, the tag it
/// yields, the pattern the whole scalar must match, and the first
/// characters that select it (`""` selects the empty scalar).
const IMPLICIT_RESOLVERS: &[(&[YamlVersion], &str, &str, &[&str])] = &[
    (
        &[(1, 2)],
        "tag:yaml.org,2002:bool",
        r"^(?:true|True|TRUE|false|False|FALSE)$",
        &["t", "T", "f", "F"],
    ),
    (
        &[(1, 1)],
        "tag:yaml.org,2002:bool",
        r"^(?:y|Y|yes|Yes|YES|n|N|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$",
        &["y", "Y", "n", "N", "t", "T", "f", "F", "o", "O"],
    ),
    (
        &[(1, 2)],
        "tag:yaml.org,2002:float",
        r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?|[-+]?(?:[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)|[-+]?\.[0-9_]+(?:[eE][-+][0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
        &["-", "+", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "."],
    ),
    (
        &[(1, 1)],
        "tag:yaml.org,2002:float",
        r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?|[-+]?(?:[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)|\.[0-9_]+(?:[eE][-+][0-9]+)?|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
        &["-", "+", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "."],
    ),
    (
        &[(1, 2)],
        "tag:yaml.org,2002:int",
        r"^(?:[-+]?0b[0-1_]+|[-+]?0o?[0-7_]+|[-+]?[0-9_]+|[-+]?0x[0-9a-fA-F_]+)$",
        &["-", "+", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
    ),
    (
        &[(1, 1)],
        "tag:yaml.org,2002:int",
        r"^(?:[-+]?0b[0-1_]+|[-+]?0?[0-7_]+|[-+]?(?:0|[1-9][0-9_]*)|[-+]?0x[0-9a-fA-F_]+|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+)$",
        &["-", "+", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
    ),
    (
        &[(1, 2), (1, 1)],
        "tag:yaml.org,2002:merge",
        r"^(?:<<)$",
        &["<"],
    ),
    (
        &[(1, 2), (1, 1)],
        "tag:yaml.org,2002:null",
        r"^(?:~|null|Null|NULL|)$",
        &["~", "n", "N", ""],
    ),
    (
        &[(1, 2), (1, 1)],
        "tag:yaml.org,2002:timestamp",
        r"^(?:[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]|[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?(?:[Tt]|[ \t]+)[0-9][0-9]?:[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?)$",
        &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
    ),
    (
        &[(1, 2), (1, 1)],
        "tag:yaml.org,2002:value",
        r"^(?:=)$",
        &["="],
    ),
    // Documentation only: plain scalars cannot start with these.
    (
        &[(1, 2), (1, 1)],
        "tag:yaml.org,2002:yaml",
        r"^(?:!|&|\*)$",
        &["!", "&", "*"],
    ),
];

type Buckets = HashMap<Option<char>, Vec<(String, Regex)>>;

pub struct Resolver {
    version: YamlVersion,
    v11: Buckets,
    v12: Buckets,
    /// Rules registered without first characters, tried on every value.
    any: Vec<(String, Regex)>,
}

impl Resolver {
    #[must_use]
    pub fn new(version: YamlVersion) -> Resolver {
        let mut v11 = Buckets::new();
        let mut v12 = Buckets::new();
        for (versions, tag, pattern, first) in IMPLICIT_RESOLVERS {
            let regex = Regex::new(pattern).unwrap();
            if versions.contains(&(1, 1)) {
                bucket_rule(&mut v11, tag, &regex, first);
            }
            if versions.contains(&(1, 2)) {
                bucket_rule(&mut v12, tag, &regex, first);
            }
        }
        Resolver {
            version,
            v11,
            v12,
            any: Vec::new(),
        }
    }

    #[must_use]
    pub fn version(&self) -> YamlVersion {
        self.version
    }

    /// Switches the active rule set; called at each document boundary.
    pub fn set_version(&mut self, version: YamlVersion) {
        self.version = version;
    }

    /// Registers an extra rule in both rule sets. `first` is the set of
    /// leading characters that select it; `None` tries it on every value.
    pub fn add_implicit_resolver(
        &mut self,
        tag: impl Into<String>,
        pattern: Regex,
        first: Option<&str>,
    ) {
        let tag = tag.into();
        match first {
            None => self.any.push((tag, pattern)),
            Some(chars) => {
                for ch in chars.chars() {
                    for table in [&mut self.v11, &mut self.v12] {
                        table
                            .entry(Some(ch))
                            .or_default()
                            .push((tag.clone(), pattern.clone()));
                    }
                }
            }
        }
    }

    /// Resolves a scalar's tag. The pattern tables only apply when the
    /// scalar was plain and untagged (`implicit.0`); everything else is a
    /// string.
    #[must_use]
    pub fn resolve(&self, value: &str, implicit: (bool, bool)) -> String {
        if implicit.0 {
            let buckets = if self.version == (1, 1) {
                &self.v11
            } else {
                &self.v12
            };
            if let Some(rules) = buckets.get(&value.chars().next()) {
                for (tag, regex) in rules {
                    if regex.is_match(value) {
                        return tag.clone();
                    }
                }
            }
            for (tag, regex) in &self.any {
                if regex.is_match(value) {
                    return tag.clone();
                }
            }
        }
        DEFAULT_SCALAR_TAG.to_string()
    }
}

fn bucket_rule(buckets: &mut Buckets, tag: &str, regex: &Regex, first: &[&str]) {
    for f in first {
        let key = f.chars().next();
        buckets
            .entry(key)
            .or_default()
            .push((tag.to_string(), regex.clone()));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case((1, 2), "true", "tag:yaml.org,2002:bool")]
    #[case((1, 2), "yes", "tag:yaml.org,2002:str")]
    #[case((1, 1), "yes", "tag:yaml.org,2002:bool")]
    #[case((1, 1), "off", "tag:yaml.org,2002:bool")]
    #[case((1, 2), "12", "tag:yaml.org,2002:int")]
    #[case((1, 2), "0x_1A", "tag:yaml.org,2002:int")]
    #[case((1, 2), "1:30", "tag:yaml.org,2002:str")]
    #[case((1, 1), "1:30", "tag:yaml.org,2002:int")]
    #[case((1, 1), "1:30.5", "tag:yaml.org,2002:float")]
    #[case((1, 2), "3.14", "tag:yaml.org,2002:float")]
    #[case((1, 2), "-.inf", "tag:yaml.org,2002:float")]
    #[case((1, 2), ".nan", "tag:yaml.org,2002:float")]
    #[case((1, 2), "~", "tag:yaml.org,2002:null")]
    #[case((1, 2), "null", "tag:yaml.org,2002:null")]
    #[case((1, 2), "", "tag:yaml.org,2002:null")]
    #[case((1, 2), "<<", "tag:yaml.org,2002:merge")]
    #[case((1, 2), "=", "tag:yaml.org,2002:value")]
    #[case((1, 2), "2001-12-14", "tag:yaml.org,2002:timestamp")]
    #[case((1, 2), "2001-12-14 21:59:43.10 -5", "tag:yaml.org,2002:timestamp")]
    #[case((1, 2), "words", "tag:yaml.org,2002:str")]
    fn implicit_resolution(
        #[case] version: YamlVersion,
        #[case] value: &str,
        #[case] tag: &str,
    ) {
        let resolver = Resolver::new(version);
        assert_eq!(resolver.resolve(value, (true, false)), tag);
    }

    #[test]
    fn quoted_scalars_resolve_to_str() {
        let resolver = Resolver::new((1, 2));
        assert_eq!(resolver.resolve("123", (false, true)), DEFAULT_SCALAR_TAG);
    }

    #[test]
    fn extra_resolver_applies_in_both_dialects() {
        let mut resolver = Resolver::new((1, 2));
        resolver.add_implicit_resolver(
            "!semver",
            Regex::new(r"^\d+\.\d+\.\d+$").unwrap(),
            Some("0123456789"),
        );
        assert_eq!(resolver.resolve("1.2.3", (true, false)), "!semver");
        resolver.set_version((1, 1));
        assert_eq!(resolver.resolve("1.2.3", (true, false)), "!semver");
    }
}
