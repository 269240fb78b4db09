use std::cmp::Ordering;
use std::fmt;

/// Version of the engine mods are validated against.
pub const ENGINE_VERSION: VersionTag = VersionTag::new(0, 1, 0);

/// Where [`VersionTag::parse`] stopped consuming input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStop {
    /// The whole input was consumed.
    Clean,
    /// First character that was not consumed.
    At(char),
}

/// `major.minor.patch` version with partial precision.
///
/// A field that was never parsed is distinct from a field parsed as zero:
/// a manifest may legitimately specify only `"2"` or `"2.1"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionTag {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub major_set: bool,
    pub minor_set: bool,
    pub patch_set: bool,
}

fn parse_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u32 {
    let mut value: u32 = 0;

    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(digit);
        chars.next();
    }

    value
}

impl VersionTag {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        VersionTag {
            major,
            minor,
            patch,
            major_set: true,
            minor_set: true,
            patch_set: true,
        }
    }

    /// Parses the longest valid prefix of `text`.
    ///
    /// Returns the parsed tag and where parsing stopped. A dangling `.` stops
    /// at that `.` without marking the following field as set.
    pub fn parse(text: &str) -> (VersionTag, ParseStop) {
        let mut tag = VersionTag::default();
        let mut chars = text.chars().peekable();

        tag.major = parse_number(&mut chars);
        tag.major_set = true;

        for field in 0..2 {
            match chars.next() {
                None => return (tag, ParseStop::Clean),
                Some('.') => {}
                Some(c) => return (tag, ParseStop::At(c)),
            }

            if chars.peek().is_none() {
                return (tag, ParseStop::At('.'));
            }

            let value = parse_number(&mut chars);
            if field == 0 {
                tag.minor = value;
                tag.minor_set = true;
            } else {
                tag.patch = value;
                tag.patch_set = true;
            }
        }

        match chars.next() {
            None => (tag, ParseStop::Clean),
            Some(c) => (tag, ParseStop::At(c)),
        }
    }

    /// Parses `text` and only accepts it if every character was consumed and it
    /// starts with a digit.
    pub fn parse_exact(text: &str) -> Option<VersionTag> {
        if !text.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }

        match Self::parse(text) {
            (tag, ParseStop::Clean) => Some(tag),
            _ => None,
        }
    }

    /// Renders the fields that were set, e.g. `"2"`, `"2.1"` or `"2.1.3"`.
    pub fn dump(&self) -> String {
        let mut s = self.major.to_string();

        if self.minor_set || self.patch_set {
            s.push('.');
            s.push_str(&self.minor.to_string());
        }

        if self.patch_set {
            s.push('.');
            s.push_str(&self.patch.to_string());
        }

        s
    }

    /// A mod built for `self` runs on `engine` iff major and minor match and,
    /// when `self` names a patch, the patch matches as well.
    pub fn is_compatible_with(&self, engine: &VersionTag) -> bool {
        self.major == engine.major
            && self.minor == engine.minor
            && (!self.patch_set || self.patch == engine.patch)
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for VersionTag {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for VersionTag {}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_precision() {
        let (v, stop) = VersionTag::parse("2");
        assert_eq!(stop, ParseStop::Clean);
        assert!(v.major_set && !v.minor_set && !v.patch_set);
        assert_eq!(v.major, 2);

        let (v, stop) = VersionTag::parse("2.1");
        assert_eq!(stop, ParseStop::Clean);
        assert!(v.minor_set && !v.patch_set);
        assert_eq!((v.major, v.minor), (2, 1));

        let (v, stop) = VersionTag::parse("2.1.3");
        assert_eq!(stop, ParseStop::Clean);
        assert!(v.patch_set);
        assert_eq!(v, VersionTag::new(2, 1, 3));
    }

    #[test]
    fn stops_at_first_foreign_character() {
        let (v, stop) = VersionTag::parse("1.2.3-beta");
        assert_eq!(stop, ParseStop::At('-'));
        assert_eq!(v, VersionTag::new(1, 2, 3));

        let (v, stop) = VersionTag::parse("1.");
        assert_eq!(stop, ParseStop::At('.'));
        assert!(v.major_set && !v.minor_set);

        let (v, stop) = VersionTag::parse("abc");
        assert_eq!(stop, ParseStop::At('a'));
        assert!(v.major_set);
        assert_eq!(v.major, 0);
    }

    #[test]
    fn parse_exact_rejects_garbage() {
        assert!(VersionTag::parse_exact("1.0.0").is_some());
        assert!(VersionTag::parse_exact("3").is_some());
        assert!(VersionTag::parse_exact("").is_none());
        assert!(VersionTag::parse_exact("mod").is_none());
        assert!(VersionTag::parse_exact("1.0_b").is_none());
        assert!(VersionTag::parse_exact(".1").is_none());
    }

    #[test]
    fn dump_reparses_to_the_same_fields() {
        for text in ["7", "7.4", "7.4.1", "0.0.0", "10.20"] {
            let (first, _) = VersionTag::parse(text);
            let (second, stop) = VersionTag::parse(&first.dump());
            assert_eq!(stop, ParseStop::Clean);
            assert_eq!(first, second);
            assert_eq!(first.minor_set, second.minor_set);
            assert_eq!(first.patch_set, second.patch_set);
            assert_eq!(first.dump(), text);
        }
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(VersionTag::new(1, 2, 0) > VersionTag::new(1, 1, 9));
        assert!(VersionTag::new(2, 0, 0) > VersionTag::new(1, 9, 9));
        assert!(VersionTag::new(1, 0, 1) >= VersionTag::new(1, 0, 1));
        assert!(VersionTag::new(1, 0, 0) < VersionTag::new(1, 0, 1));
        // unset fields compare as zero
        assert_eq!(VersionTag::parse("1").0, VersionTag::new(1, 0, 0));
    }

    #[test]
    fn compatibility_ignores_unspecified_patch() {
        let engine = VersionTag::new(0, 1, 4);
        assert!(VersionTag::parse("0.1").0.is_compatible_with(&engine));
        assert!(VersionTag::parse("0.1.4").0.is_compatible_with(&engine));
        assert!(!VersionTag::parse("0.1.3").0.is_compatible_with(&engine));
        assert!(!VersionTag::parse("0.2").0.is_compatible_with(&engine));
        assert!(!VersionTag::parse("1.1").0.is_compatible_with(&engine));
    }
}
