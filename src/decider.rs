use std::fmt;
use std::str::FromStr;

/// Combines a mod's previous enabled state with a freshly loaded one when a
/// configuration is merged on top of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decider {
    Or,
    And,
    Xor,
    Nor,
    Nand,
    Xnor,
    #[default]
    Override,
}

impl Decider {
    pub const ALL: [Decider; 7] = [
        Decider::Or,
        Decider::And,
        Decider::Xor,
        Decider::Nor,
        Decider::Nand,
        Decider::Xnor,
        Decider::Override,
    ];

    pub fn decide(self, previous: bool, loaded: bool) -> bool {
        match self {
            Decider::Or => previous || loaded,
            Decider::And => previous && loaded,
            Decider::Xor => previous ^ loaded,
            Decider::Nor => !(previous || loaded),
            Decider::Nand => !(previous && loaded),
            Decider::Xnor => !(previous ^ loaded),
            Decider::Override => loaded,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Decider::Or => "or",
            Decider::And => "and",
            Decider::Xor => "xor",
            Decider::Nor => "nor",
            Decider::Nand => "nand",
            Decider::Xnor => "xnor",
            Decider::Override => "override",
        }
    }
}

impl fmt::Display for Decider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown decider '{0}'. Only or/and/xor/nor/nand/xnor/override are allowed.")]
pub struct UnknownDecider(pub String);

impl FromStr for Decider {
    type Err = UnknownDecider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decider::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| UnknownDecider(s.to_string()))
    }
}
