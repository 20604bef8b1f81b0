use std::fmt;

/// How many argument tokens a command or option consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly `n` tokens. `Exact(0)` is a plain switch.
    Exact(usize),
    /// One token or more, up to the next known option/command or end of input.
    AtLeastOne,
    /// Any number of tokens, up to the next known option/command or end of input.
    ZeroOrMore,
}

impl Default for Arity {
    fn default() -> Self {
        Self::Exact(0)
    }
}

impl Arity {
    /// Whether this arity is open-ended.
    pub fn is_unbounded(self) -> bool {
        matches!(self, Self::AtLeastOne | Self::ZeroOrMore)
    }

    /// The fewest tokens that satisfy this arity.
    pub fn minimum(self) -> usize {
        match self {
            Self::Exact(n) => n,
            Self::AtLeastOne => 1,
            Self::ZeroOrMore => 0,
        }
    }
}

impl From<usize> for Arity {
    fn from(n: usize) -> Self {
        Self::Exact(n)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::AtLeastOne => f.write_str("1+"),
            Self::ZeroOrMore => f.write_str("0+"),
        }
    }
}
