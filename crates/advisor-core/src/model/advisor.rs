use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Advisor {
    A = 0,
    B = 1,
}

impl Advisor {
    pub const BOTH: [Advisor; 2] = [Advisor::A, Advisor::B];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Advisor::A),
            1 => Some(Advisor::B),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn other(self) -> Advisor {
        match self {
            Advisor::A => Advisor::B,
            Advisor::B => Advisor::A,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Advisor::A => "a",
            Advisor::B => "b",
        }
    }
}

impl fmt::Display for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Advisor::A => "A",
            Advisor::B => "B",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::Advisor;

    #[test]
    fn index_round_trips() {
        for advisor in Advisor::BOTH {
            assert_eq!(Advisor::from_index(advisor.index()), Some(advisor));
        }
        assert_eq!(Advisor::from_index(2), None);
    }

    #[test]
    fn other_flips_between_advisors() {
        assert_eq!(Advisor::A.other(), Advisor::B);
        assert_eq!(Advisor::B.other(), Advisor::A);
    }

    #[test]
    fn display_uses_uppercase_names() {
        assert_eq!(Advisor::A.to_string(), "A");
        assert_eq!(Advisor::B.label(), "b");
    }
}
