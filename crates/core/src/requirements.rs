//! Statistics requirement flags.

use core::fmt;
use core::ops::BitOr;

/// Which per-class statistics a check has to produce.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Requirements(u8);

impl Requirements {
    /// Class sizes.
    pub const COUNTER: Requirements = Requirements(1 << 0);
    /// Secondary class sizes over a row subset.
    pub const SECONDARY_COUNTER: Requirements = Requirements(1 << 1);
    /// Sensitive-value distributions.
    pub const DISTRIBUTION: Requirements = Requirements(1 << 2);

    /// Creates requirements from raw bits.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Requirements(bits)
    }

    /// Returns the raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if all flags of `other` are set.
    #[inline]
    pub const fn contains(self, other: Requirements) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Requirements {
    type Output = Requirements;

    fn bitor(self, rhs: Requirements) -> Requirements {
        Requirements(self.0 | rhs.0)
    }
}

impl fmt::Debug for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in [
            (Self::COUNTER, "COUNTER"),
            (Self::SECONDARY_COUNTER, "SECONDARY_COUNTER"),
            (Self::DISTRIBUTION, "DISTRIBUTION"),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        if first {
            write!(f, "(empty)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_requirements_flags() {
        let r = Requirements::COUNTER | Requirements::DISTRIBUTION;
        assert!(r.contains(Requirements::COUNTER));
        assert!(!r.contains(Requirements::SECONDARY_COUNTER));
        assert_eq!(r.bits(), 0b101);
        assert_eq!(format!("{:?}", r), "COUNTER | DISTRIBUTION");
        assert_eq!(format!("{:?}", Requirements::default()), "(empty)");
    }
}
