//! Limit switch input bank.
//!
//! Level inputs, already mapped to "asserted" regardless of the electrical
//! active level. No software debounce is applied.

use bitflags::bitflags;

use crate::tester::state::Direction;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LimitInputs: u8 {
        /// Top travel limit (end of positive motion).
        const TOP    = 0x01;
        /// Bottom travel limit (end of negative motion).
        const BOTTOM = 0x02;
    }
}

impl Default for LimitInputs {
    fn default() -> Self {
        Self::empty()
    }
}

impl LimitInputs {
    /// Limit that ends travel in `direction`.
    #[inline]
    pub const fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::TOP,
            Direction::Down => Self::BOTTOM,
        }
    }

    /// Whether travel in `direction` is blocked.
    #[inline]
    pub const fn blocks(self, direction: Direction) -> bool {
        self.contains(Self::for_direction(direction))
    }
}
