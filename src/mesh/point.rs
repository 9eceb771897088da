//! Per-point state flags.
//!
//! A point's identity is its index into the engine's position arena; this
//! module only carries the flags the external write channel needs:
//! - Clickable: the point accepts drag input
//! - Pinned: the point was dragged and is held in place for the next tick

/// Point state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointState {
    flags: u8,
}

impl PointState {
    const CLICKABLE: u8 = 0b0000_0001;
    const PINNED: u8 = 0b0000_0010;

    /// Create a new default point state.
    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    /// Check if the point accepts drag input.
    #[inline]
    pub fn is_clickable(self) -> bool {
        self.flags & Self::CLICKABLE != 0
    }

    /// Set the clickable state.
    #[inline]
    pub fn set_clickable(&mut self, clickable: bool) {
        if clickable {
            self.flags |= Self::CLICKABLE;
        } else {
            self.flags &= !Self::CLICKABLE;
        }
    }

    /// Check if the point is pinned for the coming tick.
    #[inline]
    pub fn is_pinned(self) -> bool {
        self.flags & Self::PINNED != 0
    }

    /// Set the pinned state.
    #[inline]
    pub fn set_pinned(&mut self, pinned: bool) {
        if pinned {
            self.flags |= Self::PINNED;
        } else {
            self.flags &= !Self::PINNED;
        }
    }
}
