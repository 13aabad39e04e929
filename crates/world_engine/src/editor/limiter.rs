#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCheck {
    Allowed,
    /// Placement goes ahead but the world is getting full.
    Warning {
        current: usize,
        max: usize,
        threshold: usize,
    },
    Reached {
        current: usize,
        max: usize,
    },
}

/// Guard on the number of placed instances. The current count is always
/// supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetLimits {
    max_assets: usize,
    warning_threshold: usize,
}

impl AssetLimits {
    pub fn new(max_assets: usize, warning_threshold: usize) -> Self {
        Self {
            max_assets,
            warning_threshold: warning_threshold.min(max_assets),
        }
    }

    pub fn max_assets(&self) -> usize {
        self.max_assets
    }

    pub fn warning_threshold(&self) -> usize {
        self.warning_threshold
    }

    pub fn can_place(&self, current: usize) -> bool {
        current < self.max_assets
    }

    pub fn remaining(&self, current: usize) -> usize {
        self.max_assets.saturating_sub(current)
    }

    pub fn check(&self, current: usize) -> LimitCheck {
        if !self.can_place(current) {
            return LimitCheck::Reached {
                current,
                max: self.max_assets,
            };
        }
        if current >= self.warning_threshold {
            return LimitCheck::Warning {
                current,
                max: self.max_assets,
                threshold: self.warning_threshold,
            };
        }
        LimitCheck::Allowed
    }
}
