//! Decoder configuration.

/// How Long and Double constants are numbered in the constant pool.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PoolSlotPolicy {
    /// Long and Double take two slots, the second one is reserved and holds
    /// no entry. This is how compilers lay out the pool.
    #[default]
    Wide,
    /// Every entry takes exactly one slot, so a pool of count `N` always
    /// holds `N - 1` entries and no index is reserved.
    Single,
}

/// What to do with Utf8 constants that are not valid text.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum TextPolicy {
    /// Accept UTF-8 and modified UTF-8, fail with `InvalidText` otherwise.
    #[default]
    Strict,
    /// Replace invalid sequences with U+FFFD.
    Lossy,
}

/// Options accepted by `JVMParser::parse_with`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub pool_slots: PoolSlotPolicy,
    pub text: TextPolicy,
}

impl DecodeOptions {
    pub fn with_pool_slots(mut self, pool_slots: PoolSlotPolicy) -> Self {
        self.pool_slots = pool_slots;
        self
    }

    pub fn with_text(mut self, text: TextPolicy) -> Self {
        self.text = text;
        self
    }
}
