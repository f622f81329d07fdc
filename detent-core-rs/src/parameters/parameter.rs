/// One host-tunable scalar with change tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Parameter {
    /// Current raw value. Stored as written; interpretation (gain, mode
    /// selector) is up to the reader.
    pub value: u16,
    /// Set on every write, cleared by
    /// [`ParameterStore::take_changes`](super::ParameterStore::take_changes).
    pub changed: bool,
}

impl Parameter {
    /// A parameter holding `value` with no pending change.
    pub const fn new(value: u16) -> Self {
        Self {
            value,
            changed: false,
        }
    }

    /// Overwrite the value and mark it changed, even if it is equal to the
    /// previous one.
    pub fn set_value(&mut self, v: u16) {
        self.value = v;
        self.changed = true;
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self::new(0)
    }
}
