use super::error::ParameterError;
use super::parameter::Parameter;
use super::{MODE, N_PARAMS, PARAM_DEFAULTS, PARAM_NAMES};

/// Describes a single parameter write, returned by
/// [`ParameterStore::take_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterChange {
    /// Static name of the parameter (from [`PARAM_NAMES`]).
    pub name: &'static str,
    /// Slot index.
    pub index: usize,
    /// Value after the write.
    pub value: u16,
}

/// Fixed table of host-tunable parameters.
///
/// Written by the host protocol, read by the control laws. Both run in the
/// control loop context, so no locking is needed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStore {
    params: [Parameter; N_PARAMS],
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    /// Create a store holding [`PARAM_DEFAULTS`] with no pending changes.
    pub fn new() -> Self {
        let mut params = [Parameter::default(); N_PARAMS];
        for (param, default) in params.iter_mut().zip(PARAM_DEFAULTS) {
            *param = Parameter::new(default);
        }
        Self { params }
    }

    // ── Access ───────────────────────────────────────────────────────

    /// Read a parameter value.
    ///
    /// Returns [`ParameterError::InvalidIndex`] if `index >= N_PARAMS`.
    pub fn get(&self, index: usize) -> Result<u16, ParameterError> {
        self.params
            .get(index)
            .map(|p| p.value)
            .ok_or(ParameterError::InvalidIndex)
    }

    /// Overwrite a parameter value.
    ///
    /// Out-of-range indices are rejected and leave the store untouched.
    /// Values are stored as written; a mode selector outside the known
    /// laws is legal here and makes the control law fail safe to a stop.
    ///
    /// # Examples
    ///
    /// ```
    /// use detent::parameters::{ParameterError, ParameterStore, MODE};
    ///
    /// let mut store = ParameterStore::new();
    /// store.set(MODE, 1).unwrap();
    /// assert_eq!(store.mode_raw(), 1);
    ///
    /// assert_eq!(store.set(8, 5), Err(ParameterError::InvalidIndex));
    /// ```
    pub fn set(&mut self, index: usize, value: u16) -> Result<(), ParameterError> {
        match self.params.get_mut(index) {
            Some(param) => {
                param.set_value(value);
                Ok(())
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("rejected write to parameter index {}", index);
                Err(ParameterError::InvalidIndex)
            }
        }
    }

    /// The raw mode selector (slot [`MODE`]).
    pub fn mode_raw(&self) -> u16 {
        self.params[MODE].value
    }

    /// Restore [`PARAM_DEFAULTS`], marking every slot whose value changes.
    pub fn reset(&mut self) {
        for (param, default) in self.params.iter_mut().zip(PARAM_DEFAULTS) {
            if param.value != default {
                param.set_value(default);
            }
        }
    }

    // ── Change consumption ───────────────────────────────────────────

    /// Collect all parameters whose change flag is set, then clear those
    /// flags.
    ///
    /// Returns a fixed-size array and a count of valid entries. Callers
    /// should iterate `&result.0[..result.1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use detent::parameters::ParameterStore;
    ///
    /// let mut store = ParameterStore::new();
    /// store.set(0, 7).unwrap();
    ///
    /// let (changes, count) = store.take_changes();
    /// assert_eq!(count, 1);
    /// assert_eq!(changes[0].unwrap().name, "K_spring");
    ///
    /// // Flags are cleared; a second call returns nothing.
    /// let (_, count) = store.take_changes();
    /// assert_eq!(count, 0);
    /// ```
    pub fn take_changes(&mut self) -> ([Option<ParameterChange>; N_PARAMS], usize) {
        let mut result = [None; N_PARAMS];
        let mut count = 0;

        for (index, param) in self.params.iter_mut().enumerate() {
            if param.changed {
                result[count] = Some(ParameterChange {
                    name: PARAM_NAMES[index],
                    index,
                    value: param.value,
                });
                count += 1;
                param.changed = false;
            }
        }

        (result, count)
    }
}
