//! Slot policy compilation.
//!
//! [`SlotOptions`] is the user-facing, serde-friendly configuration: plain
//! lists of value-type names, an optional cap, an optional depth bound. The
//! detector never reads it directly. Instead the options are compiled once per
//! run into a [`CompiledSlotOptions`]:
//!
//! - `alwaysSlots` / `neverSlots` become [`ValueTypeSet`] bitmasks, so the hot
//!   per-path check is a single `contains`.
//! - Out-of-range numbers are clamped instead of rejected; strict checking is
//!   the job of `ExtractOptions::validate` at configuration load time.
//!
//! ## Invariants
//!
//! - `min_similarity` is always within `0.0..=1.0`.
//! - A type present in both sets is treated as `never`: exclusion wins.

use crate::{SlotNaming, SlotOptions, ValueType};

bitflags::bitflags! {
    /// Set of value categories.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValueTypeSet: u8 {
        const TEXT       = 1 << 0;
        const FILLS      = 1 << 1;
        const STROKES    = 1 << 2;
        const OPACITY    = 1 << 3;
        const VISIBILITY = 1 << 4;
        const PROPERTY   = 1 << 5;
    }
}

impl ValueTypeSet {
    pub fn of(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Text => ValueTypeSet::TEXT,
            ValueType::Fills => ValueTypeSet::FILLS,
            ValueType::Strokes => ValueTypeSet::STROKES,
            ValueType::Opacity => ValueTypeSet::OPACITY,
            ValueType::Visibility => ValueTypeSet::VISIBILITY,
            ValueType::Property => ValueTypeSet::PROPERTY,
        }
    }

    pub fn has(self, value_type: ValueType) -> bool {
        self.contains(ValueTypeSet::of(value_type))
    }
}

impl FromIterator<ValueType> for ValueTypeSet {
    fn from_iter<I: IntoIterator<Item = ValueType>>(iter: I) -> Self {
        iter.into_iter().fold(ValueTypeSet::empty(), |set, vt| set | ValueTypeSet::of(vt))
    }
}

/// Slot policy in the form the detector consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledSlotOptions {
    pub min_similarity: f64,
    pub always: ValueTypeSet,
    pub never: ValueTypeSet,
    pub max_slots: Option<usize>,
    pub max_depth: Option<usize>,
    pub naming: SlotNaming,
}

impl CompiledSlotOptions {
    pub fn new(options: &SlotOptions) -> Self {
        let min_similarity = if options.min_similarity.is_nan() { 1.0 } else { options.min_similarity.clamp(0.0, 1.0) };
        let never: ValueTypeSet = options.never_slots.iter().copied().collect();
        let always = options.always_slots.iter().copied().collect::<ValueTypeSet>() - never;

        CompiledSlotOptions {
            min_similarity,
            always,
            never,
            max_slots: options.max_slots,
            max_depth: options.max_depth,
            naming: options.slot_naming,
        }
    }

    /// True when a path of `value_type` may be reported at all.
    pub fn admits(&self, value_type: ValueType) -> bool {
        !self.never.has(value_type)
    }

    /// True when a path of `value_type` is reported even without variation.
    pub fn forces(&self, value_type: ValueType) -> bool {
        self.always.has(value_type)
    }

    /// Whether a non-matching path whose most common value is shared by
    /// `agreement` of the instances counts as a slot.
    pub fn is_slot_candidate(&self, agreement: f64) -> bool {
        agreement < self.min_similarity
    }
}

impl Default for CompiledSlotOptions {
    fn default() -> Self {
        CompiledSlotOptions::new(&SlotOptions::default())
    }
}
