//! Mixed-radix addressing of shader variations.
//!
//! Every macro axis contributes one digit. The last declared axis is the least
//! significant, so the stride of an axis is the product of the value counts of
//! every axis declared after it. Index 0 is the original program, with every
//! axis at its first value.

use crate::logger;
use crate::program::Variation;
use crate::res::ResArray;
use std::fmt;

/// Identifies one variation of a program.
///
/// `VariationId::ORIGINAL` is the unmodified program. Every other id `n` is a
/// variant stored at index `n - 1`.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariationId(pub u32);

impl VariationId {
    pub const ORIGINAL: VariationId = VariationId(0);

    pub fn is_original(self) -> bool {
        self == Self::ORIGINAL
    }

    /// Index into variant storage, or `None` for the original program.
    pub fn storage_index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }

    /// # Panics
    /// If `index + 1` does not fit a variation id.
    #[track_caller]
    pub fn from_storage_index(index: usize) -> Self {
        match index.checked_add(1).and_then(|id| u32::try_from(id).ok()) {
            Some(id) => VariationId(id),
            None => panic!("storage index {index} does not fit a variation id"),
        }
    }
}

impl fmt::Display for VariationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Computes the stride of every axis and the total variation count.
///
/// # Panics
/// If the total overflows `usize`.
pub fn compute_strides(value_counts: &[usize]) -> (Vec<usize>, usize) {
    let mut strides = vec![0; value_counts.len()];
    let mut total = 1usize;
    for (stride, &count) in strides.iter_mut().zip(value_counts).rev() {
        *stride = total;
        total = total
            .checked_mul(count)
            .expect("variation count overflows usize");
    }
    (strides, total)
}

/// One macro axis of a [`VariationSpace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationMacro<'a> {
    name: &'a str,
    id: &'a str,
    stride: usize,
    values: Vec<&'a str>,
}

impl<'a> VariationMacro<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn values(&self) -> &[&'a str] {
        &self.values
    }

    pub fn position_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| *v == value)
    }
}

#[derive(Debug)]
struct PendingMacro<'a> {
    name: &'a str,
    id: &'a str,
    values: Vec<Option<&'a str>>,
}

/// Collects macro axes before their strides are known.
#[derive(Debug)]
pub struct VariationSpaceBuilder<'a> {
    macros: Vec<Option<PendingMacro<'a>>>,
}

impl<'a> VariationSpaceBuilder<'a> {
    pub fn new(macro_count: usize) -> Self {
        let mut macros = Vec::with_capacity(macro_count);
        macros.resize_with(macro_count, || None);
        VariationSpaceBuilder { macros }
    }

    /// # Panics
    /// If `index` is out of range or `value_count` is zero. Declaring the same
    /// index twice is caught in debug builds.
    #[track_caller]
    pub fn declare_macro(
        &mut self,
        index: usize,
        name: &'a str,
        id: &'a str,
        value_count: usize,
    ) -> &mut Self {
        let count = self.macros.len();
        let slot = match self.macros.get_mut(index) {
            Some(slot) => slot,
            None => panic!("macro {index} declared on a space of {count} macros"),
        };
        debug_assert!(slot.is_none(), "macro {index} declared twice");
        assert!(value_count > 0, "macro {name} declared without values");

        *slot = Some(PendingMacro {
            name,
            id,
            values: vec![None; value_count],
        });
        self
    }

    /// # Panics
    /// If the macro is undeclared or `value_index` is out of range.
    #[track_caller]
    pub fn declare_value(&mut self, macro_index: usize, value_index: usize, value: &'a str) -> &mut Self {
        let pending = match self.macros.get_mut(macro_index) {
            Some(Some(pending)) => pending,
            _ => panic!("value declared on undeclared macro {macro_index}"),
        };
        let count = pending.values.len();
        let slot = match pending.values.get_mut(value_index) {
            Some(slot) => slot,
            None => panic!(
                "value {value_index} declared on macro {} with {count} values",
                pending.name
            ),
        };
        debug_assert!(slot.is_none(), "value {value_index} of macro {} declared twice", pending.name);

        *slot = Some(value);
        self
    }

    /// Computes every stride in one pass and freezes the space.
    ///
    /// # Panics
    /// If a macro or value slot was never declared, or if the last variation
    /// id does not fit in 32 bits.
    #[track_caller]
    pub fn finalize(self) -> VariationSpace<'a> {
        let pending: Vec<PendingMacro<'a>> = self
            .macros
            .into_iter()
            .enumerate()
            .map(|(index, pending)| match pending {
                Some(pending) => pending,
                None => panic!("macro {index} was never declared"),
            })
            .collect();

        let counts: Vec<usize> = pending.iter().map(|m| m.values.len()).collect();
        let (strides, variation_count) = compute_strides(&counts);
        assert!(
            u32::try_from(variation_count - 1).is_ok(),
            "{variation_count} variations do not fit a 32-bit variation id"
        );

        let macros: Vec<VariationMacro<'a>> = pending
            .into_iter()
            .zip(strides)
            .map(|(pending, stride)| {
                let name = pending.name;
                let values = pending
                    .values
                    .into_iter()
                    .enumerate()
                    .map(|(index, value)| match value {
                        Some(value) => value,
                        None => panic!("value {index} of macro {name} was never declared"),
                    })
                    .collect();
                VariationMacro {
                    name,
                    id: pending.id,
                    stride,
                    values,
                }
            })
            .collect();

        tracing::debug!(
            target: "sharc",
            macros = macros.len(),
            variation_count,
            "variation space finalized"
        );

        VariationSpace {
            macros,
            variation_count,
        }
    }
}

/// An immutable set of macro axes with precomputed strides.
///
/// Read-only after construction and safe to share between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationSpace<'a> {
    macros: Vec<VariationMacro<'a>>,
    variation_count: usize,
}

impl Default for VariationSpace<'_> {
    fn default() -> Self {
        VariationSpace {
            macros: Vec::new(),
            variation_count: 1,
        }
    }
}

impl<'a> VariationSpace<'a> {
    pub fn builder(macro_count: usize) -> VariationSpaceBuilder<'a> {
        VariationSpaceBuilder::new(macro_count)
    }

    /// Builds the space from a program's variation table.
    ///
    /// Variations without values select nothing and are left out.
    ///
    /// # Panics
    /// If the variations multiply out past 32-bit variation ids.
    pub fn from_variations(variations: ResArray<'a, Variation<'a>>) -> Self {
        let axes: Vec<(Variation<'a>, Vec<&'a str>)> = variations
            .iter()
            .map(|variation| (variation, variation.values().collect::<Vec<_>>()))
            .filter(|(_, values)| !values.is_empty())
            .collect();

        let mut builder = VariationSpaceBuilder::new(axes.len());
        for (index, (variation, values)) in axes.into_iter().enumerate() {
            builder.declare_macro(index, variation.name(), variation.id(), values.len());
            for (value_index, value) in values.into_iter().enumerate() {
                builder.declare_value(index, value_index, value);
            }
        }
        builder.finalize()
    }

    pub fn macros(&self) -> &[VariationMacro<'a>] {
        &self.macros
    }

    pub fn stride(&self, macro_index: usize) -> usize {
        self.macros[macro_index].stride
    }

    /// Number of variations, the original program included.
    pub fn variation_count(&self) -> usize {
        self.variation_count
    }

    /// Number of variations stored apart from the original program.
    pub fn variant_count(&self) -> usize {
        self.variation_count - 1
    }

    pub fn contains(&self, id: VariationId) -> bool {
        (id.0 as usize) < self.variation_count
    }

    /// Maps a sparse macro assignment to a variation.
    ///
    /// Axes missing from `assignment` stay at their first value. Macros are
    /// matched by name; unknown names are ignored and unknown values leave the
    /// axis where it was.
    pub fn to_index(&self, assignment: &[(&str, &str)]) -> VariationId {
        self.apply(vec![0; self.macros.len()], assignment)
    }

    /// Like [`to_index`](Self::to_index), with names and values in parallel slices.
    ///
    /// # Panics
    /// If the slices differ in length.
    #[track_caller]
    pub fn search_index(&self, names: &[&str], values: &[&str]) -> VariationId {
        assert_eq!(names.len(), values.len(), "macro names and values differ in length");
        let assignment: Vec<(&str, &str)> = names.iter().copied().zip(values.iter().copied()).collect();
        self.to_index(&assignment)
    }

    /// Applies `assignment` on top of the axis positions of `current`.
    pub fn retarget(&self, current: VariationId, assignment: &[(&str, &str)]) -> VariationId {
        self.apply(self.axis_positions_for(current), assignment)
    }

    fn apply(&self, mut positions: Vec<usize>, assignment: &[(&str, &str)]) -> VariationId {
        for (axis, position) in self.macros.iter().zip(positions.iter_mut()) {
            let Some((_, value)) = assignment.iter().find(|(name, _)| *name == axis.name) else {
                continue;
            };
            match axis.position_of(value) {
                Some(found) => *position = found,
                None => logger::unknown_macro_value(axis.name, value),
            }
        }
        self.index_of(&positions)
    }

    /// Accumulates `Σ position[i] * stride[i]`.
    ///
    /// # Panics
    /// If `positions` does not have one entry per macro.
    #[track_caller]
    pub fn index_of(&self, positions: &[usize]) -> VariationId {
        assert_eq!(positions.len(), self.macros.len(), "one position per macro");
        let sum: usize = self
            .macros
            .iter()
            .zip(positions)
            .map(|(axis, &position)| {
                debug_assert!(position < axis.values.len(), "position {position} of macro {}", axis.name);
                position * axis.stride
            })
            .sum();
        match u32::try_from(sum) {
            Ok(index) => VariationId(index),
            Err(_) => panic!("variation index {sum} does not fit a variation id"),
        }
    }

    /// Splits `id` into one value position per macro.
    ///
    /// # Panics
    /// If `id` is outside this space.
    #[track_caller]
    pub fn axis_positions_for(&self, id: VariationId) -> Vec<usize> {
        assert!(
            self.contains(id),
            "variation {id} outside a space of {} variations",
            self.variation_count
        );
        let mut rest = id.0 as usize;
        self.macros
            .iter()
            .map(|axis| {
                let position = rest / axis.stride;
                rest -= position * axis.stride;
                position
            })
            .collect()
    }

    /// The macro/value pairs that make up `id`.
    #[track_caller]
    pub fn from_index(&self, id: VariationId) -> VariationSelection<'a> {
        let positions = self.axis_positions_for(id);
        let pairs = self
            .macros
            .iter()
            .zip(&positions)
            .map(|(axis, &position)| (axis.name, axis.values[position]))
            .collect();
        VariationSelection { positions, pairs }
    }

    /// The variation named by a variation-default table.
    ///
    /// Each entry's first value is the default for the macro of the same name.
    pub fn default_id(&self, defaults: ResArray<'_, Variation<'_>>) -> VariationId {
        let assignment: Vec<(&str, &str)> = defaults
            .iter()
            .filter(|default| default.value_count() > 0)
            .map(|default| (default.name(), default.value(0)))
            .collect();
        self.to_index(&assignment)
    }

    /// Finds a macro name by its stable id.
    pub fn macro_name_for_id(&self, id: &str) -> Option<&'a str> {
        self.macros.iter().find(|axis| axis.id == id).map(|axis| axis.name)
    }
}

/// The decoded form of a [`VariationId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationSelection<'a> {
    positions: Vec<usize>,
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> VariationSelection<'a> {
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn pairs(&self) -> &[(&'a str, &'a str)] {
        &self.pairs
    }

    pub fn value_of(&self, name: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(macro_name, _)| *macro_name == name)
            .map(|(_, value)| *value)
    }
}

/// One owned value per variation: the original plus every stored variant.
#[derive(Debug, Clone)]
pub struct Variations<T> {
    original: T,
    variants: Vec<T>,
}

impl<T> Variations<T> {
    pub fn build(space: &VariationSpace<'_>, mut f: impl FnMut(VariationId) -> T) -> Self {
        let original = f(VariationId::ORIGINAL);
        let variants = (0..space.variant_count())
            .map(|index| f(VariationId::from_storage_index(index)))
            .collect();
        Variations { original, variants }
    }

    pub fn original(&self) -> &T {
        &self.original
    }

    pub fn variants(&self) -> &[T] {
        &self.variants
    }

    pub fn get(&self, id: VariationId) -> Option<&T> {
        match id.storage_index() {
            None => Some(&self.original),
            Some(index) => self.variants.get(index),
        }
    }

    pub fn get_mut(&mut self, id: VariationId) -> Option<&mut T> {
        match id.storage_index() {
            None => Some(&mut self.original),
            Some(index) => self.variants.get_mut(index),
        }
    }

    /// Number of variations, the original included.
    pub fn len(&self) -> usize {
        self.variants.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariationId, &T)> {
        std::iter::once((VariationId::ORIGINAL, &self.original)).chain(
            self.variants
                .iter()
                .enumerate()
                .map(|(index, variant)| (VariationId::from_storage_index(index), variant)),
        )
    }
}
