//! Views of the records stored inside an archive.

use crate::enums::{ShaderStage, StageFlags, SymbolCategory};
use crate::res::{nth_array, read_str, ResArray, ResElement, ResView};
use crate::variation::{VariationId, VariationSpace};
use sharc_sys::{
    BinaryHeader, BinaryProgramHeader, MacroHeader, ProgramHeader, SourceHeader, SymbolHeader,
    VariationHeader,
};
use std::fmt;

macro_rules! res_element {
    ($name:ident, $data:ty) => {
        #[derive(Copy, Clone)]
        pub struct $name<'a>(ResView<'a, $data>);

        impl<'a> ResElement<'a> for $name<'a> {
            type Data = $data;

            fn from_view(view: ResView<'a, $data>) -> Self {
                $name(view)
            }
        }

        impl<'a> $name<'a> {
            pub fn view(&self) -> ResView<'a, $data> {
                self.0
            }

            pub fn name(&self) -> &'a str {
                self.0.name()
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("name", &self.name())
                    .field("size", &self.0.bytes().len())
                    .finish()
            }
        }
    };
}

res_element!(ShaderMacro, MacroHeader);
res_element!(Variation, VariationHeader);
res_element!(Symbol, SymbolHeader);
res_element!(ShaderSource, SourceHeader);
res_element!(ShaderProgram, ProgramHeader);
res_element!(BinaryShaderProgram, BinaryProgramHeader);
res_element!(ShaderBinary, BinaryHeader);

/// Negative indices, [`sharc_sys::NO_INDEX`] included, mean the stage is absent.
fn stage_index(index: i32) -> Option<usize> {
    usize::try_from(index).ok()
}

impl<'a> ShaderMacro<'a> {
    pub fn value(&self) -> &'a str {
        let data = self.0.data();
        read_str(self.0.region(self.0.name_end(), data.value_len as usize))
    }
}

impl<'a> Variation<'a> {
    pub fn value_count(&self) -> usize {
        self.0.data().value_count as usize
    }

    fn values_region(&self) -> &'a [u8] {
        self.0
            .region(self.0.name_end(), self.0.data().values_len as usize)
    }

    /// The stable identifier, used for reverse lookups.
    pub fn id(&self) -> &'a str {
        let data = self.0.data();
        let offset = self.0.name_end() + data.values_len as usize;
        read_str(self.0.region(offset, data.id_len as usize))
    }

    /// The legal values, in declaration order.
    pub fn values(&self) -> VariationValues<'a> {
        VariationValues {
            rest: self.values_region(),
            remaining: self.value_count(),
        }
    }

    /// # Panics
    /// If `index` is not below [`value_count`](Self::value_count).
    #[track_caller]
    pub fn value(&self, index: usize) -> &'a str {
        assert!(
            index < self.value_count(),
            "value {index} of variation {} with {} values",
            self.name(),
            self.value_count()
        );
        self.values().nth(index).unwrap_or_default()
    }
}

/// Value strings of a [`Variation`]. Runs of NUL padding between values are skipped.
#[derive(Debug, Clone)]
pub struct VariationValues<'a> {
    rest: &'a [u8],
    remaining: usize,
}

impl<'a> Iterator for VariationValues<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.remaining == 0 {
            return None;
        }
        let start = self.rest.iter().position(|&b| b != 0)?;
        let rest = &self.rest[start..];
        let value = read_str(rest);
        let consumed = rest
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(rest.len());
        self.rest = &rest[consumed..];
        self.remaining -= 1;
        Some(value)
    }
}

impl<'a> Symbol<'a> {
    pub fn id(&self) -> &'a str {
        read_str(self.0.region(self.0.name_end(), self.0.data().id_len as usize))
    }

    pub fn stages(&self) -> StageFlags {
        StageFlags::from_bits_truncate(self.0.data().stages)
    }

    /// Raw default value words, already in host order for non-block symbols.
    pub fn default_value(&self) -> &'a [u8] {
        let data = self.0.data();
        let offset = self.0.name_end() + data.id_len as usize;
        self.0.region(offset, data.default_value_size as usize)
    }
}

impl<'a> ResArray<'a, Symbol<'a>> {
    pub fn search_by_id(&self, id: &str) -> Option<Symbol<'a>> {
        self.iter().find(|symbol| symbol.id() == id)
    }
}

impl<'a> ShaderSource<'a> {
    pub fn text(&self) -> &'a str {
        read_str(self.0.region(self.0.name_end(), self.0.data().text_len as usize))
    }
}

/// Arrays stored after the variation tables of both program kinds.
const SYMBOL_ARRAYS_AFTER_VARIATIONS: usize = 2;

impl<'a> ShaderProgram<'a> {
    pub fn source_index(&self, stage: ShaderStage) -> Option<usize> {
        let data = self.0.data();
        stage_index(match stage {
            ShaderStage::Vertex => data.vertex_source,
            ShaderStage::Fragment => data.fragment_source,
            ShaderStage::Geometry => data.geometry_source,
        })
    }

    fn nested<E: ResElement<'a>>(&self, n: usize) -> ResArray<'a, E> {
        nth_array(self.0.bytes(), self.0.name_end(), n)
    }

    pub fn macro_array(&self, stage: ShaderStage) -> ResArray<'a, ShaderMacro<'a>> {
        self.nested(stage as usize)
    }

    pub fn variation_array(&self) -> ResArray<'a, Variation<'a>> {
        self.nested(ShaderStage::COUNT)
    }

    pub fn variation_default_array(&self) -> ResArray<'a, Variation<'a>> {
        self.nested(ShaderStage::COUNT + 1)
    }

    pub fn symbol_array(&self, category: SymbolCategory) -> ResArray<'a, Symbol<'a>> {
        self.nested(ShaderStage::COUNT + SYMBOL_ARRAYS_AFTER_VARIATIONS + category as usize)
    }

    /// Symbols of `category` that apply to `stage`.
    pub fn symbols_for_stage(
        &self,
        category: SymbolCategory,
        stage: ShaderStage,
    ) -> impl Iterator<Item = Symbol<'a>> {
        symbols_for_stage(self.symbol_array(category), stage)
    }

    pub fn variation_space(&self) -> VariationSpace<'a> {
        VariationSpace::from_variations(self.variation_array())
    }

    /// The variation selected by the variation-default table.
    pub fn default_variation(&self, space: &VariationSpace<'_>) -> VariationId {
        space.default_id(self.variation_default_array())
    }
}

impl<'a> BinaryShaderProgram<'a> {
    /// Index of the binary used by the original program for `stage`.
    pub fn binary_index(&self, stage: ShaderStage) -> Option<usize> {
        let data = self.0.data();
        stage_index(match stage {
            ShaderStage::Vertex => data.vertex_binary,
            ShaderStage::Fragment => data.fragment_binary,
            ShaderStage::Geometry => data.geometry_binary,
        })
    }

    fn nested<E: ResElement<'a>>(&self, n: usize) -> ResArray<'a, E> {
        nth_array(self.0.bytes(), self.0.name_end(), n)
    }

    pub fn variation_array(&self) -> ResArray<'a, Variation<'a>> {
        self.nested(0)
    }

    pub fn variation_default_array(&self) -> ResArray<'a, Variation<'a>> {
        self.nested(1)
    }

    pub fn symbol_array(&self, category: SymbolCategory) -> ResArray<'a, Symbol<'a>> {
        self.nested(SYMBOL_ARRAYS_AFTER_VARIATIONS + category as usize)
    }

    pub fn symbols_for_stage(
        &self,
        category: SymbolCategory,
        stage: ShaderStage,
    ) -> impl Iterator<Item = Symbol<'a>> {
        symbols_for_stage(self.symbol_array(category), stage)
    }

    pub fn variation_space(&self) -> VariationSpace<'a> {
        VariationSpace::from_variations(self.variation_array())
    }

    pub fn default_variation(&self, space: &VariationSpace<'_>) -> VariationId {
        space.default_id(self.variation_default_array())
    }
}

impl<'a> ShaderBinary<'a> {
    pub fn stage(&self) -> Option<ShaderStage> {
        ShaderStage::try_from(self.0.data().stage).ok()
    }

    /// Byte size of the native payload.
    pub fn data_size(&self) -> usize {
        self.0.data().data_size as usize
    }

    pub(crate) fn data_offset(&self) -> usize {
        self.0.data().data_offset as usize
    }
}

fn symbols_for_stage<'a>(
    symbols: ResArray<'a, Symbol<'a>>,
    stage: ShaderStage,
) -> impl Iterator<Item = Symbol<'a>> {
    let stage = StageFlags::from(stage);
    symbols
        .into_iter()
        .filter(move |symbol| symbol.stages().contains(stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_archive, AlignedBlob, ProgramDesc, SymbolDesc, VariationDesc};
    use crate::Endian;
    use crate::ShaderArchive;
    use sharc_sys::NO_INDEX;

    fn sample() -> AlignedBlob {
        let mut program = ProgramDesc::new("dof_final");
        program.sources = [0, 1, NO_INDEX];
        program.macros[ShaderStage::Fragment as usize]
            .push(("ENABLE_NEAR".into(), "1".into()));
        program.variations = vec![
            VariationDesc::new("ENABLE_NEAR", "near", &["0", "1"]),
            VariationDesc::new("QUALITY", "quality", &["low", "mid", "high"]),
        ];
        program.defaults = vec![VariationDesc::new("QUALITY", "quality", &["mid"])];
        program.symbols[SymbolCategory::Uniform as usize] = vec![
            SymbolDesc::new("uParam", "param", vec![1, 2], StageFlags::FRAGMENT),
            SymbolDesc::new("uMvp", "mvp", vec![], StageFlags::VERTEX | StageFlags::FRAGMENT),
        ];
        build_archive("agl_technique", &[program], &[], Endian::NATIVE)
    }

    #[test]
    fn nested_regions_in_fixed_order() {
        let mut blob = sample();
        let archive = ShaderArchive::set_up(blob.as_bytes_mut()).expect("set up");
        let program = archive.program_array().get(0).expect("program");

        assert_eq!(program.name(), "dof_final");
        assert_eq!(program.source_index(ShaderStage::Vertex), Some(0));
        assert_eq!(program.source_index(ShaderStage::Geometry), None);

        assert!(program.macro_array(ShaderStage::Vertex).is_empty());
        let macros: Vec<_> = program
            .macro_array(ShaderStage::Fragment)
            .iter()
            .map(|m| (m.name(), m.value()))
            .collect();
        assert_eq!(macros, vec![("ENABLE_NEAR", "1")]);
        assert!(program.macro_array(ShaderStage::Geometry).is_empty());

        let variations = program.variation_array();
        assert_eq!(variations.len(), 2);
        let quality = variations.get(1).unwrap();
        assert_eq!(quality.name(), "QUALITY");
        assert_eq!(quality.id(), "quality");
        assert_eq!(quality.values().collect::<Vec<_>>(), vec!["low", "mid", "high"]);
        assert_eq!(quality.value(2), "high");

        assert_eq!(program.variation_default_array().len(), 1);

        let uniforms = program.symbol_array(SymbolCategory::Uniform);
        assert_eq!(uniforms.len(), 2);
        let param = uniforms.search_by_id("param").expect("symbol by id");
        assert_eq!(param.name(), "uParam");
        let expected: Vec<u8> = [1u32, 2].iter().flat_map(|w| w.to_ne_bytes()).collect();
        assert_eq!(param.default_value(), &expected[..]);
        assert!(uniforms.search_by_id("missing").is_none());

        let vertex: Vec<_> = program
            .symbols_for_stage(SymbolCategory::Uniform, ShaderStage::Vertex)
            .map(|s| s.name())
            .collect();
        assert_eq!(vertex, vec!["uMvp"]);

        for category in [SymbolCategory::UniformBlock, SymbolCategory::Sampler, SymbolCategory::Attribute] {
            let array = program.symbol_array(category);
            assert!(array.is_valid());
            assert!(array.is_empty());
        }
    }

    #[test]
    fn default_variation_follows_default_table() {
        let mut blob = sample();
        let archive = ShaderArchive::set_up(blob.as_bytes_mut()).expect("set up");
        let program = archive.program_array().get(0).unwrap();
        let space = program.variation_space();

        // ENABLE_NEAR stays at its base value, QUALITY moves to "mid".
        assert_eq!(program.default_variation(&space), VariationId(1));
    }

    #[test]
    #[should_panic(expected = "value 3 of variation QUALITY")]
    fn value_out_of_range_panics() {
        let mut blob = sample();
        let archive = ShaderArchive::set_up(blob.as_bytes_mut()).unwrap();
        let program = archive.program_array().get(0).unwrap();
        program.variation_array().get(1).unwrap().value(3);
    }
}
