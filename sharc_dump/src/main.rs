use sharc::{
    BinaryShaderArchive, SetUpConfig, ShaderArchive, ShaderStage, SymbolCategory, VariationSpace,
};
use std::env;
use std::path::Path;
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn print_space(space: &VariationSpace<'_>) {
    println!("    variations: {}", space.variation_count());
    for axis in space.macros() {
        println!(
            "      {} ({}) stride {}: {}",
            axis.name(),
            axis.id(),
            axis.stride(),
            axis.values().join(", ")
        );
    }
}

fn dump_archive(blob: &mut [u8]) -> Result<(), sharc::SharcError> {
    let archive = ShaderArchive::set_up(blob)?;
    println!("{} ({:?})", archive.name(), archive.source_endian());

    for program in archive.program_array() {
        println!("  program {}", program.name());
        for stage in ShaderStage::ALL {
            if let Some(source) = archive.program_source(&program, stage) {
                println!("    {stage}: {}", source.name());
            }
        }
        for category in SymbolCategory::ALL {
            let symbols = program.symbol_array(category);
            if !symbols.is_empty() {
                println!("    {category} symbols: {}", symbols.len());
            }
        }
        let space = program.variation_space();
        print_space(&space);
        println!("    default: {}", program.default_variation(&space));
    }
    Ok(())
}

fn dump_binary_archive(blob: &mut [u8]) -> Result<(), sharc::SharcError> {
    let archive = BinaryShaderArchive::set_up(blob, &SetUpConfig::default())?.into_fixed()?;
    println!(
        "{} ({:?}, {} relocations)",
        archive.name(),
        archive.source_endian(),
        archive.relocations().len()
    );

    for program in archive.binary_program_array() {
        println!("  program {}", program.name());
        let space = program.variation_space();
        for (stage, shader) in ShaderStage::ALL
            .into_iter()
            .zip(archive.program_binaries(&program, sharc::VariationId::ORIGINAL))
        {
            let Some(shader) = shader else {
                continue;
            };
            let code = shader.code().map_or(0, |code| code.len());
            println!("    {stage}: {} ({code} bytes)", shader.name());
        }
        print_space(&space);
    }
    Ok(())
}

fn main() -> ! {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Some(file) = env::args().nth(1) else {
        eprintln!("usage: sharc_dump <archive.sharc|archive.sharcfb>");
        exit(1)
    };

    let Ok(bytes) = std::fs::read(&file) else {
        eprintln!("could not read {file}");
        exit(1);
    };

    tracing::info!(file = %file, size = bytes.len(), "loading archive");

    // Loading works in place on a word-aligned buffer.
    let mut words = vec![0u32; bytes.len().div_ceil(4)];
    let blob = &mut bytemuck::cast_slice_mut::<u32, u8>(&mut words)[..bytes.len()];
    blob.copy_from_slice(&bytes);

    let extension = Path::new(&file).extension().and_then(|e| e.to_str());
    let result = if extension == Some(BinaryShaderArchive::EXTENSION) {
        dump_binary_archive(blob)
    } else {
        dump_archive(blob)
    };

    if let Err(err) = result {
        eprintln!("{file}: {err}");
        exit(1);
    }

    exit(0)
}
