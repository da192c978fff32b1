//! Envmap CLI - Tool for inspecting and converting environment maps.

use envmap::cache::{cache_path, FilterKind};
use envmap::codec::{self, dds};
use envmap::image::PixelEncoding;
use envmap::layout;
use std::env;
use std::path::Path;

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = match verbosity {
        0 => "envmap=warn",
        1 => "envmap=debug",
        _ => "envmap=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    fmt().with_env_filter(filter).init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity: u8 = 0;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = 1,
            "-vv" | "--trace" => verbosity = 2,
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(verbosity);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        // Info command - classify and describe an image
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: envmap-cli info <image>");
                std::process::exit(1);
            }
            cmd_info(filtered_args[1]);
        }

        // Convert command - normalize into a cubemap DDS
        "convert" | "c" => {
            if filtered_args.len() < 3 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: envmap-cli convert <input> <output.dds> [--format 16f|32f]");
                std::process::exit(1);
            }
            let mut format = PixelEncoding::Rgba16f;
            if let Some(pos) = filtered_args.iter().position(|&s| s == "--format") {
                match filtered_args.get(pos + 1) {
                    Some(&"16f") => format = PixelEncoding::Rgba16f,
                    Some(&"32f") => format = PixelEncoding::Rgba32f,
                    other => {
                        eprintln!("Error: unknown format {:?} (expected 16f or 32f)", other);
                        std::process::exit(1);
                    }
                }
            }
            cmd_convert(filtered_args[1], filtered_args[2], format);
        }

        // Cache command - show derived cache file state
        "cache" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: envmap-cli cache <image>");
                std::process::exit(1);
            }
            cmd_cache(filtered_args[1]);
        }

        // Help
        "help" | "h" | "-h" | "--help" => print_help(),

        // Default: if file exists, show info; otherwise error
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(filtered_args[0]);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    }
}

fn print_help() {
    println!("envmap-cli - environment map toolkit");
    println!();
    println!("USAGE:");
    println!("    envmap-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <image>                Show dimensions, encoding and layout");
    println!("    c, convert <in> <out.dds>         Normalize into a 6-face cubemap DDS");
    println!("               [--format 16f|32f]     Storage format (default 16f)");
    println!("    cache      <image>                Show derived filter cache files");
    println!("    h, help                           Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!();
    println!("EXAMPLES:");
    println!("    envmap-cli info studio.hdr              # Classify a panorama");
    println!("    envmap-cli convert cross.png env.dds    # Repack a cross into a cubemap");
    println!("    envmap-cli cache studio.hdr             # List _pmrem/_iem cache state");
    println!();
    println!("NOTES:");
    println!("    - Passing an image file directly is equivalent to 'info'");
    println!("    - Supported sources: HDR, EXR, PNG, JPEG, DDS");
}

fn cmd_info(path: &str) {
    let img = match codec::load_native(Path::new(path)) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let layout = layout::classify(&img);
    println!("Image: {}", path);
    println!("Size:     {}x{}", img.width(), img.height());
    println!("Encoding: {}", img.encoding());
    println!("Faces:    {}", img.num_faces());
    println!("Mips:     {}", img.num_mips());
    println!("Layout:   {:?}", layout);
    if layout == layout::Layout::Unknown {
        println!();
        println!("This image cannot be normalized into a cubemap.");
    }
}

fn cmd_convert(input: &str, output: &str, format: PixelEncoding) {
    let img = match codec::load_native(Path::new(input)) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Failed to load {}: {}", input, e);
            std::process::exit(1);
        }
    };

    let layout = layout::classify(&img);
    let cube = match layout::normalize(img) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to normalize {}: {}", input, e);
            std::process::exit(1);
        }
    };
    let face_size = cube.width();

    if let Err(e) = dds::save(cube, Path::new(output), format) {
        eprintln!("Failed to write {}: {}", output, e);
        std::process::exit(1);
    }

    println!(
        "Converted {} ({:?}) -> {} ({} face size, {})",
        input, layout, output, face_size, format
    );
}

fn cmd_cache(path: &str) {
    let source = Path::new(path);
    println!("Source: {}", path);
    for kind in [
        FilterKind::Radiance(Default::default()),
        FilterKind::Irradiance(Default::default()),
    ] {
        let file = cache_path(source, &kind);
        let state = if file.exists() { "present" } else { "missing" };
        println!("  {:8} {} [{}]", kind.cache_suffix(), file.display(), state);
    }
}
