//! Standalone validator for link configuration files.
//!
//! Checks a links JSON file the same way the bot does at startup and reports
//! every problem instead of stopping at the first one.

use std::process::ExitCode;

use clap::Parser;

use community_link_bot::commands::links_keyboard;
use community_link_bot::config::{LinkConfig, MAX_CALLBACK_DATA_BYTES};

/// Link configuration validator.
#[derive(Parser, Debug)]
#[command(name = "validate_links")]
#[command(about = "Validates link configuration files for the community link bot")]
#[command(version)]
struct Args {
    /// Path to the JSON links file to validate.
    #[arg(short, long, default_value = "links.json")]
    file: String,

    /// Generate an example links file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show detailed information for each link.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    validate_links(&args.file, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = LinkConfig::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example links written to: {output_path}");
            println!("\nThe file contains {} example links.", example.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_links(path: &str, verbose: bool) -> ExitCode {
    println!("Validating: {path}\n");

    let config = match LinkConfig::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Failed to load links: {e}");
            return ExitCode::FAILURE;
        }
    };

    let results = config.validate_all();
    let mut errors = 0;
    let mut warnings = 0;

    for (i, result) in results.iter().enumerate() {
        let Some(link) = config.links.get(i) else {
            // Only the "no links" error has no entry behind it
            if let Err(e) = result {
                errors += 1;
                println!("  ✗ Error: {e}");
            }
            continue;
        };

        let data_len = link.callback_data().len();
        if verbose {
            println!("[{}] {} ({} bytes of button data)", link.label, link.url, data_len);
        }

        match result {
            Ok(()) => {
                if link.url.starts_with("http://") {
                    warnings += 1;
                    if verbose {
                        println!("  ⚠ Warning: plain http URL");
                    }
                } else if verbose {
                    println!("  ✓ OK");
                }
            }
            Err(e) => {
                errors += 1;
                println!("  ✗ Error: {e}");
            }
        }
    }

    println!();

    let total = config.len();
    if errors == 0 {
        println!("✓ All {total} links are valid!");

        if warnings > 0 {
            println!("  ({warnings} warning(s) - links using plain http)");
        }

        let keyboard = links_keyboard(&config);
        println!("\nKeyboard: {} rows, {} buttons", keyboard.rows.len(), keyboard.button_count());
        println!("Button data limit: {MAX_CALLBACK_DATA_BYTES} bytes");

        ExitCode::SUCCESS
    } else {
        println!("✗ Validation failed: {errors} error(s) in {total} links");
        println!("  Valid: {}/{total}", total.saturating_sub(errors));

        ExitCode::FAILURE
    }
}
