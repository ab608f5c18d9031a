//! Standalone validator for menu files.
//!
//! Checks the structure of a menu JSON file: labels, texts, link buttons,
//! callback ids and the keyboard layout.

use std::process::ExitCode;

use clap::Parser;

use group_tally_bot::config::{MAX_MESSAGE_LENGTH, MenuConfig, MenuError};

/// Menu file validator.
#[derive(Parser, Debug)]
#[command(name = "validate_menu")]
#[command(about = "Validates menu files for the group tally bot")]
#[command(version)]
struct Args {
    /// Path to the menu JSON file to validate.
    #[arg(short, long, default_value = "menu.json")]
    file: String,

    /// Generate an example menu file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show detailed information for each entry.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    validate_menu(&args.file, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = MenuConfig::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example menu written to: {output_path}");
            println!("\nThe file contains {} example entries.", example.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_menu(path: &str, verbose: bool) -> ExitCode {
    println!("Validating: {path}\n");

    let config = match MenuConfig::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Failed to load menu: {e}");
            return ExitCode::FAILURE;
        }
    };

    let results = config.validate_all();

    let mut errors = 0;
    let mut warnings = 0;

    for (entry, result) in config.entries.iter().zip(&results) {
        let char_count = entry.char_count();

        if verbose {
            println!(
                "[{}] \"{}\" ({} chars, {} buttons{})",
                entry.label,
                truncate(&entry.text, 40),
                char_count,
                entry.button_count(),
                entry
                    .callback
                    .as_deref()
                    .map(|c| format!(", callback '{c}'"))
                    .unwrap_or_default()
            );
        }

        match result {
            Ok(()) => {
                let warn_threshold = MAX_MESSAGE_LENGTH * 90 / 100;
                if char_count > warn_threshold {
                    warnings += 1;
                    if verbose {
                        println!("  ⚠ Warning: {char_count} chars is close to the {MAX_MESSAGE_LENGTH} char limit");
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

    // Keyboard layout and deletion delays
    let layout = if config.is_empty() {
        Err(MenuError::NoEntries)
    } else {
        config.validate_layout()
    };
    let mut menu_errors = 0;
    if let Err(e) = layout {
        menu_errors += 1;
        println!("  ✗ Error: {e}");
    }

    println!();

    let total = config.len();
    if errors == 0 && menu_errors == 0 {
        println!("✓ All {total} menu entries are valid!");
        if warnings > 0 {
            println!("  ({warnings} warning(s) - replies close to the message limit)");
        }
        println!(
            "\nCleanup: button presses deleted after {}s, replies after {}s",
            config.user_message_ttl_secs, config.reply_ttl_secs
        );
        ExitCode::SUCCESS
    } else {
        println!("✗ Validation failed: {} error(s) in {total} entries", errors + menu_errors);
        println!("  Valid: {}/{total}", total - errors);
        ExitCode::FAILURE
    }
}

/// Truncates a string for display.
fn truncate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", chars[..max_len].iter().collect::<String>())
    }
}
