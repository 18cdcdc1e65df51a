//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the ScholarSynth CLI.

use crate::research::{TaskProgress, progress::DONE_PERCENT};
use owo_colors::OwoColorize;

const BAR_WIDTH: usize = 30;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the ScholarSynth banner
    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}",
                "ScholarSynth".bright_cyan().bold(),
                version.dimmed()
            );
            println!("   {}\n", "Multi-Stage Research Report Server".bright_white());
        } else {
            println!("\n   ScholarSynth {}", version);
            println!("   Multi-Stage Research Report Server\n");
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print one progress line for a task update
    pub fn progress(&self, progress: &TaskProgress) {
        let bar = progress_bar(progress.progress_percentage);
        let counts = if progress.sub_question_count > 0 {
            format!(" ({}/{})", progress.completed_count, progress.sub_question_count)
        } else {
            String::new()
        };

        if self.colored {
            println!(
                "  {} {} {}{}",
                bar.cyan(),
                format!("{:>3}%", progress.progress_percentage).bright_white().bold(),
                progress.current_step,
                counts.dimmed()
            );
        } else {
            println!(
                "  {} {:>3}% {}{}",
                bar, progress.progress_percentage, progress.current_step, counts
            );
        }
    }

    /// Print the finished report body
    pub fn report(&self, title: &str, content: &str, word_count: usize) {
        self.header(title);
        println!();
        println!("{}", content);
        println!();
        if self.colored {
            println!("  {}", format!("{} words", word_count).dimmed());
        } else {
            println!("  {} words", word_count);
        }
    }
}

fn progress_bar(percentage: u8) -> String {
    let filled = usize::from(percentage.min(DONE_PERCENT)) * BAR_WIDTH / usize::from(DONE_PERCENT);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
