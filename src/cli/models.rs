use colored::Colorize;

use crate::budget::{DEFAULT_MODEL, known_models};

pub(crate) fn list() {
    println!("{}", "Supported models".bold());
    for (model, budget) in known_models() {
        let marker = if model == DEFAULT_MODEL {
            " (default)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("  {} {:>7} tokens{}", format!("{model:<12}").cyan(), budget, marker);
    }
}
