use std::fmt::Display;

use colored::Colorize;
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{set_global_render_config, Password, Text};

use crate::error::Error;

/// How many unrecognised answers a yes/no prompt tolerates before
/// falling back to its default.
const YES_NO_ATTEMPTS: usize = 3;

/// Initialize the global render configuration for inquire prompts
pub fn init_render_config() {
    let mut style = RenderConfig::default_colored();
    style.prompt_prefix = Styled::new(">").with_fg(Color::LightGreen);
    set_global_render_config(style);
}

/// Print a progress line, e.g. `> Branch: feature/ABC-1`
pub fn step(label: &str, value: impl Display) {
    println!(
        "{} {}: {}",
        ">".bright_green(),
        label,
        value.to_string().bright_cyan()
    );
}

pub fn success(message: impl Display) {
    println!("{} {}", "+".bright_green(), message.to_string().green());
}

pub fn warn(message: impl Display) {
    println!("{} {}", "!".yellow(), message.to_string().yellow());
}

pub fn failure(message: impl Display) {
    println!("{} {}", "x".red(), message.to_string().red());
}

/// Prompt for a secret without echoing it
pub fn prompt_secret(message: &str) -> Result<String, Error> {
    Password::new(message).prompt().map_err(map_inquire_error)
}

/// Ask a yes/no question on the terminal
///
/// An empty answer selects `default`.
pub fn ask_yes_no(message: &str, default: bool) -> Result<bool, Error> {
    let hint = if default { "(y/n) [y]" } else { "(y/n) [n]" };
    let message = format!("{} {}", message.trim_end(), hint);

    ask_yes_no_with(
        || Text::new(&message).prompt().map_err(map_inquire_error),
        default,
    )
}

/// Drive a yes/no question with an arbitrary answer source
///
/// Unrecognised answers are re-asked at most [`YES_NO_ATTEMPTS`] times.
pub(crate) fn ask_yes_no_with<F>(mut ask: F, default: bool) -> Result<bool, Error>
where
    F: FnMut() -> Result<String, Error>,
{
    for _ in 0..YES_NO_ATTEMPTS {
        let answer = ask()?;
        match parse_yes_no(&answer) {
            Some(Some(choice)) => return Ok(choice),
            Some(None) => return Ok(default),
            None => warn(format!("Please answer y or n, got {:?}", answer)),
        }
    }

    warn(format!(
        "No valid answer, using default ({})",
        if default { "y" } else { "n" }
    ));
    Ok(default)
}

/// `Some(Some(_))` for an explicit choice, `Some(None)` for an empty
/// answer and `None` for anything else.
fn parse_yes_no(answer: &str) -> Option<Option<bool>> {
    match answer.trim().to_lowercase().as_str() {
        "" => Some(None),
        "y" | "yes" => Some(Some(true)),
        "n" | "no" => Some(Some(false)),
        _ => None,
    }
}

/// Map inquire errors to our error type
fn map_inquire_error(err: InquireError) -> Error {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => Error::Cancelled,
        _ => Error::Prompt(err.to_string()),
    }
}
