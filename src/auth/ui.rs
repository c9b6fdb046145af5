use std::fmt;
use std::io::{self, BufRead, Write};

const INVALID_CHOICE_MSG: &str = "Invalid choice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMenuItem {
    pub id: String,
    pub display_name: String,
    pub configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuSelection {
    Service(usize),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationChoice {
    Yes,
    No,
    Cancel,
}

#[derive(Debug, Clone)]
pub struct UiError {
    message: String,
}

impl UiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UiError {}

fn read_answer(prompt: &str) -> Result<String, UiError> {
    print!("{prompt}");
    io::stdout()
        .flush()
        .map_err(|err| UiError::new(err.to_string()))?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|err| UiError::new(err.to_string()))?;
    Ok(input)
}

pub fn prompt_service_menu(
    title: &str,
    services: &[ServiceMenuItem],
) -> Result<MenuSelection, UiError> {
    println!("{title}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    for (index, service) in services.iter().enumerate() {
        let status = if service.configured {
            "✓ configured"
        } else {
            "not configured"
        };
        println!(
            "  {}. {} ({}) - {}",
            index + 1,
            service.display_name,
            service.id,
            status
        );
    }
    println!("  {}. Cancel", services.len() + 1);
    println!();

    let input = read_answer(&format!("Select a service (1-{}): ", services.len() + 1))?;
    parse_menu_selection(&input, services.len())
}

pub fn prompt_token(display_name: &str) -> Result<String, UiError> {
    println!();
    println!("Selected service: {display_name}");
    let token = read_answer("Enter your API key: ")?;
    let token = token.trim();
    if token.is_empty() {
        return Err(UiError::new("Token cannot be empty"));
    }
    Ok(token.to_string())
}

pub fn prompt_confirmation(question: &str) -> Result<ConfirmationChoice, UiError> {
    let answer = read_answer(&format!("{question} (y/N): "))?;
    parse_confirmation(&answer)
}

pub fn parse_confirmation(input: &str) -> Result<ConfirmationChoice, UiError> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        return Ok(ConfirmationChoice::No);
    }
    match trimmed.as_str() {
        "y" | "yes" => Ok(ConfirmationChoice::Yes),
        "n" | "no" => Ok(ConfirmationChoice::No),
        "c" | "cancel" => Ok(ConfirmationChoice::Cancel),
        _ => Err(UiError::new("Invalid confirmation response")),
    }
}

/// Interpret a 1-based menu answer; the entry after the last service cancels.
pub fn parse_menu_selection(input: &str, service_count: usize) -> Result<MenuSelection, UiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UiError::new("Selection cannot be empty"));
    }

    let choice: usize = trimmed
        .parse()
        .map_err(|_| UiError::new(INVALID_CHOICE_MSG))?;

    if choice == 0 || choice > service_count + 1 {
        return Err(UiError::new(INVALID_CHOICE_MSG));
    }
    if choice == service_count + 1 {
        return Ok(MenuSelection::Cancel);
    }
    Ok(MenuSelection::Service(choice - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_parsing_handles_empty_and_cancel() {
        assert_eq!(parse_confirmation(" ").unwrap(), ConfirmationChoice::No);
        assert_eq!(parse_confirmation("Yes").unwrap(), ConfirmationChoice::Yes);
        assert_eq!(
            parse_confirmation("cancel").unwrap(),
            ConfirmationChoice::Cancel
        );
        assert!(parse_confirmation("maybe").is_err());
    }

    #[test]
    fn menu_selection_maps_trailing_entry_to_cancel() {
        assert_eq!(parse_menu_selection("2", 5).unwrap(), MenuSelection::Service(1));
        assert_eq!(parse_menu_selection("6", 5).unwrap(), MenuSelection::Cancel);
    }

    #[test]
    fn menu_selection_rejects_out_of_range_and_garbage() {
        assert!(parse_menu_selection("0", 5).is_err());
        assert!(parse_menu_selection("7", 5).is_err());
        assert!(parse_menu_selection("two", 5).is_err());
        assert!(parse_menu_selection("   ", 5).is_err());
    }
}
