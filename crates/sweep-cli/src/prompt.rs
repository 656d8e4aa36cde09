use std::io::{self, Write};
use std::str::FromStr;

use sweep_worker::{LoginPrompt, WorkerError};

pub fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Parses a trimmed number, `None` for anything else.
pub fn parse_number<T: FromStr>(input: &str) -> Option<T> {
    input.trim().parse().ok()
}

/// Asks on the terminal for the login code and 2FA password.
pub struct StdinPrompt;

impl LoginPrompt for StdinPrompt {
    fn login_code(&self, phone_number: &str) -> Result<String, WorkerError> {
        read_line(&format!("Enter the code sent to {}: ", phone_number))
            .map_err(|e| WorkerError::Prompt(e.to_string()))
    }

    fn password(&self) -> Result<String, WorkerError> {
        read_line("Enter your two-step verification password: ")
            .map_err(|e| WorkerError::Prompt(e.to_string()))
    }
}
