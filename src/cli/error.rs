// Error handling utilities for consistent error messages and exit codes

use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate pipeline name format (alphanumeric, dots, underscores, hyphens)
pub fn validate_pipeline_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Pipeline name cannot be empty".to_string());
    }

    if name.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(format!("Invalid pipeline name: '{}'. Pipeline names can only contain letters, numbers, dots, underscores, and hyphens.", name))
    }
}

/// Parse a monetary amount (non-negative, commas allowed as thousands separators)
pub fn parse_lead_value(value_str: &str) -> Result<f64, String> {
    let cleaned: String = value_str.chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.parse::<f64>()
        .map_err(|_| format!("Invalid value: '{}'. Value must be a number.", value_str))
        .and_then(|value| {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(format!("Invalid value: {}. Value must be non-negative.", value_str))
            }
        })
}
