use crate::error::AppError;

/// Validate that a string is at most `max` characters long.
pub fn validate_max_length(value: &str, max: usize, field_name: &str) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field_name} must be at most {max} characters"
        )));
    }
    Ok(())
}
