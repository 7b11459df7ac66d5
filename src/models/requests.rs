use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::models::domain::Gender;

/// Body for `auth/register` and `auth/resend-otp`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 10, max = 15))]
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 10, max = 15))]
    pub phone_number: String,
    #[validate(length(equal = 6), custom(function = "validate_digits"))]
    pub otp_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProfileSetupRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    pub gender: Gender,
    #[validate(range(min = 18, max = 100))]
    pub age: Option<u8>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MessageRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
}

fn validate_digits(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("digits_only"))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}
