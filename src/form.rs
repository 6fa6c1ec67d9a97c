//! Typed, validated bindings for the urlencoded forms the site accepts.
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

use std::{borrow::Cow, collections::HashMap};

use crate::{cafe::Cafe, cafe::CafeChanges, user::NewUser};

/// Messages for failed fields, keyed by field name.
#[derive(Clone, Debug, Default)]
pub struct FieldErrors(HashMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(Vec::new)
            .push(message.into());
    }

    /// The first message for `field`, or an empty string.
    pub fn first(&self, field: &str) -> &str {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::default();
        for (field, failures) in errors.field_errors() {
            for failure in failures.iter() {
                let message = match failure.message {
                    Some(ref message) => message.to_string(),
                    None => failure.code.to_string(),
                };
                fields.add(&field.to_string(), message);
            }
        }
        fields
    }
}

/// Runs the form's validation rules, returning the messages on failure.
pub fn check<T: Validate>(form: &T) -> Result<(), FieldErrors> {
    form.validate().map_err(FieldErrors::from)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Rejects empty and whitespace-only input.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "This field is required."));
    }
    Ok(())
}

/// Only absolute `http` and `https` URLs with a host; these end up in `href` and `src`.
fn web_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(invalid("url", "Invalid URL.")),
    }
}

/// HTML checkboxes are only sent when ticked.
pub mod checkbox {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'d, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'d>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(!matches!(value.as_str(), "" | "false" | "off" | "0"))
    }
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

impl RegisterForm {
    pub fn into_new_user(self) -> NewUser {
        NewUser {
            name: self.name,
            email: self.email,
            password: self.password,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CafeForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "web_url"))]
    pub map_url: String,
    #[serde(default)]
    #[validate(custom(function = "web_url"))]
    pub img_url: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub location: String,
    #[serde(default, deserialize_with = "checkbox::deserialize")]
    pub has_sockets: bool,
    #[serde(default, deserialize_with = "checkbox::deserialize")]
    pub has_toilet: bool,
    #[serde(default, deserialize_with = "checkbox::deserialize")]
    pub has_wifi: bool,
    #[serde(default, deserialize_with = "checkbox::deserialize")]
    pub can_take_calls: bool,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub seats: String,
    #[serde(default)]
    pub coffee_price: String,
}

impl CafeForm {
    /// The record this form describes, written by `author`.
    pub fn to_changes(&self, author: i32) -> CafeChanges {
        let price = self.coffee_price.trim();
        CafeChanges {
            name: self.name.clone(),
            author: Some(author),
            map_url: self.map_url.clone(),
            img_url: self.img_url.clone(),
            location: self.location.clone(),
            seats: self.seats.clone(),
            has_toilet: self.has_toilet,
            has_wifi: self.has_wifi,
            has_sockets: self.has_sockets,
            can_take_calls: self.can_take_calls,
            coffee_price: if price.is_empty() {
                None
            } else {
                Some(self.coffee_price.clone())
            },
        }
    }
}

impl From<&Cafe> for CafeForm {
    fn from(cafe: &Cafe) -> Self {
        CafeForm {
            name: cafe.name.clone(),
            map_url: cafe.map_url.clone(),
            img_url: cafe.img_url.clone(),
            location: cafe.location.clone(),
            has_sockets: cafe.has_sockets,
            has_toilet: cafe.has_toilet,
            has_wifi: cafe.has_wifi,
            can_take_calls: cafe.can_take_calls,
            seats: cafe.seats.clone(),
            coffee_price: cafe.coffee_price.clone().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub comment: String,
}
