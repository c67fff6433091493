mod register_host;
mod set_domain_name;
mod unregister_host;

pub use register_host::RegisterHostUseCase;
pub use set_domain_name::SetDomainNameUseCase;
pub use unregister_host::UnregisterHostUseCase;

use minke_dns_domain::DomainError;

/// A single DNS label: letters, digits and hyphens, not starting or ending with a hyphen.
pub(crate) fn validate_label(label: &str) -> Result<(), DomainError> {
    let valid = !label.is_empty()
        && label.len() <= 63
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidDomainName(label.to_string()))
    }
}
