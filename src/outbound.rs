//! Outbound messaging deep link. Pure URL construction; transport is an
//! external collaborator.

/// `https://wa.me/<digits>?text=<encoded message>`. Non-digits in the
/// phone are stripped.
pub fn build_deep_link(phone_e164: &str, message: &str) -> String {
    let digits: String = phone_e164.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("https://wa.me/{digits}?text={}", urlencoding::encode(message))
}
