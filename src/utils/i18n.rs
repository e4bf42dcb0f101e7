use tracing::warn;

/// Locales shipped in `locales/`
pub const AVAILABLE_LOCALES: [&str; 2] = ["en", "fi"];

/// Switch the locale used for user-facing messages, falling back to English
pub fn set_locale(locale: &str) {
    // Accept region-qualified tags such as "en-US" or "fi_FI"
    let language = locale
        .split(['-', '_'])
        .next()
        .unwrap_or("en")
        .to_ascii_lowercase();

    if AVAILABLE_LOCALES.contains(&language.as_str()) {
        rust_i18n::set_locale(&language);
    } else {
        warn!("Locale {} is not available, using English", locale);
        rust_i18n::set_locale("en");
    }
}
