//! Agent base URL handling

/// Path an agent serves its manifest at, relative to the base URL
pub const MANIFEST_PATH: &str = "/manifest.json";

/// Strip one trailing slash, then a literal `/manifest.json` suffix
pub fn normalize_base_url(url: &str) -> String {
    let url = url.strip_suffix('/').unwrap_or(url);
    url.strip_suffix(MANIFEST_PATH).unwrap_or(url).to_string()
}

/// `{baseUrl}/logo.png`
pub fn logo_url(base_url: &str) -> String {
    format!("{}/logo.png", base_url)
}
