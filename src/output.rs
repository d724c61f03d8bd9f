use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Suppress decorative terminal output (banners, section headers) when
/// `GRADCHECK_QUIET` is set to `1` or `true`.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("GRADCHECK_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
