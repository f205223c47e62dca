use std::sync::LazyLock;

/// Defines the application version.
///
/// Git metadata is absent when building outside a checkout; the build script
/// then only emits a warning and the sha falls back to `unknown`.
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{}-{}{}",
        env!("IMAGE_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        if option_env!("VERGEN_GIT_DIRTY") == Some("true") {
            "-dirty"
        } else {
            ""
        }
    )
});
