use std::sync::LazyLock;

/// Whether to keep fixture directories after a test finishes
///
/// This is set to `false` by default, but can be overridden by the `TESTS_KEEP_TEMP_DIRS` environment
/// variable.
pub static TESTS_KEEP_TEMP_DIRS: LazyLock<bool> = LazyLock::new(|| {
    std::env::var("TESTS_KEEP_TEMP_DIRS")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
});

/// Initialize color backtraces and logging for every test in the binary.
#[ctor::ctor]
fn init_test_process() {
    color_backtrace::install();
    monitoring::logging::init();
}
