use crate::error::VerifyError;

/// Reports a failed header check and aborts the load.
///
/// The archive was packaged for a different build. The logged line and the
/// panic message carry the same text so either one identifies the archive.
#[track_caller]
pub(crate) fn fatal_verify(what: &'static str, error: VerifyError) -> ! {
    let msg = format!("[{what}] {error}");
    tracing::error!(target: "sharc", "{msg}");
    panic!("{msg}")
}

/// Logs a requested macro value that the macro does not declare.
pub(crate) fn unknown_macro_value(name: &str, value: &str) {
    tracing::warn!(target: "sharc", macro_name = name, value, "unknown variation macro value");
}
