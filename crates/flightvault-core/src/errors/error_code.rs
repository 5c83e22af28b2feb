/// Stable machine-readable code for an error variant.
///
/// Codes never change once published; callers render them next to the
/// human-readable message.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}
