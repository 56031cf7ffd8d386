/// Generic remote-execution wrapper whose first argument is the real check.
pub const NRPE_WRAPPER: &str = "check_nrpe2";

/// Returns the canonical check name for a raw `check_command`.
///
/// Arguments are separated by `!`. Commands run through the NRPE wrapper
/// report under the wrapped check:
///
/// ```text
/// check_load!5.0!4.0!3.0!10.0!6.0!4.0  ->  check_load
/// check_nrpe2!check_node               ->  check_node
/// ```
pub fn canonical_command(raw: &str) -> &str {
    let mut fields = raw.split('!');
    let first = fields.next().unwrap_or_default();

    match fields.next() {
        Some(wrapped) if first == NRPE_WRAPPER => wrapped,
        _ => first,
    }
}
