//! Response envelope handling: name check and status classification.

use gvmkit_common::GmpError;
use tracing::debug;

use crate::xml::XmlNode;

/// gvmd answers 503 while the scanner or database is temporarily unavailable.
const SERVICE_UNAVAILABLE: u16 = 503;

/// Validates the envelope of the response to `command` and returns it.
///
/// * The root must be `<command>_response`; anything else is a protocol violation.
/// * `status` must be a three-digit number.
/// * 2xx passes, 503 is transient, every other status is a remote rejection.
pub fn check<'a>(command: &str, root: &'a XmlNode) -> Result<&'a XmlNode, GmpError> {
    let expected = format!("{command}_response");
    if root.name != expected {
        return Err(GmpError::protocol(format!(
            "expected <{expected}>, got <{}>",
            root.name
        )));
    }

    let raw_status = root
        .attr("status")
        .ok_or_else(|| GmpError::protocol(format!("<{expected}> has no status")))?;
    let status: u16 = raw_status
        .parse()
        .ok()
        .filter(|s| (100..=599).contains(s))
        .ok_or_else(|| GmpError::protocol(format!("<{expected}> has invalid status '{raw_status}'")))?;
    let text = root.attr("status_text").unwrap_or_default().to_string();

    debug!(command, status, status_text = %text, "gmp response");

    match status {
        200..=299 => Ok(root),
        SERVICE_UNAVAILABLE => Err(GmpError::Transient(format!("{command}: {text}"))),
        _ => Err(GmpError::Remote {
            command: command.to_string(),
            status,
            text,
        }),
    }
}
