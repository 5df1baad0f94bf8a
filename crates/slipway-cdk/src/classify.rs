//! Failure classification for CDK toolkit output.

use slipway_core::DeployError;

const AUTHENTICATION: &[&str] = &[
    "expiredtoken",
    "invalidclienttokenid",
    "signaturedoesnotmatch",
    "security token",
    "unable to resolve aws account",
    "could not load credentials",
];

const PERMISSION: &[&str] = &[
    "accessdenied",
    "access denied",
    "not authorized",
    "unauthorizedoperation",
    "forbidden",
];

const NETWORK: &[&str] = &[
    "enotfound",
    "etimedout",
    "econnrefused",
    "econnreset",
    "getaddrinfo",
    "socket hang up",
    "networkingerror",
];

const VALIDATION: &[&str] = &[
    "validationerror",
    "template format error",
    "invalid template",
    "repository does not exist",
    "manifest for",
    "no such image",
    "failed to synthesize",
];

/// Map a failed toolkit invocation onto the error taxonomy.
///
/// Rollback states and anything unrecognized count as convergence
/// failures: the target demonstrably did not reach the declared state,
/// and the stderr tail rides along so nothing is swallowed.
pub(crate) fn classify_failure(
    operation: &str,
    exit_code: Option<i32>,
    stderr: &str,
) -> DeployError {
    let haystack = stderr.to_ascii_lowercase();
    let code = exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    let detail = format!(
        "{} exited with code {}: {}",
        operation,
        code,
        stderr_tail(stderr)
    );

    if AUTHENTICATION.iter().any(|p| haystack.contains(p)) {
        DeployError::Authentication(detail)
    } else if PERMISSION.iter().any(|p| haystack.contains(p)) {
        DeployError::Permission(detail)
    } else if NETWORK.iter().any(|p| haystack.contains(p)) {
        DeployError::Network(detail)
    } else if VALIDATION.iter().any(|p| haystack.contains(p)) {
        DeployError::Validation(detail)
    } else {
        DeployError::Convergence(detail)
    }
}

/// Last few non-empty stderr lines, enough to identify the failure
/// without replaying the toolkit's full progress output.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let tail_start = lines.len().saturating_sub(5);
    if lines.is_empty() {
        "(no stderr)".to_string()
    } else {
        lines[tail_start..].join("; ")
    }
}
