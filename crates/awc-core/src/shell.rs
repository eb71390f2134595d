//! Shell quoting shared by every command the compiler emits.
//!
//! Both the firewall wrapper and the direct invocation path quote through
//! [`escape_arg`], so the same argument is always rendered the same way.

/// Characters that force an argument into single quotes.
const SPECIAL_CHARS: &[char] = &[
    '(', ')', '[', ']', '{', '}', '*', '?', '$', '`', '"', '\'', '\\', '|', '&', ';', '<', '>',
    ' ', '\t', '\n', '#', '~', '!', ',',
];

/// Quote a single argument for a POSIX shell.
///
/// Arguments already wrapped in double quotes are passed through untouched so
/// callers can opt into runtime expansion (e.g. `"${GITHUB_WORKSPACE}"`).
/// Plain words are returned as-is; anything else is single-quoted with
/// embedded single quotes rendered as `'\''`.
pub fn escape_arg(arg: &str) -> String {
    if arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"') {
        return arg.to_string();
    }
    if arg.is_empty() {
        return "''".to_string();
    }
    if !arg.contains(SPECIAL_CHARS) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Quote every argument and join with single spaces.
pub fn join_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| escape_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
