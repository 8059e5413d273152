use snooper_core::IdentitySource;

use super::{OutputFormat, emit, exit_on_error};
use crate::format;

pub fn run(show_identifiers: bool, json: bool) {
    let sources = snooper_core::sources::native();
    let identity = exit_on_error(sources.identity.read_with_policy(show_identifiers));
    let output = OutputFormat::from_flags(json, false);

    emit(output, &identity, |id| {
        let mut lines: Vec<String> = format::identity_rows(id)
            .into_iter()
            .map(|(label, value)| format!("{label:<14} {value}"))
            .collect();
        if !show_identifiers {
            lines.push(String::new());
            lines.push("Identifiers masked; pass --show-identifiers to reveal.".to_string());
        }
        lines
    });
}
