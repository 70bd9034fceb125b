//! Plain-text rendering of differences

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::differ::Differences;

/// Render `differences` as a human-readable report.
///
/// Entries appear in ascending path order and the root command is left
/// out. An empty string means there is nothing to report.
pub fn format_differences(differences: &Differences) -> String {
    let mut output = String::new();

    for (path, record) in differences {
        // The root command is a single token
        if !path.contains(' ') {
            continue;
        }

        output.push_str(path);
        if record.is_new_command {
            output.push_str(" (new command)");
        }
        output.push('\n');

        write_section(&mut output, "Added subcommands", &record.added_subcommands);
        write_section(&mut output, "Added options", &record.added_options);
        write_section(&mut output, "Removed subcommands", &record.removed_subcommands);
        write_section(&mut output, "Removed options", &record.removed_options);
        output.push('\n');
    }

    output
}

fn write_section(output: &mut String, title: &str, names: &BTreeSet<String>) {
    if names.is_empty() {
        return;
    }
    // Writing into a String cannot fail
    let _ = writeln!(output, "  {}:", title);
    for name in names {
        let _ = writeln!(output, "    * {}", name);
    }
}
