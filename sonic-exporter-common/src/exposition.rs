//! Prometheus text exposition format (version 0.0.4) encoding.

use std::collections::HashMap;
use std::fmt::Write;

use crate::metric::{Labels, MetricSample};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode samples into the text exposition format.
///
/// Samples sharing a name are grouped into one family under a single
/// `# HELP`/`# TYPE` header. Families appear in the order their first sample
/// appears and samples keep their relative order within a family.
pub fn encode_text(samples: &[MetricSample]) -> String {
    let mut families: Vec<Vec<&MetricSample>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sample in samples {
        match index.get(sample.name.as_str()) {
            Some(&i) => families[i].push(sample),
            None => {
                index.insert(&sample.name, families.len());
                families.push(vec![sample]);
            }
        }
    }

    let mut output = String::with_capacity(samples.len() * 80);

    for family in families {
        let head = family[0];
        if !head.help.is_empty() {
            writeln!(output, "# HELP {} {}", head.name, escape_help(&head.help)).ok();
        }
        writeln!(output, "# TYPE {} {}", head.name, head.metric_type.as_str()).ok();

        for sample in family {
            writeln!(
                output,
                "{}{} {}",
                sample.name,
                format_labels(&sample.labels),
                format_value(sample.value)
            )
            .ok();
        }
    }

    output
}

/// Escape special characters in label values.
pub fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape help text. Quotes are left alone in `# HELP` lines.
pub fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format a label set as `{k="v",...}`; empty sets format as nothing.
pub fn format_labels(labels: &Labels) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
