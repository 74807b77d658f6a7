//! Renders a parsed feature set into the intermediate AsciiDoc document.
//!
//! The emitter is pure: same features and attributes always produce the
//! same text. Backend-specific behaviour is limited to the capability
//! toggle — HTML passes get docinfo decoration and passthrough widgets
//! that the PDF toolchain cannot process.

use std::fmt::Write;

use vivadoc_features::{Element, Feature, FeatureStats, StepStatus, totals};

use crate::application::render::types::DocumentAttributes;

/// Emit the full intermediate document for one conversion pass.
pub fn emit(features: &[Feature], attributes: &DocumentAttributes) -> String {
    let mut doc = String::new();
    let extensions = attributes.backend.render_mode().extensions_enabled();

    header(&mut doc, attributes, extensions);

    if extensions {
        controls_widget(&mut doc);
    }

    if !attributes.layout.hide_summary {
        summary_section(&mut doc, features);
    }

    features_section(&mut doc, features, attributes);

    doc
}

fn header(doc: &mut String, attributes: &DocumentAttributes, extensions: bool) {
    let _ = writeln!(doc, "= {}", attributes.title);
    let _ = writeln!(doc, ":toc: {}", attributes.toc.as_str());
    if attributes.numbered {
        doc.push_str(":numbered:\n");
    }
    if attributes.sect_anchors {
        doc.push_str(":sectanchors:\n");
    }
    doc.push_str(":sectlinks:\n");
    doc.push_str(":icons: font\n");
    if extensions {
        // docinfo pulls in the shared header/footer snippets; the PDF
        // backend chokes on them so it is gated on the render mode.
        doc.push_str(":docinfo: shared\n");
    }
    doc.push('\n');
}

/// HTML-only passthrough block with expand/collapse controls. Emitted as
/// raw HTML, which is exactly why it must never reach the PDF backend.
fn controls_widget(doc: &mut String) {
    doc.push_str("++++\n");
    doc.push_str("<div id=\"documentation-controls\">\n");
    doc.push_str("  <a href=\"#\" onclick=\"document.querySelectorAll('.sect1 .content').forEach(function(e){e.style.display='none'});return false\">Collapse all</a>\n");
    doc.push_str("  <a href=\"#\" onclick=\"document.querySelectorAll('.sect1 .content').forEach(function(e){e.style.display=''});return false\">Expand all</a>\n");
    doc.push_str("</div>\n");
    doc.push_str("++++\n\n");
}

fn summary_section(doc: &mut String, features: &[Feature]) {
    doc.push_str("== Summary\n\n");
    doc.push_str("[cols=\"3,1,1,1,1,2\", options=\"header\"]\n");
    doc.push_str("|===\n");
    doc.push_str("| Feature | Scenarios | Steps | Passed | Failed | Duration\n");

    for feature in features {
        let stats = FeatureStats::of(feature);
        let _ = writeln!(
            doc,
            "| <<{},{}>> | {} | {} | {} | {} | {}",
            feature.anchor(),
            feature.name,
            stats.scenarios,
            stats.steps,
            stats.passed_steps,
            stats.failed_steps,
            format_duration(stats.duration_nanos)
        );
    }

    let total = totals(features);
    let _ = writeln!(
        doc,
        "| *Totals* | *{}* | *{}* | *{}* | *{}* | *{}*",
        total.scenarios,
        total.steps,
        total.passed_steps,
        total.failed_steps,
        format_duration(total.duration_nanos)
    );
    doc.push_str("|===\n\n");
}

fn features_section(doc: &mut String, features: &[Feature], attributes: &DocumentAttributes) {
    // Hiding the features section promotes each feature to a top-level
    // chapter instead of nesting under a shared heading.
    let feature_level = if attributes.layout.hide_features_section {
        "=="
    } else {
        doc.push_str("== Features\n\n");
        "==="
    };
    let scenario_level = if attributes.layout.hide_features_section {
        "==="
    } else {
        "===="
    };

    for feature in features {
        let _ = writeln!(doc, "[[{}]]", feature.anchor());
        let _ = writeln!(doc, "{feature_level} {}", feature.name);
        doc.push('\n');

        if !attributes.layout.hide_tags {
            tags_line(doc, &feature.tags);
        }

        if let Some(description) = feature
            .description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            let _ = writeln!(doc, "{description}");
            doc.push('\n');
        }

        for scenario in feature.scenarios() {
            scenario_section(doc, scenario, scenario_level, attributes);
        }
    }
}

fn scenario_section(
    doc: &mut String,
    scenario: &Element,
    level: &str,
    attributes: &DocumentAttributes,
) {
    let name = scenario.display_name();
    if attributes.layout.hide_scenario_keyword {
        let _ = writeln!(doc, "{level} {name}");
    } else {
        let keyword = scenario.keyword.as_deref().unwrap_or("Scenario");
        let _ = writeln!(doc, "{level} {keyword}: {name}");
    }
    doc.push('\n');

    if !attributes.layout.hide_tags {
        tags_line(doc, &scenario.tags);
    }

    for step in &scenario.steps {
        let icon = status_icon(step.status());
        let keyword = step.keyword.as_deref().unwrap_or("").trim();
        let text = step.name.as_deref().unwrap_or("");
        if attributes.layout.hide_step_time {
            let _ = writeln!(doc, "* {icon} *{keyword}* {text}");
        } else {
            let _ = writeln!(
                doc,
                "* {icon} *{keyword}* {text} [small]#({})#",
                format_duration(step.duration_nanos())
            );
        }

        if let Some(message) = step
            .result
            .as_ref()
            .and_then(|result| result.error_message.as_deref())
        {
            doc.push_str("+\n....\n");
            doc.push_str(message.trim_end());
            doc.push_str("\n....\n");
        }
    }
    doc.push('\n');
}

fn tags_line(doc: &mut String, tags: &[vivadoc_features::Tag]) {
    if tags.is_empty() {
        return;
    }
    let rendered: Vec<String> = tags.iter().map(|tag| format!("`{}`", tag.name)).collect();
    let _ = writeln!(doc, "[.tags]#{}#", rendered.join(" "));
    doc.push('\n');
}

fn status_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Passed => "[green]*✔*",
        StepStatus::Failed => "[red]*✘*",
        _ => "[silver]*●*",
    }
}

/// Human-readable duration from Cucumber's nanosecond clock.
pub fn format_duration(nanos: u64) -> String {
    let millis = nanos / 1_000_000;
    if millis < 1_000 {
        return format!("{millis}ms");
    }
    let seconds = millis / 1_000;
    let rem_millis = millis % 1_000;
    if seconds < 60 {
        if rem_millis == 0 {
            return format!("{seconds}s");
        }
        return format!("{seconds}s {rem_millis}ms");
    }
    let minutes = seconds / 60;
    let rem_seconds = seconds % 60;
    if rem_seconds == 0 {
        format!("{minutes}m")
    } else {
        format!("{minutes}m {rem_seconds}s")
    }
}
