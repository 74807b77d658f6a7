//! Per-request theme substitution on rendered HTML.
//!
//! The converter inlines its stylesheet into `<head>`. Substitution is
//! a streaming rewrite: every inline stylesheet in the head is dropped
//! and the selected theme is appended in its place, leaving the stored
//! artifact untouched.

use lol_html::{
    RewriteStrSettings, element, errors::RewritingError, html_content::ContentType, rewrite_str,
};

pub fn apply_theme(html: &str, css: &str) -> Result<String, RewritingError> {
    let themed_style = format!("<style>\n{css}\n</style>");
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("head style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("head", move |el| {
                    el.append(&themed_style, ContentType::Html);
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )
}
