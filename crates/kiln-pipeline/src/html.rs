//! HTML composer: reference built bundles from the page template.
//!
//! The template marks injection points with comment pairs:
//!
//! ```html
//! <!-- inject:css -->
//! <!-- endinject -->
//! ```
//!
//! Everything between a pair is replaced with one tag per built bundle, so
//! composing an already composed page gives the same result.

use async_trait::async_trait;
use kiln_graph::{Task, TaskError, TaskOutcome};
use std::sync::Arc;
use tracing::debug;

use crate::artifact::{OutputFile, write_files_atomic};
use crate::error::{PipelineError, Result};
use crate::mode::BuildMode;
use crate::paths::PathConfig;

const END_MARKER: &str = "<!-- endinject -->";

/// Elements whose content is never touched by whitespace collapsing.
const RAW_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

pub fn script_tag(url: &str) -> String {
    format!("<script src=\"{url}\"></script>")
}

pub fn stylesheet_tag(url: &str) -> String {
    format!("<link rel=\"stylesheet\" href=\"{url}\">")
}

/// Replace every `<!-- inject:{kind} -->` block with `tags`, one per line,
/// indented like the opening marker.
pub fn inject(html: &str, kind: &str, tags: &[String]) -> String {
    let start_marker = format!("<!-- inject:{kind} -->");
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find(&start_marker) {
        let after = start + start_marker.len();
        let Some(end) = rest[after..].find(END_MARKER) else {
            break;
        };
        let indent = line_indent(rest, start);

        out.push_str(&rest[..after]);
        for tag in tags {
            out.push('\n');
            out.push_str(indent);
            out.push_str(tag);
        }
        out.push('\n');
        out.push_str(indent);
        out.push_str(END_MARKER);

        rest = &rest[after + end + END_MARKER.len()..];
    }

    out.push_str(rest);
    out
}

/// Leading whitespace of the line containing `pos`, if the line has nothing
/// else before `pos`.
fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..pos];
    if prefix.chars().all(char::is_whitespace) {
        prefix
    } else {
        ""
    }
}

/// Collapse insignificant whitespace.
///
/// Every run of whitespace in text becomes one space. Whitespace touching a
/// block-level or document-structure tag, or the start or end of the page,
/// is removed entirely; between inline elements it stays a single space.
/// Tags, comments and the content of `pre`, `textarea`, `script` and `style`
/// elements are copied unchanged.
pub fn collapse_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    // Whether whitespace right after the last emitted tag may be dropped.
    let mut after_block = true;

    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            let end = rest.find("-->").map_or(rest.len(), |i| i + 3);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        } else if rest.starts_with('<') {
            let end = tag_end(rest);
            let tag = &rest[..end];
            out.push_str(tag);
            rest = &rest[end..];
            after_block = is_block(&tag_name(tag));

            if let Some(name) = raw_element(tag) {
                let close = format!("</{name}");
                let content_end = rest
                    .to_ascii_lowercase()
                    .find(&close)
                    .unwrap_or(rest.len());
                out.push_str(&rest[..content_end]);
                rest = &rest[content_end..];
            }
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let mut text = &rest[..end];
            rest = &rest[end..];

            if after_block {
                text = text.trim_start();
            }
            if before_block(rest) {
                text = text.trim_end();
            }
            push_collapsed(&mut out, text);
        }
    }

    out
}

/// Block-level and document-structure elements.
const BLOCK_ELEMENTS: &[&str] = &[
    "doctype", "html", "head", "body", "title", "meta", "link", "base", "script", "style",
    "noscript", "template", "div", "p", "pre", "blockquote", "ul", "ol", "li", "dl", "dt", "dd",
    "table", "caption", "thead", "tbody", "tfoot", "tr", "th", "td", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "footer", "main", "nav", "section", "article", "aside", "figure",
    "figcaption", "form", "fieldset", "legend", "hr", "address", "details", "summary",
];

fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// Whether text ending where `rest` starts may lose its trailing whitespace.
/// Comments count as block boundaries.
fn before_block(rest: &str) -> bool {
    if rest.is_empty() || rest.starts_with("<!--") {
        return true;
    }
    is_block(&tag_name(&rest[..tag_end(rest)]))
}

fn push_collapsed(out: &mut String, text: &str) {
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
}

/// Byte offset just past the `>` closing the tag at the start of `text`.
fn tag_end(text: &str) -> usize {
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices().skip(1) {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return i + 1,
            (None, _) => {}
        }
    }
    text.len()
}

/// Lowercase element name of an opening, closing or `<!...>` tag.
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches(['/', '!'])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Lowercase element name if `tag` opens a raw-content element.
fn raw_element(tag: &str) -> Option<String> {
    if tag.starts_with("</") || tag.ends_with("/>") {
        return None;
    }
    let name = tag_name(tag);
    RAW_ELEMENTS.contains(&name.as_str()).then_some(name)
}

/// Inject bundle references and optionally collapse whitespace.
pub fn compose(template: &str, scripts: &[String], styles: &[String], release: bool) -> String {
    let script_tags: Vec<String> = scripts.iter().map(|url| script_tag(url)).collect();
    let style_tags: Vec<String> = styles.iter().map(|url| stylesheet_tag(url)).collect();

    let html = inject(template, "css", &style_tags);
    let html = inject(&html, "js", &script_tags);
    if release { collapse_whitespace(&html) } else { html }
}

/// The `html` task.
#[derive(Debug, Clone)]
pub struct HtmlComposer {
    paths: Arc<PathConfig>,
    mode: BuildMode,
}

impl HtmlComposer {
    pub fn new(paths: Arc<PathConfig>, mode: BuildMode) -> Self {
        Self { paths, mode }
    }

    /// URLs of the bundles currently present in the output directory.
    fn built_bundles(&self) -> (Vec<String>, Vec<String>) {
        let paths = &self.paths;
        let scripts = paths
            .script_bundle_path()
            .is_file()
            .then(|| paths.url_for(&paths.script_bundle));
        let styles = paths
            .style_bundle_path()
            .is_file()
            .then(|| paths.url_for(&paths.style_bundle));
        (scripts.into_iter().collect(), styles.into_iter().collect())
    }

    pub async fn compose_page(&self) -> Result<String> {
        let template_path = self.paths.html_template_path();
        if !template_path.is_file() {
            return Err(PipelineError::MissingInput(template_path));
        }
        let template = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|e| PipelineError::io("Failed to read", &template_path, e))?;

        let (scripts, styles) = self.built_bundles();
        Ok(compose(&template, &scripts, &styles, self.mode.release))
    }
}

#[async_trait]
impl Task for HtmlComposer {
    async fn run(&self) -> std::result::Result<TaskOutcome, TaskError> {
        let page = self.compose_page().await?;
        let output = OutputFile::new(self.paths.html_output.clone(), page.into_bytes());
        write_files_atomic(&self.paths.out_root(), &[&output]).await?;
        debug!("Composed {} ({} bytes)", output.path.display(), output.len());
        Ok(TaskOutcome::Completed)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = "<!DOCTYPE html>
<html>
  <head>
    <title>  My   App </title>
    <!-- inject:css -->
    <!-- endinject -->
  </head>
  <body>
    <pre>
  keep   this
    </pre>
    <!-- inject:js -->
    <script src=\"/stale.js\"></script>
    <!-- endinject -->
  </body>
</html>
";

    #[test]
    fn test_inject_reuses_marker_indentation() {
        let html = compose(
            TEMPLATE,
            &["/app/bundle.js".to_string()],
            &["/css/site.css".to_string()],
            false,
        );
        assert!(html.contains(
            "    <!-- inject:css -->\n    <link rel=\"stylesheet\" href=\"/css/site.css\">\n    <!-- endinject -->"
        ));
        assert!(html.contains(
            "    <!-- inject:js -->\n    <script src=\"/app/bundle.js\"></script>\n    <!-- endinject -->"
        ));
        assert!(!html.contains("stale.js"));
    }

    #[test]
    fn test_inject_is_idempotent() {
        let scripts = vec!["/app/bundle.js".to_string()];
        let once = compose(TEMPLATE, &scripts, &[], false);
        let twice = compose(&once, &scripts, &[], false);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_bundles_empties_block() {
        let html = inject(TEMPLATE, "js", &[]);
        assert!(html.contains("    <!-- inject:js -->\n    <!-- endinject -->"));
    }

    #[test]
    fn test_release_collapses_whitespace_but_keeps_pre() {
        let html = compose(TEMPLATE, &["/app/bundle.js".to_string()], &[], true);
        assert!(html.contains("<title>My App</title>"));
        assert!(html.contains("<pre>\n  keep   this\n    </pre>"));
        assert!(html.contains("<!DOCTYPE html><html><head><title>"));
        assert!(!html.ends_with('\n'));
    }

    #[test]
    fn test_collapse_keeps_space_between_inline_elements() {
        let html = "<p><span>Hello</span> <span>world</span></p>";
        assert_eq!(collapse_whitespace(html), html);

        assert_eq!(
            collapse_whitespace("<p>\n  Hello   <b>big</b>\n  world\n</p>"),
            "<p>Hello <b>big</b> world</p>"
        );
    }

    #[test]
    fn test_collapse_drops_space_between_blocks() {
        let html = "<ul>\n  <li>One</li>\n  <li>Two</li>\n</ul>\n<div> <p>Three</p> </div>";
        assert_eq!(
            collapse_whitespace(html),
            "<ul><li>One</li><li>Two</li></ul><div><p>Three</p></div>"
        );
    }

    #[test]
    fn test_collapse_keeps_script_and_quoted_gt() {
        let html = "<div data-x=\"a > b\">\n  <script>\n if (a  >  b) {}\n</script>\n</div>";
        assert_eq!(
            collapse_whitespace(html),
            "<div data-x=\"a > b\"><script>\n if (a  >  b) {}\n</script></div>"
        );
    }

    #[tokio::test]
    async fn test_missing_template_propagates() {
        let temp = TempDir::new().unwrap();
        let composer = HtmlComposer::new(
            Arc::new(PathConfig::new(temp.path())),
            BuildMode::default(),
        );
        assert!(composer.run().await.is_err());
    }

    #[tokio::test]
    async fn test_only_existing_bundles_are_referenced() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("index.html"), TEMPLATE).unwrap();
        fs::create_dir_all(root.join("dist/css")).unwrap();
        fs::write(root.join("dist/css/site.css"), "body{}").unwrap();

        let composer = HtmlComposer::new(Arc::new(PathConfig::new(root)), BuildMode::default());
        composer.run().await.unwrap();

        let html = fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert!(html.contains("href=\"/css/site.css\""));
        assert!(!html.contains("bundle.js"));
    }
}
