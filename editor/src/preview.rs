//! Preview rendering
//!
//! Markdown source is turned into the HTML shown in the detached preview
//! pane. Uses pulldown-cmark for CommonMark parsing and rewrites the event
//! stream before it reaches the HTML writer: link and image destinations are
//! resolved against the public site URL, and raw HTML fragments are stripped
//! of unsafe markup and have their `href`/`src` attributes resolved too.
//! Text and code spans are never touched.
//!
//! Rendering never fails: pulldown-cmark accepts any input, so malformed
//! Markdown still yields some HTML.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use regex::{Captures, Regex};
use url::Url;

/// Configuration for preview rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewConfig {
    /// Enable GitHub-flavored markdown (tables, strikethrough, task lists)
    pub gfm: bool,
    /// Strip scripts, frames, inline handlers and `javascript:` links
    pub sanitize_html: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            gfm: true,
            sanitize_html: true,
        }
    }
}

/// Markdown → absolute-URL HTML, bound to one site's public base URL.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    base_url: Url,
    config: PreviewConfig,
}

impl PreviewRenderer {
    pub fn new(base_url: Url) -> Self {
        Self::with_config(base_url, PreviewConfig::default())
    }

    pub fn with_config(base_url: Url, config: PreviewConfig) -> Self {
        Self { base_url, config }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Deterministic and side-effect free.
    ///
    /// Only link/image destinations and raw HTML fragments are rewritten;
    /// text and code pass through as pulldown-cmark emits them.
    pub fn render(&self, markdown: &str) -> String {
        let mut filter = HtmlFilter::new(&self.base_url, self.config.sanitize_html);
        let events = Parser::new_ext(markdown, build_options(&self.config))
            .filter_map(|event| filter.apply(event));

        let mut output = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut output, events);
        output
    }
}

/// Parse markdown and render to HTML
pub fn markdown_to_html(input: &str, config: &PreviewConfig) -> String {
    let parser = Parser::new_ext(input, build_options(config));
    let mut output = String::with_capacity(input.len() * 2);
    html::push_html(&mut output, parser);
    output
}

fn build_options(config: &PreviewConfig) -> Options {
    let mut options = Options::empty();
    if config.gfm {
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
    }
    options
}

/// Per-document rewrite state. An unsafe element opened in one raw HTML
/// event may close several events later; everything in between is dropped.
struct HtmlFilter<'a> {
    base: &'a Url,
    sanitize: bool,
    skipping: Option<String>,
}

impl<'a> HtmlFilter<'a> {
    fn new(base: &'a Url, sanitize: bool) -> Self {
        Self {
            base,
            sanitize,
            skipping: None,
        }
    }

    fn apply<'e>(&mut self, event: Event<'e>) -> Option<Event<'e>> {
        match event {
            Event::Html(raw) => self.fragment(&raw).map(|html| Event::Html(html.into())),
            Event::InlineHtml(raw) => self
                .fragment(&raw)
                .map(|html| Event::InlineHtml(html.into())),
            // Structure stays balanced even inside a dropped element.
            Event::Start(tag) if self.skipping.is_none() => Some(Event::Start(self.tag(tag))),
            event @ (Event::Start(_) | Event::End(_)) => Some(event),
            _ if self.skipping.is_some() => None,
            event => Some(event),
        }
    }

    fn tag<'e>(&self, tag: Tag<'e>) -> Tag<'e> {
        match tag {
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => Tag::Link {
                link_type,
                dest_url: self.destination(dest_url),
                title,
                id,
            },
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => Tag::Image {
                link_type,
                dest_url: self.destination(dest_url),
                title,
                id,
            },
            other => other,
        }
    }

    fn destination<'e>(&self, dest: CowStr<'e>) -> CowStr<'e> {
        if self.sanitize && is_javascript(&dest) {
            return CowStr::Borrowed("#");
        }
        match absolutize(&dest, self.base) {
            Some(absolute) => absolute.into(),
            None => dest,
        }
    }

    /// Sanitise and absolutize one raw HTML fragment. `None` when nothing
    /// is left of it.
    fn fragment(&mut self, raw: &str) -> Option<String> {
        let html = if self.sanitize {
            let kept = strip_unsafe_elements(&mut self.skipping, raw);
            rewrite_tags(&kept, scrub_tag)
        } else {
            raw.to_string()
        };
        let html = absolutize_urls(&html, self.base);
        (!html.is_empty()).then_some(html)
    }
}

/// Copy `raw` minus any `<script>`, `<iframe>` or `<object>` element.
/// `skipping` names the element still open from an earlier fragment.
fn strip_unsafe_elements(skipping: &mut Option<String>, raw: &str) -> String {
    let mut kept = String::with_capacity(raw.len());
    let mut rest = raw;
    loop {
        if let Some(element) = skipping.take() {
            // ASCII lowering keeps byte offsets valid for `rest`.
            let lower = rest.to_ascii_lowercase();
            let Some(close) = lower.find(&format!("</{element}")) else {
                *skipping = Some(element);
                return kept;
            };
            rest = match rest[close..].find('>') {
                Some(end) => &rest[close + end + 1..],
                None => "",
            };
        }

        match UNSAFE_ELEMENT.captures(rest) {
            Some(caps) => {
                let open = caps.get(0).map_or(0..0, |m| m.range());
                kept.push_str(&rest[..open.start]);
                *skipping = Some(caps[1].to_ascii_lowercase());
                rest = &rest[open.end..];
            }
            None => {
                kept.push_str(rest);
                return kept;
            }
        }
    }
}

fn is_javascript(dest: &str) -> bool {
    dest.trim_start()
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z][^>]*>").expect("valid regex"));

static URL_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(href|src)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Apply `f` to every opening tag in `html`; text between tags is kept.
fn rewrite_tags(html: &str, f: impl Fn(&str) -> String) -> String {
    OPEN_TAG
        .replace_all(html, |caps: &Captures| f(&caps[0]))
        .into_owned()
}

/// Rewrite relative `href`/`src` attribute values of the tags in `html`
/// into absolute URLs resolved against `base`.
///
/// Left untouched: values that already carry a scheme (`https:`,
/// `mailto:`, `data:`, ...), fragment-only links, empty values and any
/// text outside a tag.
pub fn absolutize_urls(html: &str, base: &Url) -> String {
    rewrite_tags(html, |tag| {
        URL_ATTRIBUTE
            .replace_all(tag, |caps: &Captures| {
                let attribute = &caps[1];
                let separator = &caps[2];
                let (value, quote) = match (caps.get(3), caps.get(4)) {
                    (Some(v), _) => (v.as_str(), '"'),
                    (None, Some(v)) => (v.as_str(), '\''),
                    (None, None) => return caps[0].to_string(),
                };
                match absolutize(value, base) {
                    Some(absolute) => format!("{attribute}{separator}{quote}{absolute}{quote}"),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    })
}

fn absolutize(value: &str, base: &Url) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    if Url::parse(trimmed).is_ok() {
        return None;
    }
    base.join(trimmed).ok().map(String::from)
}

static UNSAFE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(script|iframe|object)\b[^>]*>").expect("valid regex"));
static EMBED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^<embed\b").expect("valid regex"));
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});
static JS_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(href|src)\s*=\s*(?:"\s*javascript:[^"]*"|'\s*javascript:[^']*')"#)
        .expect("valid regex")
});

/// Drop inline handlers and `javascript:` URLs from one opening tag;
/// `<embed>` tags go entirely.
fn scrub_tag(tag: &str) -> String {
    if EMBED.is_match(tag) {
        return String::new();
    }
    let tag = EVENT_HANDLER.replace_all(tag, "");
    JS_LINK.replace_all(&tag, "${1}=\"#\"").into_owned()
}

/// Remove unsafe elements, handlers and `javascript:` URLs from a complete
/// HTML fragment.
pub fn sanitize_html(html: &str) -> String {
    let kept = strip_unsafe_elements(&mut None, html);
    rewrite_tags(&kept, scrub_tag)
}
