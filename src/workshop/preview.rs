//! Preview resolver: turns the project file store into one runnable document.
//!
//! Every file gets an ephemeral reference minted into a [`ReferencePool`];
//! `href`/`src` attributes in the entry point that name a project file are
//! rewritten to those references, and a bridge script is injected so the
//! sandboxed page reports console output back to the workshop.

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::{Captures, Regex};

use super::files::FileStore;
use crate::ports::IdGenerator;

static HEAD_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head(\s[^>]*)?>").expect("Invalid head tag regex"));

/// Name of the file that drives the preview.
pub const ENTRY_POINT: &str = "index.html";

/// `source` field of messages posted by the bridge script.
pub const PREVIEW_SOURCE: &str = "workshop-preview";

/// Scheme prefix of pooled references.
pub const REFERENCE_PREFIX: &str = "blob:workshop/";

/// Text shown instead of a preview when there is no entry point.
pub const PLACEHOLDER_NOTICE: &str = "Create an `index.html` file to see a live preview.";

/// Script forwarding console output and uncaught errors to the parent frame.
pub const BRIDGE_SCRIPT: &str = r"<script>
(function () {
  var send = function (level, args) {
    try {
      var message = Array.prototype.map.call(args, function (a) {
        if (typeof a === 'string') { return a; }
        try { return JSON.stringify(a); } catch (e) { return String(a); }
      }).join(' ');
      window.parent.postMessage({ source: 'workshop-preview', level: level, message: message }, '*');
    } catch (e) {}
  };
  ['log', 'info', 'warn', 'error'].forEach(function (level) {
    var original = console[level];
    console[level] = function () {
      send(level, arguments);
      if (original) { original.apply(console, arguments); }
    };
  });
  window.onerror = function (message, source, line, column) {
    send('error', [message + ' (' + line + ':' + column + ')']);
  };
  window.addEventListener('unhandledrejection', function (event) {
    send('error', ['Unhandled promise rejection: ' + event.reason]);
  });
})();
</script>";

/// Maps a path's extension to a media type; unknown extensions are plain text.
#[must_use]
pub fn content_type(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}

/// How references are minted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceScheme {
    /// Opaque `blob:workshop/<id>` handles resolvable through the pool.
    #[default]
    Blob,
    /// Self-contained `data:` URLs, for exporting a standalone document.
    DataUrl,
}

/// Content held behind a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledResource {
    /// Project path the reference stands for.
    pub path: String,
    /// Media type.
    pub content_type: &'static str,
    /// File content.
    pub content: String,
}

/// References minted for one preview generation.
#[derive(Debug, Default)]
pub struct ReferencePool {
    generation: u64,
    entries: HashMap<String, PooledResource>,
}

impl ReferencePool {
    /// Mints a reference for `content` and returns its URL.
    pub fn mint(
        &mut self,
        ids: &dyn IdGenerator,
        path: &str,
        content: &str,
        scheme: ReferenceScheme,
    ) -> String {
        let media = content_type(path);
        let url = match scheme {
            ReferenceScheme::Blob => format!("{REFERENCE_PREFIX}{}", ids.generate_id()),
            ReferenceScheme::DataUrl => {
                format!("data:{media};base64,{}", STANDARD.encode(content.as_bytes()))
            }
        };
        self.entries.insert(
            url.clone(),
            PooledResource { path: path.to_string(), content_type: media, content: content.to_string() },
        );
        url
    }

    /// Looks up a live reference.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<&PooledResource> {
        self.entries.get(url)
    }

    /// Live references and what they resolve to.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PooledResource)> {
        self.entries.iter().map(|(url, resource)| (url.as_str(), resource))
    }

    /// Invalidates every reference and starts a new generation.
    ///
    /// Returns how many references were released.
    pub fn release_all(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        self.generation += 1;
        released
    }

    /// Number of live references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no references are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of completed releases.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Output of a preview render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// No entry point exists.
    Placeholder(String),
    /// A runnable document.
    Document {
        /// Path of the entry point used.
        entry_point: String,
        /// Rewritten HTML with the bridge script injected.
        html: String,
    },
}

/// Renders previews and owns the reference pool of the current generation.
#[derive(Debug, Default)]
pub struct PreviewResolver {
    pool: ReferencePool,
    scheme: ReferenceScheme,
}

impl PreviewResolver {
    /// Releases the previous generation and renders the store's entry point.
    pub fn render(
        &mut self,
        ids: &dyn IdGenerator,
        files: &FileStore,
        scheme: ReferenceScheme,
    ) -> Preview {
        self.scheme = scheme;
        let released = self.pool.release_all();
        if released > 0 {
            tracing::debug!(released, "released preview references");
        }

        let Some(entry) = files.entry_point() else {
            return Preview::Placeholder(PLACEHOLDER_NOTICE.to_string());
        };

        let mut html = entry.content.clone();
        for file in files.iter() {
            let url = self.pool.mint(ids, &file.file_name, &file.content, scheme);
            html = rewrite_references(&html, &file.file_name, &url);
        }

        Preview::Document { entry_point: entry.file_name.clone(), html: inject_bridge(&html) }
    }

    /// The live pool.
    #[must_use]
    pub fn pool(&self) -> &ReferencePool {
        &self.pool
    }

    /// Scheme of the latest render.
    #[must_use]
    pub fn scheme(&self) -> ReferenceScheme {
        self.scheme
    }

    /// Invalidates every outstanding reference.
    pub fn release(&mut self) -> usize {
        self.pool.release_all()
    }
}

impl Drop for PreviewResolver {
    fn drop(&mut self) {
        self.pool.release_all();
    }
}

/// Replaces `href`/`src` values equal to `path` (optionally `./`-prefixed) with `url`.
#[must_use]
pub fn rewrite_references(html: &str, path: &str, url: &str) -> String {
    let pattern = format!(
        r#"(?i)(?P<attr>\b(?:href|src)\s*=\s*)(?P<open>["'])(?-i:(?:\./)?{})(?P<close>["'])"#,
        regex::escape(path)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return html.to_string();
    };
    re.replace_all(html, |caps: &Captures<'_>| {
        if caps["open"] == caps["close"] {
            format!("{}{}{url}{}", &caps["attr"], &caps["open"], &caps["close"])
        } else {
            caps[0].to_string()
        }
    })
    .into_owned()
}

/// Inserts [`BRIDGE_SCRIPT`] right after the opening `<head>` tag, or at the
/// start of the document when there is none.
#[must_use]
pub fn inject_bridge(html: &str) -> String {
    match HEAD_TAG.find(html) {
        Some(tag) => {
            let mut out = String::with_capacity(html.len() + BRIDGE_SCRIPT.len());
            out.push_str(&html[..tag.end()]);
            out.push_str(BRIDGE_SCRIPT);
            out.push_str(&html[tag.end()..]);
            out
        }
        None => format!("{BRIDGE_SCRIPT}{html}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingIds(AtomicUsize);

    impl IdGenerator for CountingIds {
        fn generate_id(&self) -> String {
            format!("ref-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn store(files: &[(&str, &str)]) -> FileStore {
        let mut store = FileStore::default();
        for (path, content) in files {
            store.create_file(path, "", *content);
        }
        store
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type("index.html"), "text/html");
        assert_eq!(content_type("css/site.CSS"), "text/css");
        assert_eq!(content_type("app.js"), "application/javascript");
        assert_eq!(content_type("logo.png"), "image/png");
        assert_eq!(content_type("main.py"), "text/plain");
        assert_eq!(content_type("Makefile"), "text/plain");
    }

    #[test]
    fn rewrites_only_the_matching_file() {
        let ids = CountingIds(AtomicUsize::new(0));
        let files = store(&[("index.html", r#"<img src="./logo.png">"#), ("logo.png", "PNG")]);
        let mut resolver = PreviewResolver::default();

        let Preview::Document { html, .. } = resolver.render(&ids, &files, ReferenceScheme::Blob)
        else {
            panic!("expected a document");
        };

        // index.html minted ref-0, logo.png minted ref-1.
        assert!(html.contains(r#"<img src="blob:workshop/ref-1">"#));
        assert!(!html.contains("blob:workshop/ref-0"));
        assert_eq!(resolver.pool().resolve("blob:workshop/ref-1").unwrap().path, "logo.png");
    }

    #[test]
    fn matching_is_exact_and_quote_balanced() {
        let html = r#"<script src="app.js"></script><script src="lib/app.js"></script><a href='app.js"'>"#;
        let out = rewrite_references(html, "app.js", "blob:workshop/x");
        assert!(out.contains(r#"<script src="blob:workshop/x"></script>"#));
        assert!(out.contains(r#"<script src="lib/app.js"></script>"#));
        assert!(out.contains(r#"<a href='app.js"'>"#));
    }

    #[test]
    fn paths_are_escaped() {
        let out = rewrite_references(r#"<link href="a+b.css"><link href="aab.css">"#, "a+b.css", "U");
        assert_eq!(out, r#"<link href="U"><link href="aab.css">"#);
    }

    #[test]
    fn missing_entry_point_yields_placeholder() {
        let ids = CountingIds(AtomicUsize::new(0));
        let mut resolver = PreviewResolver::default();
        let preview = resolver.render(&ids, &store(&[("app.py", "print()")]), ReferenceScheme::Blob);
        assert_eq!(preview, Preview::Placeholder(PLACEHOLDER_NOTICE.into()));
        assert!(resolver.pool().is_empty());
    }

    #[test]
    fn each_render_releases_the_previous_generation() {
        let ids = CountingIds(AtomicUsize::new(0));
        let files = store(&[("index.html", "<p>hi</p>"), ("a.css", "p{}")]);
        let mut resolver = PreviewResolver::default();

        resolver.render(&ids, &files, ReferenceScheme::Blob);
        assert_eq!(resolver.pool().len(), 2);
        assert!(resolver.pool().resolve("blob:workshop/ref-0").is_some());

        resolver.render(&ids, &files, ReferenceScheme::Blob);
        assert_eq!(resolver.pool().len(), 2);
        assert!(resolver.pool().resolve("blob:workshop/ref-0").is_none());
        assert!(resolver.pool().resolve("blob:workshop/ref-2").is_some());
        let mut paths: Vec<&str> = resolver.pool().iter().map(|(_, r)| r.path.as_str()).collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["a.css", "index.html"]);

        assert_eq!(resolver.release(), 2);
        assert!(resolver.pool().is_empty());
    }

    #[test]
    fn data_urls_embed_content() {
        let ids = CountingIds(AtomicUsize::new(0));
        let files = store(&[("index.html", r#"<link href="s.css">"#), ("s.css", "p{}")]);
        let mut resolver = PreviewResolver::default();

        let Preview::Document { html, .. } =
            resolver.render(&ids, &files, ReferenceScheme::DataUrl)
        else {
            panic!("expected a document");
        };
        assert!(html.contains(r#"href="data:text/css;base64,cHt9""#));
    }

    #[test]
    fn bridge_goes_after_head_or_first() {
        let with_head = inject_bridge("<html><HEAD lang=\"en\"><title>x</title></HEAD></html>");
        let head_end = with_head.find("<HEAD lang=\"en\">").unwrap() + "<HEAD lang=\"en\">".len();
        assert!(with_head[head_end..].starts_with("<script>"));
        assert!(with_head.contains(PREVIEW_SOURCE));

        let bare = inject_bridge("<p>hi</p>");
        assert!(bare.starts_with("<script>"));
        assert!(bare.ends_with("<p>hi</p>"));
    }
}
