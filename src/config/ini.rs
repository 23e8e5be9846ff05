//! Reader for Sabnzbd's own `sabnzbd.ini`.
//!
//! The file is parsed into a flat layer keyed `<section>.<key>` and merged into
//! the store through [`IniParser::merge`], which only extracts the API key and
//! rebuilds the target URL from `host`/`port`/`enable_https`.

use tracing::debug;
use url::Url;

use super::store::{Layer, Mapping, Parser, Value};
use crate::error::{Result, SabnzbdError};

/// Section assumed for keys that appear before any `[section]` header.
const DEFAULT_SECTION: &str = "misc";

/// Header artifacts written by Sabnzbd that carry no configuration.
const IGNORED_MARKERS: [&str; 2] = ["sabnzbd.ini_version__", "__encoding__"];

/// Read-only parser for the `sabnzbd.ini` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct IniParser;

impl IniParser {
    pub fn new() -> Self {
        Self
    }

    /// Merge function applying a parsed `sabnzbd.ini` layer.
    ///
    /// `base_url` is the caller-supplied URL from before any layer was
    /// loaded. When the file provides both `host` and `port`, the scheme and
    /// authority of `base_url` are replaced while its path and query are kept;
    /// with an empty `base_url` the URL is built from scratch.
    ///
    /// # Examples
    ///
    /// ```
    /// use sabnzbd_exporter::config::ini::IniParser;
    /// use sabnzbd_exporter::config::store::{Layer, Mapping, Value};
    ///
    /// let src = Layer::from_iter([("misc.host", "::"), ("misc.port", "8080")]);
    /// let mut dest = Mapping::new();
    ///
    /// let merge = IniParser::new().merge("http://sabnzbd.example.com:9090");
    /// merge(&src, &mut dest).unwrap();
    ///
    /// assert_eq!(dest.get("url"), Some(&Value::from("http://localhost:8080")));
    /// ```
    pub fn merge(&self, base_url: &str) -> impl Fn(&Layer, &mut Mapping) -> Result<()> {
        let base_url = base_url.to_string();
        move |src, dest| merge_ini(&base_url, src, dest)
    }
}

impl Parser for IniParser {
    fn unmarshal(&self, bytes: &[u8]) -> Result<Layer> {
        let text = String::from_utf8_lossy(bytes);
        let mut layer = Layer::new();
        let mut section = DEFAULT_SECTION.to_string();

        for line in text.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if IGNORED_MARKERS.iter().any(|marker| line.contains(marker)) {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                section = line.trim_matches(|c: char| c == '[' || c == ']').to_string();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            layer.insert(format!("{}.{}", section, key.trim()), value);
        }

        debug!(keys = layer.len(), "Parsed sabnzbd.ini");
        Ok(layer)
    }

    fn marshal(&self, _layer: &Layer) -> Result<Vec<u8>> {
        Err(SabnzbdError::Unsupported("writing sabnzbd.ini"))
    }
}

fn merge_ini(base_url: &str, src: &Layer, dest: &mut Mapping) -> Result<()> {
    if let Some(api_key) = non_empty(src, "misc.api_key") {
        dest.insert("api-key".to_string(), Value::String(api_key));
    }

    let (Some(host), Some(mut port)) = (non_empty(src, "misc.host"), non_empty(src, "misc.port"))
    else {
        return Ok(());
    };

    let protocol = if src.string("misc.enable_https").as_deref() == Some("1") {
        if let Some(https_port) = non_empty(src, "misc.https_port") {
            port = https_port;
        }
        "https"
    } else {
        "http"
    };

    let host = normalize_host(&host);
    let url = build_url(base_url, protocol, &host, &port)?;
    debug!(url = %url, "Derived Sabnzbd URL from sabnzbd.ini");
    dest.insert("url".to_string(), Value::String(url));
    Ok(())
}

fn non_empty(src: &Layer, key: &str) -> Option<String> {
    src.string(key).filter(|value| !value.is_empty())
}

/// `::` and blank hosts mean "all interfaces"; other IPv6 literals need brackets.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() || host == "::" {
        "localhost".to_string()
    } else if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Build `<protocol>://[userinfo@]<host>:<port><rest>`, where userinfo and
/// everything after the authority are taken verbatim from `base_url`.
fn build_url(base_url: &str, protocol: &str, host: &str, port: &str) -> Result<String> {
    let (userinfo, rest) = if base_url.is_empty() {
        (None, "")
    } else {
        Url::parse(base_url).map_err(|source| SabnzbdError::Url {
            context: "base URL",
            source,
        })?;
        split_base(base_url)
    };

    let url = match userinfo {
        Some(userinfo) => format!("{}://{}@{}:{}{}", protocol, userinfo, host, port, rest),
        None => format!("{}://{}:{}{}", protocol, host, port, rest),
    };
    Url::parse(&url).map_err(|source| SabnzbdError::Url {
        context: "constructed URL",
        source,
    })?;

    Ok(url)
}

/// Split a parsed base URL into its userinfo and the text following its
/// authority. A base without a `//` authority contributes neither.
fn split_base(base_url: &str) -> (Option<&str>, &str) {
    let Some((_, after_scheme)) = base_url.split_once("://") else {
        return (None, "");
    };

    let end = after_scheme
        .find(&['/', '?', '#'][..])
        .unwrap_or(after_scheme.len());
    let (authority, rest) = after_scheme.split_at(end);
    let userinfo = authority.rsplit_once('@').map(|(userinfo, _)| userinfo);
    (userinfo, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Layer {
        IniParser::new().unmarshal(text.as_bytes()).unwrap()
    }

    fn merge(base_url: &str, src: &Layer) -> Result<Mapping> {
        let mut dest = Mapping::new();
        IniParser::new().merge(base_url)(src, &mut dest)?;
        Ok(dest)
    }

    fn url_of(dest: &Mapping) -> Option<String> {
        dest.get("url").map(Value::to_string)
    }

    #[test]
    fn test_unmarshal_sections_and_default_section() {
        let layer = parse(
            r#"
host = ::
port = 8080

[servers]
[[news.example.com]]
name = news.example.com
"#,
        );

        assert_eq!(layer.string("misc.host").as_deref(), Some("::"));
        assert_eq!(layer.string("misc.port").as_deref(), Some("8080"));
        assert_eq!(
            layer.string("news.example.com.name").as_deref(),
            Some("news.example.com")
        );
    }

    #[test]
    fn test_unmarshal_skips_comments_and_headers_anywhere() {
        let layer = parse(
            r#"sabnzbd.ini_version__ = 19
__encoding__ = utf-8
# comment = 1
[misc]
; other = 2
api_key = "abcdef0123456789abcdef0123456789"

__encoding__ = latin-1
no separator here
"#,
        );

        assert_eq!(layer.len(), 1);
        assert_eq!(
            layer.string("misc.api_key").as_deref(),
            Some("abcdef0123456789abcdef0123456789")
        );
    }

    #[test]
    fn test_unmarshal_splits_on_first_equals_and_strips_quotes() {
        let layer = parse("[misc]\n  password = \"a=b\"  \nhost=1.2.3.4\nhost = 5.6.7.8\n");

        assert_eq!(layer.string("misc.password").as_deref(), Some("a=b"));
        assert_eq!(layer.string("misc.host").as_deref(), Some("5.6.7.8"));
    }

    #[test]
    fn test_marshal_is_unsupported() {
        let parser = IniParser::new();
        assert!(matches!(
            parser.marshal(&Layer::new()),
            Err(SabnzbdError::Unsupported(_))
        ));
        assert!(parser.marshal(&parse("host = ::")).is_err());
    }

    #[test]
    fn test_merge_any_host_becomes_localhost() {
        let src = Layer::from_iter([("misc.host", "::"), ("misc.port", "8080")]);

        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("http://localhost:8080"));
        assert_eq!(
            url_of(&merge("http://localhost", &src).unwrap()).as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_merge_overrides_base_authority_and_keeps_path() {
        let src = Layer::from_iter([("misc.host", "::"), ("misc.port", "8080")]);

        let dest = merge("http://sabnzbd.example.com:9090", &src).unwrap();
        assert_eq!(url_of(&dest).as_deref(), Some("http://localhost:8080"));

        let dest = merge("https://user:pw@sabnzbd.example.com:9090/sabnzbd?x=1", &src).unwrap();
        assert_eq!(
            url_of(&dest).as_deref(),
            Some("http://user:pw@localhost:8080/sabnzbd?x=1")
        );
    }

    #[test]
    fn test_merge_https_uses_https_port() {
        let src = Layer::from_iter([
            ("misc.host", "sab.lan"),
            ("misc.port", "8080"),
            ("misc.enable_https", "1"),
            ("misc.https_port", "9090"),
        ]);
        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("https://sab.lan:9090"));

        let src = Layer::from_iter([
            ("misc.host", "sab.lan"),
            ("misc.port", "8080"),
            ("misc.enable_https", "0"),
            ("misc.https_port", "9090"),
        ]);
        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("http://sab.lan:8080"));
    }

    #[test]
    fn test_merge_https_without_https_port_keeps_port() {
        let src = Layer::from_iter([
            ("misc.host", "sab.lan"),
            ("misc.port", "8080"),
            ("misc.enable_https", "1"),
            ("misc.https_port", ""),
        ]);
        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("https://sab.lan:8080"));
    }

    #[test]
    fn test_merge_brackets_ipv6_hosts() {
        let src = Layer::from_iter([("misc.host", "::1"), ("misc.port", "8080")]);
        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("http://[::1]:8080"));

        let src = Layer::from_iter([("misc.host", "[::1]"), ("misc.port", "8080")]);
        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("http://[::1]:8080"));
    }

    #[test]
    fn test_merge_coerces_integer_values() {
        let src = Layer::from_iter([
            ("misc.host", Value::from("127.0.0.1")),
            ("misc.port", Value::from(8080)),
            ("misc.enable_https", Value::from(1i64)),
            ("misc.https_port", Value::from(8443)),
        ]);
        assert_eq!(
            url_of(&merge("", &src).unwrap()).as_deref(),
            Some("https://127.0.0.1:8443")
        );
    }

    #[test]
    fn test_merge_extracts_api_key_only_when_non_empty() {
        let dest = merge("", &Layer::from_iter([("misc.api_key", "abc")])).unwrap();
        assert_eq!(dest.get("api-key"), Some(&Value::from("abc")));
        assert!(!dest.contains_key("url"));

        let dest = merge("", &Layer::from_iter([("misc.api_key", "")])).unwrap();
        assert!(dest.is_empty());
    }

    #[test]
    fn test_merge_requires_host_and_port() {
        let host_only = Layer::from_iter([("misc.host", "sab.lan")]);
        assert!(merge("http://base:1", &host_only).unwrap().is_empty());

        let port_only = Layer::from_iter([("misc.port", "8080")]);
        assert!(merge("http://base:1", &port_only).unwrap().is_empty());

        let empty_host = Layer::from_iter([("misc.host", ""), ("misc.port", "8080")]);
        assert!(merge("http://base:1", &empty_host).unwrap().is_empty());
    }

    #[test]
    fn test_merge_ignores_other_keys() {
        let src = Layer::from_iter([("misc.username", "admin"), ("servers.host", "news")]);
        assert!(merge("", &src).unwrap().is_empty());
    }

    #[test]
    fn test_merge_invalid_base_url_fails() {
        let src = Layer::from_iter([("misc.host", "::"), ("misc.port", "8080")]);
        let err = merge("http://[broken", &src).unwrap_err();
        assert!(matches!(err, SabnzbdError::Url { context: "base URL", .. }));
    }

    #[test]
    fn test_merge_invalid_port_fails() {
        let src = Layer::from_iter([("misc.host", "sab.lan"), ("misc.port", "eighty")]);
        let err = merge("", &src).unwrap_err();
        assert!(matches!(err, SabnzbdError::Url { context: "constructed URL", .. }));
    }

    #[test]
    fn test_merge_keeps_default_ports() {
        let src = Layer::from_iter([("misc.host", "sab.lan"), ("misc.port", "80")]);
        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("http://sab.lan:80"));

        let src = Layer::from_iter([
            ("misc.host", "sab.lan"),
            ("misc.port", "8080"),
            ("misc.enable_https", "1"),
            ("misc.https_port", "443"),
        ]);
        assert_eq!(
            url_of(&merge("http://sabnzbd.example.com:9090", &src).unwrap()).as_deref(),
            Some("https://sab.lan:443")
        );
    }

    #[test]
    fn test_merge_keeps_base_path_as_written() {
        let src = Layer::from_iter([("misc.host", "::"), ("misc.port", "8080")]);

        let dest = merge("http://sabnzbd.example.com:9090/", &src).unwrap();
        assert_eq!(url_of(&dest).as_deref(), Some("http://localhost:8080/"));

        let dest = merge("http://sabnzbd.example.com:9090?apikey=x#top", &src).unwrap();
        assert_eq!(url_of(&dest).as_deref(), Some("http://localhost:8080?apikey=x#top"));
    }

    #[test]
    fn test_merge_keeps_host_case() {
        let src = Layer::from_iter([("misc.host", "SAB.LAN"), ("misc.port", "8080")]);
        assert_eq!(url_of(&merge("", &src).unwrap()).as_deref(), Some("http://SAB.LAN:8080"));
    }

    #[test]
    fn test_merge_base_without_authority() {
        let src = Layer::from_iter([("misc.host", "::"), ("misc.port", "8080")]);
        assert_eq!(
            url_of(&merge("sabnzbd.local:8080", &src).unwrap()).as_deref(),
            Some("http://localhost:8080")
        );

        let err = merge("192.168.1.5:8080", &src).unwrap_err();
        assert!(matches!(err, SabnzbdError::Url { context: "base URL", .. }));
    }

    #[test]
    fn test_split_base() {
        assert_eq!(split_base("http://u:p@host:1/a/b?q=1"), (Some("u:p"), "/a/b?q=1"));
        assert_eq!(split_base("http://host:1"), (None, ""));
        assert_eq!(split_base("opaque:value"), (None, ""));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("  "), "localhost");
        assert_eq!(normalize_host("::"), "localhost");
        assert_eq!(normalize_host(" 0.0.0.0 "), "0.0.0.0");
        assert_eq!(normalize_host("fe80::1"), "[fe80::1]");
        assert_eq!(normalize_host("[fe80::1]"), "[fe80::1]");
    }
}
