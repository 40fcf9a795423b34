//! Typed model of nginx configuration files.
//!
//! The bench generates `config/nginx.conf`; production setup adjusts its
//! static-asset handling. Instead of patching text, the file is parsed into a
//! tree of [`Node`]s, changed through setters, and rendered back with a
//! deterministic layout (4-space indent, one statement per line). Rendering
//! a parsed tree and parsing it again yields the same tree, so applying a
//! setter twice produces byte-identical output.
//!
//! Comments on their own line survive a round trip; comments embedded inside
//! a multi-line statement are dropped.
mod parser;

use std::fmt::{self, Write as _};

use thiserror::Error;

/// Indentation unit used when rendering.
const INDENT: &str = "    ";

/// Path of the static-asset location managed by the wizard.
pub const ASSETS_PATH: &str = "/assets";

/// Syntax error in an nginx configuration file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line of the offending statement.
    pub line: usize,
    /// Description of the problem.
    pub message: String,
}

/// A single statement in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `name arg...;`
    Directive(Directive),
    /// `name arg... { ... }`
    Block(Block),
    /// `# text`
    Comment(String),
}

/// A simple directive such as `listen 80;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directive name.
    pub name: String,
    /// Arguments, quotes preserved.
    pub args: Vec<String>,
}

impl Directive {
    /// Create a directive.
    #[must_use]
    pub fn new(name: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A block directive such as `server { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block name.
    pub name: String,
    /// Arguments before the opening brace.
    pub args: Vec<String>,
    /// Nested statements.
    pub children: Vec<Node>,
}

impl Block {
    /// Create an empty block.
    #[must_use]
    pub fn new(name: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            children: Vec::new(),
        }
    }

    /// Append a directive, builder style.
    #[must_use]
    pub fn with_directive(mut self, name: &str, args: &[&str]) -> Self {
        self.children
            .push(Node::Directive(Directive::new(name, args)));
        self
    }

    /// Direct child directives named `name`. The iterator borrows only
    /// `self`.
    pub fn directives<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = &'a Directive> + use<'a> {
        let name = name.to_owned();
        self.children.iter().filter_map(move |node| match node {
            Node::Directive(d) if d.name == name => Some(d),
            _ => None,
        })
    }

    /// First direct child directive named `name`.
    #[must_use]
    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives(name).next()
    }

    /// Whether this block is `location <path>` (optionally with the `=` or
    /// `^~` modifier). Regex locations never match.
    #[must_use]
    pub fn is_location(&self, path: &str) -> bool {
        if self.name != "location" {
            return false;
        }
        match self.args.as_slice() {
            [p] => p == path,
            [modifier, p] => matches!(modifier.as_str(), "=" | "^~") && p == path,
            _ => false,
        }
    }

    /// Direct child `location <path>` blocks.
    #[must_use]
    pub fn locations(&self, path: &str) -> Vec<&Self> {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Block(b) if b.is_location(path) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Replace every `location <path>` child with `location`.
    ///
    /// The replacement takes the position of the first existing match, or
    /// is appended when there was none.
    pub fn set_location(&mut self, path: &str, location: Self) {
        let position = self.children.iter().position(
            |node| matches!(node, Node::Block(b) if b.is_location(path)),
        );
        self.children
            .retain(|node| !matches!(node, Node::Block(b) if b.is_location(path)));
        let index = position.unwrap_or(self.children.len());
        self.children.insert(index, Node::Block(location));
    }
}

/// Desired contents of the static-asset location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetsLocation {
    /// Directory served for `/assets` (`<bench>/sites/assets`).
    pub alias: String,
    /// `Cache-Control` header value, without quotes.
    pub cache_control: String,
    /// `access_log` argument (`off` or a log path).
    pub access_log: String,
}

impl AssetsLocation {
    /// Default `Cache-Control` value for fingerprinted assets.
    pub const DEFAULT_CACHE_CONTROL: &'static str = "max-age=31536000, immutable";

    /// Settings for `alias` with the default cache policy and no access log.
    #[must_use]
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            cache_control: Self::DEFAULT_CACHE_CONTROL.to_string(),
            access_log: "off".to_string(),
        }
    }

    /// Override the `Cache-Control` value.
    #[must_use]
    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = value.into();
        self
    }

    /// Override the `access_log` argument.
    #[must_use]
    pub fn with_access_log(mut self, value: impl Into<String>) -> Self {
        self.access_log = value.into();
        self
    }

    /// The `location /assets` block these settings describe.
    #[must_use]
    pub fn to_block(&self) -> Block {
        let alias = quote_if_needed(&self.alias);
        let cache_control = format!("\"{}\"", self.cache_control.replace('"', "\\\""));
        let access_log = quote_if_needed(&self.access_log);
        Block::new("location", &[ASSETS_PATH])
            .with_directive("alias", &[alias.as_str()])
            .with_directive("try_files", &["$uri", "=404"])
            .with_directive("add_header", &["Cache-Control", cache_control.as_str()])
            .with_directive("access_log", &[access_log.as_str()])
    }
}

/// Quote an argument that contains characters nginx treats as separators.
fn quote_if_needed(arg: &str) -> String {
    let special = |c: char| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#' | '"' | '\'');
    if arg.is_empty() || arg.chars().any(special) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

/// A parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NginxConfig {
    /// Top-level statements.
    pub nodes: Vec<Node>,
}

impl NginxConfig {
    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for unbalanced braces, unterminated quotes or
    /// statements missing their `;`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Self {
            nodes: parser::parse(text)?,
        })
    }

    /// Every `server` block, at top level or nested in `http`.
    #[must_use]
    pub fn servers(&self) -> Vec<&Block> {
        fn collect<'a>(nodes: &'a [Node], out: &mut Vec<&'a Block>) {
            for node in nodes {
                if let Node::Block(block) = node {
                    if block.name == "server" {
                        out.push(block);
                    } else {
                        collect(&block.children, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }

    /// Apply `f` to every `server` block. Returns how many were visited.
    pub fn for_each_server(&mut self, mut f: impl FnMut(&mut Block)) -> usize {
        fn visit(nodes: &mut [Node], f: &mut dyn FnMut(&mut Block)) -> usize {
            let mut count = 0;
            for node in nodes {
                if let Node::Block(block) = node {
                    if block.name == "server" {
                        f(block);
                        count += 1;
                    } else {
                        count += visit(&mut block.children, f);
                    }
                }
            }
            count
        }
        visit(&mut self.nodes, &mut f)
    }

    /// Give every server block exactly one asset location matching
    /// `assets`. Returns the number of server blocks.
    pub fn set_assets_location(&mut self, assets: &AssetsLocation) -> usize {
        let block = assets.to_block();
        self.for_each_server(|server| server.set_location(ASSETS_PATH, block.clone()))
    }

    /// Whether every server block already has exactly one asset location
    /// equal to `assets`. False when there are no server blocks.
    #[must_use]
    pub fn has_assets_location(&self, assets: &AssetsLocation) -> bool {
        let expected = assets.to_block();
        let servers = self.servers();
        !servers.is_empty()
            && servers.iter().all(|server| {
                let found = server.locations(ASSETS_PATH);
                found.len() == 1 && found.first().is_some_and(|b| **b == expected)
            })
    }

    /// Render with the canonical layout.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

/// Whether a blank line separates `prev` and `next` when rendering.
const fn needs_gap(prev: &Node, next: &Node) -> bool {
    matches!(prev, Node::Block(_))
        || (matches!(next, Node::Block(_)) && !matches!(prev, Node::Comment(_)))
}

fn write_head(out: &mut String, name: &str, args: &[String]) {
    out.push_str(name);
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
}

fn write_nodes(out: &mut String, nodes: &[Node], depth: usize) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    let mut prev: Option<&Node> = None;
    for node in nodes {
        if prev.is_some_and(|p| needs_gap(p, node)) {
            out.push('\n');
        }
        out.push_str(&indent);
        match node {
            Node::Directive(d) => {
                write_head(out, &d.name, &d.args);
                out.push_str(";\n");
            }
            Node::Comment(text) if text.is_empty() => out.push_str("#\n"),
            Node::Comment(text) => writeln!(out, "# {text}")?,
            Node::Block(b) => {
                write_head(out, &b.name, &b.args);
                out.push_str(" {\n");
                write_nodes(out, &b.children, depth + 1)?;
                out.push_str(&indent);
                out.push_str("}\n");
            }
        }
        prev = Some(node);
    }
    Ok(())
}

impl fmt::Display for NginxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_nodes(&mut out, &self.nodes, 0)?;
        f.write_str(&out)
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    const BENCH_CONF: &str = r#"upstream frappe-bench-frappe {
	server 127.0.0.1:8000 fail_timeout=0;
}

# server blocks

server {
	listen 80;
	server_name
		erp.example.com
		;

	root /home/frappe/frappe-bench/sites;

	location /assets {
		try_files $uri =404;
		add_header Cache-Control "max-age=31536000";
	}

	location ~ ^/protected/(.*) {
		internal;
		try_files /erp.example.com/$1 =404;
	}

	location / {
		rewrite ^(.+)/$ $1 permanent;
		try_files /erp.example.com/public/$uri @webserver;
	}
}
"#;

    fn assets() -> AssetsLocation {
        AssetsLocation::new("/home/frappe/frappe-bench/sites/assets")
    }

    #[test]
    fn render_canonical_layout() {
        let config = NginxConfig::parse("events {}\nhttp { server { listen 80; } }\n").unwrap();
        assert_eq!(
            config.render(),
            "events {\n}\n\nhttp {\n    server {\n        listen 80;\n    }\n}\n"
        );
    }

    #[test]
    fn render_then_parse_is_stable() {
        let config = NginxConfig::parse(BENCH_CONF).unwrap();
        let rendered = config.render();
        let reparsed = NginxConfig::parse(&rendered).unwrap();
        assert_eq!(reparsed, config);
        assert_eq!(reparsed.render(), rendered);
    }

    #[test]
    fn servers_are_found_inside_http() {
        let config =
            NginxConfig::parse("http {\n server { listen 80; }\n server { listen 443; }\n}\n")
                .unwrap();
        assert_eq!(config.servers().len(), 2);
    }

    #[test]
    fn assets_location_replaces_existing_block() {
        let mut config = NginxConfig::parse(BENCH_CONF).unwrap();
        assert!(!config.has_assets_location(&assets()));
        assert_eq!(config.set_assets_location(&assets()), 1);

        let server = config.servers()[0];
        let found = server.locations(ASSETS_PATH);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].directive("alias").unwrap().args,
            vec!["/home/frappe/frappe-bench/sites/assets".to_string()]
        );
        assert_eq!(
            found[0].directive("add_header").unwrap().args,
            vec![
                "Cache-Control".to_string(),
                "\"max-age=31536000, immutable\"".to_string()
            ]
        );
        assert!(config.has_assets_location(&assets()));
    }

    #[test]
    fn assets_location_keeps_position() {
        let mut config = NginxConfig::parse(BENCH_CONF).unwrap();
        config.set_assets_location(&assets());
        let server = config.servers()[0];
        let first_location = server
            .children
            .iter()
            .find_map(|n| match n {
                Node::Block(b) if b.name == "location" => Some(b),
                _ => None,
            })
            .unwrap();
        assert!(first_location.is_location(ASSETS_PATH));
    }

    #[test]
    fn duplicate_assets_locations_collapse_to_one() {
        let text = "server {\n location /assets { root /a; }\n location / { }\n location ^~ /assets { root /b; }\n}\n";
        let mut config = NginxConfig::parse(text).unwrap();
        config.set_assets_location(&assets());
        assert_eq!(config.servers()[0].locations(ASSETS_PATH).len(), 1);
    }

    #[test]
    fn assets_location_added_when_absent() {
        let mut config = NginxConfig::parse("server {\n    listen 80;\n}\n").unwrap();
        config.set_assets_location(&assets());
        assert_eq!(config.servers()[0].locations(ASSETS_PATH).len(), 1);
    }

    #[test]
    fn every_server_gets_assets() {
        let text = "server { listen 80; }\nserver { listen 443 ssl; location /assets { } }\n";
        let mut config = NginxConfig::parse(text).unwrap();
        assert_eq!(config.set_assets_location(&assets()), 2);
        assert!(config.has_assets_location(&assets()));
    }

    #[test]
    fn patching_is_idempotent() {
        let mut once = NginxConfig::parse(BENCH_CONF).unwrap();
        once.set_assets_location(&assets());
        let first = once.render();

        let mut twice = NginxConfig::parse(&first).unwrap();
        twice.set_assets_location(&assets());
        assert_eq!(twice.render(), first);
    }

    #[test]
    fn custom_settings_are_quoted() {
        let block = AssetsLocation::new("/srv/my bench/sites/assets")
            .with_cache_control("no-cache")
            .with_access_log("/var/log/nginx/assets.log")
            .to_block();
        assert_eq!(
            block.directive("alias").unwrap().args,
            vec!["\"/srv/my bench/sites/assets\"".to_string()]
        );
        assert_eq!(
            block.directive("access_log").unwrap().args,
            vec!["/var/log/nginx/assets.log".to_string()]
        );
    }

    #[test]
    fn regex_location_is_not_assets() {
        let block = Block::new("location", &["~", "/assets"]);
        assert!(!block.is_location(ASSETS_PATH));
    }

    #[test]
    fn directive_lookup_outlives_the_key() {
        let block = Block::new("server", &[])
            .with_directive("listen", &["80"])
            .with_directive("client_max_body_size", &["10m"])
            .with_directive("client_max_body_size", &["20m"]);
        let found = {
            let key = String::from("client_max_body_size");
            block.directive(&key)
        };
        assert_eq!(found.unwrap().args, vec!["10m".to_string()]);
        let all: Vec<_> = {
            let key = "client_max_body_size".to_string();
            block.directives(&key).collect()
        };
        assert_eq!(all.len(), 2);
        assert!(block.directive("keepalive_timeout").is_none());
    }

    #[test]
    fn parse_error_display() {
        let err = NginxConfig::parse("server {\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: block 'server' is never closed");
    }

    #[test]
    fn comments_survive_round_trip() {
        let config = NginxConfig::parse("# managed by bench\nserver {\n    listen 80;\n}\n").unwrap();
        assert_eq!(
            config.render(),
            "# managed by bench\nserver {\n    listen 80;\n}\n"
        );
    }
}
