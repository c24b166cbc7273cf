//! Derivation of package names from namespace URIs, and class name allocation per package.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

use crate::customs::GlobalSettings;
use crate::names::NameSet;

lazy_static! {
    static ref SCHEME: Regex = Regex::new(r"^[a-z][a-z0-9+.\-]*:").unwrap();
    static ref PORT: Regex = Regex::new(r":[0-9]*$").unwrap();
    static ref PERCENT_ESCAPE: Regex = Regex::new(r"%([0-9a-f]{2})").unwrap();
    static ref NOT_PACKAGE_CHARACTER: Regex = Regex::new(r"[^a-z0-9.]").unwrap();
    static ref REPEATED_DOTS: Regex = Regex::new(r"\.{2,}").unwrap();
}

/// Maps namespace URIs to dotted package names. Results are cached per URI.
///
/// `http://www.example.com/schema/foo` maps to `com.example.schema.foo`, `urn:mycompany:types`
/// to `mycompany.types`.
#[derive(Debug, Clone)]
pub struct PackageMapper {
    /// Lowercased leads, longest first
    lead_rewrites: Vec<(String, String)>,
    strip_prefixes: Vec<String>,
    no_namespace_package: String,
    cache: HashMap<String, String>,
}

impl PackageMapper {
    pub fn new(settings: &GlobalSettings) -> Self {
        let mut lead_rewrites = settings
            .lead_rewrites
            .iter()
            .map(|(lead, replacement)| (lead.to_lowercase(), replacement.to_lowercase()))
            .collect::<Vec<_>>();
        lead_rewrites.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        Self {
            lead_rewrites,
            strip_prefixes: settings
                .strip_prefixes
                .iter()
                .map(|prefix| prefix.to_lowercase())
                .collect(),
            no_namespace_package: settings.no_namespace_package.clone(),
            cache: HashMap::new(),
        }
    }

    pub fn package_for(&mut self, namespace: Option<&str>) -> String {
        let uri = namespace.unwrap_or_default();
        if let Some(package) = self.cache.get(uri) {
            return package.clone();
        }
        let package = self.derive(uri);
        tracing::trace!(uri, package, "derived package");
        self.cache.insert(uri.to_string(), package.clone());
        package
    }

    fn derive(&self, uri: &str) -> String {
        let mut text = uri.trim().to_lowercase();
        if let Some((lead, replacement)) = self
            .lead_rewrites
            .iter()
            .find(|(lead, _)| text.starts_with(lead.as_str()))
        {
            text = format!("{replacement}{}", &text[lead.len()..]);
        }
        text = text.replace('\\', "/");
        if let Some(scheme) = SCHEME.find(&text) {
            text = text[scheme.end()..].to_string();
        }

        let (authority, path) = split_authority(&text);
        let mut labels = authority
            .map(|authority| self.host_labels(authority))
            .unwrap_or_default();

        let mut segments = path
            .split([':', '/'])
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        let has_parent = !labels.is_empty() || segments.len() > 1;
        if let Some(last) = segments.last_mut().filter(|_| has_parent) {
            if let Some(dot) = last.rfind('.') {
                last.truncate(dot);
            }
        }
        labels.extend(segments);

        let package = clean(&labels.join("."));
        if package.is_empty() {
            self.no_namespace_package.clone()
        } else {
            package
        }
    }

    /// Host name labels of an authority in reverse order, with user info, port and configured
    /// prefixes removed.
    fn host_labels(&self, authority: &str) -> Vec<String> {
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = PORT.replace(host, "");
        let host: &str = &host;
        let host = self
            .strip_prefixes
            .iter()
            .find_map(|prefix| host.strip_prefix(prefix.as_str()))
            .unwrap_or(host);
        host.split('.')
            .rev()
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Splits `//authority/path` and `user@host/path` forms; anything else is all path.
fn split_authority(text: &str) -> (Option<&str>, &str) {
    let (rest, explicit) = match text.strip_prefix("//") {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let end = rest.find('/').unwrap_or(rest.len());
    let (authority, path) = rest.split_at(end);
    if explicit || authority.contains('@') {
        (Some(authority), path)
    } else {
        (None, text)
    }
}

fn clean(package: &str) -> String {
    let decoded = PERCENT_ESCAPE.replace_all(package, |captures: &regex::Captures| {
        u8::from_str_radix(&captures[1], 16)
            .map(|byte| char::from(byte).to_ascii_lowercase().to_string())
            .unwrap_or_default()
    });
    let package = NOT_PACKAGE_CHARACTER.replace_all(&decoded, "");
    let package = REPEATED_DOTS.replace_all(&package, ".");
    package.trim_matches('.').to_string()
}

/// Allocates class names so that they are unique within their package.
#[derive(Debug, Default, Clone)]
pub struct PackageSet {
    packages: BTreeMap<String, NameSet>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, package: &str, class_name: &str) -> String {
        let name = self
            .packages
            .entry(package.to_string())
            .or_default()
            .add(class_name);
        if name != class_name {
            tracing::debug!(package, class_name, name, "renamed colliding class");
        }
        name
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> PackageMapper {
        PackageMapper::new(&GlobalSettings::default())
    }

    #[test]
    fn maps_urls_and_urns() {
        let mut mapper = mapper();
        assert_eq!(
            mapper.package_for(Some("http://www.example.com/schema/foo")),
            "com.example.schema.foo"
        );
        assert_eq!(
            mapper.package_for(Some("urn:mycompany:types")),
            "mycompany.types"
        );
        assert_eq!(
            mapper.package_for(Some("https://Example.ORG:8080/v1/orders.xsd")),
            "org.example.v1.orders"
        );
        assert_eq!(
            mapper.package_for(Some("mailto:someone@lists.example.net/archive")),
            "net.example.lists.archive"
        );
        assert_eq!(
            mapper.package_for(Some("http://example.com/my%2Dschema/2024")),
            "com.example.myschema.2024"
        );
    }

    #[test]
    fn empty_namespace_uses_default_package() {
        let mut mapper = mapper();
        assert_eq!(mapper.package_for(None), "nonamespace");
        assert_eq!(mapper.package_for(Some("")), "nonamespace");
        assert_eq!(mapper.package_for(Some("::")), "nonamespace");
    }

    #[test]
    fn longest_lead_rewrite_wins() {
        let mut settings = GlobalSettings::default();
        settings
            .lead_rewrites
            .insert("http://example.org/".to_string(), "org.base/".to_string());
        settings.lead_rewrites.insert(
            "http://example.org/legacy/".to_string(),
            "org.example.compat/".to_string(),
        );
        let mut mapper = PackageMapper::new(&settings);
        assert_eq!(
            mapper.package_for(Some("http://example.org/legacy/v1")),
            "org.example.compat.v1"
        );
        assert_eq!(
            mapper.package_for(Some("http://example.org/current")),
            "org.base.current"
        );
    }

    #[test]
    fn allocates_unique_class_names_per_package() {
        let mut packages = PackageSet::new();
        assert_eq!(packages.allocate("a", "Order"), "Order");
        assert_eq!(packages.allocate("a", "Order"), "Order1");
        assert_eq!(packages.allocate("b", "Order"), "Order");
        assert_eq!(packages.packages().collect::<Vec<_>>(), ["a", "b"]);
    }
}
