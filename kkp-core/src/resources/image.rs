use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::REGISTRY_DOCKER;

const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPOSITORY_PREFIX: &str = "library/";

static PATH_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").unwrap());
static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])",
        r"(?:\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))*",
        r"(?::[0-9]+)?$",
    ))
    .unwrap()
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w][\w.-]{0,127}$").unwrap());
static DIGEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}$").unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageReferenceError {
    #[error("image reference is empty")]
    Empty,
    #[error("repository name must be lowercase: '{}'", .0)]
    Uppercase(String),
    #[error("invalid registry domain: '{}'", .0)]
    InvalidDomain(String),
    #[error("invalid repository path: '{}'", .0)]
    InvalidPath(String),
    #[error("invalid tag: '{}'", .0)]
    InvalidTag(String),
    #[error("invalid digest: '{}'", .0)]
    InvalidDigest(String),
}

/// Container image reference normalized the way the docker CLI does it, so
/// `nginx` becomes `docker.io/library/nginx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub domain: String,
    pub path: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageReference {
    /// Path plus tag and digest, without the registry domain.
    pub fn remainder(&self) -> String {
        let mut remainder = self.path.clone();
        if let Some(tag) = &self.tag {
            remainder.push(':');
            remainder.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            remainder.push('@');
            remainder.push_str(digest);
        }

        remainder
    }

    pub fn with_domain(self, domain: &str) -> Self {
        Self {
            domain: domain.to_owned(),
            ..self
        }
    }
}

impl FromStr for ImageReference {
    type Err = ImageReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(ImageReferenceError::Empty);
        }

        let (name, digest) = match raw.split_once('@') {
            Some((name, digest)) => {
                if !DIGEST.is_match(digest) {
                    return Err(ImageReferenceError::InvalidDigest(digest.to_owned()));
                }
                (name, Some(digest.to_owned()))
            }
            None => (raw, None),
        };

        let last_slash = name.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match name[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                let tag = &name[split + 1..];
                if !TAG.is_match(tag) {
                    return Err(ImageReferenceError::InvalidTag(tag.to_owned()));
                }
                (&name[..split], Some(tag.to_owned()))
            }
            None => (name, None),
        };

        let (domain, path) = split_domain(name);
        if !DOMAIN.is_match(&domain) {
            return Err(ImageReferenceError::InvalidDomain(domain));
        }
        if path.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ImageReferenceError::Uppercase(path));
        }
        if !path.split('/').all(|component| PATH_COMPONENT.is_match(component)) {
            return Err(ImageReferenceError::InvalidPath(path));
        }

        Ok(Self {
            domain,
            path,
            tag,
            digest,
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.remainder())
    }
}

fn split_domain(name: &str) -> (String, String) {
    let (domain, path) = match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_owned(), rest.to_owned())
        }
        _ => (REGISTRY_DOCKER.to_owned(), name.to_owned()),
    };

    let domain = if domain == LEGACY_DEFAULT_DOMAIN {
        REGISTRY_DOCKER.to_owned()
    } else {
        domain
    };

    let path = if domain == REGISTRY_DOCKER && !path.contains('/') {
        format!("{OFFICIAL_REPOSITORY_PREFIX}{path}")
    } else {
        path
    };

    (domain, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_short_names() {
        let image: ImageReference = "nginx".parse().unwrap();

        assert_eq!(image.to_string(), "docker.io/library/nginx");
    }

    #[test]
    fn keeps_tag_and_namespace() {
        let image: ImageReference = "myrepo/image:tag".parse().unwrap();

        assert_eq!(image.domain, "docker.io");
        assert_eq!(image.path, "myrepo/image");
        assert_eq!(image.tag.as_deref(), Some("tag"));
        assert_eq!(image.remainder(), "myrepo/image:tag");
    }

    #[test]
    fn recognizes_registries_with_ports() {
        let image: ImageReference = "localhost:5000/kubermatic/etcd-launcher".parse().unwrap();

        assert_eq!(image.domain, "localhost:5000");
        assert_eq!(image.path, "kubermatic/etcd-launcher");
        assert_eq!(image.tag, None);
    }

    #[test]
    fn maps_legacy_index_domain() {
        let image: ImageReference = "index.docker.io/busybox".parse().unwrap();

        assert_eq!(image.to_string(), "docker.io/library/busybox");
    }

    #[test]
    fn keeps_digest() {
        let digest = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let image: ImageReference = format!("quay.io/kubermatic/kubermatic@{digest}")
            .parse()
            .unwrap();

        assert_eq!(image.digest.as_deref(), Some(digest));
        assert_eq!(
            image.with_domain("registry.local").to_string(),
            format!("registry.local/kubermatic/kubermatic@{digest}")
        );
    }

    #[test]
    fn rejects_invalid_references() {
        assert_eq!("".parse::<ImageReference>(), Err(ImageReferenceError::Empty));
        assert!(matches!(
            "quay.io/Kubermatic/api".parse::<ImageReference>(),
            Err(ImageReferenceError::Uppercase(_))
        ));
        assert!(matches!(
            "quay.io/kubermatic/api:".parse::<ImageReference>(),
            Err(ImageReferenceError::InvalidTag(_))
        ));
        assert!(matches!(
            "quay.io//api".parse::<ImageReference>(),
            Err(ImageReferenceError::InvalidPath(_))
        ));
    }
}
