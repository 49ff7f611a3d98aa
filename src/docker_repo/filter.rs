// Whitelist/blacklist container filter over image and name patterns

use regex::Regex;

use crate::models::ContainerMeta;

#[derive(Debug, thiserror::Error)]
#[error("invalid regex '{pattern}': {source}")]
pub struct FilterError {
    pattern: String,
    #[source]
    source: regex::Error,
}

#[derive(Debug, Clone, Default)]
struct PatternSet {
    image: Vec<Regex>,
    name: Vec<Regex>,
}

impl PatternSet {
    /// Compile `image:<regex>` / `name:<regex>` filters. Other prefixes are ignored.
    fn parse(filters: &[String]) -> Result<Self, FilterError> {
        let mut set = PatternSet::default();
        for filter in filters {
            let (target, pattern) = if let Some(p) = filter.strip_prefix("image:") {
                (&mut set.image, p)
            } else if let Some(p) = filter.strip_prefix("name:") {
                (&mut set.name, p)
            } else {
                continue;
            };
            let re = Regex::new(pattern).map_err(|source| FilterError {
                pattern: pattern.to_string(),
                source,
            })?;
            target.push(re);
        }
        Ok(set)
    }

    fn matches(&self, meta: &ContainerMeta) -> bool {
        self.image.iter().any(|r| r.is_match(&meta.image))
            || self.name.iter().any(|r| r.is_match(&meta.name))
    }
}

/// Classifies containers as excluded. A whitelist match always overrides a blacklist match.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilter {
    enabled: bool,
    whitelist: PatternSet,
    blacklist: PatternSet,
}

impl ContainerFilter {
    pub fn new(whitelist: &[String], blacklist: &[String]) -> Result<Self, FilterError> {
        Ok(Self {
            enabled: !whitelist.is_empty() || !blacklist.is_empty(),
            whitelist: PatternSet::parse(whitelist)?,
            blacklist: PatternSet::parse(blacklist)?,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_excluded(&self, meta: &ContainerMeta) -> bool {
        if !self.enabled {
            return false;
        }
        self.blacklist.matches(meta) && !self.whitelist.matches(meta)
    }
}
