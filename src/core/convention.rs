/*!
 * Institutional payload naming convention
 *
 * Payload files are renamed to
 * `<institution>_<collection>_<parent>-<basename>` in place, where the
 * collection is taken from the first two fields of the bag directory name.
 * Files whose name already carries the institution prefix are left alone and
 * counted as previously renamed.
 */

use crate::config::ConventionConfig;
use crate::error::Result;
use bagmend_core_manifest::RenameMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    pub institution: String,
    pub interfield_sep: String,
    pub intrafield_sep: String,
}

/// Renames proposed for one bag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConventionPlan {
    pub renames: RenameMap,
    /// Payload files that already follow the convention
    pub previously_renamed: Vec<String>,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::from(&ConventionConfig::default())
    }
}

impl From<&ConventionConfig> for NamingConvention {
    fn from(config: &ConventionConfig) -> Self {
        Self {
            institution: config.institution.clone(),
            interfield_sep: config.interfield_sep.clone(),
            intrafield_sep: config.intrafield_sep.clone(),
        }
    }
}

impl NamingConvention {
    /// Collection token: the first two fields of the bag name
    pub fn collection(&self, bag_name: &str) -> String {
        bag_name
            .split(self.intrafield_sep.as_str())
            .take(2)
            .collect::<Vec<_>>()
            .join(self.intrafield_sep.as_str())
    }

    /// Whether the base name of `path` already starts with the institution prefix
    pub fn is_renamed(&self, path: &str) -> bool {
        let prefix = format!("{}{}", self.institution, self.interfield_sep);
        base_name(path).starts_with(&prefix)
    }

    /// New `/`-separated path for `path` within `collection`
    pub fn rename(&self, collection: &str, path: &str) -> String {
        let parts: Vec<&str> = path.split('/').collect();
        let tail = parts[parts.len().saturating_sub(2)..].join(self.intrafield_sep.as_str());
        let new_base =
            [self.institution.as_str(), collection, tail.as_str()].join(self.interfield_sep.as_str());

        match path.rfind('/') {
            Some(slash) => format!("{}/{}", &path[..slash], new_base),
            None => new_base,
        }
    }

    /// Plan renames for every payload file of the bag named `bag_name`
    pub fn plan(&self, bag_name: &str, payload_files: &[String]) -> Result<ConventionPlan> {
        let collection = self.collection(bag_name);
        let mut plan = ConventionPlan::default();

        for path in payload_files {
            if self.is_renamed(path) {
                plan.previously_renamed.push(path.clone());
            } else {
                plan.renames.insert(path.as_str(), self.rename(&collection, path))?;
            }
        }

        Ok(plan)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
